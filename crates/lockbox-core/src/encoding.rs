//! Text encodings used on the wire.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Base62 alphabet, digits first.
pub const BASE62: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encode bytes as base62.
pub fn base62_encode(bytes: &[u8]) -> String {
    base_x::encode(BASE62, bytes)
}

/// Decode base62 text.
pub fn base62_decode(s: &str) -> Result<Vec<u8>, base_x::DecodeError> {
    base_x::decode(BASE62, s)
}

/// Standard base64 with padding.
pub fn base64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64 with padding.
pub fn base64_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(s)
}
