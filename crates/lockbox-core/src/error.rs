//! Error types for Lockbox Core.

use thiserror::Error;

/// Errors from parsing and verifying the core primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid key id: {0}")]
    InvalidKeyId(String),

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("malformed url: {0}")]
    MalformedUrl(String),

    #[error("invalid nonce: {0}")]
    InvalidNonce(String),

    #[error("invalid direction: {0}")]
    InvalidDirection(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
