//! Keys, signatures, nonces and the body hash.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::encoding;
use crate::error::CoreError;
use crate::types::KeyId;

/// Length of a nonce in raw bytes.
pub const NONCE_LEN: usize = 32;

/// Content hash of a request body.
///
/// Empty for an empty body, otherwise base64 of the SHA-256 digest.
pub fn content_hash(body: &[u8]) -> String {
    if body.is_empty() {
        return String::new();
    }
    encoding::base64_encode(&Sha256::digest(body))
}

/// Raw Ed25519 verification key as it appears inside a [`KeyId`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn point(&self) -> Result<VerifyingKey, CoreError> {
        VerifyingKey::from_bytes(&self.0).map_err(|e| CoreError::UnsupportedKeyType(e.to_string()))
    }

    /// Fails with `UnsupportedKeyType` unless the bytes are a valid point.
    pub fn check(&self) -> Result<(), CoreError> {
        self.point().map(|_| ())
    }

    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CoreError> {
        self.point()?
            .verify(message, &Signature::from_bytes(&signature.0))
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", &self.to_hex()[..16])
    }
}

/// Detached signature from the second half of a credential.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

impl Ed25519Signature {
    /// Standard base64 with padding, as carried in credentials.
    pub fn to_base64(&self) -> String {
        encoding::base64_encode(&self.0)
    }

    /// Decode from standard base64.
    pub fn from_base64(s: &str) -> Result<Self, CoreError> {
        let bytes = encoding::base64_decode(s)
            .map_err(|e| CoreError::InvalidSignatureEncoding(e.to_string()))?;
        let arr: [u8; 64] = bytes.try_into().map_err(|v: Vec<u8>| {
            CoreError::InvalidSignatureEncoding(format!("expected 64 bytes, got {}", v.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Sig({}...)", &hex::encode(self.0)[..16])
    }
}

/// Client-held signing key. Only its [`KeyId`] ever leaves the process.
#[derive(Clone)]
pub struct Keypair(SigningKey);

impl Keypair {
    pub fn generate() -> Self {
        Self(SigningKey::generate(&mut OsRng))
    }

    /// Deterministic key for fixtures and golden vectors.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self(SigningKey::from_bytes(seed))
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.0.verifying_key().to_bytes())
    }

    pub fn key_id(&self) -> KeyId {
        KeyId::ed25519(&self.public_key())
    }

    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.0.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.key_id())
    }
}

/// A single-use request nonce.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce(pub [u8; NONCE_LEN]);

impl Nonce {
    /// Draw a fresh nonce from the operating system RNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    /// Wire form carried in the `nonce` query parameter.
    pub fn to_base62(&self) -> String {
        encoding::base62_encode(&self.0)
    }

    /// Decode the wire form. Anything other than exactly 32 bytes is rejected.
    pub fn from_base62(s: &str) -> Result<Self, CoreError> {
        let bytes = encoding::base62_decode(s)
            .map_err(|_| CoreError::InvalidNonce(format!("not base62: {:?}", s)))?;
        let arr: [u8; NONCE_LEN] = bytes.try_into().map_err(|v: Vec<u8>| {
            CoreError::InvalidNonce(format!("expected {} bytes, got {}", NONCE_LEN, v.len()))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({}...)", &hex::encode(self.0)[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_sign_verify() {
        let keypair = Keypair::generate();
        let message = b"hello world";
        let signature = keypair.sign(message);

        keypair
            .public_key()
            .verify(message, &signature)
            .expect("valid signature should verify");

        let tampered = b"hello worlD";
        assert_eq!(
            keypair.public_key().verify(tampered, &signature),
            Err(CoreError::InvalidSignature)
        );
    }

    #[test]
    fn test_keypair_deterministic_from_seed() {
        let seed = [0x42u8; 32];
        let kp1 = Keypair::from_seed(&seed);
        let kp2 = Keypair::from_seed(&seed);
        assert_eq!(kp1.key_id(), kp2.key_id());
        assert_eq!(kp1.sign(b"m"), kp2.sign(b"m"));
    }

    #[test]
    fn test_content_hash() {
        assert_eq!(content_hash(b""), "");
        // SHA-256("abc")
        assert_eq!(
            content_hash(b"abc"),
            "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0="
        );
    }

    #[test]
    fn test_signature_base64_roundtrip() {
        let sig = Keypair::from_seed(&[0x09; 32]).sign(b"msg");
        let text = sig.to_base64();
        assert_eq!(Ed25519Signature::from_base64(&text).unwrap(), sig);

        assert!(matches!(
            Ed25519Signature::from_base64("not base64!"),
            Err(CoreError::InvalidSignatureEncoding(_))
        ));
        assert!(matches!(
            Ed25519Signature::from_base64("AAAA"),
            Err(CoreError::InvalidSignatureEncoding(_))
        ));
    }

    #[test]
    fn test_nonce_base62_preserves_leading_zeros() {
        let mut bytes = [0xffu8; NONCE_LEN];
        bytes[0] = 0;
        bytes[1] = 0;
        let nonce = Nonce::from_bytes(bytes);
        let text = nonce.to_base62();
        assert!(text.starts_with("00"));
        assert_eq!(Nonce::from_base62(&text).unwrap(), nonce);
    }

    #[test]
    fn test_nonce_rejects_wrong_length() {
        let short = encoding::base62_encode(&[1u8; 16]);
        assert!(matches!(
            Nonce::from_base62(&short),
            Err(CoreError::InvalidNonce(_))
        ));
        assert!(matches!(
            Nonce::from_base62("not-base62"),
            Err(CoreError::InvalidNonce(_))
        ));
    }

    #[test]
    fn test_random_nonces_differ() {
        assert_ne!(Nonce::random(), Nonce::random());
    }
}
