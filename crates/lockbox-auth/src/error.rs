//! Error types for request authentication.

use lockbox_store::StoreError;
use thiserror::Error;

/// Every way a signed request can fail to authenticate.
///
/// Variants are listed in the order the verifier can produce them.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Credential is not exactly `<kid>:<signature>`.
    #[error("malformed credential")]
    MalformedCredential,

    #[error("invalid key id: {0}")]
    InvalidKeyId(String),

    /// Credential names a different key than the resource owner.
    #[error("invalid kid")]
    KeyIdMismatch,

    #[error("not a valid sign public key: {0}")]
    UnsupportedKeyType(String),

    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    #[error("malformed url: {0}")]
    MalformedUrl(String),

    #[error("verify failed")]
    SignatureInvalid,

    #[error("nonce is missing")]
    MissingNonce,

    #[error("invalid nonce: {0}")]
    InvalidNonce(String),

    #[error("nonce collision")]
    NonceCollision,

    #[error("timestamp (ts) is missing")]
    MissingTimestamp,

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("timestamp is invalid, diff {skew_ms}ms")]
    TimestampOutOfWindow { skew_ms: i64 },

    #[error("request canceled")]
    Canceled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The replay cache could not be reached.
    #[error("replay cache error: {0}")]
    Store(StoreError),
}

impl AuthError {
    /// HTTP status this error surfaces as.
    pub fn status(&self) -> u16 {
        match self {
            AuthError::MalformedCredential
            | AuthError::InvalidKeyId(_)
            | AuthError::UnsupportedKeyType(_)
            | AuthError::InvalidSignatureEncoding(_)
            | AuthError::MalformedUrl(_)
            | AuthError::MissingNonce
            | AuthError::InvalidNonce(_)
            | AuthError::MissingTimestamp
            | AuthError::InvalidTimestamp(_) => 400,
            AuthError::KeyIdMismatch
            | AuthError::SignatureInvalid
            | AuthError::NonceCollision
            | AuthError::TimestampOutOfWindow { .. } => 403,
            AuthError::Canceled | AuthError::DeadlineExceeded => 503,
            AuthError::Store(_) => 500,
        }
    }

    /// Message safe to return to the caller.
    ///
    /// Storage failures never leak detail.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Store(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }

    /// Short stable name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MalformedCredential => "malformed_credential",
            AuthError::InvalidKeyId(_) => "invalid_key_id",
            AuthError::KeyIdMismatch => "key_id_mismatch",
            AuthError::UnsupportedKeyType(_) => "unsupported_key_type",
            AuthError::InvalidSignatureEncoding(_) => "invalid_signature_encoding",
            AuthError::MalformedUrl(_) => "malformed_url",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::MissingNonce => "missing_nonce",
            AuthError::InvalidNonce(_) => "invalid_nonce",
            AuthError::NonceCollision => "nonce_collision",
            AuthError::MissingTimestamp => "missing_timestamp",
            AuthError::InvalidTimestamp(_) => "invalid_timestamp",
            AuthError::TimestampOutOfWindow { .. } => "timestamp_out_of_window",
            AuthError::Canceled => "canceled",
            AuthError::DeadlineExceeded => "deadline_exceeded",
            AuthError::Store(_) => "store",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Canceled => AuthError::Canceled,
            StoreError::DeadlineExceeded => AuthError::DeadlineExceeded,
            other => AuthError::Store(other),
        }
    }
}

/// Result type for authentication.
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_messages() {
        assert_eq!(AuthError::KeyIdMismatch.public_message(), "invalid kid");
        assert_eq!(AuthError::SignatureInvalid.public_message(), "verify failed");
        assert_eq!(AuthError::NonceCollision.public_message(), "nonce collision");
        assert_eq!(
            AuthError::Store(StoreError::InvalidData("disk on fire".into())).public_message(),
            "internal error"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::MalformedCredential.status(), 400);
        assert_eq!(AuthError::MissingNonce.status(), 400);
        assert_eq!(AuthError::KeyIdMismatch.status(), 403);
        assert_eq!(AuthError::NonceCollision.status(), 403);
        assert_eq!(AuthError::Store(StoreError::InvalidData(String::new())).status(), 500);
    }

    #[test]
    fn test_store_cancellation_maps_to_auth_kinds() {
        assert!(matches!(
            AuthError::from(StoreError::Canceled),
            AuthError::Canceled
        ));
        assert!(matches!(
            AuthError::from(StoreError::DeadlineExceeded),
            AuthError::DeadlineExceeded
        ));
    }
}
