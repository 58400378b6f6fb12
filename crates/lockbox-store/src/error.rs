//! Store errors.

use thiserror::Error;

/// Failure of a log store or replay cache call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row could not be decoded.
    #[error("corrupt row: {0}")]
    InvalidData(String),

    #[error("schema migration failed: {0}")]
    Migration(String),

    /// A bounded cache is holding its limit of live keys.
    #[error("cache full")]
    Full,

    /// The caller's context was cancelled.
    #[error("operation canceled")]
    Canceled,

    /// The caller's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True for the two context-termination kinds.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StoreError::Canceled | StoreError::DeadlineExceeded)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
