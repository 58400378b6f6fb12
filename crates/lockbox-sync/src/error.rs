//! Sync engine errors and their HTTP status.

use lockbox_store::StoreError;
use thiserror::Error;

/// Failure of a vault or event operation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Cursor-less read of a log with no live entries.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// `dir` was neither `asc` nor `desc`.
    #[error("invalid dir")]
    InvalidDirection(String),

    /// A pagination parameter did not parse.
    #[error("invalid {param}")]
    InvalidQuery { param: &'static str, value: String },

    /// A stored record failed to decode.
    #[error("corrupt record at {path}#{index}: {reason}")]
    Corrupt {
        path: String,
        index: i64,
        reason: String,
    },

    #[error("encode failed: {0}")]
    Serialization(String),

    #[error("operation canceled")]
    Canceled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("store: {0}")]
    Store(StoreError),
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Canceled => SyncError::Canceled,
            StoreError::DeadlineExceeded => SyncError::DeadlineExceeded,
            other => SyncError::Store(other),
        }
    }
}

impl SyncError {
    /// HTTP status class of this failure.
    pub fn status(&self) -> u16 {
        match self {
            SyncError::NotFound(_) => 404,
            SyncError::InvalidDirection(_) | SyncError::InvalidQuery { .. } => 400,
            SyncError::Canceled | SyncError::DeadlineExceeded => 503,
            SyncError::Corrupt { .. } | SyncError::Serialization(_) | SyncError::Store(_) => 500,
        }
    }

    /// Message safe to return to the caller.
    pub fn public_message(&self) -> String {
        match self.status() {
            500 => "internal error".to_string(),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
