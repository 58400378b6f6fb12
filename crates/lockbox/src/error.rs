//! API error type and the uniform error envelope.
//!
//! Every failure renders as `{"error":{"code":<status>,"message":<msg>}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lockbox_auth::AuthError;
use lockbox_sync::SyncError;
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required credential header is absent.
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        let code = match self {
            ApiError::MissingHeader(_) => 401,
            ApiError::BadRequest(_) => 400,
            ApiError::Auth(e) => e.status(),
            ApiError::Sync(e) => e.status(),
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Message rendered to the client.
    pub fn message(&self) -> String {
        match self {
            ApiError::Auth(e) => e.public_message(),
            ApiError::Sync(e) => e.public_message(),
            other => other.to_string(),
        }
    }
}

/// Error envelope.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: status.as_u16(),
                message: self.message(),
            },
        };
        (status, Json(body)).into_response()
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;
