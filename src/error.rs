use axum::{Json,
    http::StatusCode,
    response::IntoResponse
};
use serde_json::json;
use thiserror::Error;

use crate::{metadata::MetadataError, storage::StorageError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Multipart error: {0}")]
    MultipartError(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl AppError {
    /// Status code and client-facing summary for this error.
    fn status_and_message(&self) -> (StatusCode, &str) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::MultipartError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Storage(StorageError::NotFound(_)) => (StatusCode::NOT_FOUND, "File not found"),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Storage failure"),
            AppError::Metadata(MetadataError::NotFound(_)) => (StatusCode::NOT_FOUND, "File not found"),
            AppError::Metadata(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Metadata failure"),
        }
    }
}

/// Convert `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = self.status_and_message();

        // Server-side failures carry their cause; storage errors never name a path
        let body = if status.is_server_error() {
            let cause = match &self {
                AppError::Storage(StorageError::IoError(e)) => e.kind().to_string(),
                other => other.to_string(),
            };
            tracing::error!("{}: {}", message, self);
            json!({"message": message, "error": cause})
        } else {
            json!({"message": message})
        };

        (status, Json(body)).into_response()
    }
}
