// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Errors raised by the exam, reporting and streak services.
///
/// All of them are local and synchronous; none is retried internally.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced exam, attempt, result or user does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The attempt's time budget is exhausted. Callers must move to the
    /// submit flow instead of retrying the write.
    #[error("attempt time budget exhausted")]
    AttemptExpired,

    /// The attempt already reached a terminal state.
    #[error("attempt already submitted")]
    AlreadySubmitted,

    /// Malformed exam definition or answer payload.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The persistence layer failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Storage(err.to_string())
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., second submit of the same attempt)
    Conflict(String),

    // 410 Gone (attempt ran out of time)
    Gone(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Gone(msg) => (StatusCode::GONE, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Maps service errors onto HTTP semantics.
/// Allows using `?` on service calls inside handlers.
impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => AppError::NotFound(msg),
            CoreError::AttemptExpired => AppError::Gone(err.to_string()),
            CoreError::AlreadySubmitted => AppError::Conflict(err.to_string()),
            CoreError::Validation(msg) => AppError::BadRequest(msg),
            CoreError::Storage(msg) => AppError::InternalServerError(msg),
        }
    }
}
