//! Error types for the Marginalia peer server
//!
//! Client-side failures (anchoring, stores, transport) have their own enums
//! in their modules and never reach this type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Highlight not found: {0}")]
    HighlightNotFound(i64),

    #[error("Invalid highlight at {path} [{start}, {end})")]
    InvalidHighlight { path: String, start: usize, end: usize },

    #[error("Batch of {received} highlights exceeds the limit of {max}")]
    BatchTooLarge { received: usize, max: usize },

    #[error("Missing or invalid API key")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::HighlightNotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("No highlight with id {}", id),
            ),
            AppError::InvalidHighlight { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_highlight",
                self.to_string(),
            ),
            AppError::BatchTooLarge { max, .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "batch_too_large",
                format!("At most {} highlights per request", max),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing or invalid API key".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "Database error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
