//! Error types for the economy API.
//!
//! [`ApiError`] unifies every failure mode into one enum rendered as
//! `{ "error": message }` with a matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors returned by API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A path or query parameter is not a valid UUID.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// The admin surface is disabled in this runtime mode.
    #[error("forbidden")]
    Forbidden,

    /// An administrative operation failed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::InvalidUuid(msg) => (StatusCode::BAD_REQUEST, format!("invalid UUID: {msg}")),
            Self::Forbidden => (StatusCode::FORBIDDEN, String::from("forbidden")),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Admin operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
    }
}
