//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Operator header missing or not in the admin directory.
    #[error("authentication required")]
    Unauthorized,

    /// Request body failed validation.
    #[error("{0}")]
    Validation(String),

    /// Bad request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// CAPTCHA token missing while verification is enforced.
    #[error("captcha token required")]
    CaptchaRequired,

    /// CAPTCHA verification failed.
    #[error("captcha verification failed")]
    CaptchaFailed,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Emailed action link rejected.
    #[error("invalid token: {0}")]
    InvalidToken(#[from] riposte_core::TokenError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] riposte_storage::StorageError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_failed"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::CaptchaRequired => (StatusCode::FORBIDDEN, "captcha_required"),
            ApiError::CaptchaFailed => (StatusCode::FORBIDDEN, "captcha_failed"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::InvalidToken(_) => (StatusCode::BAD_REQUEST, "invalid_token"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        // Server-side failures answer with a generic line; the detail goes
        // to the log, not to unauthenticated callers.
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            code: code.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
