//! Error types for outbound services.

use thiserror::Error;

/// Errors from external collaborators.
#[derive(Debug, Error)]
pub enum OutboundError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Token signing failed: {0}")]
    Token(String),
}

/// Result type alias for outbound operations.
pub type Result<T> = std::result::Result<T, OutboundError>;
