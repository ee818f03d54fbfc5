//! Core error types.

use thiserror::Error;

/// Errors that can occur in core domain logic.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (e.g., reading the admin directory file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
