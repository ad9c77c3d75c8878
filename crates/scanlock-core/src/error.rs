//! Error types for Scanlock

use thiserror::Error;

/// Main error type for Scanlock operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("QR encoding failed: {0}")]
    QrEncode(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias using Scanlock's Error
pub type Result<T> = std::result::Result<T, Error>;
