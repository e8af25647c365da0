//! Error types for readaloud

use std::io;
use thiserror::Error;

/// Main error type for readaloud
#[derive(Error, Debug)]
pub enum ReadAloudError {
    #[error("Invalid speech request: {0}")]
    Validation(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Delivery failure: {0}")]
    Delivery(String),

    #[error("Provisioning error: {0}")]
    Provisioning(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for readaloud operations
pub type Result<T> = std::result::Result<T, ReadAloudError>;

impl From<String> for ReadAloudError {
    fn from(s: String) -> Self {
        ReadAloudError::Other(s)
    }
}

impl From<&str> for ReadAloudError {
    fn from(s: &str) -> Self {
        ReadAloudError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for ReadAloudError {
    fn from(e: serde_json::Error) -> Self {
        ReadAloudError::Delivery(format!("Message encoding error: {}", e))
    }
}
