//! Error types for the stamp module.

use thiserror::Error;

/// Errors that can occur while building or rendering stamps.
#[derive(Debug, Error)]
pub enum StampError {
    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] charter_core::CoreError),
}

impl From<serde_json::Error> for StampError {
    fn from(e: serde_json::Error) -> Self {
        StampError::SerializationError(e.to_string())
    }
}

/// Result type for stamp operations.
pub type Result<T> = std::result::Result<T, StampError>;
