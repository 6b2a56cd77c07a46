//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Entry or identity serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The entry does not follow the current head of its chain.
    ///
    /// Raised when another writer appended first; nothing was written.
    #[error("conflict on chain {chain}: index {index} does not follow the current head")]
    Conflict { chain: String, index: u64 },

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock could not be taken (poisoned mutex or advisory file lock).
    #[error("lock error: {0}")]
    Lock(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<charter_core::CoreError> for StoreError {
    fn from(e: charter_core::CoreError) -> Self {
        StoreError::InvalidData(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
