//! Error types for Charter Core.

use thiserror::Error;

/// Core errors raised while encoding, decoding or validating primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("invalid chain id: {0}")]
    InvalidChainId(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            CoreError::DecodingError(e.to_string())
        } else {
            CoreError::EncodingError(e.to_string())
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
