//! Error types for the Charter facade.

use charter_core::CoreError;
use charter_stamp::StampError;
use charter_store::StoreError;
use thiserror::Error;

use crate::bridge::BridgeStatus;

/// Errors that can occur during Charter operations.
#[derive(Debug, Error)]
pub enum CharterError {
    /// No identity has been created for this node.
    #[error("no identity found; create one first")]
    NoIdentity,

    /// An identity already exists for this node.
    #[error("identity already exists: {0}")]
    IdentityExists(String),

    /// The identity chain has entries but no identity record owns them.
    #[error("identity chain already has {0} entries; refusing to write a second genesis")]
    IdentityChainExists(u64),

    /// The identity is already bound to a real person.
    #[error("Identity already verified as: {name}. Transfer already complete.")]
    AlreadyVerified { name: String, email: String },

    /// Context not found.
    #[error("context not found: {0}")]
    ContextNotFound(String),

    /// Context already exists.
    #[error("context already exists: {0}")]
    ContextExists(String),

    /// Bridge not found.
    #[error("bridge not found: {0}")]
    BridgeNotFound(String),

    /// The bridge is not in a state that allows the operation.
    #[error("bridge {bridge_id} is already {status}")]
    BridgeState {
        bridge_id: String,
        status: BridgeStatus,
    },

    /// The bridge request is malformed or made by the wrong party.
    #[error("invalid bridge: {0}")]
    InvalidBridge(String),

    /// The governance document is unusable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Stamp error.
    #[error("stamp error: {0}")]
    Stamp(#[from] StampError),

    /// YAML error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Charter operations.
pub type Result<T> = std::result::Result<T, CharterError>;
