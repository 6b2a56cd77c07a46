//! # Charter
//!
//! Tamper-evident attribution for AI-assisted work: a signed hash chain per
//! node, a one-time transfer of authorship from a pseudonym to a verified
//! person, attribution stamps bound to a governance ruleset, and the
//! ingestion gate that decides whether a work product may be used.
//!
//! ## Overview
//!
//! [`Charter`] is the entry point. It is generic over a [`store::ChainStore`]
//! and a [`store::IdentityStore`], which the caller opens at an explicit
//! location:
//!
//! - **Identity**: create, load, verify, export, transfer proof
//! - **Chain**: append, read, tail, integrity walk, deep validation
//! - **Stamps**: mint, verify, attest, gate
//! - **Contexts**: partitions with their own chains, the active context
//! - **Bridges**: consented flow between two contexts
//! - **Audit**: Markdown reports and a status summary
//!
//! ## Usage
//!
//! ```rust,no_run
//! use charter::{Charter, CharterConfig};
//! use charter::stamp::ToolFact;
//! use charter::store::{FileIdentityStore, JsonlChainStore};
//!
//! fn example() -> charter::Result<()> {
//!     let chains = JsonlChainStore::open("/var/lib/charter")?;
//!     let identities = FileIdentityStore::new("/var/lib/charter/identity.json");
//!     let charter = Charter::new(chains, identities);
//!
//!     charter.create_identity(Some("ada"))?;
//!
//!     let config = charter::load_config("charter.yaml")?;
//!     let tools = [ToolFact::new("claude_code", "Claude Code", "Anthropic", true)];
//!     let stamp = charter.create_stamp(Some(&config), &tools, Some("Q1 report"))?;
//!     println!("{}", charter.stamp_trailer(&stamp));
//!
//!     let decision = charter.accept_work_product(Some(&stamp.to_value()?));
//!     assert!(decision.accepted);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `charter::core` - Entries, identities, canonical JSON, fingerprints
//! - `charter::store` - Storage traits and backends
//! - `charter::stamp` - Stamps, attestations and the gate

pub mod audit;
pub mod bridge;
pub mod charter;
pub mod config;
pub mod context;
pub mod error;
pub mod proof;

// Re-export component crates
pub use charter_core as core;
pub use charter_stamp as stamp;
pub use charter_store as store;

// Re-export main types for convenience
pub use crate::audit::{AuditReport, GovernanceSummary, Status, AUDIT_EVENT};
pub use crate::bridge::{
    Bridge, BridgePolicy, BridgeStatus, Bridging, BRIDGE_APPROVED_EVENT, BRIDGE_PROPOSED_EVENT,
    BRIDGE_REVOKED_EVENT,
};
pub use crate::charter::{
    attestation_path, AttestOutcome, Charter, TransferRecord, Verification, VerifiedParty,
    IDENTITY_CREATED_EVENT, IDENTITY_VERIFIED_EVENT,
};
pub use crate::config::{find_config, load_config, CharterConfig, CharterOptions, CONFIG_NAME};
pub use crate::context::{
    ContextInfo, ContextKind, CONTEXT_ACTIVATED_EVENT, CONTEXT_CREATED_EVENT,
};
pub use crate::error::{CharterError, Result};
pub use crate::proof::{ProofVerification, TransferProof, PROOF_TYPE};

// Re-export commonly used core types
pub use charter_core::{
    ChainEntry, ChainId, Digest, Governance, IdentityRecord, IntegrityReport, PublicId,
    PublicIdentity, TrustLevel, VerificationMethod,
};
pub use charter_stamp::{Attestation, GateDecision, Stamp, StampVerification, ToolFact};
