//! # Charter Core
//!
//! Pure primitives for Charter: signed hash-chain entries, identity records,
//! canonical JSON and governance fingerprints.
//!
//! This crate contains no I/O and no storage. It is pure computation over
//! hashed and signed data structures.
//!
//! ## Key Types
//!
//! - [`ChainEntry`] - The atomic unit of the hash chain
//! - [`EntryBuilder`] - Builds an entry as the successor of a chain head
//! - [`IdentityRecord`] - Pseudonymous key material plus optional real identity
//! - [`Governance`] - A governance ruleset, fingerprinted by [`fingerprint`]
//!
//! ## Canonicalization
//!
//! Hashes and signatures are computed over canonical JSON. See [`canonical`].

pub mod canonical;
pub mod crypto;
pub mod entry;
pub mod error;
pub mod governance;
pub mod identity;
pub mod integrity;
pub mod types;
pub mod validation;

pub use canonical::{canonical_bytes, canonical_bytes_without, canonical_json};
pub use crypto::{Digest, PrivateSeed, Signature};
pub use entry::{
    hash_content, sign_artifact, sign_content, verify_artifact, ChainEntry, EntryBuilder,
};
pub use error::{CoreError, Result};
pub use governance::{
    fingerprint, fingerprint_value, Governance, KillTrigger, LayerA, LayerB, LayerC, Rule,
    StructuredRule,
};
pub use identity::{
    IdentityRecord, PublicIdentity, RealIdentity, TrustLevel, VerificationMethod,
    IDENTITY_VERSION,
};
pub use integrity::{verify_integrity, IntegrityReport};
pub use types::{now_timestamp, ChainId, PublicId, TIMESTAMP_FORMAT};
pub use validation::{validate_chain, ChainValidation, EntryFault};
