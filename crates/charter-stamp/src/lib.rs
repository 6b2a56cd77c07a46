//! # Charter Stamp
//!
//! Attribution for work products: signed stamps recording which AI tools
//! contributed and whether they were governed, human attestations for
//! work produced outside governed tools, and the ingestion gate that
//! decides whether a work product may enter institutional use.
//!
//! Like `charter-core`, this crate does no I/O. Stamps and attestations
//! are minted in two steps: a draft yields a chain payload, the caller
//! appends it, and the draft is sealed against the resulting entry.
//!
//! ## Key Types
//!
//! - [`Stamp`] / [`StampDraft`] - Signed attribution for AI-assisted work
//! - [`Attestation`] / [`AttestationDraft`] - Signed human sign-off
//! - [`GateDecision`] - The ingestion verdict from [`accept_work_product`]

pub mod attestation;
pub mod error;
pub mod gate;
pub mod render;
pub mod stamp;
pub mod verify;

pub use attestation::{Attestation, AttestationDraft, ATTESTATION_TYPE, ATTESTED_EVENT};
pub use error::{Result, StampError};
pub use gate::{accept_work_product, GateDecision, HUMAN_ONLY};
pub use render::{to_header, to_json, to_trailer, CommentStyle, DEFAULT_TRAILER_TAG};
pub use stamp::{
    aggregate_governed, Stamp, StampDraft, ToolAttestation, ToolFact, STAMPED_EVENT,
    STAMP_VERSION, UNKNOWN_DOMAIN,
};
pub use verify::{verify_artifact_signature, verify_stamp, StampVerification, REQUIRED_FIELDS};
