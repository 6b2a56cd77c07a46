//! Human attestations: a reviewer signs off on a work product produced
//! outside any governed tool. The reviewer's signature is the governance,
//! so an attestation is governed by construction.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use charter_core::{
    now_timestamp, sign_artifact, ChainEntry, Digest, PrivateSeed, PublicId, Signature,
};

use crate::error::Result;
use crate::stamp::STAMP_VERSION;

/// Discriminator value of the `type` field.
pub const ATTESTATION_TYPE: &str = "attestation";

/// Chain event recorded when a work product is attested.
pub const ATTESTED_EVENT: &str = "work_product_attested";

/// An attestation before it is bound to a chain entry and signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationDraft {
    pub node: PublicId,
    pub alias: String,
    pub reviewer: String,
    pub timestamp: String,
    pub file_path: String,
    pub file_hash: Digest,
    pub reason: String,
}

impl AttestationDraft {
    /// Draft an attestation over `content`.
    ///
    /// `file_name` is recorded as given; callers pass the base name.
    /// Without a reviewer, the signer's alias is the reviewer.
    pub fn new(
        node: PublicId,
        alias: impl Into<String>,
        reviewer: Option<&str>,
        file_name: impl Into<String>,
        content: &[u8],
        reason: impl Into<String>,
    ) -> Self {
        let alias = alias.into();
        let reviewer = match reviewer {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => alias.clone(),
        };
        Self {
            node,
            alias,
            reviewer,
            timestamp: now_timestamp(),
            file_path: file_name.into(),
            file_hash: Digest::sha256(content),
            reason: reason.into(),
        }
    }

    /// Override the timestamp.
    pub fn at(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// The payload of the `work_product_attested` chain entry.
    pub fn chain_payload(&self) -> Value {
        json!({
            "file": self.file_path,
            "file_hash": self.file_hash,
            "reviewer": self.reviewer,
            "reason": self.reason,
        })
    }

    /// Bind the chain entry the payload was recorded as, then sign.
    pub fn seal(self, entry: &ChainEntry, seed: &PrivateSeed) -> Result<Attestation> {
        let mut attestation = Attestation {
            version: STAMP_VERSION.to_string(),
            kind: ATTESTATION_TYPE.to_string(),
            node: self.node,
            alias: self.alias,
            reviewer: self.reviewer,
            timestamp: self.timestamp,
            file_path: self.file_path,
            file_hash: self.file_hash,
            reason: self.reason,
            governed: true,
            chain_index: entry.index,
            chain_hash: entry.hash,
            signature: Signature::from_bytes([0u8; 32]),
        };
        attestation.signature = sign_artifact(&serde_json::to_value(&attestation)?, seed);
        Ok(attestation)
    }
}

/// A signed human attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub version: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub node: PublicId,
    pub alias: String,
    pub reviewer: String,
    pub timestamp: String,
    pub file_path: String,
    pub file_hash: Digest,
    pub reason: String,
    pub governed: bool,
    pub chain_index: u64,
    pub chain_hash: Digest,
    pub signature: Signature,
}

impl Attestation {
    /// The attestation as an untyped JSON object.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
