//! ChainEntry: the atomic unit of the hash chain.
//!
//! An entry is an immutable, signed event linked to its predecessor by hash.
//! Once appended it is never edited; corrections are new entries.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::canonical::canonical_bytes_without;
use crate::crypto::{Digest, PrivateSeed, Signature};
use crate::error::Result;
use crate::types::{now_timestamp, PublicId};

/// Fields excluded from the bytes an entry's hash and signature cover.
pub const SEALED_FIELDS: &[&str] = &["hash", "signature"];

/// A single signed, hash-linked event.
///
/// Field order matches the line format of chain files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEntry {
    /// Zero-based position; equals the entry's offset in the chain.
    pub index: u64,

    /// Creation time in [`crate::TIMESTAMP_FORMAT`].
    pub timestamp: String,

    /// Open namespace tag naming the event kind.
    pub event: String,

    /// Event payload, opaque to the chain.
    pub data: Value,

    /// `hash` of the preceding entry, or [`Digest::ZERO`] for genesis.
    pub previous_hash: Digest,

    /// Public id of the writer. Absent only on legacy unsigned genesis lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<PublicId>,

    /// SHA-256 over the canonical entry minus `hash` and `signature`.
    pub hash: Digest,

    /// HMAC-SHA256 over the same bytes as `hash`, keyed by the signer's seed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

impl ChainEntry {
    /// The entry as a JSON object, every field included.
    pub fn to_value(&self) -> Value {
        let mut map = self.content_map();
        map.insert("hash".into(), Value::String(self.hash.to_hex()));
        if let Some(sig) = &self.signature {
            map.insert("signature".into(), Value::String(sig.to_hex()));
        }
        Value::Object(map)
    }

    /// The fields covered by `hash` and `signature`.
    fn content_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("index".into(), Value::from(self.index));
        map.insert("timestamp".into(), Value::String(self.timestamp.clone()));
        map.insert("event".into(), Value::String(self.event.clone()));
        map.insert("data".into(), self.data.clone());
        map.insert(
            "previous_hash".into(),
            Value::String(self.previous_hash.to_hex()),
        );
        if let Some(signer) = &self.signer {
            map.insert("signer".into(), Value::String(signer.to_hex()));
        }
        map
    }

    /// The canonical bytes that `hash` and `signature` are computed over.
    pub fn content_bytes(&self) -> Vec<u8> {
        canonical_bytes_without(&Value::Object(self.content_map()), SEALED_FIELDS)
    }

    /// Recompute the hash from the entry's content.
    pub fn compute_hash(&self) -> Digest {
        Digest::sha256(&self.content_bytes())
    }

    /// Whether the stored hash matches the content.
    pub fn verify_hash(&self) -> bool {
        self.compute_hash() == self.hash
    }

    /// Whether the stored signature was produced by `seed` over the content.
    ///
    /// An unsigned entry never verifies.
    pub fn verify_signature(&self, seed: &PrivateSeed) -> bool {
        match &self.signature {
            Some(sig) => seed.verify(&self.content_bytes(), sig),
            None => false,
        }
    }

    /// Check if this is a genesis entry.
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Decode the payload into a typed view.
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(&self.data)?)
    }
}

/// Builder for creating chain entries.
///
/// Position (`index`, `previous_hash`) comes from the current head, so an
/// entry can only be built as the successor of a specific chain state.
pub struct EntryBuilder {
    index: u64,
    previous_hash: Digest,
    timestamp: Option<String>,
    event: String,
    data: Value,
}

impl EntryBuilder {
    /// Start building the successor of `head`, or a genesis when `None`.
    pub fn after(head: Option<&ChainEntry>) -> Self {
        let (index, previous_hash) = match head {
            Some(h) => (h.index + 1, h.hash),
            None => (0, Digest::ZERO),
        };
        Self {
            index,
            previous_hash,
            timestamp: None,
            event: String::new(),
            data: Value::Object(Map::new()),
        }
    }

    /// Start building a genesis entry.
    pub fn genesis() -> Self {
        Self::after(None)
    }

    /// Set the timestamp. Defaults to the current time.
    pub fn timestamp(mut self, ts: impl Into<String>) -> Self {
        self.timestamp = Some(ts.into());
        self
    }

    /// Set the event tag.
    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    /// Set the payload.
    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// The index the entry will have.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Build, hash and sign the entry.
    pub fn sign(self, signer: &PublicId, seed: &PrivateSeed) -> ChainEntry {
        let mut entry = self.unsealed(Some(*signer));
        let content = entry.content_bytes();
        entry.hash = Digest::sha256(&content);
        entry.signature = Some(seed.sign(&content));
        entry
    }

    /// Build and hash an entry with no signer.
    ///
    /// Chains written before per-entry signing carry an unsigned genesis.
    /// New writes always go through [`EntryBuilder::sign`].
    pub fn build_unsigned(self) -> ChainEntry {
        let mut entry = self.unsealed(None);
        entry.hash = entry.compute_hash();
        entry
    }

    fn unsealed(self, signer: Option<PublicId>) -> ChainEntry {
        ChainEntry {
            index: self.index,
            timestamp: self.timestamp.unwrap_or_else(now_timestamp),
            event: self.event,
            data: self.data,
            previous_hash: self.previous_hash,
            signer,
            hash: Digest::ZERO,
            signature: None,
        }
    }
}

/// SHA-256 over a JSON object's canonical form minus `hash` and `signature`.
pub fn hash_content(value: &Value) -> Digest {
    Digest::sha256(&canonical_bytes_without(value, SEALED_FIELDS))
}

/// HMAC over a JSON object's canonical form minus `hash` and `signature`.
pub fn sign_content(value: &Value, seed: &PrivateSeed) -> Signature {
    seed.sign(&canonical_bytes_without(value, SEALED_FIELDS))
}

/// HMAC over an artifact (stamp, attestation, proof) minus its `signature`.
///
/// Artifacts keep any `hash`-named fields in the signed bytes; only the
/// signature itself is excluded.
pub fn sign_artifact(value: &Value, seed: &PrivateSeed) -> Signature {
    seed.sign(&canonical_bytes_without(value, &["signature"]))
}

/// Check an artifact's `signature` field against `seed`.
///
/// False when the field is missing or not a 64-character hex string.
pub fn verify_artifact(value: &Value, seed: &PrivateSeed) -> bool {
    let sig = match value
        .get("signature")
        .and_then(Value::as_str)
        .and_then(|s| Signature::from_hex(s).ok())
    {
        Some(sig) => sig,
        None => return false,
    };
    seed.verify(&canonical_bytes_without(value, &["signature"]), &sig)
}
