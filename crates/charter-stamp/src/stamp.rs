//! Attribution stamps: which AI tools contributed to a work product, whether
//! each was governed, and which governance ruleset was in force.
//!
//! A stamp is minted in two steps. [`StampDraft::assemble`] computes the
//! governed flag and the chain payload; once the caller has appended that
//! payload to the chain, [`StampDraft::seal`] binds the entry and signs.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use charter_core::{
    now_timestamp, sign_artifact, ChainEntry, Digest, PrivateSeed, PublicId, Signature,
};

use crate::error::Result;

/// The current stamp schema version.
pub const STAMP_VERSION: &str = "1.0";

/// Chain event recorded when a stamp is minted.
pub const STAMPED_EVENT: &str = "work_product_stamped";

/// Domain used when no governance config is in force.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// A tool as reported by a tool-fact supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFact {
    pub tool_id: String,
    pub name: String,
    pub vendor: String,
    /// Whether the tool operates under a charter.
    #[serde(default)]
    pub governable: bool,
}

impl ToolFact {
    /// Create a tool fact.
    pub fn new(
        tool_id: impl Into<String>,
        name: impl Into<String>,
        vendor: impl Into<String>,
        governable: bool,
    ) -> Self {
        Self {
            tool_id: tool_id.into(),
            name: name.into(),
            vendor: vendor.into(),
            governable,
        }
    }
}

/// A tool as recorded in a stamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolAttestation {
    pub tool_id: String,
    pub name: String,
    pub vendor: String,
    pub governed: bool,
}

impl From<&ToolFact> for ToolAttestation {
    fn from(fact: &ToolFact) -> Self {
        Self {
            tool_id: fact.tool_id.clone(),
            name: fact.name.clone(),
            vendor: fact.vendor.clone(),
            governed: fact.governable,
        }
    }
}

/// True iff there is at least one tool and every tool is governed.
///
/// A stamp with no attested tools makes no provenance claim, so it is never
/// governed.
pub fn aggregate_governed(tools: &[ToolAttestation]) -> bool {
    !tools.is_empty() && tools.iter().all(|t| t.governed)
}

/// A stamp before it is bound to a chain entry and signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampDraft {
    pub node: PublicId,
    pub alias: String,
    pub timestamp: String,
    pub charter_hash: Option<Digest>,
    pub domain: String,
    pub tools: Vec<ToolAttestation>,
    pub governed: bool,
    pub description: String,
}

impl StampDraft {
    /// Assemble a draft from the signer, the ruleset fingerprint and tool facts.
    pub fn assemble(
        node: PublicId,
        alias: impl Into<String>,
        charter_hash: Option<Digest>,
        domain: Option<&str>,
        tools: &[ToolFact],
        description: Option<&str>,
    ) -> Self {
        let tools: Vec<ToolAttestation> = tools.iter().map(ToolAttestation::from).collect();
        let governed = aggregate_governed(&tools);
        Self {
            node,
            alias: alias.into(),
            timestamp: now_timestamp(),
            charter_hash,
            domain: domain.unwrap_or(UNKNOWN_DOMAIN).to_string(),
            tools,
            governed,
            description: description.unwrap_or_default().to_string(),
        }
    }

    /// Override the timestamp.
    pub fn at(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// The payload of the `work_product_stamped` chain entry.
    pub fn chain_payload(&self) -> Value {
        json!({
            "charter_hash": self.charter_hash,
            "tools": self.tools.iter().map(|t| t.tool_id.as_str()).collect::<Vec<_>>(),
            "governed": self.governed,
            "description": self.description,
        })
    }

    /// Bind the chain entry the payload was recorded as, then sign.
    ///
    /// The signature covers every field except `signature` itself.
    pub fn seal(self, entry: &ChainEntry, seed: &PrivateSeed) -> Result<Stamp> {
        let mut stamp = Stamp {
            version: STAMP_VERSION.to_string(),
            node: self.node,
            alias: self.alias,
            timestamp: self.timestamp,
            charter_hash: self.charter_hash,
            domain: self.domain,
            tools: self.tools,
            governed: self.governed,
            description: self.description,
            chain_index: entry.index,
            chain_hash: entry.hash,
            signature: Signature::from_bytes([0u8; 32]),
        };
        stamp.signature = sign_artifact(&serde_json::to_value(&stamp)?, seed);
        Ok(stamp)
    }
}

/// A signed, chain-referenced attribution stamp. Immutable once sealed.
///
/// Field order matches the JSON rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    pub version: String,
    pub node: PublicId,
    pub alias: String,
    pub timestamp: String,
    pub charter_hash: Option<Digest>,
    pub domain: String,
    pub tools: Vec<ToolAttestation>,
    pub governed: bool,
    pub description: String,
    pub chain_index: u64,
    pub chain_hash: Digest,
    pub signature: Signature,
}

impl Stamp {
    /// The stamp as an untyped JSON object.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charter_core::{verify_artifact, EntryBuilder};

    fn seed() -> PrivateSeed {
        PrivateSeed::from_bytes([0x42; 32])
    }

    fn node() -> PublicId {
        PublicId::from_bytes([0x93; 32])
    }

    fn mint(tools: &[ToolFact]) -> Stamp {
        let draft = StampDraft::assemble(
            node(),
            "node-93939393",
            Some(Digest::sha256(b"rules")),
            Some("general"),
            tools,
            Some("quarterly report"),
        )
        .at("2025-01-15T10:00:00Z");
        let entry = EntryBuilder::genesis()
            .event(STAMPED_EVENT)
            .data(draft.chain_payload())
            .sign(&node(), &seed());
        draft.seal(&entry, &seed()).unwrap()
    }

    #[test]
    fn test_governed_computation() {
        let governed = ToolFact::new("claude_code", "Claude Code", "Anthropic", true);
        let ungoverned = ToolFact::new("chatgpt", "ChatGPT", "OpenAI", false);

        assert!(!mint(&[]).governed);
        assert!(mint(&[governed.clone()]).governed);
        assert!(!mint(&[governed, ungoverned]).governed);
    }

    #[test]
    fn test_chain_payload_shape() {
        let draft = StampDraft::assemble(
            node(),
            "a",
            None,
            None,
            &[ToolFact::new("x", "X", "V", true)],
            None,
        );
        assert_eq!(
            draft.chain_payload(),
            json!({"charter_hash": null, "tools": ["x"], "governed": true, "description": ""})
        );
        assert_eq!(draft.domain, UNKNOWN_DOMAIN);
    }

    #[test]
    fn test_seal_binds_entry_and_signs() {
        let stamp = mint(&[ToolFact::new("x", "X", "V", true)]);
        assert_eq!(stamp.chain_index, 0);
        assert_eq!(stamp.version, STAMP_VERSION);
        assert!(verify_artifact(&stamp.to_value().unwrap(), &seed()));
    }

    #[test]
    fn test_signature_covers_fields() {
        let stamp = mint(&[ToolFact::new("x", "X", "V", true)]);
        let mut value = stamp.to_value().unwrap();
        value["governed"] = json!(false);
        assert!(!verify_artifact(&value, &seed()));
    }

    #[test]
    fn test_json_field_names() {
        let value = mint(&[]).to_value().unwrap();
        for field in [
            "version", "node", "alias", "timestamp", "charter_hash", "domain", "tools",
            "governed", "description", "chain_index", "chain_hash", "signature",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        let back: Stamp = serde_json::from_value(value).unwrap();
        assert!(!back.governed);
    }

    #[test]
    fn test_tool_fact_governable_defaults_false() {
        let fact: ToolFact =
            serde_json::from_value(json!({"tool_id": "t", "name": "T", "vendor": "V"})).unwrap();
        assert!(!fact.governable);
    }
}
