//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use serde_json::{json, Value};

use charter::{Charter, CharterConfig, IDENTITY_CREATED_EVENT};
use charter_core::{
    now_timestamp, ChainEntry, Digest, EntryBuilder, Governance, IdentityRecord, PrivateSeed,
    PublicId, IDENTITY_VERSION,
};
use charter_stamp::ToolFact;
use charter_store::{IdentityStore, MemoryStore};

/// A Charter over one in-memory store, with an identity already created.
pub struct TestFixture {
    pub store: MemoryStore,
    pub charter: Charter<MemoryStore, MemoryStore>,
}

impl TestFixture {
    /// Create a fixture with a random identity.
    pub fn new() -> Self {
        let fixture = Self::empty();
        fixture
            .charter
            .create_identity(Some("test-node"))
            .expect("fresh store accepts an identity");
        fixture
    }

    /// Create a fixture with a deterministic identity.
    ///
    /// The public id is the SHA-256 of the seed, so the same seed always
    /// yields the same signer.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        let fixture = Self::empty();
        let record = IdentityRecord {
            version: IDENTITY_VERSION.to_string(),
            public_id: PublicId::from_bytes(*Digest::sha256(&seed).as_bytes()),
            private_seed: PrivateSeed::from_bytes(seed),
            alias: "test-node".to_string(),
            created_at: now_timestamp(),
            real_identity: None,
            contributions: 0,
        };
        fixture.store.save(&record).expect("memory store save");
        fixture
            .charter
            .append(
                IDENTITY_CREATED_EVENT,
                json!({"public_id": record.public_id, "alias": record.alias}),
            )
            .expect("genesis append");
        fixture
    }

    /// A fixture with no identity.
    pub fn empty() -> Self {
        let store = MemoryStore::new();
        let charter = Charter::new(store.clone(), store.clone());
        Self { store, charter }
    }

    /// The stored identity.
    pub fn identity(&self) -> IdentityRecord {
        self.charter
            .load_identity()
            .expect("memory store load")
            .expect("fixture has an identity")
    }

    /// Append `n` events named `event_<i>`.
    pub fn append_events(&self, n: usize) -> Vec<ChainEntry> {
        (0..n)
            .map(|i| {
                self.charter
                    .append(&format!("event_{}", i), json!({ "i": i }))
                    .expect("append")
            })
            .collect()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A governance document with every layer populated.
pub const SAMPLE_CONFIG_YAML: &str = r#"
domain: general
version: "1.0"
identity:
  public_id: abc123
  alias: test-node
governance:
  layer_a:
    description: Hard constraints.
    universal:
      - Never violate applicable law
      - Never fabricate data, citations, or evidence
      - Never conceal the audit trail
      - Never impersonate a real person
    rules:
      - Never send external communications without approval
      - Never access financial accounts without authorization
  layer_b:
    description: Gradient decisions.
    rules:
      - action: financial_transaction
        threshold: always
        requires: human_approval
        description: All spending requires human approval
  layer_c:
    description: Self-audit.
    frequency: weekly
    report_includes:
      - decisions_made
      - rules_applied
  kill_triggers:
    - trigger: ethics_decline
      description: Ethics compliance declining
"#;

/// The parsed [`SAMPLE_CONFIG_YAML`].
pub fn sample_config() -> CharterConfig {
    CharterConfig::from_yaml_str(SAMPLE_CONFIG_YAML).expect("sample config parses")
}

/// The sample ruleset alone.
pub fn sample_governance() -> Governance {
    sample_config().governance()
}

pub fn governed_tool() -> ToolFact {
    ToolFact::new("claude_code", "Claude Code", "Anthropic", true)
}

pub fn ungoverned_tool() -> ToolFact {
    ToolFact::new("chatgpt", "ChatGPT", "OpenAI", false)
}

/// A hand-written governed stamp, as another node might send it.
pub fn governed_stamp_json() -> Value {
    json!({
        "version": "1.0",
        "node": "93921f61".repeat(8),
        "alias": "remote-node",
        "timestamp": "2025-01-15T10:00:00Z",
        "charter_hash": "a1b2c3d4".repeat(8),
        "domain": "general",
        "tools": [{"tool_id": "claude_code", "name": "Claude Code", "vendor": "Anthropic", "governed": true}],
        "governed": true,
        "description": "",
        "chain_index": 4,
        "chain_hash": "00".repeat(32),
        "signature": "ab".repeat(32),
    })
}

/// Build a signed chain of `n` entries without any store.
pub fn signed_chain(n: usize, signer: &PublicId, seed: &PrivateSeed) -> Vec<ChainEntry> {
    let mut chain: Vec<ChainEntry> = Vec::with_capacity(n);
    for i in 0..n {
        let entry = EntryBuilder::after(chain.last())
            .timestamp("2025-01-15T10:00:00Z")
            .event(format!("event_{}", i))
            .data(json!({ "i": i }))
            .sign(signer, seed);
        chain.push(entry);
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectors::SAMPLE_GOVERNANCE_FINGERPRINT;

    #[test]
    fn test_fixture_has_genesis() {
        let fixture = TestFixture::new();
        let chain = fixture.charter.read_chain().unwrap();
        assert_eq!(chain.len(), 1);
        assert!(chain[0].is_genesis());
    }

    #[test]
    fn test_seeded_fixture_is_deterministic() {
        let a = TestFixture::with_seed([7; 32]);
        let b = TestFixture::with_seed([7; 32]);
        assert_eq!(a.identity().public_id, b.identity().public_id);
    }

    #[test]
    fn test_sample_governance_fingerprint() {
        assert_eq!(
            sample_governance().fingerprint().unwrap().to_hex(),
            SAMPLE_GOVERNANCE_FINGERPRINT
        );
    }
}
