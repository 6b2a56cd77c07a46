//! Bridges: consented knowledge flow between two contexts.
//!
//! The source context proposes, the target context approves, and either
//! side may revoke. Every step is a signed event written to both context
//! chains and to the identity chain; bridge state is folded from those
//! events, never stored on the side.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use charter_core::{ChainEntry, ChainId, Digest, IdentityRecord};
use charter_store::{ChainStore, IdentityStore};

use crate::charter::Charter;
use crate::error::{CharterError, Result};

pub const BRIDGE_PROPOSED_EVENT: &str = "bridge_proposed";
pub const BRIDGE_APPROVED_EVENT: &str = "bridge_approved";
pub const BRIDGE_REVOKED_EVENT: &str = "bridge_revoked";

/// What may cross a bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BridgePolicy {
    /// Nothing flows. The state of every context without an active bridge.
    #[default]
    Isolated,
    /// The target reads from the source.
    ReadOnly,
    /// Both contexts read from each other.
    Bidirectional,
    /// Only the named items cross.
    ItemsOnly,
}

impl BridgePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            BridgePolicy::Isolated => "isolated",
            BridgePolicy::ReadOnly => "read-only",
            BridgePolicy::Bidirectional => "bidirectional",
            BridgePolicy::ItemsOnly => "items-only",
        }
    }
}

impl fmt::Display for BridgePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeStatus {
    Pending,
    Approved,
    Revoked,
}

impl fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BridgeStatus::Pending => "pending",
            BridgeStatus::Approved => "approved",
            BridgeStatus::Revoked => "revoked",
        })
    }
}

/// A bridge and its history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bridge {
    pub bridge_id: String,
    pub source: String,
    pub target: String,
    pub policy: BridgePolicy,
    /// Items allowed across; `None` means everything the policy allows.
    pub items: Option<Vec<String>>,
    pub proposed_at: String,
    pub proposed_by: String,
    pub status: BridgeStatus,
    pub approved_at: Option<String>,
    pub approved_by: Option<String>,
    pub revoked_at: Option<String>,
    pub revoked_by: Option<String>,
}

/// A context's bridging state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bridging {
    pub enabled: bool,
    pub policy: BridgePolicy,
    pub requires_approval: bool,
}

impl Default for Bridging {
    fn default() -> Self {
        Self {
            enabled: false,
            policy: BridgePolicy::Isolated,
            requires_approval: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Proposal {
    bridge_id: String,
    source: String,
    target: String,
    policy: BridgePolicy,
    #[serde(default)]
    items: Option<Vec<String>>,
    proposed_by: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Approval {
    bridge_id: String,
    source: String,
    target: String,
    policy: BridgePolicy,
    approved_by: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Revocation {
    bridge_id: String,
    source: String,
    target: String,
    revoked_by: String,
}

/// Bridging of one context after the given context-chain entries.
///
/// An approval enables bridging with the bridge's policy; a revocation
/// returns the context to isolated.
pub(crate) fn bridging_state(entries: &[ChainEntry]) -> Bridging {
    let mut state = Bridging::default();
    for entry in entries {
        match entry.event.as_str() {
            BRIDGE_APPROVED_EVENT => match entry.decode_data::<Approval>() {
                Ok(approval) => {
                    state.enabled = true;
                    state.policy = approval.policy;
                }
                Err(e) => tracing::warn!(index = entry.index, error = %e, "skipping unreadable approval"),
            },
            BRIDGE_REVOKED_EVENT => state = Bridging::default(),
            _ => {}
        }
    }
    state
}

/// Fold bridge events into `bridges`.
///
/// The same event appears on both context chains, so each transition is
/// applied once: a proposal only creates, an approval only moves a pending
/// bridge and a revocation only moves a live one.
fn apply_bridge_event(bridges: &mut BTreeMap<String, Bridge>, entry: &ChainEntry) {
    let applied = match entry.event.as_str() {
        BRIDGE_PROPOSED_EVENT => entry.decode_data::<Proposal>().map(|p| {
            bridges
                .entry(p.bridge_id.clone())
                .or_insert_with(|| Bridge {
                    bridge_id: p.bridge_id,
                    source: p.source,
                    target: p.target,
                    policy: p.policy,
                    items: p.items,
                    proposed_at: entry.timestamp.clone(),
                    proposed_by: p.proposed_by,
                    status: BridgeStatus::Pending,
                    approved_at: None,
                    approved_by: None,
                    revoked_at: None,
                    revoked_by: None,
                });
        }),
        BRIDGE_APPROVED_EVENT => entry.decode_data::<Approval>().map(|a| {
            if let Some(bridge) = bridges.get_mut(&a.bridge_id) {
                if bridge.status == BridgeStatus::Pending {
                    bridge.status = BridgeStatus::Approved;
                    bridge.approved_at = Some(entry.timestamp.clone());
                    bridge.approved_by = Some(a.approved_by);
                }
            }
        }),
        BRIDGE_REVOKED_EVENT => entry.decode_data::<Revocation>().map(|r| {
            if let Some(bridge) = bridges.get_mut(&r.bridge_id) {
                if bridge.status != BridgeStatus::Revoked {
                    bridge.status = BridgeStatus::Revoked;
                    bridge.revoked_at = Some(entry.timestamp.clone());
                    bridge.revoked_by = Some(r.revoked_by);
                }
            }
        }),
        _ => Ok(()),
    };
    if let Err(e) = applied {
        tracing::warn!(event = %entry.event, index = entry.index, error = %e, "skipping unreadable bridge event");
    }
}

/// First 16 hex characters of SHA-256 over `source:target:nanos`.
fn new_bridge_id(source: &str, target: &str) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let digest = Digest::sha256(format!("{}:{}:{}", source, target, nanos).as_bytes());
    digest.short(16)
}

impl<C: ChainStore, I: IdentityStore> Charter<C, I> {
    /// Propose a bridge from `source` to `target`.
    ///
    /// Nothing flows until the target approves. `items-only` bridges must
    /// name at least one item, and an `isolated` bridge is refused since it
    /// would allow nothing.
    pub fn propose_bridge(
        &self,
        source: &str,
        target: &str,
        policy: BridgePolicy,
        items: Option<&[String]>,
    ) -> Result<Bridge> {
        let source_chain = self.existing_context(source)?;
        let target_chain = self.existing_context(target)?;
        if source == target {
            return Err(CharterError::InvalidBridge(format!(
                "context '{}' cannot bridge to itself",
                source
            )));
        }
        if policy == BridgePolicy::Isolated {
            return Err(CharterError::InvalidBridge(
                "an isolated bridge allows nothing".to_string(),
            ));
        }
        if policy == BridgePolicy::ItemsOnly && items.map_or(true, <[String]>::is_empty) {
            return Err(CharterError::InvalidBridge(
                "items-only bridge names no items".to_string(),
            ));
        }

        let proposal = Proposal {
            bridge_id: new_bridge_id(source, target),
            source: source.to_string(),
            target: target.to_string(),
            policy,
            items: items.map(<[String]>::to_vec),
            proposed_by: source.to_string(),
        };
        let payload = serde_json::to_value(&proposal)?;

        self.with_identity(|identity| {
            for chain in [&source_chain, &target_chain, &ChainId::identity()] {
                self.append_as(identity, chain, BRIDGE_PROPOSED_EVENT, payload.clone())?;
            }
            Ok(())
        })?;

        tracing::info!(
            bridge = %proposal.bridge_id,
            source = %source,
            target = %target,
            policy = %policy,
            "bridge proposed"
        );
        self.bridge(&proposal.bridge_id)
    }

    /// Approve a pending bridge. Only the target context may approve.
    pub fn approve_bridge(&self, bridge_id: &str, approver: &str) -> Result<Bridge> {
        let bridge = self.with_identity(|identity| {
            let bridge = self.bridge(bridge_id)?;
            if bridge.status != BridgeStatus::Pending {
                return Err(CharterError::BridgeState {
                    bridge_id: bridge.bridge_id,
                    status: bridge.status,
                });
            }
            if approver != bridge.target {
                return Err(CharterError::InvalidBridge(format!(
                    "bridge {} can only be approved by its target '{}'",
                    bridge.bridge_id, bridge.target
                )));
            }

            let payload = serde_json::to_value(Approval {
                bridge_id: bridge.bridge_id.clone(),
                source: bridge.source.clone(),
                target: bridge.target.clone(),
                policy: bridge.policy,
                approved_by: approver.to_string(),
            })?;
            self.record_bridge_event(identity, &bridge, BRIDGE_APPROVED_EVENT, payload)?;
            self.bridge(bridge_id)
        })?;

        tracing::info!(bridge = %bridge.bridge_id, policy = %bridge.policy, "bridge approved");
        Ok(bridge)
    }

    /// Revoke a bridge, pending or approved. Either context may revoke.
    pub fn revoke_bridge(&self, bridge_id: &str, revoker: &str) -> Result<Bridge> {
        let bridge = self.with_identity(|identity| {
            let bridge = self.bridge(bridge_id)?;
            if bridge.status == BridgeStatus::Revoked {
                return Err(CharterError::BridgeState {
                    bridge_id: bridge.bridge_id,
                    status: bridge.status,
                });
            }
            if revoker != bridge.source && revoker != bridge.target {
                return Err(CharterError::InvalidBridge(format!(
                    "'{}' is not a party to bridge {}",
                    revoker, bridge.bridge_id
                )));
            }

            let payload = serde_json::to_value(Revocation {
                bridge_id: bridge.bridge_id.clone(),
                source: bridge.source.clone(),
                target: bridge.target.clone(),
                revoked_by: revoker.to_string(),
            })?;
            self.record_bridge_event(identity, &bridge, BRIDGE_REVOKED_EVENT, payload)?;
            self.bridge(bridge_id)
        })?;

        tracing::info!(bridge = %bridge.bridge_id, revoked_by = %revoker, "bridge revoked");
        Ok(bridge)
    }

    /// Every bridge ever proposed, sorted by id.
    pub fn list_bridges(&self) -> Result<Vec<Bridge>> {
        let mut bridges = BTreeMap::new();
        for chain in self.chains().list_chains()? {
            if chain.context_name().is_none() {
                continue;
            }
            for entry in self.chains().read_all(&chain)? {
                apply_bridge_event(&mut bridges, &entry);
            }
        }
        Ok(bridges.into_values().collect())
    }

    /// One bridge by id.
    pub fn bridge(&self, bridge_id: &str) -> Result<Bridge> {
        self.list_bridges()?
            .into_iter()
            .find(|b| b.bridge_id == bridge_id)
            .ok_or_else(|| CharterError::BridgeNotFound(bridge_id.to_string()))
    }

    /// Write a bridge event to both context chains and the identity chain.
    fn record_bridge_event(
        &self,
        identity: &mut IdentityRecord,
        bridge: &Bridge,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        for name in [&bridge.source, &bridge.target] {
            let chain = self.existing_context(name)?;
            self.append_as(identity, &chain, event, payload.clone())?;
        }
        self.append_as(identity, &ChainId::identity(), event, payload)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextKind;
    use charter_store::MemoryStore;
    use serde_json::json;

    fn charter() -> Charter<MemoryStore, MemoryStore> {
        let store = MemoryStore::new();
        let c = Charter::new(store.clone(), store);
        c.create_identity(Some("ada")).unwrap();
        c.create_context("home", ContextKind::Personal, None, None).unwrap();
        c.create_context("acme", ContextKind::Work, Some("Acme"), None).unwrap();
        c
    }

    #[test]
    fn test_propose_records_on_every_chain() {
        let c = charter();
        let bridge = c
            .propose_bridge("home", "acme", BridgePolicy::ReadOnly, None)
            .unwrap();
        assert_eq!(bridge.bridge_id.len(), 16);
        assert_eq!(bridge.status, BridgeStatus::Pending);
        assert_eq!(bridge.proposed_by, "home");

        for entries in [
            c.read_context("home").unwrap(),
            c.read_context("acme").unwrap(),
            c.read_chain().unwrap(),
        ] {
            let last = entries.last().unwrap();
            assert_eq!(last.event, BRIDGE_PROPOSED_EVENT);
            assert_eq!(last.data["bridge_id"], bridge.bridge_id);
            assert_eq!(last.data["policy"], "read-only");
        }
        assert!(!c.context("acme").unwrap().bridging.enabled);
    }

    #[test]
    fn test_approve_enables_both_sides() {
        let c = charter();
        let proposed = c
            .propose_bridge("home", "acme", BridgePolicy::Bidirectional, None)
            .unwrap();
        let approved = c.approve_bridge(&proposed.bridge_id, "acme").unwrap();
        assert_eq!(approved.status, BridgeStatus::Approved);
        assert_eq!(approved.approved_by.as_deref(), Some("acme"));

        for name in ["home", "acme"] {
            let bridging = c.context(name).unwrap().bridging;
            assert!(bridging.enabled);
            assert_eq!(bridging.policy, BridgePolicy::Bidirectional);
        }
        assert_eq!(c.bridge(&proposed.bridge_id).unwrap(), approved);
    }

    #[test]
    fn test_approve_twice_fails() {
        let c = charter();
        let id = c
            .propose_bridge("home", "acme", BridgePolicy::ReadOnly, None)
            .unwrap()
            .bridge_id;
        c.approve_bridge(&id, "acme").unwrap();
        let err = c.approve_bridge(&id, "acme").unwrap_err();
        assert!(matches!(
            err,
            CharterError::BridgeState { status: BridgeStatus::Approved, .. }
        ));
        assert_eq!(err.to_string(), format!("bridge {} is already approved", id));
    }

    #[test]
    fn test_only_target_approves() {
        let c = charter();
        let id = c
            .propose_bridge("home", "acme", BridgePolicy::ReadOnly, None)
            .unwrap()
            .bridge_id;
        let before = c.read_chain().unwrap().len();
        assert!(matches!(
            c.approve_bridge(&id, "home"),
            Err(CharterError::InvalidBridge(_))
        ));
        assert_eq!(c.read_chain().unwrap().len(), before);
        assert_eq!(c.bridge(&id).unwrap().status, BridgeStatus::Pending);
    }

    #[test]
    fn test_revoke_resets_to_isolated() {
        let c = charter();
        let id = c
            .propose_bridge("home", "acme", BridgePolicy::ReadOnly, None)
            .unwrap()
            .bridge_id;
        c.approve_bridge(&id, "acme").unwrap();

        let revoked = c.revoke_bridge(&id, "home").unwrap();
        assert_eq!(revoked.status, BridgeStatus::Revoked);
        assert_eq!(revoked.revoked_by.as_deref(), Some("home"));
        assert!(revoked.approved_at.is_some());
        for name in ["home", "acme"] {
            assert_eq!(c.context(name).unwrap().bridging, Bridging::default());
        }

        assert!(matches!(
            c.revoke_bridge(&id, "acme"),
            Err(CharterError::BridgeState { status: BridgeStatus::Revoked, .. })
        ));
        assert!(matches!(
            c.approve_bridge(&id, "acme"),
            Err(CharterError::BridgeState { .. })
        ));
    }

    #[test]
    fn test_revoke_by_outsider_fails() {
        let c = charter();
        c.create_context("other", ContextKind::Personal, None, None).unwrap();
        let id = c
            .propose_bridge("home", "acme", BridgePolicy::ReadOnly, None)
            .unwrap()
            .bridge_id;
        assert!(matches!(
            c.revoke_bridge(&id, "other"),
            Err(CharterError::InvalidBridge(_))
        ));
    }

    #[test]
    fn test_unknown_bridge() {
        let c = charter();
        assert!(matches!(
            c.approve_bridge("0123456789abcdef", "acme"),
            Err(CharterError::BridgeNotFound(_))
        ));
        assert!(matches!(
            c.revoke_bridge("0123456789abcdef", "acme"),
            Err(CharterError::BridgeNotFound(_))
        ));
    }

    #[test]
    fn test_propose_preconditions() {
        let c = charter();
        assert!(matches!(
            c.propose_bridge("home", "nope", BridgePolicy::ReadOnly, None),
            Err(CharterError::ContextNotFound(_))
        ));
        assert!(matches!(
            c.propose_bridge("home", "home", BridgePolicy::ReadOnly, None),
            Err(CharterError::InvalidBridge(_))
        ));
        assert!(matches!(
            c.propose_bridge("home", "acme", BridgePolicy::Isolated, None),
            Err(CharterError::InvalidBridge(_))
        ));
        assert!(matches!(
            c.propose_bridge("home", "acme", BridgePolicy::ItemsOnly, Some(&[][..])),
            Err(CharterError::InvalidBridge(_))
        ));
        assert!(c.list_bridges().unwrap().is_empty());
    }

    #[test]
    fn test_items_only_bridge() {
        let c = charter();
        let items = vec!["calendar".to_string()];
        let bridge = c
            .propose_bridge("acme", "home", BridgePolicy::ItemsOnly, Some(items.as_slice()))
            .unwrap();
        assert_eq!(bridge.items, Some(items));
        assert_eq!(bridge.source, "acme");
    }

    #[test]
    fn test_list_bridges_sorted_and_deduplicated() {
        let c = charter();
        let a = c.propose_bridge("home", "acme", BridgePolicy::ReadOnly, None).unwrap();
        let b = c.propose_bridge("acme", "home", BridgePolicy::ReadOnly, None).unwrap();
        c.approve_bridge(&b.bridge_id, "home").unwrap();

        let bridges = c.list_bridges().unwrap();
        assert_eq!(bridges.len(), 2);
        assert!(bridges[0].bridge_id < bridges[1].bridge_id);
        let listed_b = bridges.iter().find(|x| x.bridge_id == b.bridge_id).unwrap();
        assert_eq!(listed_b.status, BridgeStatus::Approved);
        let listed_a = bridges.iter().find(|x| x.bridge_id == a.bridge_id).unwrap();
        assert_eq!(listed_a.status, BridgeStatus::Pending);
    }

    #[test]
    fn test_bridge_chains_stay_intact() {
        let c = charter();
        let id = c
            .propose_bridge("home", "acme", BridgePolicy::ReadOnly, None)
            .unwrap()
            .bridge_id;
        c.approve_bridge(&id, "acme").unwrap();
        c.revoke_bridge(&id, "acme").unwrap();
        assert!(c.verify_integrity().unwrap().intact);
        assert!(c.verify_context("home").unwrap().intact);
        assert!(c.verify_context("acme").unwrap().intact);
        assert!(c.validate_chain().unwrap().is_valid());
    }

    #[test]
    fn test_policy_wire_names() {
        assert_eq!(serde_json::to_value(BridgePolicy::ReadOnly).unwrap(), json!("read-only"));
        assert_eq!(serde_json::to_value(BridgePolicy::ItemsOnly).unwrap(), json!("items-only"));
        assert_eq!(BridgePolicy::Bidirectional.to_string(), "bidirectional");
        assert_eq!(
            serde_json::to_value(Bridging::default()).unwrap(),
            json!({"enabled": false, "policy": "isolated", "requires_approval": true})
        );
    }
}
