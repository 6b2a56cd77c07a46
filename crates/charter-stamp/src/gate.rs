//! The ingestion gate: accept or reject a work product for institutional use.
//!
//! The gate polices AI provenance only. Work with no stamp at all is human
//! work and passes untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::attestation::ATTESTATION_TYPE;
use crate::verify::{missing_fields, tool_name, tools_of, truthy, verify_stamp};

/// Sentinel a caller passes to declare a work product human-only.
pub const HUMAN_ONLY: &str = "human_only";

/// The gate's verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub accepted: bool,
    pub reason: String,
}

impl GateDecision {
    fn accept(reason: impl Into<String>) -> Self {
        Self {
            accepted: true,
            reason: reason.into(),
        }
    }

    fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: reason.into(),
        }
    }

    /// `"ACCEPTED"` or `"REJECTED"`.
    pub fn verdict(&self) -> &'static str {
        if self.accepted {
            "ACCEPTED"
        } else {
            "REJECTED"
        }
    }
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.verdict(), self.reason)
    }
}

/// Decide whether a work product may be ingested.
///
/// Branches, in order:
/// 1. No stamp, JSON null, or the [`HUMAN_ONLY`] sentinel: accept.
/// 2. Anything but a JSON object: reject as malformed.
/// 3. An attestation: accept iff governed with a reviewer and a signature.
/// 4. A stamp: reject if a required field is missing (naming the fields),
///    if ungoverned (naming the ungoverned tools) or if it carries no
///    charter hash; otherwise accept.
///
/// Signatures are checked for presence, not validity. A fabricated
/// attestation with any non-empty `signature` passes; use a strict gate
/// with the signer's seed where that matters.
pub fn accept_work_product(stamp: Option<&Value>) -> GateDecision {
    let stamp = match stamp {
        None | Some(Value::Null) => {
            return GateDecision::accept("human-only work product, no AI governance required")
        }
        Some(Value::String(s)) if s == HUMAN_ONLY => {
            return GateDecision::accept("human-only work product, no AI governance required")
        }
        Some(v) if v.is_object() => v,
        Some(_) => return GateDecision::reject("invalid stamp format"),
    };

    if stamp.get("type").and_then(Value::as_str) == Some(ATTESTATION_TYPE) {
        let complete = truthy(stamp.get("governed"))
            && truthy(stamp.get("reviewer"))
            && truthy(stamp.get("signature"));
        if !complete {
            return GateDecision::reject("attestation incomplete (missing reviewer or signature)");
        }
        let reviewer = stamp.get("reviewer").and_then(Value::as_str).unwrap_or("unknown");
        return GateDecision::accept(format!(
            "attested by {}, human review is the governance bridge",
            reviewer
        ));
    }

    let missing = missing_fields(stamp);
    if !missing.is_empty() {
        return GateDecision::reject(format!(
            "invalid stamp, missing fields: {}",
            missing.join(", ")
        ));
    }

    let result = verify_stamp(stamp);
    if !result.governed {
        let tools = tools_of(stamp);
        let ungoverned: Vec<&str> = tools
            .iter()
            .filter(|t| !truthy(t.get("governed")))
            .map(tool_name)
            .collect();
        if !ungoverned.is_empty() {
            return GateDecision::reject(format!(
                "work product used ungoverned AI tools ({}). \
                 all AI tools must operate under a charter for institutional use.",
                ungoverned.join(", ")
            ));
        }
        if !tools.is_empty() {
            return GateDecision::reject("stamp is not marked governed");
        }
        return GateDecision::reject(
            "no governed AI tools in attribution chain. \
             institutional use requires governed provenance.",
        );
    }

    if !truthy(stamp.get("charter_hash")) {
        return GateDecision::reject("no charter governance reference in stamp");
    }

    GateDecision::accept("stamp valid, all tools governed, charter referenced")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn governed_stamp() -> Value {
        json!({
            "version": "1.0",
            "node": "93921f61",
            "timestamp": "2025-01-15T10:00:00Z",
            "tools": [{"tool_id": "claude_code", "name": "Claude Code", "governed": true}],
            "governed": true,
            "charter_hash": "a1b2c3d4e5f6",
            "signature": "sig"
        })
    }

    #[test]
    fn test_no_stamp_is_human_only() {
        let d = accept_work_product(None);
        assert!(d.accepted);
        assert!(d.reason.contains("human-only"));

        assert!(accept_work_product(Some(&Value::Null)).accepted);
        assert!(accept_work_product(Some(&json!(HUMAN_ONLY))).accepted);
    }

    #[test]
    fn test_malformed() {
        for bad in [json!("something else"), json!(42), json!([1, 2])] {
            let d = accept_work_product(Some(&bad));
            assert!(!d.accepted);
            assert_eq!(d.reason, "invalid stamp format");
        }
    }

    #[test]
    fn test_governed_stamp_accepted() {
        let d = accept_work_product(Some(&governed_stamp()));
        assert!(d.accepted);
        assert!(d.reason.contains("valid"));
    }

    #[test]
    fn test_ungoverned_tool_named() {
        let mut stamp = governed_stamp();
        stamp["governed"] = json!(false);
        stamp["tools"] = json!([{"tool_id": "chatgpt", "name": "ChatGPT", "governed": false}]);
        let d = accept_work_product(Some(&stamp));
        assert!(!d.accepted);
        assert!(d.reason.contains("ChatGPT"));
    }

    #[test]
    fn test_no_tools_rejected() {
        let mut stamp = governed_stamp();
        stamp["governed"] = json!(false);
        stamp["tools"] = json!([]);
        let d = accept_work_product(Some(&stamp));
        assert!(!d.accepted);
        assert!(d.reason.starts_with("no governed AI tools"));
    }

    #[test]
    fn test_missing_charter_hash_rejected() {
        let mut stamp = governed_stamp();
        stamp.as_object_mut().unwrap().remove("charter_hash");
        let d = accept_work_product(Some(&stamp));
        assert!(!d.accepted);
        assert_eq!(d.reason, "no charter governance reference in stamp");
    }

    #[test]
    fn test_incomplete_stamp_rejected() {
        let d = accept_work_product(Some(&json!({"version": "1.0"})));
        assert!(!d.accepted);
        assert_eq!(
            d.reason,
            "invalid stamp, missing fields: node, timestamp, tools, governed, signature"
        );
    }

    #[test]
    fn test_missing_signature_named_even_with_governed_tools() {
        let mut stamp = governed_stamp();
        stamp.as_object_mut().unwrap().remove("signature");
        let d = accept_work_product(Some(&stamp));
        assert!(!d.accepted);
        assert_eq!(d.reason, "invalid stamp, missing fields: signature");
        assert!(!d.reason.contains("no governed AI tools"));
    }

    #[test]
    fn test_unmarked_stamp_with_governed_tools() {
        let mut stamp = governed_stamp();
        stamp["governed"] = json!(false);
        let d = accept_work_product(Some(&stamp));
        assert!(!d.accepted);
        assert_eq!(d.reason, "stamp is not marked governed");
    }

    #[test]
    fn test_attestation_accepted() {
        let att = json!({"type": "attestation", "governed": true, "reviewer": "Alice", "signature": "x"});
        let d = accept_work_product(Some(&att));
        assert!(d.accepted);
        assert!(d.reason.contains("Alice"));
    }

    #[test]
    fn test_attestation_incomplete() {
        let att = json!({"type": "attestation", "governed": true});
        let d = accept_work_product(Some(&att));
        assert!(!d.accepted);
        assert!(d.reason.contains("incomplete"));

        let ungoverned = json!({"type": "attestation", "governed": false, "reviewer": "Alice", "signature": "x"});
        assert!(!accept_work_product(Some(&ungoverned)).accepted);
    }

    /// The plain gate checks signature presence only: a made-up signature on
    /// a fabricated attestation is accepted. The strict gate closes this for
    /// locally minted artifacts.
    #[test]
    fn test_fabricated_attestation_signature_not_checked() {
        let forged = json!({
            "type": "attestation",
            "governed": true,
            "reviewer": "Mallory",
            "signature": "0000"
        });
        assert!(accept_work_product(Some(&forged)).accepted);
    }

    #[test]
    fn test_display() {
        let d = accept_work_product(None);
        assert!(d.to_string().starts_with("ACCEPTED ("));
    }

    mod prop {
        use super::*;
        use crate::stamp::{aggregate_governed, ToolAttestation};
        use proptest::prelude::*;

        fn tools(flags: &[bool]) -> Vec<ToolAttestation> {
            flags
                .iter()
                .enumerate()
                .map(|(i, governed)| ToolAttestation {
                    tool_id: format!("tool_{}", i),
                    name: format!("Tool {}", i),
                    vendor: "Vendor".to_string(),
                    governed: *governed,
                })
                .collect()
        }

        proptest! {
            #[test]
            fn gate_accepts_iff_governed_and_chartered(
                flags in proptest::collection::vec(any::<bool>(), 0..6),
                chartered in any::<bool>(),
            ) {
                let tools = tools(&flags);
                let governed = aggregate_governed(&tools);
                prop_assert_eq!(governed, !flags.is_empty() && flags.iter().all(|g| *g));

                let stamp = json!({
                    "version": "1.0",
                    "node": "n",
                    "timestamp": "2025-01-15T10:00:00Z",
                    "tools": tools,
                    "governed": governed,
                    "charter_hash": if chartered { json!("abc") } else { Value::Null },
                    "signature": "sig",
                });
                let decision = accept_work_product(Some(&stamp));
                prop_assert_eq!(decision.accepted, governed && chartered);

                if !governed {
                    for (i, g) in flags.iter().enumerate() {
                        let named = decision.reason.contains(&format!("Tool {}", i));
                        prop_assert_eq!(named, !*g);
                    }
                }
            }
        }
    }
}
