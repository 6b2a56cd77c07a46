//! Stamp verification over untyped JSON.
//!
//! Stamps arrive from other nodes and files, possibly incomplete, so they
//! are checked as JSON values rather than parsed into [`crate::Stamp`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use charter_core::{verify_artifact, PrivateSeed};

/// Fields every stamp must carry.
pub const REQUIRED_FIELDS: &[&str] = &["version", "node", "timestamp", "tools", "governed", "signature"];

/// Outcome of [`verify_stamp`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StampVerification {
    pub verified: bool,
    pub governed: bool,
    pub reasons: Vec<String>,
}

/// Required fields absent from the stamp, in [`REQUIRED_FIELDS`] order.
pub(crate) fn missing_fields(stamp: &Value) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| stamp.get(*field).is_none())
        .collect()
}

/// JSON truthiness: null, false, zero and empty values are false.
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// The stamp's tool entries; anything but an array reads as no tools.
pub(crate) fn tools_of(stamp: &Value) -> &[Value] {
    stamp
        .get("tools")
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

/// Display name of a tool entry.
pub(crate) fn tool_name(tool: &Value) -> &str {
    tool.get("name")
        .or_else(|| tool.get("tool_id"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
}

/// Check a stamp's structure and governance claims.
///
/// A structurally incomplete stamp short-circuits: every missing field is
/// reported and no semantic check runs. Otherwise an ungoverned stamp is
/// explained (no tools, or which tools), and a missing charter hash is
/// reported regardless of the governed flag. `verified` holds exactly when
/// no reason was recorded.
///
/// The signature is checked for presence only. To check its value, see
/// [`verify_artifact_signature`].
pub fn verify_stamp(stamp: &Value) -> StampVerification {
    let missing = missing_fields(stamp);
    if !missing.is_empty() {
        return StampVerification {
            verified: false,
            governed: false,
            reasons: missing
                .iter()
                .map(|field| format!("missing field: {}", field))
                .collect(),
        };
    }

    let mut reasons = Vec::new();
    let governed = truthy(stamp.get("governed"));
    if !governed {
        let tools = tools_of(stamp);
        if tools.is_empty() {
            reasons.push("no AI tools attested in stamp".to_string());
        } else {
            let ungoverned: Vec<&str> = tools
                .iter()
                .filter(|t| !truthy(t.get("governed")))
                .map(tool_name)
                .collect();
            if !ungoverned.is_empty() {
                reasons.push(format!("ungoverned tools in stack: {}", ungoverned.join(", ")));
            }
        }
    }

    if !truthy(stamp.get("charter_hash")) {
        reasons.push("no charter hash (work not governed by a charter)".to_string());
    }

    StampVerification {
        verified: reasons.is_empty(),
        governed,
        reasons,
    }
}

/// Recompute an artifact's HMAC and compare it to its `signature`.
///
/// HMAC is symmetric, so this needs the signer's seed: it can only check
/// artifacts minted by the local identity.
pub fn verify_artifact_signature(artifact: &Value, seed: &PrivateSeed) -> bool {
    verify_artifact(artifact, seed)
}
