//! Governance rulesets and their fingerprint.
//!
//! A ruleset has three layers plus kill triggers. The core never interprets
//! rule semantics; it hashes the structure so a stamp can name the exact
//! rule version it was minted under. Stamps fingerprint the ruleset as
//! written ([`fingerprint_value`]); the typed [`Governance`] is a reading
//! aid for reports and accepts any shape a rule or trigger may take.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::canonical::canonical_bytes;
use crate::crypto::Digest;
use crate::error::Result;

/// A governance ruleset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Governance {
    /// Hard constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_a: Option<LayerA>,

    /// Gradient decisions that may need approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_b: Option<LayerB>,

    /// Self-audit cadence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_c: Option<LayerC>,

    /// Conditions that halt the system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kill_triggers: Option<Vec<KillTrigger>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Governance {
    /// Layer A rules, empty if the layer is absent.
    pub fn layer_a_rules(&self) -> &[Rule] {
        self.layer_a
            .as_ref()
            .and_then(|l| l.rules.as_deref())
            .unwrap_or(&[])
    }

    /// Layer B rules, empty if the layer is absent.
    pub fn layer_b_rules(&self) -> &[Rule] {
        self.layer_b
            .as_ref()
            .and_then(|l| l.rules.as_deref())
            .unwrap_or(&[])
    }

    /// Kill triggers, empty if none are configured.
    pub fn kill_triggers(&self) -> &[KillTrigger] {
        self.kill_triggers.as_deref().unwrap_or(&[])
    }

    /// Layer C's audit frequency as text, if one is set.
    pub fn audit_frequency(&self) -> Option<String> {
        match self.layer_c.as_ref()?.frequency.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// The ruleset's fingerprint. See [`fingerprint`].
    pub fn fingerprint(&self) -> Result<Digest> {
        fingerprint(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerA {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Constraints every ruleset carries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub universal: Option<Vec<Rule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<Rule>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerB {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<Rule>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerC {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Usually a word like `weekly`; any value is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_includes: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A rule is a sentence, a structured gradient rule, or anything else the
/// document author wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rule {
    Plain(String),
    Structured(StructuredRule),
    Other(Value),
}

impl Rule {
    /// One-line human rendering.
    pub fn render(&self) -> String {
        match self {
            Rule::Plain(text) => text.clone(),
            Rule::Structured(rule) => rule.render(),
            Rule::Other(value) => value.to_string(),
        }
    }
}

/// A gradient rule: an action, when it applies, and what it requires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRule {
    pub action: String,
    /// Free-form: `"always"`, a dollar amount, a percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl StructuredRule {
    fn render(&self) -> String {
        let threshold = match &self.threshold {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "N/A".to_string(),
        };
        let requires = self.requires.as_deref().unwrap_or("human_review");
        let mut line = format!(
            "{}: Threshold: {}. Requires: {}.",
            self.action, threshold, requires
        );
        if let Some(desc) = self.description.as_deref().filter(|d| !d.is_empty()) {
            line.push(' ');
            line.push_str(desc);
        }
        line
    }
}

/// A kill trigger, named alone, with a description, or in some other form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KillTrigger {
    Named(String),
    Detailed {
        trigger: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(flatten)]
        extra: BTreeMap<String, Value>,
    },
    Other(Value),
}

impl KillTrigger {
    /// The trigger's name. Other forms render as JSON.
    pub fn name(&self) -> Cow<'_, str> {
        match self {
            KillTrigger::Named(name) => Cow::Borrowed(name),
            KillTrigger::Detailed { trigger, .. } => Cow::Borrowed(trigger),
            KillTrigger::Other(value) => Cow::Owned(value.to_string()),
        }
    }
}

/// SHA-256 over the canonical form of a typed governance ruleset.
///
/// Only the ruleset is hashed, never the surrounding config document. Key
/// order in the source is irrelevant; any change to a rule changes the
/// digest. Explicit nulls are not kept by the typed form; hash the document
/// with [`fingerprint_value`] when they must count.
pub fn fingerprint(governance: &Governance) -> Result<Digest> {
    Ok(fingerprint_value(&serde_json::to_value(governance)?))
}

/// Fingerprint a ruleset given as an untyped value.
pub fn fingerprint_value(governance: &Value) -> Digest {
    Digest::sha256(&canonical_bytes(governance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "layer_a": {
                "description": "Hard constraints.",
                "universal": ["Never violate applicable law"],
                "rules": [
                    "Never send external communications without approval",
                    "Never access financial accounts without authorization"
                ]
            },
            "layer_b": {
                "description": "Gradient decisions.",
                "rules": [{
                    "action": "financial_transaction",
                    "threshold": "always",
                    "requires": "human_approval",
                    "description": "All spending requires human approval"
                }]
            },
            "layer_c": {
                "description": "Self-audit.",
                "frequency": "weekly",
                "report_includes": ["decisions_made", "rules_applied"]
            },
            "kill_triggers": [
                {"trigger": "ethics_decline", "description": "Ethics compliance declining"}
            ]
        })
    }

    #[test]
    fn test_typed_parse() {
        let gov: Governance = serde_json::from_value(sample()).unwrap();
        assert_eq!(gov.layer_a_rules().len(), 2);
        assert!(matches!(gov.layer_b_rules()[0], Rule::Structured(_)));
        assert_eq!(gov.kill_triggers()[0].name(), "ethics_decline");
        assert_eq!(gov.audit_frequency().as_deref(), Some("weekly"));
    }

    #[test]
    fn test_typed_fingerprint_matches_raw() {
        let gov: Governance = serde_json::from_value(sample()).unwrap();
        assert_eq!(gov.fingerprint().unwrap(), fingerprint_value(&sample()));
    }

    #[test]
    fn test_fingerprint_stable_and_sensitive() {
        let a = fingerprint_value(&sample());
        assert_eq!(a, fingerprint_value(&sample()));

        let mut changed = sample();
        changed["layer_a"]["rules"][0] = json!("Never send anything");
        assert_ne!(a, fingerprint_value(&changed));

        let mut added = sample();
        added["layer_a"]["rules"]
            .as_array_mut()
            .unwrap()
            .push(json!("Never delete backups"));
        assert_ne!(a, fingerprint_value(&added));
    }

    #[test]
    fn test_empty_ruleset_fingerprint() {
        let d = Governance::default().fingerprint().unwrap();
        assert_eq!(d, Digest::sha256(b"{}"));
        assert_eq!(d.to_hex().len(), 64);
    }

    #[test]
    fn test_unknown_keys_kept() {
        let mut raw = sample();
        raw["custom_layer"] = json!({"note": "kept"});
        let gov: Governance = serde_json::from_value(raw.clone()).unwrap();
        assert!(gov.extra.contains_key("custom_layer"));
        assert_eq!(gov.fingerprint().unwrap(), fingerprint_value(&raw));
    }

    #[test]
    fn test_rule_render() {
        let gov: Governance = serde_json::from_value(sample()).unwrap();
        assert_eq!(
            gov.layer_b_rules()[0].render(),
            "financial_transaction: Threshold: always. Requires: human_approval. All spending requires human approval"
        );
        assert_eq!(
            Rule::Plain("Never lie".into()).render(),
            "Never lie"
        );
    }

    #[test]
    fn test_irregular_shapes_parse() {
        let raw = json!({
            "layer_b": {"rules": [{"requires": "review"}, 42]},
            "layer_c": {"frequency": 7},
            "kill_triggers": [{"trigger": 3}, null]
        });
        let gov: Governance = serde_json::from_value(raw).unwrap();

        assert!(matches!(gov.layer_b_rules()[0], Rule::Other(_)));
        assert_eq!(gov.layer_b_rules()[0].render(), r#"{"requires":"review"}"#);
        assert_eq!(gov.layer_b_rules()[1].render(), "42");
        assert_eq!(gov.audit_frequency().as_deref(), Some("7"));
        assert_eq!(gov.kill_triggers()[0].name(), r#"{"trigger":3}"#);
        assert_eq!(gov.kill_triggers()[1].name(), "null");
    }

    #[test]
    fn test_null_frequency_is_unset() {
        let gov: Governance =
            serde_json::from_value(json!({"layer_c": {"frequency": null}})).unwrap();
        assert_eq!(gov.audit_frequency(), None);
    }

    #[test]
    fn test_yaml_source_order_irrelevant() {
        let a: Governance = serde_yaml::from_str(
            "layer_c:\n  frequency: weekly\nlayer_a:\n  rules: [one, two]\n",
        )
        .unwrap();
        let b: Governance = serde_yaml::from_str(
            "layer_a:\n  rules: [one, two]\nlayer_c:\n  frequency: weekly\n",
        )
        .unwrap();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }
}
