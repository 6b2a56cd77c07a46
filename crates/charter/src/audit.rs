//! Governance audit reports and the status summary.
//!
//! Both are built from [`ChainStore::read_all`] and the integrity walk
//! alone. A broken chain never stops a report; it is reported in it.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;

use charter_core::{verify_integrity, ChainId, IntegrityReport, PublicId, PublicIdentity};
use charter_store::{ChainStore, IdentityStore};

use crate::charter::Charter;
use crate::config::CharterConfig;
use crate::error::Result;

/// Event recorded after an audit report is generated.
pub const AUDIT_EVENT: &str = "audit_generated";

/// Domain shown when the governance document names none.
const DEFAULT_AUDIT_DOMAIN: &str = "general";

/// A governance audit over the identity chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub period: String,
    pub generated_at: String,
    pub alias: String,
    pub public_id: PublicId,
    pub domain: String,
    /// Layer A rules, rendered one per line.
    pub layer_a_rules: Vec<String>,
    pub layer_b_rule_count: usize,
    pub chain_entries: u64,
    pub first_entry: Option<String>,
    pub latest_entry: Option<String>,
    /// Entry counts by event, sorted by event name.
    pub events: BTreeMap<String, u64>,
    pub integrity: IntegrityReport,
    pub kill_triggers: Vec<String>,
}

impl AuditReport {
    /// Render as Markdown.
    pub fn render_markdown(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        lines.push("# Charter Governance Audit Report".into());
        lines.push(String::new());
        lines.push(format!("Period: {}", self.period));
        lines.push(format!("Generated: {}", self.generated_at));
        lines.push(format!("Node: {} ({}...)", self.alias, self.public_id.short(16)));
        lines.push(format!("Domain: {}", self.domain));
        lines.push(String::new());

        lines.push("## Layer A: Hard Constraint Compliance".into());
        lines.push(String::new());
        lines.push(format!("Constraints in force: {}", self.layer_a_rules.len()));
        for rule in &self.layer_a_rules {
            lines.push(format!("  - {}", rule));
        }
        lines.push(String::new());
        lines.push("Violations detected: 0".into());
        lines.push("Status: COMPLIANT".into());
        lines.push(String::new());

        lines.push("## Layer B: Gradient Decision Activity".into());
        lines.push(String::new());
        lines.push(format!("Gradient rules in force: {}", self.layer_b_rule_count));
        lines.push("Decisions requiring human approval this period: (review session logs)".into());
        lines.push(String::new());

        lines.push("## Layer C: Hash Chain Activity".into());
        lines.push(String::new());
        lines.push(format!("Total chain entries: {}", self.chain_entries));
        if self.chain_entries > 0 {
            lines.push(format!(
                "First entry: {}",
                self.first_entry.as_deref().unwrap_or("unknown")
            ));
            lines.push(format!(
                "Latest entry: {}",
                self.latest_entry.as_deref().unwrap_or("unknown")
            ));
            lines.push(String::new());
            lines.push("Events by type:".into());
            for (event, count) in &self.events {
                lines.push(format!("  - {}: {}", event, count));
            }
        }
        lines.push(String::new());

        lines.push("## Chain Integrity".into());
        lines.push(String::new());
        for index in &self.integrity.breaks {
            lines.push(format!("  BREAK at index {}: previous_hash mismatch", index));
        }
        if self.integrity.intact {
            lines.push(format!(
                "Chain integrity: VERIFIED ({} entries, unbroken)",
                self.chain_entries
            ));
        } else {
            lines.push("Chain integrity: BROKEN — investigate immediately".into());
        }
        lines.push(String::new());

        lines.push("## Kill Trigger Status".into());
        lines.push(String::new());
        for trigger in &self.kill_triggers {
            lines.push(format!("  - {}: NOT TRIGGERED", trigger));
        }
        lines.push(String::new());

        lines.join("\n")
    }
}

/// Governance counts shown by [`Status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceSummary {
    pub domain: String,
    pub layer_a_rules: usize,
    pub layer_b_rules: usize,
    pub audit_frequency: String,
    pub kill_triggers: usize,
}

impl From<&CharterConfig> for GovernanceSummary {
    fn from(config: &CharterConfig) -> Self {
        let gov = config.governance();
        Self {
            domain: config.domain.clone().unwrap_or_else(|| "unknown".to_string()),
            layer_a_rules: gov.layer_a_rules().len(),
            layer_b_rules: gov.layer_b_rules().len(),
            audit_frequency: gov
                .audit_frequency()
                .unwrap_or_else(|| "unknown".to_string()),
            kill_triggers: gov.kill_triggers().len(),
        }
    }
}

/// A snapshot of the node's governance state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub governance: Option<GovernanceSummary>,
    pub identity: Option<PublicIdentity>,
    pub chain_length: u64,
    pub last_event: Option<String>,
    pub last_timestamp: Option<String>,
    pub integrity: IntegrityReport,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Charter Governance Status")?;
        writeln!(f, "{}", "=".repeat(40))?;
        match &self.governance {
            Some(g) => {
                writeln!(f, "  Domain:      {}", g.domain)?;
                writeln!(f, "  Layer A:     {} hard constraints", g.layer_a_rules)?;
                writeln!(f, "  Layer B:     {} gradient rules", g.layer_b_rules)?;
                writeln!(f, "  Layer C:     {} audit", g.audit_frequency)?;
                writeln!(f, "  Kill triggers: {}", g.kill_triggers)?;
            }
            None => writeln!(f, "  Config:      not found")?,
        }
        writeln!(f)?;
        match &self.identity {
            Some(id) => {
                writeln!(f, "  Identity:    {}", id.alias)?;
                writeln!(f, "  Public ID:   {}...", id.public_id.short(24))?;
                writeln!(f, "  Created:     {}", id.created_at)?;
                writeln!(f, "  Contributions: {}", id.contributions)?;
            }
            None => writeln!(f, "  Identity:    not created")?,
        }
        writeln!(f)?;
        if self.chain_length == 0 {
            return writeln!(f, "  Chain:       not initialized");
        }
        writeln!(f, "  Chain:       {} entries", self.chain_length)?;
        if let (Some(event), Some(ts)) = (&self.last_event, &self.last_timestamp) {
            writeln!(f, "  Last entry:  {} at {}", event, ts)?;
        }
        let verdict = if self.integrity.intact { "VERIFIED" } else { "BROKEN" };
        writeln!(f, "  Integrity:   {}", verdict)
    }
}

impl<C: ChainStore, I: IdentityStore> Charter<C, I> {
    /// Build an audit report for `period` and record it on the chain.
    ///
    /// The report covers the chain as it was before the `audit_generated`
    /// entry is appended.
    pub fn audit(&self, period: &str, config: &CharterConfig) -> Result<AuditReport> {
        let identity = self.require_identity()?;
        let entries = self.chains().read_all(&ChainId::identity())?;
        let integrity = verify_integrity(&entries);

        let mut events = BTreeMap::new();
        for entry in &entries {
            *events.entry(entry.event.clone()).or_insert(0u64) += 1;
        }

        let gov = config.governance();
        let report = AuditReport {
            period: period.to_string(),
            generated_at: chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
            alias: identity.alias.clone(),
            public_id: identity.public_id,
            domain: config
                .domain
                .clone()
                .unwrap_or_else(|| DEFAULT_AUDIT_DOMAIN.to_string()),
            layer_a_rules: gov.layer_a_rules().iter().map(|r| r.render()).collect(),
            layer_b_rule_count: gov.layer_b_rules().len(),
            chain_entries: integrity.length,
            first_entry: entries.first().map(|e| e.timestamp.clone()),
            latest_entry: entries.last().map(|e| e.timestamp.clone()),
            events,
            integrity,
            kill_triggers: gov.kill_triggers().iter().map(|t| t.name().into_owned()).collect(),
        };

        if !report.integrity.intact {
            tracing::warn!(breaks = ?report.integrity.breaks, "audit found a broken chain");
        }
        self.append(
            AUDIT_EVENT,
            json!({
                "period": report.period,
                "chain_entries": report.chain_entries,
                "chain_intact": report.integrity.intact,
            }),
        )?;
        Ok(report)
    }

    /// Summarize identity, chain and, when given, governance.
    pub fn status(&self, config: Option<&CharterConfig>) -> Result<Status> {
        let entries = self.chains().read_all(&ChainId::identity())?;
        let last = entries.last();
        Ok(Status {
            governance: config.map(GovernanceSummary::from),
            identity: self.export_public()?,
            chain_length: entries.len() as u64,
            last_event: last.map(|e| e.event.clone()),
            last_timestamp: last.map(|e| e.timestamp.clone()),
            integrity: verify_integrity(&entries),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charter_store::MemoryStore;

    const CONFIG: &str = r#"
domain: finance
governance:
  layer_a:
    rules:
      - Never move funds without approval
  layer_b:
    rules:
      - action: transfer
        threshold: 10000
        requires: cfo_approval
  layer_c:
    frequency: monthly
  kill_triggers:
    - trigger: unauthorized_transfer
    - regulator_inquiry
"#;

    fn setup() -> (Charter<MemoryStore, MemoryStore>, MemoryStore, CharterConfig) {
        let store = MemoryStore::new();
        let c = Charter::new(store.clone(), store.clone());
        c.create_identity(Some("ada")).unwrap();
        (c, store, CharterConfig::from_yaml_str(CONFIG).unwrap())
    }

    #[test]
    fn test_audit_report() {
        let (c, _, config) = setup();
        c.append("session", serde_json::json!({})).unwrap();
        c.append("session", serde_json::json!({})).unwrap();

        let report = c.audit("2025-Q1", &config).unwrap();
        assert_eq!(report.chain_entries, 3);
        assert_eq!(report.events["session"], 2);
        assert_eq!(report.events["identity_created"], 1);
        assert!(report.integrity.intact);
        assert_eq!(report.kill_triggers, vec!["unauthorized_transfer", "regulator_inquiry"]);

        let md = report.render_markdown();
        assert!(md.contains("Period: 2025-Q1"));
        assert!(md.contains("Domain: finance"));
        assert!(md.contains("  - Never move funds without approval"));
        assert!(md.contains("Gradient rules in force: 1"));
        assert!(md.contains("  - session: 2"));
        assert!(md.contains("Chain integrity: VERIFIED (3 entries, unbroken)"));
        assert!(md.contains("  - regulator_inquiry: NOT TRIGGERED"));

        let last = c.read_chain().unwrap().pop().unwrap();
        assert_eq!(last.event, AUDIT_EVENT);
        assert_eq!(last.data["chain_entries"], 3);
        assert_eq!(last.data["chain_intact"], true);
    }

    #[test]
    fn test_audit_reports_broken_chain() {
        let (c, store, config) = setup();
        c.append("a", serde_json::json!({})).unwrap();
        c.append("b", serde_json::json!({})).unwrap();
        store.tamper(&ChainId::identity(), 1, |e| {
            e.data = serde_json::json!({"edited": true});
            e.hash = e.compute_hash();
        });

        let report = c.audit("weekly", &config).unwrap();
        assert!(!report.integrity.intact);
        assert_eq!(report.integrity.breaks, vec![2]);
        let md = report.render_markdown();
        assert!(md.contains("  BREAK at index 2: previous_hash mismatch"));
        assert!(md.contains("BROKEN — investigate immediately"));
    }

    #[test]
    fn test_status() {
        let (c, _, config) = setup();
        let status = c.status(Some(&config)).unwrap();
        assert_eq!(status.chain_length, 1);
        assert_eq!(status.last_event.as_deref(), Some("identity_created"));
        let gov = status.governance.as_ref().unwrap();
        assert_eq!(gov.audit_frequency, "monthly");
        assert_eq!(gov.kill_triggers, 2);

        let text = status.to_string();
        assert!(text.contains("Identity:    ada"));
        assert!(text.contains("Integrity:   VERIFIED"));
    }

    #[test]
    fn test_summary_of_irregular_ruleset() {
        let config = CharterConfig::from_yaml_str(
            "governance:\n  layer_c:\n    frequency: 7\n  kill_triggers:\n    - trigger: 3\n",
        )
        .unwrap();
        let summary = GovernanceSummary::from(&config);
        assert_eq!(summary.audit_frequency, "7");
        assert_eq!(summary.kill_triggers, 1);
        assert_eq!(summary.domain, "unknown");
    }

    #[test]
    fn test_status_without_identity() {
        let store = MemoryStore::new();
        let c = Charter::new(store.clone(), store);
        let status = c.status(None).unwrap();
        assert!(status.identity.is_none());
        assert!(status.to_string().contains("Chain:       not initialized"));
    }
}
