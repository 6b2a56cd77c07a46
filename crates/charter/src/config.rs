//! Configuration: the governance document and runtime options.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use charter_core::{fingerprint_value, Digest, Governance};
use charter_stamp::DEFAULT_TRAILER_TAG;

use crate::error::{CharterError, Result};

/// File name searched for by [`find_config`].
pub const CONFIG_NAME: &str = "charter.yaml";

/// Default prefix for generated aliases.
pub const DEFAULT_ALIAS_PREFIX: &str = "node-";

/// A governance document, usually `charter.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharterConfig {
    /// Domain the ruleset was written for, e.g. `healthcare`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Ruleset version. Documents use both strings and numbers here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,

    /// The ruleset exactly as written. Only this part is fingerprinted.
    ///
    /// An absent section reads as `{}`; an explicit `null` stays `null`.
    #[serde(default = "empty_governance")]
    pub governance: Value,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CharterConfig {
    /// Parse a governance document from YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Err(CharterError::InvalidConfig("empty document".to_string()));
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serialize back to YAML.
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Fingerprint of the `governance` section as written, nulls included.
    pub fn charter_hash(&self) -> Digest {
        fingerprint_value(&self.governance)
    }

    /// Typed view of the ruleset.
    ///
    /// A section that is `null` or not a mapping reads as an empty ruleset.
    pub fn governance(&self) -> Governance {
        if self.governance.is_null() {
            return Governance::default();
        }
        match Governance::deserialize(&self.governance) {
            Ok(gov) => gov,
            Err(e) => {
                tracing::warn!(error = %e, "governance section is not a mapping; reading it as empty");
                Governance::default()
            }
        }
    }
}

impl Default for CharterConfig {
    fn default() -> Self {
        Self {
            domain: None,
            version: None,
            governance: empty_governance(),
            extra: BTreeMap::new(),
        }
    }
}

fn empty_governance() -> Value {
    Value::Object(Map::new())
}

/// Search `start` and its ancestors for [`CONFIG_NAME`].
pub fn find_config(start: impl AsRef<Path>) -> Option<PathBuf> {
    start
        .as_ref()
        .ancestors()
        .map(|dir| dir.join(CONFIG_NAME))
        .find(|candidate| candidate.is_file())
}

/// Load a governance document from an explicit path.
pub fn load_config(path: impl AsRef<Path>) -> Result<CharterConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    tracing::debug!(path = %path.display(), "loaded governance config");
    CharterConfig::from_yaml_str(&text)
}

/// Runtime options for [`crate::Charter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharterOptions {
    /// Key used in stamp trailers and headers.
    pub trailer_tag: String,
    /// Prefix of generated aliases.
    pub alias_prefix: String,
}

impl Default for CharterOptions {
    fn default() -> Self {
        Self {
            trailer_tag: DEFAULT_TRAILER_TAG.to_string(),
            alias_prefix: DEFAULT_ALIAS_PREFIX.to_string(),
        }
    }
}
