//! Contexts: named partitions with their own hash chain.
//!
//! Each context chain starts with an independent `context_created` genesis
//! and is signed by the node identity. Knowledge does not flow between
//! contexts unless both sides agree on a bridge (see [`crate::bridge`]).
//! The active context is the last one named by a `context_activated` event
//! on the identity chain.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

use charter_core::{ChainEntry, ChainId, IntegrityReport, PublicId};
use charter_store::{ChainStore, ChainStoreExt, IdentityStore};

use crate::bridge::{bridging_state, Bridging};
use crate::charter::Charter;
use crate::error::{CharterError, Result};

/// Genesis event of a context chain, also recorded on the identity chain.
pub const CONTEXT_CREATED_EVENT: &str = "context_created";

/// Identity-chain event naming the active context.
pub const CONTEXT_ACTIVATED_EVENT: &str = "context_activated";

/// What a context is for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    #[default]
    Personal,
    Work,
}

impl ContextKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContextKind::Personal => "personal",
            ContextKind::Work => "work",
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a context chain's genesis entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ContextGenesis {
    name: String,
    #[serde(rename = "type")]
    kind: ContextKind,
    #[serde(default)]
    org_name: Option<String>,
    #[serde(default)]
    work_email: Option<String>,
}

/// Context metadata, decoded from the context chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ContextKind,
    pub org_name: Option<String>,
    pub work_email: Option<String>,
    pub created_at: String,
    /// Identity that signed the genesis.
    pub owner: Option<PublicId>,
    /// Bridging as left by the latest bridge approval or revocation.
    pub bridging: Bridging,
}

impl ContextInfo {
    /// Decode the genesis and fold later bridge events over it.
    fn from_chain(entries: &[ChainEntry]) -> Result<Option<Self>> {
        let Some((genesis, later)) = entries.split_first() else {
            return Ok(None);
        };
        let payload: ContextGenesis = genesis.decode_data()?;
        Ok(Some(Self {
            name: payload.name,
            kind: payload.kind,
            org_name: payload.org_name,
            work_email: payload.work_email,
            created_at: genesis.timestamp.clone(),
            owner: genesis.signer,
            bridging: bridging_state(later),
        }))
    }
}

impl<C: ChainStore, I: IdentityStore> Charter<C, I> {
    /// Create a context with its own chain.
    ///
    /// Writes the context genesis, then records the creation on the identity
    /// chain. `org_name` and `work_email` link a work context to its
    /// organization.
    pub fn create_context(
        &self,
        name: &str,
        kind: ContextKind,
        org_name: Option<&str>,
        work_email: Option<&str>,
    ) -> Result<ContextInfo> {
        let chain = ChainId::context(name)?;
        let genesis = self.with_identity(|identity| {
            if self.chains().count(&chain)? > 0 {
                return Err(CharterError::ContextExists(name.to_string()));
            }

            let payload = ContextGenesis {
                name: name.to_string(),
                kind,
                org_name: org_name.map(str::to_string),
                work_email: work_email.map(str::to_string),
            };
            let genesis = self.append_as(
                identity,
                &chain,
                CONTEXT_CREATED_EVENT,
                serde_json::to_value(&payload)?,
            )?;

            self.append_as(
                identity,
                &ChainId::identity(),
                CONTEXT_CREATED_EVENT,
                json!({
                    "context": name,
                    "type": kind,
                    "org_name": org_name,
                }),
            )?;
            Ok(genesis)
        })?;

        tracing::info!(context = %name, kind = %kind, "context created");
        ContextInfo::from_chain(std::slice::from_ref(&genesis))?
            .ok_or_else(|| CharterError::ContextNotFound(name.to_string()))
    }

    /// Every context, sorted by name.
    ///
    /// A context whose genesis cannot be decoded is skipped.
    pub fn list_contexts(&self) -> Result<Vec<ContextInfo>> {
        let mut contexts = Vec::new();
        for chain in self.chains().list_chains()? {
            if chain.context_name().is_none() {
                continue;
            }
            let entries = self.chains().read_all(&chain)?;
            match ContextInfo::from_chain(&entries) {
                Ok(Some(info)) => contexts.push(info),
                Ok(None) => {}
                Err(e) => tracing::warn!(chain = %chain, error = %e, "skipping unreadable context"),
            }
        }
        contexts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(contexts)
    }

    /// Metadata of one context.
    pub fn context(&self, name: &str) -> Result<ContextInfo> {
        let entries = self.read_context(name)?;
        ContextInfo::from_chain(&entries)?
            .ok_or_else(|| CharterError::ContextNotFound(name.to_string()))
    }

    /// Make `name` the active context by recording it on the identity chain.
    pub fn set_active_context(&self, name: &str) -> Result<ChainEntry> {
        self.existing_context(name)?;
        let entry = self.append(CONTEXT_ACTIVATED_EVENT, json!({ "context": name }))?;
        tracing::info!(context = %name, "context activated");
        Ok(entry)
    }

    /// The active context, or `None` if none was ever set.
    pub fn active_context(&self) -> Result<Option<String>> {
        let entries = self.chains().read_all(&ChainId::identity())?;
        Ok(entries
            .iter()
            .rev()
            .find(|e| e.event == CONTEXT_ACTIVATED_EVENT)
            .and_then(|e| e.data.get("context"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Append a signed event to a context chain.
    pub fn append_to_context(&self, name: &str, event: &str, data: Value) -> Result<ChainEntry> {
        let chain = self.existing_context(name)?;
        self.with_identity(|identity| self.append_as(identity, &chain, event, data))
    }

    /// Every entry of a context chain.
    pub fn read_context(&self, name: &str) -> Result<Vec<ChainEntry>> {
        let chain = self.existing_context(name)?;
        Ok(self.chains().read_all(&chain)?)
    }

    /// Walk a context chain's hash links.
    pub fn verify_context(&self, name: &str) -> Result<IntegrityReport> {
        let chain = self.existing_context(name)?;
        Ok(self.chains().verify_integrity(&chain)?)
    }

    pub(crate) fn existing_context(&self, name: &str) -> Result<ChainId> {
        let chain = ChainId::context(name)
            .map_err(|_| CharterError::ContextNotFound(name.to_string()))?;
        if self.chains().count(&chain)? == 0 {
            return Err(CharterError::ContextNotFound(name.to_string()));
        }
        Ok(chain)
    }
}
