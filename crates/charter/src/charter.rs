//! The Charter facade: identity, chain, stamping and gate operations.
//!
//! Every operation loads the identity from the injected [`IdentityStore`]
//! and writes through the injected [`ChainStore`]. Nothing here computes a
//! storage location.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use charter_core::{
    now_timestamp, ChainEntry, ChainId, ChainValidation, EntryBuilder, IdentityRecord,
    IntegrityReport, PublicIdentity, RealIdentity, TrustLevel, VerificationMethod,
};
use charter_stamp::{
    accept_work_product, to_header, to_trailer, verify_artifact_signature, verify_stamp,
    Attestation, AttestationDraft, GateDecision, Stamp, StampDraft, StampVerification,
    ToolFact, ATTESTED_EVENT, STAMPED_EVENT,
};
use charter_store::{ChainStore, ChainStoreExt, IdentityStore, StoreError};

use crate::config::{CharterConfig, CharterOptions};
use crate::error::{CharterError, Result};

/// Genesis event of the identity chain.
pub const IDENTITY_CREATED_EVENT: &str = "identity_created";

/// Event recording the authorship transfer.
pub const IDENTITY_VERIFIED_EVENT: &str = "identity_verified";

/// Suffix of failure events written by [`Charter::record_failure`].
pub const FAILED_SUFFIX: &str = "_failed";

/// The verified party as recorded in the transfer entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedParty {
    pub name: String,
    pub email: String,
}

/// Payload of the `identity_verified` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub real_identity: VerifiedParty,
    pub method: VerificationMethod,
    pub trust_level: TrustLevel,
    pub prior_entries_transferred: u64,
    pub transfer_proof: String,
}

/// Result of [`Charter::verify_identity`].
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub record: RealIdentity,
    /// Entries on the identity chain before the transfer entry.
    pub prior_entries: u64,
    /// The transfer entry itself.
    pub entry: ChainEntry,
}

/// Result of [`Charter::attest_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestOutcome {
    /// A valid attestation was already on disk; nothing was written.
    AlreadyAttested(Value),
    /// A new attestation was created and written next to the file.
    Created(Attestation),
}

/// The Charter facade.
///
/// Generic over its chain and identity stores so the same operations run
/// against files, SQLite or memory.
///
/// Operations that rewrite the identity record hold an internal lock from
/// load to save, so a shared `Charter` never loses a verification or a
/// contribution count to an interleaved writer.
pub struct Charter<C: ChainStore, I: IdentityStore> {
    chains: C,
    identities: I,
    options: CharterOptions,
    identity_lock: Mutex<()>,
}

impl<C: ChainStore, I: IdentityStore> Charter<C, I> {
    /// Create a facade over the given stores.
    pub fn new(chains: C, identities: I) -> Self {
        Self::with_options(chains, identities, CharterOptions::default())
    }

    /// Create a facade with explicit options.
    pub fn with_options(chains: C, identities: I, options: CharterOptions) -> Self {
        Self {
            chains,
            identities,
            options,
            identity_lock: Mutex::new(()),
        }
    }

    /// The chain store.
    pub fn chains(&self) -> &C {
        &self.chains
    }

    /// The identity store.
    pub fn identities(&self) -> &I {
        &self.identities
    }

    pub fn options(&self) -> &CharterOptions {
        &self.options
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identity Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create this node's identity and write the genesis entry.
    ///
    /// Fails with [`CharterError::IdentityExists`] if one is already stored,
    /// and with [`CharterError::IdentityChainExists`] if the identity chain
    /// already has entries, since a second genesis would not sit at index 0.
    pub fn create_identity(&self, alias: Option<&str>) -> Result<IdentityRecord> {
        let _guard = self.lock_identity()?;
        if let Some(existing) = self.identities.load()? {
            return Err(CharterError::IdentityExists(existing.public_id.to_hex()));
        }
        let existing_entries = self.chains.count(&ChainId::identity())?;
        if existing_entries > 0 {
            return Err(CharterError::IdentityChainExists(existing_entries));
        }

        let mut identity = IdentityRecord::generate(alias, &self.options.alias_prefix);
        let data = json!({
            "public_id": identity.public_id,
            "alias": identity.alias,
        });
        let genesis = self.append_as(
            &mut identity,
            &ChainId::identity(),
            IDENTITY_CREATED_EVENT,
            data,
        )?;
        self.identities.save(&identity)?;

        tracing::info!(
            public_id = %identity.public_id.short(16),
            alias = %identity.alias,
            genesis = %genesis.hash.short(16),
            "identity created"
        );
        Ok(identity)
    }

    /// Load the identity. `None` means the node is not initialized.
    pub fn load_identity(&self) -> Result<Option<IdentityRecord>> {
        Ok(self.identities.load()?)
    }

    pub(crate) fn require_identity(&self) -> Result<IdentityRecord> {
        self.identities.load()?.ok_or(CharterError::NoIdentity)
    }

    /// Bind a verified real identity to the pseudonym.
    ///
    /// Prior entries are left untouched; the binding is one more entry
    /// recording how many entries preceded it. Succeeds at most once per
    /// identity.
    pub fn verify_identity(
        &self,
        name: &str,
        email: &str,
        method: VerificationMethod,
        verification_token: Option<&str>,
    ) -> Result<Verification> {
        self.with_identity(|identity| {
            if let Some(real) = &identity.real_identity {
                return Err(CharterError::AlreadyVerified {
                    name: real.name.clone(),
                    email: real.email.clone(),
                });
            }

            let trust_level = method.trust_level();
            let record = RealIdentity {
                name: name.to_string(),
                email: email.to_string(),
                method: method.clone(),
                verification_token: verification_token.map(str::to_string),
                verified_at: now_timestamp(),
                trust_level,
            };

            let chain = ChainId::identity();
            let prior_entries = self.chains.count(&chain)?;
            let transfer = TransferRecord {
                real_identity: VerifiedParty {
                    name: name.to_string(),
                    email: email.to_string(),
                },
                method: method.clone(),
                trust_level,
                prior_entries_transferred: prior_entries,
                transfer_proof: format!(
                    "All {} chain entries prior to this verification were signed by public_id {}. \
                     This identity is now verified as {} ({}) via {}. \
                     The unbroken chain from genesis to this entry proves authorship of all prior work.",
                    prior_entries, identity.public_id, name, email, method
                ),
            };
            let entry = self.append_as(
                identity,
                &chain,
                IDENTITY_VERIFIED_EVENT,
                serde_json::to_value(&transfer)?,
            )?;
            identity.real_identity = Some(record.clone());

            tracing::info!(
                public_id = %identity.public_id.short(16),
                method = %method,
                trust_level = %trust_level,
                prior_entries,
                "identity verified"
            );
            Ok(Verification {
                record,
                prior_entries,
                entry,
            })
        })
    }

    /// The identity without key material, or `None` if there is none.
    pub fn export_public(&self) -> Result<Option<PublicIdentity>> {
        Ok(self.identities.load()?.map(|id| id.public_view()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Chain Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a signed event to the identity chain.
    pub fn append(&self, event: &str, data: Value) -> Result<ChainEntry> {
        self.with_identity(|identity| self.append_as(identity, &ChainId::identity(), event, data))
    }

    /// Record an external failure as a `<kind>_failed` event.
    pub fn record_failure(&self, kind: &str, detail: Value) -> Result<ChainEntry> {
        let event = format!("{}{}", kind, FAILED_SUFFIX);
        tracing::warn!(event = %event, "recording failure");
        self.append(&event, detail)
    }

    /// Every identity-chain entry in index order.
    pub fn read_chain(&self) -> Result<Vec<ChainEntry>> {
        Ok(self.chains.read_all(&ChainId::identity())?)
    }

    /// The most recent `n` identity-chain entries.
    pub fn read_tail(&self, n: usize) -> Result<Vec<ChainEntry>> {
        Ok(self.chains.read_tail(&ChainId::identity(), n)?)
    }

    /// Walk the identity chain's hash links.
    pub fn verify_integrity(&self) -> Result<IntegrityReport> {
        Ok(self.chains.verify_integrity(&ChainId::identity())?)
    }

    /// Validate every identity-chain entry, checking signatures when the
    /// identity is available.
    pub fn validate_chain(&self) -> Result<ChainValidation> {
        let identity = self.identities.load()?;
        let expected = identity
            .as_ref()
            .map(|id| (&id.public_id, &id.private_seed));
        Ok(self.chains.validate(&ChainId::identity(), expected)?)
    }

    /// Load the identity, run `f` on it and save it, all under the identity
    /// lock. Nothing is saved if `f` fails.
    pub(crate) fn with_identity<T>(
        &self,
        f: impl FnOnce(&mut IdentityRecord) -> Result<T>,
    ) -> Result<T> {
        let _guard = self.lock_identity()?;
        let mut identity = self.require_identity()?;
        let out = f(&mut identity)?;
        self.identities.save(&identity)?;
        Ok(out)
    }

    fn lock_identity(&self) -> Result<MutexGuard<'_, ()>> {
        self.identity_lock
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()).into())
    }

    /// Sign and append an entry as `identity`, updating its contribution
    /// count. The caller persists the identity.
    pub(crate) fn append_as(
        &self,
        identity: &mut IdentityRecord,
        chain: &ChainId,
        event: &str,
        data: Value,
    ) -> Result<ChainEntry> {
        let entry = self.chains.append_with(chain, |head| {
            identity.sign(EntryBuilder::after(head).event(event).data(data))
        })?;
        if chain.is_identity() {
            identity.note_contribution(&entry);
        }
        Ok(entry)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stamp Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Mint a stamp for a work product.
    ///
    /// Without a governance document the stamp carries no charter hash and
    /// the domain `unknown`.
    pub fn create_stamp(
        &self,
        config: Option<&CharterConfig>,
        tools: &[ToolFact],
        description: Option<&str>,
    ) -> Result<Stamp> {
        let charter_hash = config.map(CharterConfig::charter_hash);
        let domain = config.and_then(|c| c.domain.as_deref());

        let stamp = self.with_identity(|identity| {
            let draft = StampDraft::assemble(
                identity.public_id,
                identity.alias.clone(),
                charter_hash,
                domain,
                tools,
                description,
            );
            let entry = self.append_as(
                identity,
                &ChainId::identity(),
                STAMPED_EVENT,
                draft.chain_payload(),
            )?;
            Ok(draft.seal(&entry, &identity.private_seed)?)
        })?;

        tracing::info!(
            chain_index = stamp.chain_index,
            governed = stamp.governed,
            tools = stamp.tools.len(),
            "stamp minted"
        );
        Ok(stamp)
    }

    /// Check a stamp's structure and governance claims.
    pub fn verify_stamp(&self, stamp: &Value) -> StampVerification {
        verify_stamp(stamp)
    }

    /// The stamp's trailer line, using the configured tag.
    pub fn stamp_trailer(&self, stamp: &Stamp) -> String {
        to_trailer(stamp, &self.options.trailer_tag)
    }

    /// The stamp's comment header for `language`, using the configured tag.
    pub fn stamp_header(&self, stamp: &Stamp, language: &str) -> String {
        to_header(stamp, language, &self.options.trailer_tag)
    }

    /// Attest a file as human-reviewed.
    ///
    /// The attestation records the file's base name and content digest.
    /// Fails with [`CharterError::Io`] if the file cannot be read.
    pub fn create_attestation(
        &self,
        path: impl AsRef<Path>,
        reason: &str,
        reviewer: Option<&str>,
    ) -> Result<Attestation> {
        let path = path.as_ref();
        let content = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let attestation = self.with_identity(|identity| {
            let draft = AttestationDraft::new(
                identity.public_id,
                identity.alias.clone(),
                reviewer,
                file_name,
                &content,
                reason,
            );
            let entry = self.append_as(
                identity,
                &ChainId::identity(),
                ATTESTED_EVENT,
                draft.chain_payload(),
            )?;
            Ok(draft.seal(&entry, &identity.private_seed)?)
        })?;

        tracing::info!(
            file = %attestation.file_path,
            reviewer = %attestation.reviewer,
            chain_index = attestation.chain_index,
            "work product attested"
        );
        Ok(attestation)
    }

    /// Attest a file unless a valid attestation already sits next to it.
    ///
    /// The attestation lives at `<path>.attestation.json`. An existing file
    /// that does not parse or that the gate rejects is replaced.
    pub fn attest_file(
        &self,
        path: impl AsRef<Path>,
        reason: &str,
        reviewer: Option<&str>,
    ) -> Result<AttestOutcome> {
        let path = path.as_ref();
        let sidecar = attestation_path(path);

        if let Some(existing) = read_existing_attestation(&sidecar) {
            if accept_work_product(Some(&existing)).accepted {
                return Ok(AttestOutcome::AlreadyAttested(existing));
            }
            tracing::warn!(path = %sidecar.display(), "replacing rejected attestation");
        }

        let attestation = self.create_attestation(path, reason, reviewer)?;
        std::fs::write(&sidecar, serde_json::to_string_pretty(&attestation)?)?;
        Ok(AttestOutcome::Created(attestation))
    }

    /// The ingestion gate. See [`accept_work_product`].
    pub fn accept_work_product(&self, stamp: Option<&Value>) -> GateDecision {
        accept_work_product(stamp)
    }

    /// The ingestion gate, additionally rejecting artifacts that claim this
    /// node as signer but whose signature does not verify.
    ///
    /// Artifacts from other nodes cannot be checked with a symmetric key and
    /// fall back to the ordinary gate.
    pub fn accept_work_product_strict(&self, stamp: Option<&Value>) -> Result<GateDecision> {
        let decision = accept_work_product(stamp);
        let artifact = match stamp {
            Some(v) if decision.accepted && v.is_object() => v,
            _ => return Ok(decision),
        };

        let identity = match self.identities.load()? {
            Some(id) => id,
            None => return Ok(decision),
        };
        let claims_local = artifact.get("node").and_then(Value::as_str)
            == Some(identity.public_id.to_hex().as_str());
        if claims_local && !verify_artifact_signature(artifact, &identity.private_seed) {
            return Ok(GateDecision {
                accepted: false,
                reason: "signature does not verify against the local identity".to_string(),
            });
        }
        Ok(decision)
    }
}

/// Path of the attestation written next to `path`.
pub fn attestation_path(path: &Path) -> std::path::PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".attestation.json");
    name.into()
}

fn read_existing_attestation(path: &Path) -> Option<Value> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt attestation");
            None
        }
    }
}
