//! Store traits: the abstract interface for chain and identity persistence.
//!
//! These traits keep the facade storage-agnostic. Implementations include
//! JSONL files (the interchange format), SQLite, and in-memory (for tests).

use charter_core::{
    validate_chain, verify_integrity, ChainEntry, ChainId, ChainValidation, Digest,
    IdentityRecord, IntegrityReport, PrivateSeed, PublicId,
};

use crate::error::{Result, StoreError};

/// Append-only persistence for hash chains.
///
/// # Design Notes
///
/// - **Single critical section**: [`ChainStore::append_with`] reads the head,
///   builds the entry and writes it while holding the store's write lock, so
///   two writers can never compute the same index.
/// - **Link check**: every append is checked against the head it is written
///   after. An entry that does not follow the head is rejected with
///   [`StoreError::Conflict`] and nothing is written.
/// - **No rewrites**: there is no operation that edits or removes an entry.
pub trait ChainStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Build an entry from the current head and append it atomically.
    ///
    /// `build` receives the head (`None` for an empty chain) and must return
    /// its successor. Returns the entry as written.
    fn append_with<F>(&self, chain: &ChainId, build: F) -> Result<ChainEntry>
    where
        F: FnOnce(Option<&ChainEntry>) -> ChainEntry;

    /// Append a pre-built entry.
    ///
    /// Fails with [`StoreError::Conflict`] unless it follows the head.
    fn append(&self, chain: &ChainId, entry: ChainEntry) -> Result<ChainEntry> {
        self.append_with(chain, move |_| entry)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// The latest entry, or `None` for an empty or missing chain.
    fn head(&self, chain: &ChainId) -> Result<Option<ChainEntry>>;

    /// Every entry in index order. A missing chain reads as empty.
    fn read_all(&self, chain: &ChainId) -> Result<Vec<ChainEntry>>;

    /// The most recent `n` entries, oldest first.
    fn read_tail(&self, chain: &ChainId, n: usize) -> Result<Vec<ChainEntry>> {
        let mut entries = self.read_all(chain)?;
        let skip = entries.len().saturating_sub(n);
        Ok(entries.split_off(skip))
    }

    /// Number of entries in the chain.
    fn count(&self, chain: &ChainId) -> Result<u64> {
        Ok(self.read_all(chain)?.len() as u64)
    }

    /// Every chain holding at least one entry.
    fn list_chains(&self) -> Result<Vec<ChainId>>;
}

/// Whole-record persistence for the node identity.
pub trait IdentityStore: Send + Sync {
    /// Load the identity. `None` means "not yet initialized".
    fn load(&self) -> Result<Option<IdentityRecord>>;

    /// Replace the stored identity.
    fn save(&self, record: &IdentityRecord) -> Result<()>;
}

/// Check that `entry` is the successor of `head`.
///
/// Backends call this inside their write critical section.
pub fn check_link(chain: &ChainId, head: Option<&ChainEntry>, entry: &ChainEntry) -> Result<()> {
    let (index, previous_hash) = match head {
        Some(h) => (h.index + 1, h.hash),
        None => (0, Digest::ZERO),
    };
    if entry.index != index || entry.previous_hash != previous_hash {
        return Err(StoreError::Conflict {
            chain: chain.to_string(),
            index: entry.index,
        });
    }
    Ok(())
}

/// Extension trait for common chain checks.
pub trait ChainStoreExt: ChainStore {
    /// Walk the chain's hash links.
    fn verify_integrity(&self, chain: &ChainId) -> Result<IntegrityReport> {
        let entries = self.read_all(chain)?;
        let report = verify_integrity(&entries);
        if !report.intact {
            tracing::warn!(
                chain = %chain,
                breaks = ?report.breaks,
                "chain integrity check found breaks"
            );
        }
        Ok(report)
    }

    /// Validate every entry, optionally against the expected signer.
    fn validate(
        &self,
        chain: &ChainId,
        expected: Option<(&PublicId, &PrivateSeed)>,
    ) -> Result<ChainValidation> {
        let entries = self.read_all(chain)?;
        Ok(validate_chain(&entries, expected))
    }
}

impl<S: ChainStore> ChainStoreExt for S {}
