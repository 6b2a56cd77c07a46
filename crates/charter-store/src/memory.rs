//! In-memory implementation of the store traits.
//!
//! This is primarily for testing. It has the same semantics as the file and
//! SQLite backends but keeps everything in memory with no persistence.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use charter_core::{ChainEntry, ChainId, IdentityRecord};

use crate::error::{Result, StoreError};
use crate::traits::{check_link, ChainStore, IdentityStore};

/// In-memory store implementation.
///
/// All data is lost when the last clone is dropped. Thread-safe via RwLock;
/// clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Entries per chain, in index order.
    chains: BTreeMap<ChainId, Vec<ChainEntry>>,

    /// The node identity.
    identity: Option<IdentityRecord>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryStoreInner) -> T) -> Result<T> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Lock("memory store lock poisoned".into()))?;
        Ok(f(&inner))
    }

    fn write<T>(&self, f: impl FnOnce(&mut MemoryStoreInner) -> Result<T>) -> Result<T> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Lock("memory store lock poisoned".into()))?;
        f(&mut inner)
    }

    /// Replace an entry in place, bypassing the append-only contract.
    ///
    /// Only for tests that simulate on-disk tampering.
    #[doc(hidden)]
    pub fn tamper(&self, chain: &ChainId, index: usize, f: impl FnOnce(&mut ChainEntry)) {
        if let Ok(mut inner) = self.inner.write() {
            if let Some(entry) = inner.chains.get_mut(chain).and_then(|c| c.get_mut(index)) {
                f(entry);
            }
        }
    }
}

impl ChainStore for MemoryStore {
    fn append_with<F>(&self, chain: &ChainId, build: F) -> Result<ChainEntry>
    where
        F: FnOnce(Option<&ChainEntry>) -> ChainEntry,
    {
        let entry = self.write(|inner| {
            let entries = inner.chains.entry(chain.clone()).or_default();
            let entry = build(entries.last());
            check_link(chain, entries.last(), &entry)?;
            entries.push(entry.clone());
            Ok(entry)
        })?;

        debug!(chain = %chain, index = entry.index, event = %entry.event, "appended entry");
        Ok(entry)
    }

    fn head(&self, chain: &ChainId) -> Result<Option<ChainEntry>> {
        self.read(|inner| inner.chains.get(chain).and_then(|c| c.last().cloned()))
    }

    fn read_all(&self, chain: &ChainId) -> Result<Vec<ChainEntry>> {
        self.read(|inner| inner.chains.get(chain).cloned().unwrap_or_default())
    }

    fn read_tail(&self, chain: &ChainId, n: usize) -> Result<Vec<ChainEntry>> {
        self.read(|inner| {
            inner
                .chains
                .get(chain)
                .map(|c| c[c.len().saturating_sub(n)..].to_vec())
                .unwrap_or_default()
        })
    }

    fn count(&self, chain: &ChainId) -> Result<u64> {
        self.read(|inner| inner.chains.get(chain).map_or(0, |c| c.len() as u64))
    }

    fn list_chains(&self) -> Result<Vec<ChainId>> {
        self.read(|inner| {
            let mut chains: Vec<ChainId> = inner
                .chains
                .iter()
                .filter(|(_, entries)| !entries.is_empty())
                .map(|(id, _)| id.clone())
                .collect();
            chains.sort_by_key(|c| (!c.is_identity(), c.clone()));
            chains
        })
    }
}

impl IdentityStore for MemoryStore {
    fn load(&self) -> Result<Option<IdentityRecord>> {
        self.read(|inner| inner.identity.clone())
    }

    fn save(&self, record: &IdentityRecord) -> Result<()> {
        self.write(|inner| {
            inner.identity = Some(record.clone());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ChainStoreExt;
    use charter_core::{EntryBuilder, PrivateSeed, PublicId};
    use serde_json::json;

    fn append_event(store: &MemoryStore, chain: &ChainId, n: u64) -> ChainEntry {
        let id = PublicId::from_bytes([0x11; 32]);
        let seed = PrivateSeed::from_bytes([0x42; 32]);
        store
            .append_with(chain, |head| {
                EntryBuilder::after(head)
                    .event("test")
                    .data(json!({ "n": n }))
                    .sign(&id, &seed)
            })
            .unwrap()
    }

    #[test]
    fn test_append_and_read() {
        let store = MemoryStore::new();
        let chain = ChainId::identity();
        for n in 0..5 {
            let entry = append_event(&store, &chain, n);
            assert_eq!(entry.index, n);
        }
        assert_eq!(store.count(&chain).unwrap(), 5);
        assert_eq!(store.read_tail(&chain, 2).unwrap()[0].index, 3);
        assert!(store.verify_integrity(&chain).unwrap().intact);
    }

    #[test]
    fn test_clones_share_state() {
        let a = MemoryStore::new();
        let b = a.clone();
        append_event(&a, &ChainId::identity(), 0);
        assert_eq!(b.count(&ChainId::identity()).unwrap(), 1);
    }

    #[test]
    fn test_tamper_detected() {
        let store = MemoryStore::new();
        let chain = ChainId::identity();
        for n in 0..4 {
            append_event(&store, &chain, n);
        }
        store.tamper(&chain, 1, |e| e.data = json!({"n": "forged"}));

        let report = store.verify_integrity(&chain).unwrap();
        assert_eq!(report.breaks, vec![2]);
    }

    #[test]
    fn test_missing_chain_is_empty() {
        let store = MemoryStore::new();
        let chain = ChainId::context("nowhere").unwrap();
        assert!(store.read_all(&chain).unwrap().is_empty());
        assert!(store.head(&chain).unwrap().is_none());
        assert!(store.list_chains().unwrap().is_empty());
    }
}
