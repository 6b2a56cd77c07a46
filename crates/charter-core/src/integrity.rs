//! Link-walk integrity check over a chain.
//!
//! Each entry's `previous_hash` is compared against its predecessor's hash,
//! both as stored and as recomputed from the predecessor's content. A single
//! entry edited in place therefore surfaces as exactly one break, at its
//! successor, whether or not the editor also rewrote its stored hash.
//! Deeper per-entry checks live in [`crate::validation`].

use serde::{Deserialize, Serialize};

use crate::entry::ChainEntry;

/// Result of walking a chain's hash links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// True when no link is broken.
    pub intact: bool,

    /// Every index `i` whose `previous_hash` does not match entry `i-1`.
    pub breaks: Vec<u64>,

    /// Number of entries walked.
    pub length: u64,
}

impl IntegrityReport {
    /// The report for an empty chain.
    pub fn empty() -> Self {
        Self {
            intact: true,
            breaks: Vec::new(),
            length: 0,
        }
    }
}

/// Walk `entries` in order and report every broken link.
///
/// Breaks are reported by the index stored in the entry, so a chain with a
/// deleted line reports the index of the entry after the gap.
pub fn verify_integrity(entries: &[ChainEntry]) -> IntegrityReport {
    let breaks: Vec<u64> = entries
        .windows(2)
        .filter(|pair| {
            let (prev, next) = (&pair[0], &pair[1]);
            next.previous_hash != prev.hash || next.previous_hash != prev.compute_hash()
        })
        .map(|pair| pair[1].index)
        .collect();

    IntegrityReport {
        intact: breaks.is_empty(),
        breaks,
        length: entries.len() as u64,
    }
}
