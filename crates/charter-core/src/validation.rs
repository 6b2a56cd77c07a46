//! Chain validation: per-entry structural, hash and signature checks.
//!
//! [`crate::integrity::verify_integrity`] answers "is the chain linked?".
//! This module answers "which entries are individually wrong, and how?".

use serde::{Deserialize, Serialize};

use crate::crypto::{Digest, PrivateSeed};
use crate::entry::ChainEntry;
use crate::types::PublicId;

/// A problem found with one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fault", rename_all = "snake_case")]
pub enum EntryFault {
    /// The stored index is not the entry's position.
    IndexMismatch { position: u64, index: u64 },

    /// The first entry does not point at the zero sentinel.
    BadGenesisLink { previous_hash: Digest },

    /// `previous_hash` does not match the preceding entry's hash.
    BrokenLink { index: u64 },

    /// The stored hash does not match the recomputed one.
    HashMismatch { index: u64, stored: Digest, computed: Digest },

    /// A non-genesis entry has no signer or no signature.
    Unsigned { index: u64 },

    /// The entry names a different signer than the expected identity.
    SignerMismatch { index: u64, signer: Option<PublicId> },

    /// The signature does not verify under the expected identity's seed.
    SignatureMismatch { index: u64 },
}

impl EntryFault {
    /// The index of the faulty entry.
    pub fn index(&self) -> u64 {
        match self {
            EntryFault::IndexMismatch { position, .. } => *position,
            EntryFault::BadGenesisLink { .. } => 0,
            EntryFault::BrokenLink { index }
            | EntryFault::HashMismatch { index, .. }
            | EntryFault::Unsigned { index }
            | EntryFault::SignerMismatch { index, .. }
            | EntryFault::SignatureMismatch { index } => *index,
        }
    }
}

/// Outcome of a deep validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainValidation {
    /// Number of entries checked.
    pub length: u64,

    /// Every fault found, in chain order.
    pub faults: Vec<EntryFault>,
}

impl ChainValidation {
    /// Check if no fault was found.
    pub fn is_valid(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Validate every entry of a chain.
///
/// With `expected` set, each entry must be signed by that identity and its
/// signature must verify under the seed. Without it, only structure, links
/// and hashes are checked. An unsigned genesis is tolerated (older chains
/// wrote one); any other unsigned entry is a fault.
pub fn validate_chain(
    entries: &[ChainEntry],
    expected: Option<(&PublicId, &PrivateSeed)>,
) -> ChainValidation {
    let mut faults = Vec::new();

    for (position, entry) in entries.iter().enumerate() {
        let position = position as u64;

        // 1. Position
        if entry.index != position {
            faults.push(EntryFault::IndexMismatch {
                position,
                index: entry.index,
            });
        }

        // 2. Link
        if position == 0 {
            if entry.previous_hash != Digest::ZERO {
                faults.push(EntryFault::BadGenesisLink {
                    previous_hash: entry.previous_hash,
                });
            }
        } else if entry.previous_hash != entries[position as usize - 1].hash {
            faults.push(EntryFault::BrokenLink { index: entry.index });
        }

        // 3. Hash
        let computed = entry.compute_hash();
        if computed != entry.hash {
            faults.push(EntryFault::HashMismatch {
                index: entry.index,
                stored: entry.hash,
                computed,
            });
        }

        // 4. Authorship
        let unsigned = entry.signer.is_none() || entry.signature.is_none();
        if unsigned {
            if position != 0 {
                faults.push(EntryFault::Unsigned { index: entry.index });
            }
            continue;
        }

        if let Some((public_id, seed)) = expected {
            if entry.signer.as_ref() != Some(public_id) {
                faults.push(EntryFault::SignerMismatch {
                    index: entry.index,
                    signer: entry.signer,
                });
            } else if !entry.verify_signature(seed) {
                faults.push(EntryFault::SignatureMismatch { index: entry.index });
            }
        }
    }

    ChainValidation {
        length: entries.len() as u64,
        faults,
    }
}
