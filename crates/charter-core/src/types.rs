//! Strong type definitions for Charter.
//!
//! Identifiers are newtypes so a public id can never be passed where a chain
//! hash is expected.

use rand::RngCore;
use std::fmt;

use crate::crypto::{decode_32, hex_serde, Digest};
use crate::error::{CoreError, Result};

/// Textual UTC timestamp format used in every entry, stamp and proof.
///
/// Fixed width, so lexicographic order is chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// The current UTC time in [`TIMESTAMP_FORMAT`].
pub fn now_timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// A node's 256-bit pseudonymous identifier.
///
/// Derived once at creation as SHA-256(random bytes || nanosecond clock).
/// Doubles as the display id and the `signer` of every chain entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicId(pub [u8; 32]);

hex_serde!(PublicId);

impl PublicId {
    /// Derive a fresh public id from OS-seeded randomness and the clock.
    pub fn generate() -> Self {
        let mut entropy = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut entropy);
        let nanos = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .to_string();

        let mut material = Vec::with_capacity(32 + nanos.len());
        material.extend_from_slice(&entropy);
        material.extend_from_slice(nanos.as_bytes());
        Self(Digest::sha256(&material).0)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        decode_32(s).map(Self)
    }

    /// First `len` hex characters.
    pub fn short(&self, len: usize) -> String {
        let mut hex = self.to_hex();
        hex.truncate(len);
        hex
    }
}

impl fmt::Debug for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicId({}...)", self.short(16))
    }
}

impl fmt::Display for PublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; 32]> for PublicId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Names one hash chain within a store.
///
/// Every node has the identity chain; each knowledge context gets its own
/// chain with an independent genesis.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(String);

impl ChainId {
    const IDENTITY: &'static str = "identity";
    const CONTEXT_PREFIX: &'static str = "context/";

    /// The node's main chain.
    pub fn identity() -> Self {
        Self(Self::IDENTITY.to_string())
    }

    /// The chain of a named context.
    ///
    /// Names are restricted to `[A-Za-z0-9_.-]` (not starting with `.`) so
    /// they are safe as directory names.
    pub fn context(name: &str) -> Result<Self> {
        let valid = !name.is_empty()
            && name.len() <= 64
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(CoreError::InvalidChainId(name.to_string()));
        }
        Ok(Self(format!("{}{}", Self::CONTEXT_PREFIX, name)))
    }

    /// Parse a stored chain id string.
    pub fn parse(s: &str) -> Result<Self> {
        if s == Self::IDENTITY {
            return Ok(Self::identity());
        }
        match s.strip_prefix(Self::CONTEXT_PREFIX) {
            Some(name) => Self::context(name),
            None => Err(CoreError::InvalidChainId(s.to_string())),
        }
    }

    /// Whether this is the identity chain.
    pub fn is_identity(&self) -> bool {
        self.0 == Self::IDENTITY
    }

    /// The context name, if this is a context chain.
    pub fn context_name(&self) -> Option<&str> {
        self.0.strip_prefix(Self::CONTEXT_PREFIX)
    }

    /// The stored string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainId({})", self.0)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
