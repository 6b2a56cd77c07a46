//! Cryptographic primitives: SHA-256 digests and HMAC-SHA256 signatures.
//!
//! All 32-byte values travel as lowercase hex strings, which is how they
//! appear in chain files, stamps and proofs.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest as _, Sha256};
use std::fmt;

use crate::error::{CoreError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Decode exactly 32 bytes from hex.
pub(crate) fn decode_32(s: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(s)?;
    if bytes.len() != 32 {
        return Err(CoreError::InvalidLength {
            expected: 32,
            got: bytes.len(),
        });
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

/// Implements hex-string serde for a 32-byte newtype.
macro_rules! hex_serde {
    ($ty:ident) => {
        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&hex::encode(self.0))
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                $crate::crypto::decode_32(&s)
                    .map(Self)
                    .map_err(serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use hex_serde;

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(pub [u8; 32]);

hex_serde!(Digest);

impl Digest {
    /// Compute the SHA-256 digest of data.
    pub fn sha256(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
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

    /// First `len` hex characters, for display in trailers and headers.
    pub fn short(&self, len: usize) -> String {
        let mut hex = self.to_hex();
        hex.truncate(len);
        hex
    }

    /// The all-zero digest. Its hex form is the genesis `previous_hash`.
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({}...)", self.short(16))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A 32-byte HMAC-SHA256 tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 32]);

hex_serde!(Signature);

impl Signature {
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
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The 256-bit secret an identity signs with.
///
/// Used as the HMAC key for every signature the identity produces.
/// `Debug` never prints the key material.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateSeed([u8; 32]);

hex_serde!(PrivateSeed);

impl PrivateSeed {
    /// Generate a new random seed.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        decode_32(s).map(Self)
    }

    /// Get raw bytes (secret key material).
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// HMAC-SHA256 over a message, keyed by this seed.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let mut mac = self.mac();
        mac.update(message);
        Signature(mac.finalize().into_bytes().into())
    }

    /// Check a tag in constant time.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let mut mac = self.mac();
        mac.update(message);
        mac.verify_slice(&signature.0).is_ok()
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC pads or hashes the key to its block size, so no key length is
        // rejected; the error arm of new_from_slice is unreachable.
        HmacSha256::new_from_slice(&self.0).expect("HMAC accepts keys of any length")
    }
}

impl fmt::Debug for PrivateSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateSeed(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_value() {
        let d = Digest::sha256(b"");
        assert_eq!(
            d.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_zero_digest_is_64_zeros() {
        assert_eq!(Digest::ZERO.to_hex(), "0".repeat(64));
    }

    #[test]
    fn test_hmac_known_value() {
        let seed = PrivateSeed::from_bytes([0x0b; 32]);
        let sig = seed.sign(b"Hi There");
        assert_eq!(
            sig.to_hex(),
            "198a607eb44bfbc69903a0f1cf2bbdc5ba0aa3f3d9ae3c1c7a3b1696a0b68cf7"
        );
    }

    #[test]
    fn test_sign_differs_by_message_and_seed() {
        let a = PrivateSeed::from_bytes([0xaa; 32]);
        let b = PrivateSeed::from_bytes([0xbb; 32]);
        assert_ne!(a.sign(b"one"), a.sign(b"two"));
        assert_ne!(a.sign(b"one"), b.sign(b"one"));
    }

    #[test]
    fn test_verify_rejects_other_seed() {
        let a = PrivateSeed::from_bytes([0x01; 32]);
        let b = PrivateSeed::from_bytes([0x02; 32]);
        let sig = a.sign(b"payload");
        assert!(a.verify(b"payload", &sig));
        assert!(!b.verify(b"payload", &sig));
        assert!(!a.verify(b"payloaD", &sig));
    }

    #[test]
    fn test_digest_hex_roundtrip_and_serde() {
        let d = Digest::sha256(b"charter");
        assert_eq!(Digest::from_hex(&d.to_hex()).unwrap(), d);

        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{}\"", d.to_hex()));
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn test_from_hex_rejects_wrong_length() {
        assert!(matches!(
            Digest::from_hex("abcd"),
            Err(CoreError::InvalidLength { expected: 32, got: 2 })
        ));
    }

    #[test]
    fn test_seed_debug_is_redacted() {
        let seed = PrivateSeed::from_bytes([0x42; 32]);
        let debug = format!("{:?}", seed);
        assert!(!debug.contains("42"));
    }

    #[test]
    fn test_generated_seeds_differ() {
        assert_ne!(PrivateSeed::generate(), PrivateSeed::generate());
    }
}
