//! Golden vectors for the canonical form, entry hashes and signatures.
//!
//! The expected values were produced by an independent encoder of the
//! canonical form, SHA-256 and HMAC-SHA256. Any change here means existing
//! chains no longer verify.

use serde_json::Value;

use charter_core::{ChainEntry, Digest, EntryBuilder, PrivateSeed, PublicId};

/// One entry of the golden chain.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// HMAC key.
    pub seed: [u8; 32],
    /// Public id written as `signer`.
    pub signer: [u8; 32],
    pub timestamp: &'static str,
    pub event: &'static str,
    /// Payload as JSON text.
    pub data: &'static str,
    /// Canonical bytes the hash and signature are computed over.
    pub expected_canonical: &'static str,
    pub expected_hash: &'static str,
    pub expected_signature: &'static str,
}

/// The golden chain, in order. Each vector is the successor of the one
/// before it.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "identity genesis",
            seed: [0x42; 32],
            signer: [0x11; 32],
            timestamp: "2025-01-15T10:00:00Z",
            event: "identity_created",
            data: r#"{"public_id": "1111111111111111111111111111111111111111111111111111111111111111", "alias": "node-11111111"}"#,
            expected_canonical: r#"{"data":{"alias":"node-11111111","public_id":"1111111111111111111111111111111111111111111111111111111111111111"},"event":"identity_created","index":0,"previous_hash":"0000000000000000000000000000000000000000000000000000000000000000","signer":"1111111111111111111111111111111111111111111111111111111111111111","timestamp":"2025-01-15T10:00:00Z"}"#,
            expected_hash: "179a8da21c232d2863b6940826cc2f1cb04be21e073a872912084907dbe78588",
            expected_signature: "4ce74a09a47d3bff897323ecee3dd54232b84fb46bbc77588663a6cc148b58f7",
        },
        GoldenVector {
            name: "stamp with non-ASCII description",
            seed: [0x42; 32],
            signer: [0x11; 32],
            timestamp: "2025-01-15T10:05:00Z",
            event: "work_product_stamped",
            data: "{\"charter_hash\": null, \"tools\": [\"claude_code\"], \"governed\": true, \"description\": \"caf\u{e9} \u{2615} report \u{1F600}\"}",
            expected_canonical: r#"{"data":{"charter_hash":null,"description":"caf\u00e9 \u2615 report \ud83d\ude00","governed":true,"tools":["claude_code"]},"event":"work_product_stamped","index":1,"previous_hash":"179a8da21c232d2863b6940826cc2f1cb04be21e073a872912084907dbe78588","signer":"1111111111111111111111111111111111111111111111111111111111111111","timestamp":"2025-01-15T10:05:00Z"}"#,
            expected_hash: "68cbc170c356e893e0f2843c84e32588a77ee9ad4ab600d29073244ca58c4f3e",
            expected_signature: "61cf0eedf1e1130bf4103c317c00d36ec657681761b05d10c15b030bd4b85f88",
        },
        GoldenVector {
            name: "floats, escapes and another signer",
            seed: [0x00; 32],
            signer: [0x22; 32],
            timestamp: "2025-01-15T10:10:00Z",
            event: "session",
            data: r#"{"score": 0.5, "count": 3, "nested": {"b": [1, 2.5e-7, 1e16, -0.0001], "a": "tab\there \"q\""}}"#,
            expected_canonical: r#"{"data":{"count":3,"nested":{"a":"tab\there \"q\"","b":[1,2.5e-07,1e+16,-0.0001]},"score":0.5},"event":"session","index":2,"previous_hash":"68cbc170c356e893e0f2843c84e32588a77ee9ad4ab600d29073244ca58c4f3e","signer":"2222222222222222222222222222222222222222222222222222222222222222","timestamp":"2025-01-15T10:10:00Z"}"#,
            expected_hash: "61e407349fcc6204ca4c5d436d1f7578f31a54126abcbd7db34dfec70f7ccf33",
            expected_signature: "f8855fa300029689fea1ddfb407e1cfd7ada3134ce928048779fdd8ad55a60f1",
        },
    ]
}

/// Fingerprint of [`crate::fixtures::sample_governance`].
pub const SAMPLE_GOVERNANCE_FINGERPRINT: &str =
    "4e8e6d723060249eceacd71c503e3a7037aed144986ed9f96c32c57e2b826db8";

/// Fingerprint of an empty ruleset (`{}`).
pub const EMPTY_GOVERNANCE_FINGERPRINT: &str =
    "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a";

/// Build the golden chain, each entry signed with its vector's seed.
pub fn build_golden_chain() -> Vec<ChainEntry> {
    let mut chain: Vec<ChainEntry> = Vec::new();
    for vector in all_vectors() {
        let data: Value =
            serde_json::from_str(vector.data).expect("golden vector data is valid JSON");
        let entry = EntryBuilder::after(chain.last())
            .timestamp(vector.timestamp)
            .event(vector.event)
            .data(data)
            .sign(
                &PublicId::from_bytes(vector.signer),
                &PrivateSeed::from_bytes(vector.seed),
            );
        chain.push(entry);
    }
    chain
}

/// Check every vector against the current implementation.
///
/// Returns the name and a description of each mismatch.
pub fn verify_all_vectors() -> Vec<(&'static str, String)> {
    let mut failures = Vec::new();
    for (vector, entry) in all_vectors().iter().zip(build_golden_chain()) {
        let content = String::from_utf8_lossy(&entry.content_bytes()).into_owned();
        if content != vector.expected_canonical {
            failures.push((vector.name, format!("canonical: {}", content)));
        }
        if entry.hash.to_hex() != vector.expected_hash {
            failures.push((vector.name, format!("hash: {}", entry.hash)));
        }
        let signature = entry.signature.map(|s| s.to_hex()).unwrap_or_default();
        if signature != vector.expected_signature {
            failures.push((vector.name, format!("signature: {}", signature)));
        }
    }
    failures
}

/// Parse an expected hash.
pub fn expected_digest(vector: &GoldenVector) -> Digest {
    Digest::from_hex(vector.expected_hash).expect("golden hash is valid hex")
}
