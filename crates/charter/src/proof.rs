//! Authorship transfer proofs.
//!
//! A proof summarizes the identity chain and the verification that bound it
//! to a person, signed with the identity's seed. The signature only shows
//! the proof was not altered after export by someone without the seed; it
//! is not an independent witness. Anchoring chain heads to an external log
//! would be needed for that.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use charter_core::{
    now_timestamp, sign_artifact, verify_integrity, ChainId, PrivateSeed, PublicId, Signature,
    TrustLevel, VerificationMethod,
};
use charter_store::{ChainStore, IdentityStore};

use crate::charter::{Charter, TransferRecord, IDENTITY_VERIFIED_EVENT};
use crate::error::Result;

/// Value of the `proof_type` field.
pub const PROOF_TYPE: &str = "authorship_transfer";

/// Verification details carried by a proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofVerification {
    pub name: String,
    pub email: String,
    pub method: VerificationMethod,
    pub trust_level: TrustLevel,
    /// Timestamp of the transfer entry.
    pub verified_at: String,
    pub entries_transferred: u64,
}

/// A signed, shareable summary of an identity's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProof {
    pub proof_type: String,
    pub generated_at: String,
    pub public_id: PublicId,
    pub alias: String,
    pub chain_length: u64,
    pub chain_intact: bool,
    pub chain_breaks: Vec<u64>,
    pub genesis_timestamp: Option<String>,
    pub latest_timestamp: Option<String>,
    pub verified: bool,
    pub verification: Option<ProofVerification>,
    pub signature: Signature,
}

impl TransferProof {
    /// The proof as an untyped JSON object.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Check the proof's signature against `seed`.
    pub fn verify(&self, seed: &PrivateSeed) -> Result<bool> {
        Ok(charter_core::verify_artifact(&self.to_value()?, seed))
    }
}

impl<C: ChainStore, I: IdentityStore> Charter<C, I> {
    /// Build and sign a transfer proof, or `None` without an identity.
    ///
    /// The verification section comes from the first `identity_verified`
    /// entry on the chain.
    pub fn transfer_proof(&self) -> Result<Option<TransferProof>> {
        let identity = match self.load_identity()? {
            Some(id) => id,
            None => return Ok(None),
        };
        let entries = self.chains().read_all(&ChainId::identity())?;
        let integrity = verify_integrity(&entries);

        let verification = entries
            .iter()
            .find(|e| e.event == IDENTITY_VERIFIED_EVENT)
            .and_then(|entry| match entry.decode_data::<TransferRecord>() {
                Ok(record) => Some(ProofVerification {
                    name: record.real_identity.name,
                    email: record.real_identity.email,
                    method: record.method,
                    trust_level: record.trust_level,
                    verified_at: entry.timestamp.clone(),
                    entries_transferred: record.prior_entries_transferred,
                }),
                Err(e) => {
                    tracing::warn!(index = entry.index, error = %e, "unreadable transfer entry");
                    None
                }
            });

        let mut proof = TransferProof {
            proof_type: PROOF_TYPE.to_string(),
            generated_at: now_timestamp(),
            public_id: identity.public_id,
            alias: identity.alias.clone(),
            chain_length: integrity.length,
            chain_intact: integrity.intact,
            chain_breaks: integrity.breaks,
            genesis_timestamp: entries.first().map(|e| e.timestamp.clone()),
            latest_timestamp: entries.last().map(|e| e.timestamp.clone()),
            verified: identity.is_verified(),
            verification,
            signature: Signature::from_bytes([0u8; 32]),
        };
        proof.signature = sign_artifact(&proof.to_value()?, &identity.private_seed);
        Ok(Some(proof))
    }
}
