//! Identity records: pseudonymous key material and the optional binding to a
//! verified real-world identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::PrivateSeed;
use crate::entry::{ChainEntry, EntryBuilder};
use crate::types::{now_timestamp, PublicId};

/// Schema version written into every identity record.
pub const IDENTITY_VERSION: &str = "1.0";

/// How strongly a verification method establishes real-world identity.
///
/// Ordered weakest to strongest, so `Government > SelfDeclared`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    SelfDeclared,
    Basic,
    Organizational,
    #[serde(alias = "government_id")]
    Government,
}

impl TrustLevel {
    /// The stored string form.
    pub fn as_str(self) -> &'static str {
        match self {
            TrustLevel::SelfDeclared => "self_declared",
            TrustLevel::Basic => "basic",
            TrustLevel::Organizational => "organizational",
            TrustLevel::Government => "government",
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The method used to verify a real identity.
///
/// The namespace is open: unknown methods are kept verbatim and rank as
/// self-declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VerificationMethod {
    IdMe,
    Persona,
    OrgHr,
    Email,
    Manual,
    Other(String),
}

impl VerificationMethod {
    /// The fixed trust taxonomy.
    pub fn trust_level(&self) -> TrustLevel {
        match self {
            VerificationMethod::IdMe | VerificationMethod::Persona => TrustLevel::Government,
            VerificationMethod::OrgHr => TrustLevel::Organizational,
            VerificationMethod::Email => TrustLevel::Basic,
            VerificationMethod::Manual | VerificationMethod::Other(_) => TrustLevel::SelfDeclared,
        }
    }

    /// The stored string form.
    pub fn as_str(&self) -> &str {
        match self {
            VerificationMethod::IdMe => "id_me",
            VerificationMethod::Persona => "persona",
            VerificationMethod::OrgHr => "org_hr",
            VerificationMethod::Email => "email",
            VerificationMethod::Manual => "manual",
            VerificationMethod::Other(s) => s,
        }
    }
}

impl From<&str> for VerificationMethod {
    fn from(s: &str) -> Self {
        match s {
            "id_me" => VerificationMethod::IdMe,
            "persona" => VerificationMethod::Persona,
            "org_hr" => VerificationMethod::OrgHr,
            "email" => VerificationMethod::Email,
            "manual" => VerificationMethod::Manual,
            other => VerificationMethod::Other(other.to_string()),
        }
    }
}

impl From<String> for VerificationMethod {
    fn from(s: String) -> Self {
        VerificationMethod::from(s.as_str())
    }
}

impl From<VerificationMethod> for String {
    fn from(m: VerificationMethod) -> Self {
        m.as_str().to_string()
    }
}

impl fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The real-world identity bound to a pseudonym. Set at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealIdentity {
    pub name: String,
    pub email: String,
    pub method: VerificationMethod,
    #[serde(default)]
    pub verification_token: Option<String>,
    pub verified_at: String,
    pub trust_level: TrustLevel,
}

/// A node's persisted identity.
///
/// Holds the private seed, so it is never exported as-is; use
/// [`IdentityRecord::public_view`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub version: String,
    pub public_id: PublicId,
    pub private_seed: PrivateSeed,
    pub alias: String,
    pub created_at: String,
    pub real_identity: Option<RealIdentity>,
    /// Index of the latest entry this identity wrote to its own chain.
    #[serde(default)]
    pub contributions: u64,
}

impl IdentityRecord {
    /// Generate fresh key material.
    ///
    /// Without an alias, the default is `prefix` followed by the first eight
    /// hex characters of the public id.
    pub fn generate(alias: Option<&str>, alias_prefix: &str) -> Self {
        let public_id = PublicId::generate();
        let alias = match alias {
            Some(a) if !a.is_empty() => a.to_string(),
            _ => format!("{}{}", alias_prefix, public_id.short(8)),
        };
        Self {
            version: IDENTITY_VERSION.to_string(),
            public_id,
            private_seed: PrivateSeed::generate(),
            alias,
            created_at: now_timestamp(),
            real_identity: None,
            contributions: 0,
        }
    }

    /// Check if a real identity has been bound.
    pub fn is_verified(&self) -> bool {
        self.real_identity.is_some()
    }

    /// Sign an entry as this identity.
    pub fn sign(&self, builder: EntryBuilder) -> ChainEntry {
        builder.sign(&self.public_id, &self.private_seed)
    }

    /// Record that this identity wrote `entry`. Never decreases.
    pub fn note_contribution(&mut self, entry: &ChainEntry) {
        self.contributions = self.contributions.max(entry.index);
    }

    /// The shareable view, without key material.
    pub fn public_view(&self) -> PublicIdentity {
        let real = self.real_identity.as_ref();
        PublicIdentity {
            public_id: self.public_id,
            alias: self.alias.clone(),
            created_at: self.created_at.clone(),
            contributions: self.contributions,
            verified_name: real.map(|r| r.name.clone()),
            verified_email: real.map(|r| r.email.clone()),
            trust_level: real.map(|r| r.trust_level),
        }
    }
}

/// An identity as shown to others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIdentity {
    pub public_id: PublicId,
    pub alias: String,
    pub created_at: String,
    pub contributions: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_level: Option<TrustLevel>,
}
