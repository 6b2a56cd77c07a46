//! Identity lifecycle through the facade: creation, the one-time authorship
//! transfer, public export, transfer proofs and persistence.

use serde_json::json;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

use charter::store::{FileIdentityStore, JsonlChainStore, MemoryStore, SqliteStore};
use charter::{
    Charter, CharterError, TransferRecord, TrustLevel, VerificationMethod,
    IDENTITY_CREATED_EVENT, IDENTITY_VERIFIED_EVENT, PROOF_TYPE,
};
use charter_testkit::TestFixture;

fn open_dir(dir: &TempDir) -> Charter<JsonlChainStore, FileIdentityStore> {
    let chains = JsonlChainStore::open(dir.path()).unwrap();
    let identities = FileIdentityStore::new(dir.path().join("identity.json"));
    Charter::new(chains, identities)
}

#[test]
fn test_verify_records_prior_entries() {
    let fixture = TestFixture::new();
    fixture.append_events(3);

    let verification = fixture
        .charter
        .verify_identity("Ada Lovelace", "ada@example.com", VerificationMethod::IdMe, Some("tok-1"))
        .unwrap();

    assert_eq!(verification.prior_entries, 4);
    assert_eq!(verification.entry.index, 4);
    assert_eq!(verification.entry.event, IDENTITY_VERIFIED_EVENT);
    assert_eq!(verification.record.trust_level, TrustLevel::Government);
    assert_eq!(verification.record.verification_token.as_deref(), Some("tok-1"));

    let record: TransferRecord = verification.entry.decode_data().unwrap();
    assert_eq!(record.prior_entries_transferred, 4);
    assert_eq!(record.real_identity.email, "ada@example.com");
    assert!(record.transfer_proof.starts_with("All 4 chain entries prior"));

    let identity = fixture.identity();
    assert!(identity.is_verified());
    assert_eq!(identity.real_identity.unwrap().name, "Ada Lovelace");
}

#[test]
fn test_verify_right_after_genesis() {
    let fixture = TestFixture::new();
    let verification = fixture
        .charter
        .verify_identity("Ada", "ada@example.com", VerificationMethod::Email, None)
        .unwrap();
    assert_eq!(verification.prior_entries, 1);
    assert_eq!(verification.record.trust_level, TrustLevel::Basic);
}

#[test]
fn test_second_verification_rejected() {
    let fixture = TestFixture::new();
    fixture
        .charter
        .verify_identity("Ada", "ada@example.com", VerificationMethod::OrgHr, None)
        .unwrap();
    let before = fixture.charter.read_chain().unwrap().len();

    let err = fixture
        .charter
        .verify_identity("Mallory", "m@example.com", VerificationMethod::IdMe, None)
        .unwrap_err();
    match &err {
        CharterError::AlreadyVerified { name, email } => {
            assert_eq!(name, "Ada");
            assert_eq!(email, "ada@example.com");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("Transfer already complete"));
    assert_eq!(fixture.charter.read_chain().unwrap().len(), before);
}

#[test]
fn test_verify_without_identity() {
    let fixture = TestFixture::empty();
    assert!(matches!(
        fixture
            .charter
            .verify_identity("Ada", "ada@example.com", VerificationMethod::Manual, None),
        Err(CharterError::NoIdentity)
    ));
}

#[test]
fn test_unknown_method_is_self_declared() {
    let fixture = TestFixture::new();
    let verification = fixture
        .charter
        .verify_identity("Ada", "ada@example.com", VerificationMethod::from("notary"), None)
        .unwrap();
    assert_eq!(verification.record.trust_level, TrustLevel::SelfDeclared);
    assert_eq!(verification.entry.data["method"], "notary");
}

#[test]
fn test_export_public_has_no_seed() {
    let fixture = TestFixture::new();
    fixture
        .charter
        .verify_identity("Ada", "ada@example.com", VerificationMethod::Persona, None)
        .unwrap();

    let public = fixture.charter.export_public().unwrap().unwrap();
    assert_eq!(public.verified_name.as_deref(), Some("Ada"));
    assert_eq!(public.trust_level, Some(TrustLevel::Government));

    let json = serde_json::to_value(&public).unwrap();
    assert!(json.get("private_seed").is_none());
    let seed = serde_json::to_value(fixture.identity().private_seed).unwrap();
    assert!(!json.to_string().contains(seed.as_str().unwrap()));
}

#[test]
fn test_export_public_without_identity() {
    let fixture = TestFixture::empty();
    assert!(fixture.charter.export_public().unwrap().is_none());
    assert!(fixture.charter.transfer_proof().unwrap().is_none());
}

#[test]
fn test_transfer_proof_unverified() {
    let fixture = TestFixture::new();
    fixture.append_events(2);

    let proof = fixture.charter.transfer_proof().unwrap().unwrap();
    assert_eq!(proof.proof_type, PROOF_TYPE);
    assert_eq!(proof.chain_length, 3);
    assert!(proof.chain_intact);
    assert!(!proof.verified);
    assert!(proof.verification.is_none());
    assert!(proof.verify(&fixture.identity().private_seed).unwrap());
}

#[test]
fn test_transfer_proof_verified() {
    let fixture = TestFixture::new();
    fixture.append_events(2);
    let verification = fixture
        .charter
        .verify_identity("Ada", "ada@example.com", VerificationMethod::IdMe, None)
        .unwrap();
    fixture.append_events(1);

    let proof = fixture.charter.transfer_proof().unwrap().unwrap();
    let seed = fixture.identity().private_seed;
    assert!(proof.verified);
    assert_eq!(proof.chain_length, 5);

    let details = proof.verification.clone().unwrap();
    assert_eq!(details.name, "Ada");
    assert_eq!(details.entries_transferred, 3);
    assert_eq!(details.trust_level, TrustLevel::Government);
    assert_eq!(details.verified_at, verification.entry.timestamp);
    assert!(proof.verify(&seed).unwrap());

    let mut forged = proof;
    forged.chain_length = 500;
    assert!(!forged.verify(&seed).unwrap());
}

#[test]
fn test_identity_persists_across_instances() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let public_id = {
        let charter = open_dir(&dir);
        let identity = charter.create_identity(Some("ada"))?;
        charter.append("note", json!({"text": "first"}))?;
        identity.public_id
    };

    let charter = open_dir(&dir);
    let identity = charter.load_identity()?.expect("identity on disk");
    assert_eq!(identity.public_id, public_id);
    assert_eq!(identity.contributions, 1);

    let entry = charter.append("note", json!({"text": "second"}))?;
    assert_eq!(entry.index, 2);

    let chain = charter.read_chain()?;
    assert_eq!(chain[0].event, IDENTITY_CREATED_EVENT);
    assert!(charter.verify_integrity()?.intact);
    assert!(charter.validate_chain()?.is_valid());
    assert!(matches!(
        charter.create_identity(None),
        Err(CharterError::IdentityExists(_))
    ));
    Ok(())
}

#[test]
fn test_sqlite_backend() {
    let store = SqliteStore::open_memory().unwrap();
    let identities = charter::store::MemoryStore::new();
    let charter = Charter::new(store, identities);

    charter.create_identity(Some("ada")).unwrap();
    charter.append("note", json!({})).unwrap();
    let verification = charter
        .verify_identity("Ada", "ada@example.com", VerificationMethod::Email, None)
        .unwrap();
    assert_eq!(verification.prior_entries, 2);
    assert_eq!(charter.read_tail(2).unwrap()[1].event, IDENTITY_VERIFIED_EVENT);
    assert!(charter.verify_integrity().unwrap().intact);
}

#[test]
fn test_verification_survives_concurrent_appends() {
    for _ in 0..20 {
        let store = MemoryStore::new();
        let charter = Arc::new(Charter::new(store.clone(), store));
        charter.create_identity(None).unwrap();

        let writers: Vec<_> = (0..3)
            .map(|t| {
                let charter = Arc::clone(&charter);
                thread::spawn(move || {
                    for i in 0..5 {
                        charter.append("work", json!({"thread": t, "i": i})).unwrap();
                    }
                })
            })
            .collect();
        charter
            .verify_identity("Ada Lovelace", "ada@example.com", VerificationMethod::Email, None)
            .unwrap();
        for writer in writers {
            writer.join().unwrap();
        }

        let identity = charter.load_identity().unwrap().unwrap();
        let real = identity.real_identity.expect("verification was lost");
        assert_eq!(real.email, "ada@example.com");

        let chain = charter.read_chain().unwrap();
        assert_eq!(chain.len(), 17);
        assert_eq!(identity.contributions, chain.last().unwrap().index);
    }
}

#[test]
fn test_concurrent_verifications_bind_once() {
    let store = MemoryStore::new();
    let charter = Arc::new(Charter::new(store.clone(), store));
    charter.create_identity(None).unwrap();

    let attempts: Vec<_> = ["a@example.com", "b@example.com", "c@example.com"]
        .into_iter()
        .map(|email| {
            let charter = Arc::clone(&charter);
            thread::spawn(move || {
                charter.verify_identity("Ada", email, VerificationMethod::Email, None)
            })
        })
        .collect();
    let results: Vec<_> = attempts.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, CharterError::AlreadyVerified { .. })));

    let transfers = charter
        .read_chain()
        .unwrap()
        .into_iter()
        .filter(|e| e.event == IDENTITY_VERIFIED_EVENT)
        .count();
    assert_eq!(transfers, 1);
}
