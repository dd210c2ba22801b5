//! End-to-end scenarios against the public orchestrator API: create, rotate,
//! encrypt/decrypt round trips, and their failure modes.

use secrecy::ExposeSecret;
use transit_core::config::TransitConfig;
use transit_core::kek::build_kek_chain;
use transit_core::masterkey::StaticMasterKeyProvider;
use transit_core::model::{Algorithm, KekRow, now_unix_seconds};
use transit_core::orchestrator::Orchestrator;
use transit_core::repository::InMemoryRepositories;
use transit_core::transaction::InMemoryStore;
use transit_core::TransitError;
use uuid::Uuid;

fn test_orchestrator() -> Orchestrator<InMemoryRepositories> {
    let provider = StaticMasterKeyProvider::new().with_key("mk-test", [3u8; 32]);
    let row = KekRow {
        id: Uuid::new_v4(),
        master_key_id: "mk-test".to_string(),
        algorithm: Algorithm::Aes256Gcm,
        wrapped_key: provider.wrap_for_fixture("mk-test", &[5u8; 32]),
        nonce: Vec::new(),
        version: 1,
        created_at: now_unix_seconds(),
    };
    let active_kek_id = row.id;
    let chain = build_kek_chain(&[row], active_kek_id, &provider).unwrap();
    Orchestrator::new(
        InMemoryRepositories,
        chain,
        InMemoryStore::new(),
        TransitConfig::default(),
    )
}

#[test]
fn scenario_round_trip() {
    let orch = test_orchestrator();
    orch.create("k", Algorithm::Aes256Gcm).unwrap();
    let wire = orch.encrypt_to_wire("k", b"hello").unwrap();
    assert!(wire.starts_with("1:"));
    let decrypted = orch.decrypt("k", &wire).unwrap();
    assert_eq!(decrypted.plaintext.unwrap().expose_secret(), b"hello");
}

#[test]
fn scenario_rotate_and_decrypt_old() {
    let orch = test_orchestrator();
    orch.create("k", Algorithm::Aes256Gcm).unwrap();
    let b1 = orch.encrypt_to_wire("k", b"a").unwrap();
    orch.rotate("k", Algorithm::Aes256Gcm).unwrap();
    let b2 = orch.encrypt_to_wire("k", b"b").unwrap();
    assert!(b2.starts_with("2:"));

    assert_eq!(orch.decrypt("k", &b1).unwrap().plaintext.unwrap().expose_secret(), b"a");
    assert_eq!(orch.decrypt("k", &b2).unwrap().plaintext.unwrap().expose_secret(), b"b");
}

#[test]
fn scenario_tampered_ciphertext() {
    let orch = test_orchestrator();
    orch.create("k", Algorithm::Aes256Gcm).unwrap();
    let wire = orch.encrypt_to_wire("k", b"payload").unwrap();

    let parsed = transit_core::blob::parse(&wire).unwrap();
    let mut tampered = parsed.ciphertext.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x01;
    let tampered_wire = transit_core::blob::serialize(&transit_core::blob::Blob {
        version: parsed.version,
        ciphertext: tampered,
    });

    assert!(matches!(
        orch.decrypt("k", &tampered_wire),
        Err(TransitError::DecryptionFailed)
    ));
}

#[test]
fn scenario_wrong_name() {
    let orch = test_orchestrator();
    orch.create("k1", Algorithm::Aes256Gcm).unwrap();
    orch.create("k2", Algorithm::Aes256Gcm).unwrap();
    let wire = orch.encrypt_to_wire("k1", b"payload").unwrap();
    assert!(orch.decrypt("k2", &wire).is_err());
}

#[test]
fn scenario_invalid_blob() {
    let orch = test_orchestrator();
    orch.create("k", Algorithm::Aes256Gcm).unwrap();

    assert!(matches!(
        orch.decrypt("k", "not-a-blob"),
        Err(TransitError::InvalidInput(_))
    ));
    assert!(matches!(
        orch.decrypt("k", "abc:!!!"),
        Err(TransitError::InvalidInput(_))
    ));
    assert!(matches!(
        orch.decrypt("k", "x:SGk="),
        Err(TransitError::InvalidInput(_))
    ));
}

#[test]
fn scenario_soft_deleted_version() {
    let orch = test_orchestrator();
    orch.create("k", Algorithm::Aes256Gcm).unwrap();
    let v2 = orch.rotate("k", Algorithm::Aes256Gcm).unwrap();
    let blob_v2 = orch.encrypt_to_wire("k", b"b").unwrap();

    orch.delete(v2.id).unwrap();

    assert!(matches!(
        orch.decrypt("k", &blob_v2),
        Err(TransitError::NotFound)
    ));

    let page = orch.list(0, 10).unwrap();
    let k = page.iter().find(|r| r.name == "k").unwrap();
    assert_eq!(k.version, 1);
}

#[test]
fn create_duplicate_name_is_conflict() {
    let orch = test_orchestrator();
    orch.create("k", Algorithm::Aes256Gcm).unwrap();
    assert!(matches!(
        orch.create("k", Algorithm::Aes256Gcm),
        Err(TransitError::Conflict(_))
    ));
}

#[test]
fn list_paginates_by_name_ascending() {
    let orch = test_orchestrator();
    for name in ["charlie", "alpha", "bravo"] {
        orch.create(name, Algorithm::Aes256Gcm).unwrap();
    }

    let page = orch.list(0, 2).unwrap();
    assert_eq!(
        page.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
        vec!["alpha", "bravo"]
    );
}
