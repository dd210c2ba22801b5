//! The orchestrator: wires the KEK chain, DEK manager, and repositories
//! together into `Create`/`Rotate`/`Delete`/`List`/`Encrypt`/`Decrypt`.
//!
//! Each operation follows the same shape — load, mutate, persist, return —
//! against named, versioned transit keys over the repository/transaction
//! seams built in `src/repository.rs` and `src/transaction.rs`.

use uuid::Uuid;

use crate::aead;
use crate::blob::{self, Blob};
use crate::config::TransitConfig;
use crate::dek;
use crate::error::TransitError;
use crate::kek::KekChain;
use crate::model::{Algorithm, EncryptedBlob, TransitKeyRow, now_unix_seconds};
use crate::repository::{DekRepository, RepositoryError, TransitKeyRepository};
use crate::secret::Plaintext;
use crate::transaction::{InMemoryStore, OperationContext, with_tx};

/// Wires a concrete repository pair, a KEK chain, a backing store, and the
/// service's tunables together. Holds no mutable state of its own beyond
/// what the store and KEK chain already own.
pub struct Orchestrator<R> {
    repos: R,
    kek_chain: KekChain,
    store: InMemoryStore,
    config: TransitConfig,
}

impl<R> Orchestrator<R>
where
    R: TransitKeyRepository + DekRepository,
{
    pub fn new(repos: R, kek_chain: KekChain, store: InMemoryStore, config: TransitConfig) -> Self {
        Self {
            repos,
            kek_chain,
            store,
            config,
        }
    }

    pub fn kek_chain(&self) -> &KekChain {
        &self.kek_chain
    }

    pub fn config(&self) -> &TransitConfig {
        &self.config
    }

    fn ctx(&self) -> OperationContext<'_> {
        OperationContext::autocommit(&self.store)
    }

    /// Fails `Conflict` if version 1 of `name` already exists; otherwise
    /// creates a fresh DEK under the active KEK and persists version 1.
    pub fn create(&self, name: &str, alg: Algorithm) -> Result<TransitKeyRow, TransitError> {
        let mut ctx = self.ctx();
        with_tx(&mut ctx, |ctx| self.create_in_tx(ctx, name, alg))
    }

    fn create_in_tx(
        &self,
        ctx: &mut OperationContext<'_>,
        name: &str,
        alg: Algorithm,
    ) -> Result<TransitKeyRow, TransitError> {
        match self.repos.get_by_name_and_version(ctx, name, 1) {
            Ok(_) => {
                return Err(RepositoryError::Conflict(format!(
                    "transit key {name:?} already exists"
                ))
                .into());
            }
            Err(RepositoryError::NotFound) => {}
            Err(other) => return Err(other.into()),
        }

        self.create_version(ctx, name, alg, 1)
    }

    /// Delegates to `Create` if no version of `name` exists yet; otherwise
    /// persists `current.version + 1`, retrying on a `(name, version)`
    /// conflict raised by a concurrent rotation.
    pub fn rotate(&self, name: &str, alg: Algorithm) -> Result<TransitKeyRow, TransitError> {
        let max_attempts = self.config.rotate_max_attempts.max(1);
        let mut ctx = self.ctx();
        with_tx(&mut ctx, |ctx| {
            let current = match self.repos.get_by_name(ctx, name) {
                Ok(row) => row,
                Err(RepositoryError::NotFound) => return self.create_in_tx(ctx, name, alg),
                Err(other) => return Err(other.into()),
            };

            let mut next_version = current.version + 1;
            for attempt in 0..max_attempts {
                match self.create_version(ctx, name, alg, next_version) {
                    Ok(row) => return Ok(row),
                    Err(TransitError::Conflict(_)) if attempt + 1 < max_attempts => {
                        let current = self.repos.get_by_name(ctx, name)?;
                        next_version = current.version + 1;
                    }
                    Err(err) => return Err(err),
                }
            }
            unreachable!("loop always returns within max_attempts attempts")
        })
    }

    fn create_version(
        &self,
        ctx: &mut OperationContext<'_>,
        name: &str,
        alg: Algorithm,
        version: u64,
    ) -> Result<TransitKeyRow, TransitError> {
        let active_kek = self.kek_chain.active_kek();
        let dek_row = dek::create_dek(active_kek, alg)?;
        DekRepository::create(&self.repos, ctx, dek_row.clone())?;

        let row = TransitKeyRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            version,
            dek_id: dek_row.id,
            created_at: now_unix_seconds(),
            deleted_at: None,
        };
        match TransitKeyRepository::create(&self.repos, ctx, row.clone()) {
            Ok(()) => Ok(row),
            Err(err) => Err(err.into()),
        }
    }

    /// Idempotent soft-delete of a single version; other versions and the
    /// referenced DEK are untouched.
    pub fn delete(&self, id: Uuid) -> Result<(), TransitError> {
        let mut ctx = self.ctx();
        with_tx(&mut ctx, |ctx| {
            self.repos.delete(ctx, id).map_err(TransitError::from)
        })
    }

    /// One row per name (its latest non-deleted version), ordered by name
    /// ascending.
    pub fn list(&self, offset: u64, limit: u64) -> Result<Vec<TransitKeyRow>, TransitError> {
        let mut ctx = self.ctx();
        self.repos.list(&mut ctx, offset, limit).map_err(Into::into)
    }

    /// [`Self::list`] using the service-configured default page size, for
    /// callers that don't pin an explicit limit.
    pub fn list_default(&self, offset: u64) -> Result<Vec<TransitKeyRow>, TransitError> {
        self.list(offset, self.config.list_page_size)
    }

    /// Encrypts under the latest version of `name`. The 12-byte nonce is
    /// prepended to the AEAD output in the returned ciphertext; the wire
    /// blob carries no separate nonce field.
    pub fn encrypt(&self, name: &str, plaintext: &[u8]) -> Result<EncryptedBlob, TransitError> {
        let mut ctx = self.ctx();
        let tk = self.repos.get_by_name(&mut ctx, name)?;
        let dek_row = self.repos.get(&mut ctx, tk.dek_id)?;
        let kek = self
            .kek_chain
            .get(dek_row.kek_id)
            .ok_or_else(|| TransitError::KekNotFound(dek_row.kek_id.to_string()))?;

        let dek_bytes = dek::decrypt_dek(&dek_row, kek)?;
        let cipher = aead::create_cipher(&dek_bytes, dek_row.algorithm)?;
        drop(dek_bytes);

        let (ct, nonce) = cipher.encrypt(plaintext, None)?;
        let mut wire_ciphertext = Vec::with_capacity(nonce.len() + ct.len());
        wire_ciphertext.extend_from_slice(&nonce);
        wire_ciphertext.extend_from_slice(&ct);

        Ok(EncryptedBlob {
            version: tk.version,
            ciphertext: Some(wire_ciphertext),
            plaintext: None,
        })
    }

    /// Convenience over [`Self::encrypt`] returning the canonical
    /// `"version:base64(nonce‖ct)"` wire string directly.
    pub fn encrypt_to_wire(&self, name: &str, plaintext: &[u8]) -> Result<String, TransitError> {
        let encrypted = self.encrypt(name, plaintext)?;
        let ciphertext = encrypted
            .ciphertext
            .expect("encrypt() always populates ciphertext");
        Ok(blob::serialize(&Blob {
            version: encrypted.version,
            ciphertext,
        }))
    }

    /// Looks up the exact version named in the parsed blob, never the
    /// latest. Fails `DecryptionFailed` without distinguishing a too-short
    /// ciphertext from an authentication failure.
    pub fn decrypt(&self, name: &str, wire: &str) -> Result<EncryptedBlob, TransitError> {
        let parsed = blob::parse(wire)?;
        let mut ctx = self.ctx();
        let tk = self
            .repos
            .get_by_name_and_version(&mut ctx, name, parsed.version)?;
        let dek_row = self.repos.get(&mut ctx, tk.dek_id)?;
        let kek = self
            .kek_chain
            .get(dek_row.kek_id)
            .ok_or_else(|| TransitError::KekNotFound(dek_row.kek_id.to_string()))?;

        let dek_bytes = dek::decrypt_dek(&dek_row, kek)?;
        let cipher = aead::create_cipher(&dek_bytes, dek_row.algorithm)?;
        drop(dek_bytes);

        if parsed.ciphertext.len() < aead::NONCE_LEN {
            return Err(TransitError::DecryptionFailed);
        }
        let (nonce, body) = parsed.ciphertext.split_at(aead::NONCE_LEN);
        let plaintext = cipher.decrypt(body, nonce, None)?;

        Ok(EncryptedBlob {
            version: parsed.version,
            ciphertext: None,
            plaintext: Some(Plaintext::new(plaintext)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kek::build_kek_chain;
    use crate::masterkey::StaticMasterKeyProvider;
    use crate::model::KekRow;
    use crate::repository::InMemoryRepositories;

    fn orchestrator() -> Orchestrator<InMemoryRepositories> {
        let provider = StaticMasterKeyProvider::new().with_key("mk-1", [1u8; 32]);
        let row = KekRow {
            id: Uuid::new_v4(),
            master_key_id: "mk-1".to_string(),
            algorithm: Algorithm::Aes256Gcm,
            wrapped_key: provider.wrap_for_fixture("mk-1", &[2u8; 32]),
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
    fn round_trip() {
        let orch = orchestrator();
        orch.create("k", Algorithm::Aes256Gcm).unwrap();
        let wire = orch.encrypt_to_wire("k", b"hello").unwrap();
        assert!(wire.starts_with("1:"));
        let decrypted = orch.decrypt("k", &wire).unwrap();
        assert_eq!(decrypted.plaintext.unwrap().expose_secret(), b"hello");
    }

    #[test]
    fn rotate_and_decrypt_old() {
        let orch = orchestrator();
        orch.create("k", Algorithm::Aes256Gcm).unwrap();
        let b1 = orch.encrypt_to_wire("k", b"a").unwrap();
        orch.rotate("k", Algorithm::Aes256Gcm).unwrap();
        let b2 = orch.encrypt_to_wire("k", b"b").unwrap();
        assert!(b2.starts_with("2:"));

        assert_eq!(orch.decrypt("k", &b1).unwrap().plaintext.unwrap().expose_secret(), b"a");
        assert_eq!(orch.decrypt("k", &b2).unwrap().plaintext.unwrap().expose_secret(), b"b");
    }

    #[test]
    fn rotate_without_existing_creates_version_one() {
        let orch = orchestrator();
        let tk = orch.rotate("fresh", Algorithm::Aes256Gcm).unwrap();
        assert_eq!(tk.version, 1);
    }

    #[test]
    fn create_duplicate_is_conflict() {
        let orch = orchestrator();
        orch.create("k", Algorithm::Aes256Gcm).unwrap();
        assert!(matches!(
            orch.create("k", Algorithm::Aes256Gcm),
            Err(TransitError::Conflict(_))
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_without_detail() {
        let orch = orchestrator();
        orch.create("k", Algorithm::Aes256Gcm).unwrap();
        let wire = orch.encrypt_to_wire("k", b"payload").unwrap();

        let parsed = blob::parse(&wire).unwrap();
        let mut tampered = parsed.ciphertext.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        let tampered_wire = blob::serialize(&Blob {
            version: parsed.version,
            ciphertext: tampered,
        });

        assert!(matches!(
            orch.decrypt("k", &tampered_wire),
            Err(TransitError::DecryptionFailed)
        ));
    }

    #[test]
    fn wrong_name_fails_to_decrypt() {
        let orch = orchestrator();
        orch.create("k1", Algorithm::Aes256Gcm).unwrap();
        orch.create("k2", Algorithm::ChaCha20Poly1305).unwrap();
        let wire = orch.encrypt_to_wire("k1", b"payload").unwrap();
        assert!(orch.decrypt("k2", &wire).is_err());
    }

    #[test]
    fn invalid_blob_variants() {
        let orch = orchestrator();
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
    fn soft_deleted_version_is_not_found_on_decrypt_but_falls_back_on_get() {
        let orch = orchestrator();
        orch.create("k", Algorithm::Aes256Gcm).unwrap();
        let v2 = orch.rotate("k", Algorithm::Aes256Gcm).unwrap();
        let wire_v2 = orch.encrypt_to_wire("k", b"b").unwrap();

        orch.delete(v2.id).unwrap();

        assert!(matches!(
            orch.decrypt("k", &wire_v2),
            Err(TransitError::NotFound)
        ));

        let mut ctx = orch.ctx();
        let latest = orch.repos.get_by_name(&mut ctx, "k").unwrap();
        assert_eq!(latest.version, 1);
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let orch = orchestrator();
        orch.create("k", Algorithm::Aes256Gcm).unwrap();
        let wire = orch.encrypt_to_wire("k", b"").unwrap();
        let decrypted = orch.decrypt("k", &wire).unwrap();
        assert!(decrypted.plaintext.unwrap().is_empty());
    }

    #[test]
    fn list_returns_latest_non_deleted_version_per_name() {
        let orch = orchestrator();
        orch.create("alpha", Algorithm::Aes256Gcm).unwrap();
        orch.create("bravo", Algorithm::Aes256Gcm).unwrap();
        orch.rotate("alpha", Algorithm::Aes256Gcm).unwrap();

        let page = orch.list(0, 10).unwrap();
        let alpha = page.iter().find(|r| r.name == "alpha").unwrap();
        assert_eq!(alpha.version, 2);
    }
}
