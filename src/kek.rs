//! KEK chain: a process-lifetime registry of unwrapped key-encryption keys,
//! one designated active id, zeroized wholesale on shutdown.
//!
//! The chain is built once at startup and handed to the orchestrator as an
//! explicit value rather than stored in a global, so tests can construct
//! independent chains without sharing process-wide state.

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::error::TransitError;
use crate::masterkey::MasterKeyProvider;
use crate::model::{Algorithm, KekRow};
use crate::secret::SecretBytes;

/// An unwrapped key-encryption key, held only in memory.
pub struct Kek {
    id: Uuid,
    algorithm: Algorithm,
    key: SecretBytes,
}

impl Kek {
    pub fn new(id: Uuid, algorithm: Algorithm, key: SecretBytes) -> Self {
        Self { id, algorithm, key }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn key(&self) -> &SecretBytes {
        &self.key
    }
}

impl std::fmt::Debug for Kek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kek")
            .field("id", &self.id)
            .field("algorithm", &self.algorithm)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum KekChainError {
    #[error("active kek id is not registered in the chain")]
    ActiveKekMissing,
}

/// Process-lifetime registry of unwrapped KEKs. Built once at startup by
/// unwrapping persisted KEK rows via the Master-Key provider, handed
/// explicitly to the orchestrator, never stored as a global.
pub struct KekChain {
    keks: HashMap<Uuid, Kek>,
    active_kek_id: Uuid,
}

impl KekChain {
    /// Build a chain from already-unwrapped KEKs. `active_kek_id` must name
    /// one of `keks`.
    pub fn new(keks: Vec<Kek>, active_kek_id: Uuid) -> Result<Self, KekChainError> {
        let map: HashMap<Uuid, Kek> = keks.into_iter().map(|k| (k.id(), k)).collect();
        if !map.contains_key(&active_kek_id) {
            return Err(KekChainError::ActiveKekMissing);
        }
        Ok(Self {
            keks: map,
            active_kek_id,
        })
    }

    /// Look up a KEK by id. Reads are safe from any number of threads
    /// without locking since the chain is immutable after construction.
    pub fn get(&self, id: Uuid) -> Option<&Kek> {
        self.keks.get(&id)
    }

    pub fn active_kek_id(&self) -> Uuid {
        self.active_kek_id
    }

    pub fn active_kek(&self) -> &Kek {
        self.keks
            .get(&self.active_kek_id)
            .expect("active_kek_id is validated to exist at construction")
    }

    /// Overwrite every unwrapped key's in-memory bytes with zeros and clear
    /// the map. Compiler-barrier zeroization is provided transitively by
    /// `secrecy::SecretSlice`'s `Drop` impl; this is called explicitly at
    /// graceful shutdown rather than relying solely on the final `Drop` so
    /// the moment of zeroization is observable/testable.
    pub fn close(&mut self) {
        for (_, kek) in self.keks.drain() {
            drop(kek);
        }
    }
}

/// Unwraps each persisted `KekRow` via `provider` and assembles the result
/// into a `KekChain`. The only place a `KekRow` is ever turned into a live
/// `Kek`; called once at startup.
pub fn build_kek_chain(
    rows: &[KekRow],
    active_kek_id: Uuid,
    provider: &impl MasterKeyProvider,
) -> Result<KekChain, TransitError> {
    let mut keks = Vec::with_capacity(rows.len());
    for row in rows {
        let key = provider.unwrap(&row.master_key_id, &row.wrapped_key, &row.nonce)?;
        keks.push(Kek::new(row.id, row.algorithm, key));
    }
    KekChain::new(keks, active_kek_id).map_err(|_| TransitError::KekNotFound(active_kek_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kek(byte: u8) -> Kek {
        Kek::new(
            Uuid::new_v4(),
            Algorithm::Aes256Gcm,
            SecretBytes::from(vec![byte; 32]),
        )
    }

    #[test]
    fn get_returns_registered_kek() {
        let k = kek(1);
        let id = k.id();
        let chain = KekChain::new(vec![k], id).unwrap();
        assert_eq!(chain.get(id).unwrap().id(), id);
        assert_eq!(chain.active_kek_id(), id);
    }

    #[test]
    fn unknown_active_id_is_rejected() {
        let k = kek(1);
        let bogus = Uuid::new_v4();
        assert!(matches!(
            KekChain::new(vec![k], bogus),
            Err(KekChainError::ActiveKekMissing)
        ));
    }

    #[test]
    fn close_clears_the_chain() {
        let k = kek(9);
        let id = k.id();
        let mut chain = KekChain::new(vec![k], id).unwrap();
        assert!(chain.get(id).is_some());
        chain.close();
        assert!(chain.get(id).is_none());
    }

    #[test]
    fn multiple_keks_coexist_with_one_active() {
        let active = kek(1);
        let active_id = active.id();
        let other = kek(2);
        let other_id = other.id();
        let chain = KekChain::new(vec![active, other], active_id).unwrap();
        assert!(chain.get(active_id).is_some());
        assert!(chain.get(other_id).is_some());
        assert_eq!(chain.active_kek_id(), active_id);
    }

    fn row(provider: &crate::masterkey::StaticMasterKeyProvider, master_key_id: &str, byte: u8) -> KekRow {
        KekRow {
            id: Uuid::new_v4(),
            master_key_id: master_key_id.to_string(),
            algorithm: Algorithm::Aes256Gcm,
            wrapped_key: provider.wrap_for_fixture(master_key_id, &[byte; 32]),
            nonce: Vec::new(),
            version: 1,
            created_at: 0,
        }
    }

    #[test]
    fn build_kek_chain_unwraps_persisted_rows() {
        let provider = crate::masterkey::StaticMasterKeyProvider::new().with_key("mk-1", [4u8; 32]);
        let r = row(&provider, "mk-1", 9);
        let active_id = r.id;

        let chain = build_kek_chain(&[r], active_id, &provider).unwrap();
        assert_eq!(chain.active_kek_id(), active_id);

        use secrecy::ExposeSecret;
        assert_eq!(chain.active_kek().key().expose_secret(), &[9u8; 32]);
    }

    #[test]
    fn build_kek_chain_propagates_unknown_master_key_id() {
        let wrapping_provider = crate::masterkey::StaticMasterKeyProvider::new().with_key("mk-1", [4u8; 32]);
        let r = row(&wrapping_provider, "mk-1", 1);
        let active_id = r.id;

        let provider_without_key = crate::masterkey::StaticMasterKeyProvider::new();
        assert!(build_kek_chain(&[r], active_id, &provider_without_key).is_err());
    }
}
