//! Master-Key provider contract: the boundary between this crate and an
//! external KMS that holds the root key.
//!
//! The real adapter is an opaque bridge into the environment's KMS and lives
//! outside this crate; what belongs here is the trait it must satisfy plus a
//! deterministic in-memory stand-in for tests and the demo binary.

use std::collections::HashMap;

use thiserror::Error;
use zeroize::Zeroize;

use crate::secret::SecretBytes;

#[derive(Debug, Error)]
#[error("kms error: {0}")]
pub struct KmsError(pub String);

/// Unwraps a persisted, wrapped KEK into its plaintext 32 bytes. Called only
/// at startup, once per persisted KEK row.
pub trait MasterKeyProvider {
    fn unwrap(
        &self,
        master_key_id: &str,
        wrapped_kek_bytes: &[u8],
        nonce: &[u8],
    ) -> Result<SecretBytes, KmsError>;
}

/// A deterministic, in-process stand-in for a real KMS, used by tests and
/// the demo binary. Holds a fixed map of `master_key_id -> key bytes` and
/// "unwraps" by XOR-ing the wrapped bytes with that key — good enough to
/// exercise the startup unwrap path without a real KMS dependency, and never
/// used as a security boundary.
pub struct StaticMasterKeyProvider {
    keys: HashMap<String, [u8; 32]>,
}

impl StaticMasterKeyProvider {
    pub fn new() -> Self {
        Self {
            keys: HashMap::new(),
        }
    }

    pub fn with_key(mut self, master_key_id: impl Into<String>, key: [u8; 32]) -> Self {
        self.keys.insert(master_key_id.into(), key);
        self
    }

    /// Wrap `kek_bytes` the same (reversible XOR) way `unwrap` expects, for
    /// constructing fixture KEK rows in tests.
    pub fn wrap_for_fixture(&self, master_key_id: &str, kek_bytes: &[u8; 32]) -> Vec<u8> {
        let key = self.keys.get(master_key_id).expect("fixture key registered");
        xor(kek_bytes, key)
    }
}

impl Default for StaticMasterKeyProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MasterKeyProvider for StaticMasterKeyProvider {
    fn unwrap(
        &self,
        master_key_id: &str,
        wrapped_kek_bytes: &[u8],
        _nonce: &[u8],
    ) -> Result<SecretBytes, KmsError> {
        let key = self
            .keys
            .get(master_key_id)
            .ok_or_else(|| KmsError(format!("unknown master key id {master_key_id:?}")))?;
        if wrapped_kek_bytes.len() != 32 {
            return Err(KmsError("wrapped kek must be 32 bytes".into()));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(wrapped_kek_bytes);
        let mut unwrapped = xor(&bytes, key);
        let secret = SecretBytes::from(unwrapped.to_vec());
        // The stack temporary above is copied into `secret`'s zeroize-on-drop
        // buffer; overwrite it too rather than leaving plaintext key bytes to
        // linger until the stack frame is reused.
        unwrapped.zeroize();
        Ok(secret)
    }
}

fn xor(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for i in 0..32 {
        out[i] = a[i] ^ b[i];
    }
    out
}
