//! Data model types shared across the transit-encryption core.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// AEAD algorithm selector. Both variants are AEAD with 96-bit nonces,
/// 128-bit tags, and 256-bit keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    Aes256Gcm,
    ChaCha20Poly1305,
}

impl Algorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Aes256Gcm => "aes-gcm-256",
            Algorithm::ChaCha20Poly1305 => "chacha20-poly1305",
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unix timestamp (seconds).
pub fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A KEK row as persisted by the environment's master-key-backed store.
/// The unwrapped key itself never appears here; it lives only inside
/// `KekChain` (`src/kek.rs`).
#[derive(Debug, Clone)]
pub struct KekRow {
    pub id: Uuid,
    pub master_key_id: String,
    pub algorithm: Algorithm,
    pub wrapped_key: Vec<u8>,
    pub nonce: Vec<u8>,
    pub version: u64,
    pub created_at: u64,
}

/// A DEK row. `wrapped_key` includes the AEAD authentication tag.
#[derive(Debug, Clone)]
pub struct DekRow {
    pub id: Uuid,
    pub kek_id: Uuid,
    pub algorithm: Algorithm,
    pub wrapped_key: Vec<u8>,
    pub nonce: Vec<u8>,
    pub created_at: u64,
}

/// A transit key version. Append-only except for `deleted_at`.
#[derive(Debug, Clone)]
pub struct TransitKeyRow {
    pub id: Uuid,
    pub name: String,
    pub version: u64,
    pub dek_id: Uuid,
    pub created_at: u64,
    pub deleted_at: Option<u64>,
}

impl TransitKeyRow {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Maximum length of a transit key name. Enforced by the request-validation
/// layer above the orchestrator, not re-checked here; kept alongside the
/// data model it describes.
pub const MAX_NAME_LEN: usize = 255;

/// The result of `Encrypt` or `Decrypt`: wire ciphertext on the way out,
/// recovered plaintext on the way back.
#[derive(Debug)]
pub struct EncryptedBlob {
    pub version: u64,
    pub ciphertext: Option<Vec<u8>>,
    pub plaintext: Option<crate::secret::Plaintext>,
}
