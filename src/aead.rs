//! AEAD provider: construct a cipher for a 256-bit key and one of the two
//! supported algorithms, encrypt/decrypt with a random 96-bit nonce.

use aes_gcm::Aes256Gcm;
use chacha20poly1305::ChaCha20Poly1305;
use chacha20poly1305::aead::{Aead as _, KeyInit, Payload};
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;

use crate::model::Algorithm;
use crate::secret::SecretBytes;

/// Size (bytes) of a DEK/KEK key for either supported algorithm.
pub const KEY_LEN: usize = 32;
/// Size (bytes) of the random nonce used by either supported algorithm.
pub const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum AeadError {
    #[error("invalid key length")]
    InvalidKey,

    /// Deliberately undifferentiated: authentication-tag mismatch, wrong
    /// nonce, wrong key, and corrupted ciphertext all collapse to this one
    /// variant so no padding-oracle-style probe can learn which condition
    /// triggered it.
    #[error("decryption failed")]
    DecryptionFailed,
}

enum Inner {
    Aes256Gcm(Aes256Gcm),
    ChaCha20Poly1305(ChaCha20Poly1305),
}

/// A constructed AEAD cipher bound to one key and algorithm.
pub struct Cipher {
    inner: Inner,
}

/// Construct a cipher for `key` (must be exactly [`KEY_LEN`] bytes) under
/// `alg`. Never logs or returns the key.
pub fn create_cipher(key: &SecretBytes, alg: Algorithm) -> Result<Cipher, AeadError> {
    use secrecy::ExposeSecret;

    let key_bytes = key.expose_secret();
    if key_bytes.len() != KEY_LEN {
        return Err(AeadError::InvalidKey);
    }

    let inner = match alg {
        Algorithm::Aes256Gcm => Inner::Aes256Gcm(
            Aes256Gcm::new_from_slice(key_bytes).map_err(|_| AeadError::InvalidKey)?,
        ),
        Algorithm::ChaCha20Poly1305 => Inner::ChaCha20Poly1305(
            ChaCha20Poly1305::new_from_slice(key_bytes).map_err(|_| AeadError::InvalidKey)?,
        ),
    };
    Ok(Cipher { inner })
}

impl Cipher {
    pub fn nonce_size(&self) -> usize {
        NONCE_LEN
    }

    /// Encrypt `plaintext` under a fresh, cryptographically random 96-bit
    /// nonce. Returns `(ciphertext_with_tag, nonce)`.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<(Vec<u8>, [u8; NONCE_LEN]), AeadError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let aad = associated_data.unwrap_or(&[]);
        let payload = Payload {
            msg: plaintext,
            aad,
        };

        let ciphertext = match &self.inner {
            Inner::Aes256Gcm(cipher) => cipher
                .encrypt(aes_gcm::Nonce::from_slice(&nonce), payload)
                .map_err(|_| AeadError::DecryptionFailed)?,
            Inner::ChaCha20Poly1305(cipher) => cipher
                .encrypt(chacha20poly1305::Nonce::from_slice(&nonce), payload)
                .map_err(|_| AeadError::DecryptionFailed)?,
        };

        Ok((ciphertext, nonce))
    }

    /// Decrypt `ciphertext_with_tag` using the given `nonce`. Fails with the
    /// single undifferentiated [`AeadError::DecryptionFailed`] on any
    /// authentication failure.
    pub fn decrypt(
        &self,
        ciphertext_with_tag: &[u8],
        nonce: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, AeadError> {
        if nonce.len() != NONCE_LEN {
            return Err(AeadError::DecryptionFailed);
        }

        let aad = associated_data.unwrap_or(&[]);
        let payload = Payload {
            msg: ciphertext_with_tag,
            aad,
        };

        match &self.inner {
            Inner::Aes256Gcm(cipher) => cipher
                .decrypt(aes_gcm::Nonce::from_slice(nonce), payload)
                .map_err(|_| AeadError::DecryptionFailed),
            Inner::ChaCha20Poly1305(cipher) => cipher
                .decrypt(chacha20poly1305::Nonce::from_slice(nonce), payload)
                .map_err(|_| AeadError::DecryptionFailed),
        }
    }
}
