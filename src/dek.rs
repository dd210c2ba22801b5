//! Key manager: generate DEKs, wrap them under a KEK, and unwrap DEKs on
//! demand.
//!
//! Plaintext DEK bytes are zeroized before `create_dek` returns: it returns
//! only the wrapped `DekRow`, and callers who need the key material call
//! `decrypt_dek` to unwrap it again.

use thiserror::Error;
use uuid::Uuid;

use crate::aead::{self, AeadError};
use crate::kek::Kek;
use crate::model::{Algorithm, DekRow, now_unix_seconds};
use crate::secret::SecretBytes;

#[derive(Debug, Error)]
pub enum KeyManagerError {
    #[error(transparent)]
    Aead(#[from] AeadError),
}

/// Generate a fresh 32-byte DEK, wrap it under `kek` using `alg`, and return
/// the wrapped row. The plaintext DEK bytes are zeroized (via `SecretBytes`'s
/// `Drop`) before this function returns; the caller never sees them.
pub fn create_dek(kek: &Kek, alg: Algorithm) -> Result<DekRow, KeyManagerError> {
    let dek_bytes = random_key();
    let cipher = aead::create_cipher(kek.key(), alg)?;
    let (wrapped_key, nonce) = cipher.encrypt(dek_bytes_as_slice(&dek_bytes), None)?;

    Ok(DekRow {
        id: Uuid::new_v4(),
        kek_id: kek.id(),
        algorithm: alg,
        wrapped_key,
        nonce: nonce.to_vec(),
        created_at: now_unix_seconds(),
    })
}

/// Unwrap `dek`'s key material using `kek`. Returns a freshly allocated
/// zeroize-on-drop 32-byte buffer; the caller zeroizes it (by dropping it)
/// after use.
pub fn decrypt_dek(dek: &DekRow, kek: &Kek) -> Result<SecretBytes, KeyManagerError> {
    let cipher = aead::create_cipher(kek.key(), dek.algorithm)?;
    let plaintext = cipher.decrypt(&dek.wrapped_key, &dek.nonce, None)?;
    Ok(SecretBytes::from(plaintext))
}

fn random_key() -> SecretBytes {
    use rand::RngCore;
    use rand::rngs::OsRng;

    let mut bytes = vec![0u8; aead::KEY_LEN];
    OsRng.fill_bytes(&mut bytes);
    SecretBytes::from(bytes)
}

fn dek_bytes_as_slice(bytes: &SecretBytes) -> &[u8] {
    use secrecy::ExposeSecret;
    bytes.expose_secret()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn test_kek() -> Kek {
        Kek::new(Uuid::new_v4(), Algorithm::Aes256Gcm, random_key())
    }

    #[test]
    fn wrap_unwrap_round_trips() {
        let kek = test_kek();
        let dek_row = create_dek(&kek, Algorithm::Aes256Gcm).unwrap();
        let unwrapped = decrypt_dek(&dek_row, &kek).unwrap();
        assert_eq!(unwrapped.expose_secret().len(), aead::KEY_LEN);
    }

    #[test]
    fn wrong_kek_fails_to_unwrap() {
        let kek_a = test_kek();
        let kek_b = test_kek();
        let dek_row = create_dek(&kek_a, Algorithm::ChaCha20Poly1305).unwrap();
        assert!(decrypt_dek(&dek_row, &kek_b).is_err());
    }

    #[test]
    fn two_deks_from_the_same_kek_differ() {
        let kek = test_kek();
        let a = create_dek(&kek, Algorithm::Aes256Gcm).unwrap();
        let b = create_dek(&kek, Algorithm::Aes256Gcm).unwrap();
        assert_ne!(a.wrapped_key, b.wrapped_key);
        assert_ne!(a.nonce, b.nonce);
    }
}
