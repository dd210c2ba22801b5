//! Sensitive in-memory buffers.
//!
//! `secrecy::SecretSlice` gives a non-copyable, zeroize-on-drop byte buffer;
//! this module aliases it for DEK key material and wraps it in a dedicated
//! `Plaintext` type for `Decrypt`'s return value, so the caller owns a value
//! that zeros its bytes on drop rather than a bare `Vec<u8>`.

use secrecy::{ExposeSecret, SecretSlice};

/// 32 bytes of DEK or KEK key material, zeroized on drop.
pub type SecretBytes = SecretSlice<u8>;

/// Plaintext returned by `Decrypt`.
///
/// Non-`Copy`, moves by value, zeroizes its backing buffer on drop. Callers
/// that need the bytes for longer than the immediate call should copy out of
/// `expose_secret()` into storage they are responsible for zeroizing
/// themselves.
#[derive(Debug)]
pub struct Plaintext(SecretBytes);

impl Plaintext {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(SecretBytes::from(bytes))
    }

    pub fn expose_secret(&self) -> &[u8] {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0.expose_secret().to_vec()
    }
}

impl PartialEq for Plaintext {
    fn eq(&self, other: &Self) -> bool {
        self.0.expose_secret() == other.0.expose_secret()
    }
}

impl Eq for Plaintext {}
