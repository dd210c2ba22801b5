//! Public error taxonomy for the transit-encryption core.
//!
//! Each lower-level module (`blob`, `aead`, `dek`, `repository`, `masterkey`)
//! defines its own focused error enum; `TransitError` is the umbrella the
//! orchestrator surfaces. Variants that propagate a genuinely lower-level
//! cause keep it as `#[source]`/`#[from]` so the original error's type and
//! `source()` chain survive; variants naming a condition this crate detects
//! itself (`NotFound`, `KekNotFound`, `DekNotFound`) stay bare data with no
//! deeper cause to preserve.

use thiserror::Error;

use crate::aead::AeadError;
use crate::blob::BlobError;
use crate::dek::KeyManagerError;
use crate::masterkey::KmsError;
use crate::repository::RepositoryError;

/// The error kinds exposed upward.
///
/// Everything about *why* an AEAD operation failed collapses into
/// `DecryptionFailed` so no oracle is exposed to callers; `Conflict` and `Io`
/// carry the originating `RepositoryError` as their source rather than a
/// detached copy of its message.
#[derive(Debug, Error)]
pub enum TransitError {
    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Conflict(#[source] RepositoryError),

    #[error(transparent)]
    InvalidInput(#[from] BlobError),

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("kek not found: {0}")]
    KekNotFound(String),

    #[error("dek not found: {0}")]
    DekNotFound(String),

    #[error("{0}")]
    Io(#[source] RepositoryError),

    #[error(transparent)]
    KmsError(#[from] KmsError),
}

impl From<AeadError> for TransitError {
    fn from(err: AeadError) -> Self {
        match err {
            // Key-length mismatches are a programming error inside this
            // crate (keys are always freshly generated or unwrapped to the
            // right length), not a condition a caller should be able to
            // distinguish from a tampered ciphertext.
            AeadError::InvalidKey | AeadError::DecryptionFailed => TransitError::DecryptionFailed,
        }
    }
}

impl From<KeyManagerError> for TransitError {
    fn from(err: KeyManagerError) -> Self {
        match err {
            KeyManagerError::Aead(_) => TransitError::DecryptionFailed,
        }
    }
}

impl From<RepositoryError> for TransitError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => TransitError::NotFound,
            RepositoryError::Conflict(_) => TransitError::Conflict(err),
            RepositoryError::Io(_) => TransitError::Io(err),
        }
    }
}
