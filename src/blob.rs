//! Wire-format codec for encrypted blobs: `"version:base64(ciphertext)"`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("invalid blob format")]
    InvalidFormat,

    #[error("invalid blob version")]
    InvalidVersion,

    #[error("invalid blob base64")]
    InvalidBase64(#[source] base64::DecodeError),
}

/// A parsed wire blob: a version number and opaque ciphertext bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub version: u64,
    pub ciphertext: Vec<u8>,
}

/// Parse `"V:B"` where `V` is a decimal non-negative integer (no sign, no
/// leading zeros beyond a bare "0", no whitespace) and `B` is standard
/// base64 with padding. Splits on the first and only `:`; any other count of
/// `:` is `InvalidFormat`.
pub fn parse(s: &str) -> Result<Blob, BlobError> {
    let mut parts = s.splitn(2, ':');
    let version_part = parts.next().ok_or(BlobError::InvalidFormat)?;
    let base64_part = parts.next().ok_or(BlobError::InvalidFormat)?;
    if base64_part.contains(':') {
        return Err(BlobError::InvalidFormat);
    }

    let version = parse_version(version_part)?;
    let ciphertext = BASE64_STANDARD
        .decode(base64_part)
        .map_err(BlobError::InvalidBase64)?;

    Ok(Blob { version, ciphertext })
}

fn parse_version(s: &str) -> Result<u64, BlobError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BlobError::InvalidVersion);
    }
    if s.len() > 1 && s.starts_with('0') {
        return Err(BlobError::InvalidVersion);
    }
    s.parse::<u64>().map_err(|_| BlobError::InvalidVersion)
}

/// Serialize a blob back into its canonical wire form.
pub fn serialize(blob: &Blob) -> String {
    format!(
        "{}:{}",
        blob.version,
        BASE64_STANDARD.encode(&blob.ciphertext)
    )
}
