//! SHA-256 digests of fetched artifacts.
//!
//! Files are streamed through the hasher in bounded chunks so arbitrarily
//! large artifacts never need to fit in memory.

use crate::error::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Default read size when hashing: 32 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024 * 1024;

/// Expected length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// A hex-encoded SHA-256 digest.
///
/// Always 64 lowercase hexadecimal characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Parse a hex digest, rejecting anything that is not 64 lowercase hex
    /// characters.
    ///
    /// # Examples
    ///
    /// ```
    /// use flatpak_pip_generator::artifact::digest::Sha256Digest;
    ///
    /// assert!(Sha256Digest::parse(&"a".repeat(64)).is_some());
    /// assert!(Sha256Digest::parse("ABC").is_none());
    /// ```
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let well_formed = value.len() == DIGEST_HEX_LEN
            && value
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        well_formed.then(|| Self(value.to_owned()))
    }

    /// Return the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_hasher(hasher: Sha256) -> Self {
        Self(format!("{:x}", hasher.finalize()))
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the SHA-256 digest of a file using [`DEFAULT_CHUNK_SIZE`] reads.
///
/// # Errors
///
/// Returns [`GeneratorError::Io`](crate::error::GeneratorError::Io) if the
/// file cannot be opened or read.
pub fn compute_sha256(path: &Path) -> Result<Sha256Digest> {
    compute_sha256_with_chunk(path, DEFAULT_CHUNK_SIZE)
}

/// Compute the SHA-256 digest of a file, reading at most `chunk_size` bytes
/// at a time.
///
/// # Errors
///
/// Returns [`GeneratorError::Io`](crate::error::GeneratorError::Io) if the
/// file cannot be opened or read.
pub fn compute_sha256_with_chunk(path: &Path, chunk_size: usize) -> Result<Sha256Digest> {
    let mut file = File::open(path)?;
    let file_len = file
        .metadata()
        .map(|m| usize::try_from(m.len()).unwrap_or(usize::MAX))
        .unwrap_or(chunk_size);
    // Never allocate more than the file needs, and never a zero-length buffer.
    let mut buffer = vec![0u8; chunk_size.min(file_len).max(1)];
    let mut hasher = Sha256::new();
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(buffer.get(..bytes_read).unwrap_or_default());
    }
    Ok(Sha256Digest::from_hasher(hasher))
}

/// Compute the SHA-256 digest of an in-memory byte slice.
#[must_use]
pub fn sha256_bytes(bytes: &[u8]) -> Sha256Digest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Sha256Digest::from_hasher(hasher)
}
