//! SHA hashing utilities
//!
//! SHA-256 names artifacts and provider files; SHA-1 is what Composer
//! expects for `dist.shasum` and `includes` hashes.

use crate::error::{Error, Result};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Compute SHA256 hash of a string
pub fn sha256_string(content: &str) -> String {
    sha256_bytes(content.as_bytes())
}

pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

pub fn sha1_bytes(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Compute SHA256 hash of a file's contents
pub fn sha256_file(path: &Path) -> Result<String> {
    hash_file::<Sha256>(path)
}

/// Compute SHA1 hash of a file's contents
pub fn sha1_file(path: &Path) -> Result<String> {
    hash_file::<Sha1>(path)
}

fn hash_file<D: Digest + std::io::Write>(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path).map_err(|e| {
        Error::FileOperationFailed(format!(
            "Failed to read file for hashing {}: {}",
            path.display(),
            e
        ))
    })?;
    let mut hasher = D::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}
