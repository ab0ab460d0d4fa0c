//! Artifact storage
//!
//! Release artifacts live under relative paths such as
//! `acme/acme-1.4.2-3f2a9c1b7d4e.zip`. The [`Storage`] trait is the only way
//! the release manager touches them.

pub mod local;

pub use local::LocalStorage;

use crate::error::Result;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Sha1,
    Sha256,
}

/// What a route layer needs to stream a stored file to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResponse {
    pub path: PathBuf,
    /// Suggested `Content-Disposition` file name
    pub filename: String,
    pub content_type: &'static str,
    pub content_length: u64,
}

pub trait Storage: Send + Sync {
    fn exists(&self, file: &str) -> bool;

    fn checksum(&self, algorithm: ChecksumAlgorithm, file: &str) -> Result<String>;

    /// Move a file from anywhere on disk into storage, replacing whatever is
    /// at `destination`. Readers never see a partially written file.
    fn move_file(&self, source: &Path, destination: &str) -> Result<()>;

    fn write(&self, file: &str, contents: &[u8]) -> Result<()>;

    /// Delete a file or a whole directory. Missing paths are not an error.
    fn delete(&self, path: &str) -> Result<()>;

    /// Files directly inside `directory`, as storage-relative paths, sorted.
    fn list_files(&self, directory: &str) -> Result<Vec<String>>;

    fn send(&self, file: &str) -> Result<DownloadResponse>;

    fn get_absolute_path(&self, file: &str) -> PathBuf;

    fn modified(&self, file: &str) -> Result<SystemTime>;
}
