//! On-disk cache of external package metadata
//!
//! Location: `{cache_dir}/{source_type}/{vendor}~{name}.json`

use super::ExternalRelease;
use crate::error::{Error, Result};
use crate::package::SourceType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedMetadata {
    /// Unix timestamp of the fetch
    pub fetched_at: u64,
    pub releases: Vec<ExternalRelease>,
}

#[derive(Debug, Clone)]
pub struct MetadataCache {
    dir: PathBuf,
    ttl: Duration,
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl MetadataCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, source_type: SourceType, package_name: &str) -> PathBuf {
        self.dir
            .join(source_type.as_str())
            .join(format!("{}.json", package_name.replace('/', "~")))
    }

    /// Cached entry, fresh or not. Unreadable entries count as missing.
    pub fn get(&self, source_type: SourceType, package_name: &str) -> Option<CachedMetadata> {
        let path = self.entry_path(source_type, package_name);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %e,
                    "ignoring corrupt metadata cache entry"
                );
                None
            }
        }
    }

    pub fn is_fresh(&self, entry: &CachedMetadata) -> bool {
        now().saturating_sub(entry.fetched_at) < self.ttl.as_secs()
    }

    pub fn put(
        &self,
        source_type: SourceType,
        package_name: &str,
        releases: &[ExternalRelease],
    ) -> Result<()> {
        let path = self.entry_path(source_type, package_name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::FileOperationFailed(format!(
                    "Failed to create cache directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let entry = CachedMetadata {
            fetched_at: now(),
            releases: releases.to_vec(),
        };
        let json = serde_json::to_string(&entry)?;

        let staging = path.with_extension(format!("json.{}", std::process::id()));
        std::fs::write(&staging, json)
            .and_then(|_| std::fs::rename(&staging, &path))
            .map_err(|e| {
                let _ = std::fs::remove_file(&staging);
                Error::FileOperationFailed(format!(
                    "Failed to write cache entry {}: {}",
                    path.display(),
                    e
                ))
            })
    }

    /// Remove every cached entry.
    pub fn clear(&self) -> Result<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}
