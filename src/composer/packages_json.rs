//! packages.json and the files it points at
//!
//! Layout under the output directory:
//!
//! ```text
//! packages.json
//! include/all$<sha1>.json            includes format
//! p/<vendor>/<name>$<sha256>.json    providers format, one per package
//! p/provider-all$<sha256>.json       providers format, provider index
//! p2/<vendor>/<name>.json            Composer 2, stable versions
//! p2/<vendor>/<name>~dev.json        Composer 2, dev versions
//! ```
//!
//! Content-hashed files are never rewritten in place. Each build writes new
//! ones and prunes the oldest beyond the configured history size.

use super::repository::{ComposerRepository, VersionData};
use crate::config::IndexFormat;
use crate::error::{Error, Result};
use crate::hash;
use crate::version::{self, Stability};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const WRITE_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// What a build produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub root: PathBuf,
    pub packages: usize,
    pub versions: usize,
    pub files_written: usize,
    pub files_pruned: usize,
}

pub struct PackagesJsonWriter {
    dir: PathBuf,
    format: IndexFormat,
    history_size: usize,
    available_package_patterns: Vec<String>,
}

impl PackagesJsonWriter {
    pub fn new(dir: impl Into<PathBuf>, format: IndexFormat, history_size: usize) -> Self {
        Self {
            dir: dir.into(),
            format,
            history_size: history_size.max(1),
            available_package_patterns: Vec::new(),
        }
    }

    pub fn with_available_package_patterns(mut self, patterns: Vec<String>) -> Self {
        self.available_package_patterns = patterns;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write every file for `repository` and return what was done.
    pub fn write(&self, repository: &ComposerRepository) -> Result<WriteSummary> {
        let mut summary = WriteSummary {
            root: self.dir.join("packages.json"),
            packages: repository.packages.len(),
            versions: repository.version_count(),
            ..WriteSummary::default()
        };

        let mut root = Map::new();
        root.insert("packages".into(), json!({}));

        match self.format {
            IndexFormat::Includes => {
                let content = to_json(&json!({ "packages": repository.packages }))?;
                let sha1 = hash::sha1_bytes(&content);
                let relative = format!("include/all${}.json", sha1);
                self.write_file(&relative, &content)?;
                summary.files_written += 1;
                summary.files_pruned += self.prune(&self.dir.join("include"), "all$", &relative)?;

                root.insert("includes".into(), json!({ relative: { "sha1": sha1 } }));
            }
            IndexFormat::Providers => {
                let mut providers = BTreeMap::new();
                for (name, versions) in &repository.packages {
                    let content = to_json(&json!({ "packages": { name.as_str(): versions } }))?;
                    let sha256 = hash::sha256_bytes(&content);
                    let relative = format!("p/{}${}.json", name, sha256);
                    self.write_file(&relative, &content)?;
                    summary.files_written += 1;

                    let file_name = format!("{}$", package_file_stem(name));
                    let dir = self.dir.join("p").join(vendor_of(name));
                    summary.files_pruned += self.prune(&dir, &file_name, &relative)?;
                    providers.insert(name.clone(), json!({ "sha256": sha256 }));
                }

                let content = to_json(&json!({ "providers": providers }))?;
                let sha256 = hash::sha256_bytes(&content);
                let relative = format!("p/provider-all${}.json", sha256);
                self.write_file(&relative, &content)?;
                summary.files_written += 1;
                summary.files_pruned +=
                    self.prune(&self.dir.join("p"), "provider-all$", &relative)?;

                root.insert("providers-url".into(), json!("p/%package%$%hash%.json"));
                root.insert(
                    "provider-includes".into(),
                    json!({ "p/provider-all$%hash%.json": { "sha256": sha256 } }),
                );
            }
        }

        summary.files_written += self.write_metadata(repository)?;

        root.insert("metadata-url".into(), json!("p2/%package%.json"));
        if self.available_package_patterns.is_empty() {
            let names: Vec<&str> = repository.names().collect();
            root.insert("available-packages".into(), json!(names));
        } else {
            root.insert(
                "available-package-patterns".into(),
                json!(self.available_package_patterns),
            );
        }

        self.write_file("packages.json", &to_json(&Value::Object(root))?)?;
        summary.files_written += 1;

        info!(
            dir = %self.dir.display(),
            packages = summary.packages,
            versions = summary.versions,
            pruned = summary.files_pruned,
            "wrote packages.json"
        );
        Ok(summary)
    }

    /// Composer 2 metadata, split into stable and dev files per package.
    fn write_metadata(&self, repository: &ComposerRepository) -> Result<usize> {
        let mut written = 0;
        for (name, versions) in &repository.packages {
            let (dev, stable): (Vec<&VersionData>, Vec<&VersionData>) = versions
                .values()
                .partition(|data| version::stability_of(&data.version) == Stability::Dev);

            for (suffix, mut list) in [("", stable), ("~dev", dev)] {
                // Newest first, the order Composer's own repositories use
                list.sort_by(|a, b| version::compare(&b.version, &a.version));
                let content = to_json(&json!({ "packages": { name.as_str(): list } }))?;
                self.write_file(&format!("p2/{}{}.json", name, suffix), &content)?;
                written += 1;
            }
        }
        Ok(written)
    }

    fn write_file(&self, relative: &str, content: &[u8]) -> Result<()> {
        let path = self.dir.join(relative);
        let mut attempt = 1;
        loop {
            match write_atomic(&path, content) {
                Ok(()) => {
                    debug!(path = %path.display(), "wrote file");
                    return Ok(());
                }
                Err(e) if attempt < WRITE_ATTEMPTS => {
                    warn!(path = %path.display(), attempt, error = %e, "write failed, retrying");
                    thread::sleep(RETRY_BACKOFF * 2u32.pow(attempt - 1));
                    attempt += 1;
                }
                Err(e) => {
                    return Err(Error::FileOperationFailed(format!(
                        "Failed to write {} after {} attempts: {}",
                        path.display(),
                        WRITE_ATTEMPTS,
                        e
                    )))
                }
            }
        }
    }

    /// Delete the oldest `{prefix}*.json` files in `dir` beyond the history
    /// size. `current` is always kept.
    fn prune(&self, dir: &Path, prefix: &str, current: &str) -> Result<usize> {
        let current = self.dir.join(current);
        let Ok(entries) = fs::read_dir(dir) else {
            return Ok(0);
        };

        let mut candidates: Vec<(std::time::SystemTime, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && *path != current
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(prefix) && n.ends_with(".json"))
            })
            .filter_map(|path| {
                let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
                Some((modified, path))
            })
            .collect();

        // Newest first; the current file counts against the history
        candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        let keep = self.history_size.saturating_sub(1);

        let mut pruned = 0;
        for (_, path) in candidates.into_iter().skip(keep) {
            fs::remove_file(&path).map_err(|e| {
                Error::FileOperationFailed(format!("Failed to prune {}: {}", path.display(), e))
            })?;
            debug!(path = %path.display(), "pruned old include file");
            pruned += 1;
        }
        Ok(pruned)
    }
}

fn to_json(value: &Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn vendor_of(name: &str) -> &str {
    name.split_once('/').map_or("", |(vendor, _)| vendor)
}

fn package_file_stem(name: &str) -> &str {
    name.rsplit_once('/').map_or(name, |(_, stem)| stem)
}

/// Write through a sibling temp file and rename into place.
fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));
    fs::write(&staging, content)?;
    fs::rename(&staging, path).map_err(|e| {
        let _ = fs::remove_file(&staging);
        e
    })
}
