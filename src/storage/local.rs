//! Filesystem-backed storage rooted at a single directory

use super::{ChecksumAlgorithm, DownloadResponse, Storage};
use crate::error::{Error, Result};
use crate::hash;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a storage-relative path, refusing anything that escapes the root.
    fn resolve(&self, file: &str) -> Result<PathBuf> {
        let relative = Path::new(file.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(Error::FileOperationFailed(format!(
                "Path outside storage: {}",
                file
            )));
        }
        Ok(self.root.join(relative))
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::FileOperationFailed(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Sibling temp name unique to this process and thread
    fn staging_path(dest: &Path) -> PathBuf {
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let unique_id = format!("{}.{:?}", std::process::id(), std::thread::current().id())
            .replace(['(', ')'], "");
        dest.with_file_name(format!(".{}.{}.tmp", name, unique_id))
    }
}

impl Storage for LocalStorage {
    fn exists(&self, file: &str) -> bool {
        self.resolve(file).map(|p| p.is_file()).unwrap_or(false)
    }

    fn checksum(&self, algorithm: ChecksumAlgorithm, file: &str) -> Result<String> {
        let path = self.resolve(file)?;
        match algorithm {
            ChecksumAlgorithm::Sha1 => hash::sha1_file(&path),
            ChecksumAlgorithm::Sha256 => hash::sha256_file(&path),
        }
    }

    fn move_file(&self, source: &Path, destination: &str) -> Result<()> {
        let dest = self.resolve(destination)?;
        Self::ensure_parent(&dest)?;

        if std::fs::rename(source, &dest).is_ok() {
            return Ok(());
        }

        // Different filesystem: copy next to the destination, then rename
        let staging = Self::staging_path(&dest);
        let result = std::fs::copy(source, &staging)
            .and_then(|_| std::fs::rename(&staging, &dest));
        if let Err(e) = result {
            let _ = std::fs::remove_file(&staging);
            return Err(Error::FileOperationFailed(format!(
                "Failed to move {} to {}: {}",
                source.display(),
                dest.display(),
                e
            )));
        }
        let _ = std::fs::remove_file(source);
        Ok(())
    }

    fn write(&self, file: &str, contents: &[u8]) -> Result<()> {
        let dest = self.resolve(file)?;
        Self::ensure_parent(&dest)?;
        let staging = Self::staging_path(&dest);
        let result =
            std::fs::write(&staging, contents).and_then(|_| std::fs::rename(&staging, &dest));
        if let Err(e) = result {
            let _ = std::fs::remove_file(&staging);
            return Err(Error::FileOperationFailed(format!(
                "Failed to write {}: {}",
                dest.display(),
                e
            )));
        }
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        let result = if target.is_dir() {
            std::fs::remove_dir_all(&target)
        } else if target.exists() {
            std::fs::remove_file(&target)
        } else {
            return Ok(());
        };
        result.map_err(|e| {
            Error::FileOperationFailed(format!("Failed to delete {}: {}", target.display(), e))
        })
    }

    fn list_files(&self, directory: &str) -> Result<Vec<String>> {
        let dir = self.resolve(directory)?;
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        let prefix = directory.trim_matches('/');
        let mut files: Vec<String> = entries
            .flatten()
            .filter(|e| e.path().is_file())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| !name.starts_with('.'))
            .map(|name| {
                if prefix.is_empty() {
                    name
                } else {
                    format!("{}/{}", prefix, name)
                }
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn send(&self, file: &str) -> Result<DownloadResponse> {
        let path = self.resolve(file)?;
        let metadata = std::fs::metadata(&path).map_err(|e| {
            Error::FileOperationFailed(format!("Cannot send {}: {}", path.display(), e))
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = if filename.ends_with(".zip") {
            "application/zip"
        } else if filename.ends_with(".json") {
            "application/json"
        } else {
            "application/octet-stream"
        };
        Ok(DownloadResponse {
            path,
            filename,
            content_type,
            content_length: metadata.len(),
        })
    }

    fn get_absolute_path(&self, file: &str) -> PathBuf {
        self.root.join(file.trim_start_matches('/'))
    }

    fn modified(&self, file: &str) -> Result<SystemTime> {
        let path = self.resolve(file)?;
        Ok(std::fs::metadata(path)?.modified()?)
    }
}
