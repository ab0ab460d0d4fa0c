//! Release manager
//!
//! Turns a [`Release`] into a stored artifact. The first request for a
//! release builds the zip (archiving a local source, copying an uploaded
//! archive, or downloading an external dist), validates it, and moves it into
//! storage. Later requests find the file and do nothing.
//!
//! Concurrent first builds of the same artifact inside one process are
//! serialized by a per-path lock, dropped again once no build holds it.
//! Across processes the final rename is
//! last-write-wins; both writers produce the same content.

use super::archiver;
use super::validator::{self, ArtifactValidator};
use super::{Release, ReleaseSource};
use crate::error::{Error, Result};
use crate::external::ComposerClient;
use crate::package::Package;
use crate::storage::{ChecksumAlgorithm, DownloadResponse, Storage};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::UNIX_EPOCH;
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub struct ReleaseManager {
    storage: Arc<dyn Storage>,
    client: Arc<dyn ComposerClient>,
    validators: Vec<Box<dyn ArtifactValidator>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ReleaseManager {
    pub fn new(storage: Arc<dyn Storage>, client: Arc<dyn ComposerClient>) -> Self {
        Self::with_validators(storage, client, validator::default_validators())
    }

    pub fn with_validators(
        storage: Arc<dyn Storage>,
        client: Arc<dyn ComposerClient>,
        validators: Vec<Box<dyn ArtifactValidator>>,
    ) -> Self {
        Self {
            storage,
            client,
            validators,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    fn lock_for(&self, file: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(file.to_string()).or_default())
    }

    /// Give back a build lock, forgetting it once nobody else holds it.
    fn release_lock(&self, file: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        drop(lock);
        if locks.get(file).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(file);
        }
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn exists(&self, release: &Release) -> bool {
        self.storage.exists(release.file())
    }

    /// Make sure the release's artifact is in storage.
    pub fn store(&self, package: &Package, release: &Release) -> Result<Release> {
        if release.version().is_empty() || !package.has_release(release.version()) {
            return Err(Error::invalid_release(package.slug(), release.version()));
        }

        let lock = self.lock_for(release.file());
        let stored = {
            let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
            self.store_locked(package, release)
        };
        self.release_lock(release.file(), lock);
        stored
    }

    fn store_locked(&self, package: &Package, release: &Release) -> Result<Release> {
        if self.storage.exists(release.file()) {
            debug!(file = release.file(), "artifact already stored");
            return Ok(release.clone());
        }

        let temp = NamedTempFile::new().map_err(|e| {
            Error::FileOperationFailed(format!("Failed to create temporary artifact: {}", e))
        })?;
        self.build_artifact(package, release, temp.path())?;

        for validator in &self.validators {
            validator.validate(temp.path(), release)?;
        }

        // On failure the temp file is removed when `temp` drops
        self.storage.move_file(temp.path(), release.file())?;
        info!(
            slug = package.slug(),
            version = release.version(),
            source = release.source().kind(),
            file = release.file(),
            "stored release artifact"
        );
        Ok(release.clone())
    }

    fn build_artifact(&self, package: &Package, release: &Release, dest: &Path) -> Result<()> {
        let slug = package.slug();
        let version = release.version();

        match release.source() {
            ReleaseSource::Local { path } => {
                if !path.exists() {
                    return Err(Error::invalid_source(
                        slug,
                        version,
                        format!("source {} does not exist", path.display()),
                    ));
                }
                archiver::archive_source(path, slug, dest)
            }
            ReleaseSource::LocalArchive { path } => {
                if !path.is_file() {
                    return Err(Error::invalid_source(
                        slug,
                        version,
                        format!("archive {} does not exist", path.display()),
                    ));
                }
                archiver::repack_to_zip(path, dest)
            }
            ReleaseSource::External { dist } => {
                if dist.url.is_empty() {
                    return Err(Error::invalid_source(
                        slug,
                        version,
                        "external release has no dist URL",
                    ));
                }
                let download = NamedTempFile::new().map_err(|e| {
                    Error::FileOperationFailed(format!(
                        "Failed to create temporary download: {}",
                        e
                    ))
                })?;
                self.client.download(dist, download.path())?;
                archiver::repack_to_zip(download.path(), dest)
            }
            // Nothing to build from: the stored file was the only copy
            ReleaseSource::Stored => Err(Error::missing_release(slug, version)),
        }
    }

    /// Stream a stored artifact. No validation happens here.
    pub fn send(&self, package: &Package, release: &Release) -> Result<DownloadResponse> {
        if !self.storage.exists(release.file()) {
            return Err(Error::missing_release(package.slug(), release.version()));
        }
        self.storage.send(release.file())
    }

    /// SHA-1 of the stored artifact, as Composer expects for `dist.shasum`.
    pub fn checksum(&self, release: &Release) -> Result<String> {
        self.storage.checksum(ChecksumAlgorithm::Sha1, release.file())
    }

    /// Modification time of the stored artifact as Unix seconds.
    pub fn artifact_mtime(&self, release: &Release) -> Option<u64> {
        self.storage
            .modified(release.file())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
    }

    /// Remove every stored artifact of a package.
    pub fn delete_package(&self, package: &Package) -> Result<()> {
        info!(slug = package.slug(), "deleting stored artifacts");
        self.storage.delete(package.slug())
    }

    pub fn delete_release(&self, package: &Package, release: &Release) -> Result<()> {
        info!(slug = package.slug(), version = release.version(), "deleting stored artifact");
        self.storage.delete(release.file())
    }

    /// Versions with an artifact in storage for `slug`.
    pub fn cached_versions(&self, slug: &str) -> Result<Vec<String>> {
        Ok(self
            .storage
            .list_files(slug)?
            .iter()
            .filter_map(|file| super::parse_artifact_path(slug, file).map(str::to_string))
            .collect())
    }
}
