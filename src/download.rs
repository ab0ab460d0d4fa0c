//! Release downloads
//!
//! Resolves `{identifier}/{version}` to a stored artifact. The identifier is
//! a package slug or the hashid of a managed post id; the version is a
//! release version or `latest`. The artifact is built on first request.

use crate::context::{Capability, RequestContext};
use crate::error::{Error, Result};
use crate::hashid::HashId;
use crate::package::Package;
use crate::release::{Release, ReleaseManager};
use crate::repository::{Criteria, PackageRepository};
use crate::storage::DownloadResponse;
use crate::version;
use std::sync::Arc;
use tracing::info;

pub struct DownloadService {
    repository: Arc<dyn PackageRepository>,
    releases: Arc<ReleaseManager>,
    hashid: HashId,
}

impl DownloadService {
    pub fn new(
        repository: Arc<dyn PackageRepository>,
        releases: Arc<ReleaseManager>,
        hashid: HashId,
    ) -> Self {
        Self {
            repository,
            releases,
            hashid,
        }
    }

    /// Every package named by a slug, or by the hashid of its managed post id.
    ///
    /// Several sources may provide the same slug (an installed plugin and its
    /// managed upload, say); all of them are returned in repository order.
    pub fn find_packages(&self, identifier: &str) -> Result<Vec<Package>> {
        let by_slug = self.repository.matching(&Criteria::new().slug(identifier))?;
        if !by_slug.is_empty() {
            return Ok(by_slug);
        }

        if let Some(id) = self.hashid.decode(identifier) {
            let by_id = self
                .repository
                .matching(&Criteria::new().managed_post_id(id))?;
            if !by_id.is_empty() {
                return Ok(by_id);
            }
        }

        Err(Error::PackageNotFound(identifier.to_string()))
    }

    /// Pick the package and release serving `version` among the candidates.
    ///
    /// An exact version goes to the first candidate that has it; `latest` is
    /// the highest release across all candidates.
    fn select<'a>(
        candidates: &'a [Package],
        identifier: &str,
        version: &str,
    ) -> Result<(&'a Package, &'a Release)> {
        let found = if version == "latest" {
            candidates
                .iter()
                .filter_map(|p| p.get_latest_release().ok().map(|r| (p, r)))
                .max_by(|(_, a), (_, b)| version::compare(a.version(), b.version()))
        } else {
            candidates
                .iter()
                .find_map(|p| p.get_release(version).ok().map(|r| (p, r)))
        };
        found.ok_or_else(|| Error::invalid_release(identifier, version))
    }

    pub fn download(
        &self,
        context: &RequestContext,
        identifier: &str,
        version: &str,
    ) -> Result<DownloadResponse> {
        let candidates = self.find_packages(identifier)?;
        let (package, release) = Self::select(&candidates, identifier, version)?;

        if !context.can_for(Capability::DownloadPackages, package, Some(release)) {
            return Err(Error::forbidden(
                context.user(),
                Capability::DownloadPackages.as_str(),
                format!("{} {}", package.slug(), release.version()),
            ));
        }

        let stored = self.releases.store(package, release)?;
        info!(
            slug = package.slug(),
            version = stored.version(),
            user = ?context.user(),
            "serving release"
        );
        self.releases.send(package, &stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticCapabilities;
    use crate::external::{ComposerClient, ExternalRelease};
    use crate::package::{PackageBuilder, PackageType, SourceType};
    use crate::release::{Dist, ReleaseSource};
    use crate::repository::StaticRepository;
    use crate::storage::LocalStorage;
    use std::path::Path;
    use tempfile::TempDir;

    struct NoClient;

    impl ComposerClient for NoClient {
        fn fetch_releases(&self, _url: &str, _name: &str) -> Result<Vec<ExternalRelease>> {
            Ok(Vec::new())
        }

        fn download(&self, _dist: &Dist, _dest: &Path) -> Result<()> {
            Err(Error::Network("offline".into()))
        }
    }

    fn service(temp: &TempDir) -> DownloadService {
        let source = temp.path().join("acme");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("acme.php"), "<?php // Acme").unwrap();

        let mut builder = PackageBuilder::new(PackageType::Plugin, SourceType::LocalManual);
        builder
            .set_slug("acme")
            .set_managed_post_id(42)
            .add_release("1.0.0", ReleaseSource::Local { path: source.clone() })
            .add_release("1.1.0", ReleaseSource::Local { path: source });

        DownloadService::new(
            Arc::new(StaticRepository::new(vec![builder.build().unwrap()])),
            Arc::new(ReleaseManager::new(
                Arc::new(LocalStorage::new(temp.path().join("storage"))),
                Arc::new(NoClient),
            )),
            HashId::new("salt"),
        )
    }

    #[test]
    fn test_download_latest_by_slug() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let response = service
            .download(&RequestContext::administrator(), "acme", "latest")
            .unwrap();
        assert!(response.filename.starts_with("acme-1.1.0-"));
        assert!(response.path.is_file());
    }

    #[test]
    fn test_download_by_hashid() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let id = HashId::new("salt").encode(42);
        let response = service
            .download(&RequestContext::administrator(), &id, "1.0.0")
            .unwrap();
        assert!(response.filename.starts_with("acme-1.0.0-"));
    }

    #[test]
    fn test_unknown_package_and_version() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let admin = RequestContext::administrator();

        let err = service.download(&admin, "nope", "latest").unwrap_err();
        assert!(matches!(err, Error::PackageNotFound(_)));

        let err = service.download(&admin, "acme", "9.0.0").unwrap_err();
        assert!(matches!(err, Error::InvalidReleaseVersion { .. }));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_shared_slug_serves_every_source() {
        let temp = TempDir::new().unwrap();
        let installed_dir = temp.path().join("plugins/acme");
        std::fs::create_dir_all(&installed_dir).unwrap();
        std::fs::write(installed_dir.join("acme.php"), "<?php // installed").unwrap();
        let upload_dir = temp.path().join("upload/acme");
        std::fs::create_dir_all(&upload_dir).unwrap();
        std::fs::write(upload_dir.join("acme.php"), "<?php // managed").unwrap();

        let mut installed = PackageBuilder::new(PackageType::Plugin, SourceType::LocalPlugin);
        installed
            .set_slug("acme")
            .add_release("1.4.2", ReleaseSource::Local { path: installed_dir });
        let mut managed = PackageBuilder::new(PackageType::Plugin, SourceType::LocalManual);
        managed
            .set_slug("acme")
            .set_managed_post_id(5)
            .add_release("1.5.0", ReleaseSource::Local { path: upload_dir });

        let service = DownloadService::new(
            Arc::new(StaticRepository::new(vec![
                installed.build().unwrap(),
                managed.build().unwrap(),
            ])),
            Arc::new(ReleaseManager::new(
                Arc::new(LocalStorage::new(temp.path().join("storage"))),
                Arc::new(NoClient),
            )),
            HashId::new("salt"),
        );
        let admin = RequestContext::administrator();

        assert_eq!(service.find_packages("acme").unwrap().len(), 2);
        let managed = service.download(&admin, "acme", "1.5.0").unwrap();
        assert!(managed.filename.starts_with("acme-1.5.0-"));
        let installed = service.download(&admin, "acme", "1.4.2").unwrap();
        assert!(installed.filename.starts_with("acme-1.4.2-"));
        let latest = service.download(&admin, "acme", "latest").unwrap();
        assert_eq!(latest.path, managed.path);

        let err = service.download(&admin, "acme", "2.0.0").unwrap_err();
        assert!(matches!(err, Error::InvalidReleaseVersion { .. }));
    }

    #[test]
    fn test_download_requires_capability() {
        let temp = TempDir::new().unwrap();
        let service = service(&temp);
        let viewer = RequestContext::new(
            Some(7),
            Arc::new(StaticCapabilities::new().grant(7, Capability::ViewPackages)),
        );

        let err = service.download(&viewer, "acme", "1.0.0").unwrap_err();
        assert_eq!(err.status_code(), 403);
        let message = err.to_string();
        assert!(message.contains('7'));
        assert!(message.contains("acme 1.0.0"));
    }
}
