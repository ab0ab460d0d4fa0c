//! Repositories backed by administrator-managed entries
//!
//! External repositories expose managed packages whose releases come from
//! another Composer repository; manual repositories expose packages whose
//! releases are uploaded zip files. Both also pick up any artifacts already
//! in storage for the package.

use super::{sorted, PackageRepository, Packages};
use crate::error::{Error, Result};
use crate::external::ExternalMetadata;
use crate::managed::{self, ManagedCriteria, ManagedPackage, ManagedPackageStore};
use crate::package::{Package, PackageBuilder, PackageKind, PackageType, SourceType};
use crate::storage::Storage;
use crate::version::{self, Constraint};
use std::sync::Arc;
use tracing::debug;

const EXTERNAL_SOURCES: &[SourceType] =
    &[SourceType::Packagist, SourceType::WPackagist, SourceType::Vcs];
const MANUAL_SOURCES: &[SourceType] = &[SourceType::LocalManual];

enum ReleaseOrigin {
    External(Arc<ExternalMetadata>),
    Manual,
}

pub struct ManagedRepository {
    name: &'static str,
    criteria: ManagedCriteria,
    origin: ReleaseOrigin,
    store: Arc<dyn ManagedPackageStore>,
    storage: Arc<dyn Storage>,
}

impl ManagedRepository {
    fn external(
        name: &'static str,
        package_type: PackageType,
        kind: PackageKind,
        store: Arc<dyn ManagedPackageStore>,
        storage: Arc<dyn Storage>,
        metadata: Arc<ExternalMetadata>,
    ) -> Self {
        Self {
            name,
            criteria: ManagedCriteria::new()
                .package_type(package_type)
                .kind(kind)
                .source_types(EXTERNAL_SOURCES),
            origin: ReleaseOrigin::External(metadata),
            store,
            storage,
        }
    }

    fn manual(
        name: &'static str,
        package_type: PackageType,
        kind: PackageKind,
        store: Arc<dyn ManagedPackageStore>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            name,
            criteria: ManagedCriteria::new()
                .package_type(package_type)
                .kind(kind)
                .source_types(MANUAL_SOURCES),
            origin: ReleaseOrigin::Manual,
            store,
            storage,
        }
    }

    pub fn external_plugins(
        store: Arc<dyn ManagedPackageStore>,
        storage: Arc<dyn Storage>,
        metadata: Arc<ExternalMetadata>,
    ) -> Self {
        Self::external(
            "external plugins",
            PackageType::Plugin,
            PackageKind::Package,
            store,
            storage,
            metadata,
        )
    }

    pub fn external_themes(
        store: Arc<dyn ManagedPackageStore>,
        storage: Arc<dyn Storage>,
        metadata: Arc<ExternalMetadata>,
    ) -> Self {
        Self::external(
            "external themes",
            PackageType::Theme,
            PackageKind::Package,
            store,
            storage,
            metadata,
        )
    }

    pub fn external_parts(
        store: Arc<dyn ManagedPackageStore>,
        storage: Arc<dyn Storage>,
        metadata: Arc<ExternalMetadata>,
    ) -> Self {
        Self::external(
            "external parts",
            PackageType::Plugin,
            PackageKind::Part,
            store,
            storage,
            metadata,
        )
    }

    pub fn external_wp_core(
        store: Arc<dyn ManagedPackageStore>,
        storage: Arc<dyn Storage>,
        metadata: Arc<ExternalMetadata>,
    ) -> Self {
        Self::external(
            "external core",
            PackageType::WpCore,
            PackageKind::Package,
            store,
            storage,
            metadata,
        )
    }

    pub fn manual_plugins(store: Arc<dyn ManagedPackageStore>, storage: Arc<dyn Storage>) -> Self {
        Self::manual("manual plugins", PackageType::Plugin, PackageKind::Package, store, storage)
    }

    pub fn manual_themes(store: Arc<dyn ManagedPackageStore>, storage: Arc<dyn Storage>) -> Self {
        Self::manual("manual themes", PackageType::Theme, PackageKind::Package, store, storage)
    }

    pub fn manual_parts(store: Arc<dyn ManagedPackageStore>, storage: Arc<dyn Storage>) -> Self {
        Self::manual("manual parts", PackageType::Plugin, PackageKind::Part, store, storage)
    }

    pub fn manual_wp_core(store: Arc<dyn ManagedPackageStore>, storage: Arc<dyn Storage>) -> Self {
        Self::manual("manual core", PackageType::WpCore, PackageKind::Package, store, storage)
    }

    fn build(&self, entry: &ManagedPackage) -> Result<Package> {
        let store = self.store.as_ref();
        let mut builder = PackageBuilder::new(entry.package_type, entry.source_type);
        builder
            .from_slug(&entry.slug)
            .from_manager(entry)
            .with_required_packages(managed::resolve_dependencies(store, &entry.required_packages))
            .with_replaced_packages(managed::resolve_dependencies(store, &entry.replaced_packages));

        match &self.origin {
            ReleaseOrigin::External(metadata) => {
                let constraint = Constraint::parse(&entry.version_range).ok_or_else(|| {
                    Error::PackageBuild(format!(
                        "{}: invalid version range '{}'",
                        entry.slug, entry.version_range
                    ))
                })?;
                let repository_url = Some(entry.repository_url.as_str()).filter(|u| !u.is_empty());
                let releases =
                    metadata.releases(entry.source_type, &entry.source_name, repository_url);

                let newest = releases
                    .iter()
                    .max_by(|a, b| version::compare(&a.version, &b.version));
                if let Some(newest) = newest {
                    builder.from_external(newest);
                }
                builder.add_external_releases(&releases, &constraint, entry.stability);
            }
            ReleaseOrigin::Manual => {
                builder.add_manual_releases(&entry.releases);
            }
        }

        builder.add_cached_releases(self.storage.as_ref())?;
        builder.build()
    }
}

impl PackageRepository for ManagedRepository {
    fn all(&self) -> Result<Packages> {
        let mut packages = Vec::new();
        for id in self.store.get_package_ids_by(&self.criteria) {
            if let Some(entry) = self.store.get_package_data(id) {
                packages.push(self.build(&entry)?);
            }
        }
        debug!(repository = self.name, count = packages.len(), "managed packages");
        Ok(sorted(packages))
    }

    fn reinitialize(&self) -> Result<()> {
        self.store.reinitialize()
    }
}
