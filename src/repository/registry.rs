//! Application-facing repositories
//!
//! Every category repository is cached individually, then combined:
//!
//! - packages: installed plugins and themes, external and manual plugins,
//!   themes and WordPress core
//! - parts: external and manual parts

use super::{
    CachedRepository, InstalledPlugins, InstalledThemes, ManagedRepository, MultiRepository,
    PackageRepository,
};
use crate::config::SitePaths;
use crate::error::Result;
use crate::external::ExternalMetadata;
use crate::managed::ManagedPackageStore;
use crate::storage::Storage;
use std::path::PathBuf;
use std::sync::Arc;

fn cached<R: PackageRepository + 'static>(repository: R) -> Arc<dyn PackageRepository> {
    Arc::new(CachedRepository::new(repository))
}

/// Installed plugin/theme locations
#[derive(Debug, Clone)]
pub struct InstalledDirs {
    pub plugins_dir: PathBuf,
    pub mu_plugins_dir: Option<PathBuf>,
    pub themes_dir: PathBuf,
}

#[derive(Clone)]
pub struct Repositories {
    packages: MultiRepository,
    parts: MultiRepository,
}

impl Repositories {
    /// Repositories for a site's configured directories.
    pub fn from_config(
        paths: &SitePaths,
        store: Arc<dyn ManagedPackageStore>,
        storage: Arc<dyn Storage>,
        metadata: Arc<ExternalMetadata>,
    ) -> Self {
        let dirs = InstalledDirs {
            plugins_dir: paths.plugins_dir.clone(),
            mu_plugins_dir: paths.mu_plugins_dir.clone(),
            themes_dir: paths.themes_dir.clone(),
        };
        Self::new(&dirs, store, storage, metadata)
    }

    pub fn new(
        dirs: &InstalledDirs,
        store: Arc<dyn ManagedPackageStore>,
        storage: Arc<dyn Storage>,
        metadata: Arc<ExternalMetadata>,
    ) -> Self {
        let packages = MultiRepository::new(vec![
            cached(InstalledPlugins::new(
                &dirs.plugins_dir,
                dirs.mu_plugins_dir.clone(),
                Arc::clone(&storage),
                Arc::clone(&store),
            )),
            cached(InstalledThemes::new(
                &dirs.themes_dir,
                Arc::clone(&storage),
                Arc::clone(&store),
            )),
            cached(ManagedRepository::external_plugins(
                Arc::clone(&store),
                Arc::clone(&storage),
                Arc::clone(&metadata),
            )),
            cached(ManagedRepository::external_themes(
                Arc::clone(&store),
                Arc::clone(&storage),
                Arc::clone(&metadata),
            )),
            cached(ManagedRepository::external_wp_core(
                Arc::clone(&store),
                Arc::clone(&storage),
                Arc::clone(&metadata),
            )),
            cached(ManagedRepository::manual_plugins(Arc::clone(&store), Arc::clone(&storage))),
            cached(ManagedRepository::manual_themes(Arc::clone(&store), Arc::clone(&storage))),
            cached(ManagedRepository::manual_wp_core(Arc::clone(&store), Arc::clone(&storage))),
        ]);

        let parts = MultiRepository::new(vec![
            cached(ManagedRepository::external_parts(
                Arc::clone(&store),
                Arc::clone(&storage),
                metadata,
            )),
            cached(ManagedRepository::manual_parts(store, storage)),
        ]);

        Self { packages, parts }
    }

    /// Everything except parts
    pub fn packages(&self) -> &MultiRepository {
        &self.packages
    }

    pub fn parts(&self) -> &MultiRepository {
        &self.parts
    }

    /// Packages and parts together
    pub fn everything(&self) -> MultiRepository {
        MultiRepository::new(vec![
            Arc::new(self.packages.clone()) as Arc<dyn PackageRepository>,
            Arc::new(self.parts.clone()),
        ])
    }

    pub fn reinitialize(&self) -> Result<()> {
        self.packages.reinitialize()?;
        self.parts.reinitialize()
    }
}
