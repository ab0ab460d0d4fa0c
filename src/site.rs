//! A site and everything built from its records.toml
//!
//! [`Site`] owns the collaborators every command needs: storage, the managed
//! package store, the external metadata cache, the repositories and the
//! release manager. Transformers and writers are created on demand from the
//! configuration.

use crate::composer::{
    ComposerPackageTransformer, ComposerRepositoryTransformer, CompositionBuilder,
    PackagesJsonWriter,
};
use crate::config::{self, root, Config, SitePaths};
use crate::download::DownloadService;
use crate::error::{Error, Result};
use crate::external::{ComposerClient, ExternalMetadata, HttpComposerClient, MetadataCache};
use crate::hashid::HashId;
use crate::managed::{FileManagedStore, ManagedPackageStore};
use crate::release::ReleaseManager;
use crate::repository::{PackageRepository, Repositories};
use crate::storage::{LocalStorage, Storage};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How external metadata may be fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkMode {
    #[default]
    Online,
    /// Serve only what the metadata cache already holds
    Offline,
}

pub struct Site {
    config: Config,
    paths: SitePaths,
    storage: Arc<dyn Storage>,
    store: Arc<dyn ManagedPackageStore>,
    metadata: Arc<ExternalMetadata>,
    repositories: Repositories,
    releases: Arc<ReleaseManager>,
}

impl Site {
    /// Open the site rooted at `root`. A missing records.toml means defaults.
    pub fn open(root: &Path, mode: NetworkMode) -> Result<Self> {
        let config = config::load_config(root)?.unwrap_or_default();
        let client: Arc<dyn ComposerClient> = Arc::new(HttpComposerClient::new()?);
        Self::with_client(root, config, client, mode)
    }

    /// Open the site containing the current directory.
    pub fn find(mode: NetworkMode) -> Result<Self> {
        let root = root::find_site_root_from_cwd()?.ok_or_else(|| {
            Error::Config(format!(
                "No {} found in this directory or any parent. Run 'records init' first.",
                config::CONFIG_FILE
            ))
        })?;
        Self::open(&root, mode)
    }

    /// Build a site from explicit parts.
    pub fn with_client(
        root: &Path,
        config: Config,
        client: Arc<dyn ComposerClient>,
        mode: NetworkMode,
    ) -> Result<Self> {
        let paths = config.paths(root);
        debug!(root = %paths.root.display(), "opening site");

        let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(&paths.storage_root));
        let store: Arc<dyn ManagedPackageStore> =
            Arc::new(FileManagedStore::open(&paths.managed_file)?);

        let cache = MetadataCache::new(
            paths.cache_dir.join("metadata"),
            Duration::from_secs(config.storage.metadata_ttl),
        );
        let mut metadata = ExternalMetadata::new(cache, Arc::clone(&client));
        if mode == NetworkMode::Offline {
            metadata = metadata.offline();
        }
        let metadata = Arc::new(metadata);

        let repositories = Repositories::from_config(
            &paths,
            Arc::clone(&store),
            Arc::clone(&storage),
            Arc::clone(&metadata),
        );
        let releases = Arc::new(ReleaseManager::new(Arc::clone(&storage), client));

        Ok(Self {
            config,
            paths,
            storage,
            store,
            metadata,
            repositories,
            releases,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn paths(&self) -> &SitePaths {
        &self.paths
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn store(&self) -> &Arc<dyn ManagedPackageStore> {
        &self.store
    }

    pub fn metadata(&self) -> &Arc<ExternalMetadata> {
        &self.metadata
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repositories
    }

    pub fn releases(&self) -> &Arc<ReleaseManager> {
        &self.releases
    }

    pub fn package_transformer(&self) -> ComposerPackageTransformer {
        ComposerPackageTransformer::new(&self.config.repository.vendor)
    }

    pub fn repository_transformer(&self) -> ComposerRepositoryTransformer {
        ComposerRepositoryTransformer::new(
            self.package_transformer(),
            Arc::clone(&self.store),
            &self.config.repository.base_url,
        )
        .with_release_manager(Arc::clone(&self.releases))
    }

    pub fn packages_json_writer(&self) -> PackagesJsonWriter {
        let repository = &self.config.repository;
        PackagesJsonWriter::new(
            &self.paths.packages_path,
            repository.format,
            repository.history_size,
        )
        .with_available_package_patterns(repository.available_package_patterns.clone())
    }

    pub fn composition_builder(&self) -> Result<CompositionBuilder> {
        let base_url = &self.config.repository.base_url;
        match &self.config.composition.template {
            Some(template) => {
                let path = if template.is_absolute() {
                    template.clone()
                } else {
                    self.paths.root.join(template)
                };
                CompositionBuilder::from_template_file(&path, base_url)
            }
            None => Ok(CompositionBuilder::new(base_url)),
        }
    }

    pub fn hashid(&self) -> HashId {
        HashId::new(&self.config.repository.hashid_salt)
    }

    pub fn download_service(&self) -> DownloadService {
        let everything: Arc<dyn PackageRepository> = Arc::new(self.repositories.everything());
        DownloadService::new(everything, Arc::clone(&self.releases), self.hashid())
    }
}
