//! Composer repository document
//!
//! Builds `{"packages": {name: {version: data}}}` from a package repository.
//! Packages without releases are skipped, as are non-public packages unless
//! the viewer can manage options.
//!
//! `require` is merged in increasing priority:
//!
//! 1. the release's own requires
//! 2. the package's managed required packages
//! 3. the installer dependency for the package type
//! 4. registered require extensions, in registration order
//!
//! `replace` follows the same order without step 3.

use super::package::ComposerPackageTransformer;
use crate::context::{Capability, RequestContext};
use crate::error::Result;
use crate::managed::ManagedPackageStore;
use crate::package::{Author, Package, PackageType};
use crate::release::{Dist, Release, ReleaseManager};
use crate::repository::PackageRepository;
use crate::version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const WP_CORE_INSTALLER: (&str, &str) = ("roots/wordpress-core-installer", "^1.0 || ^2.0");
const COMPOSER_INSTALLERS: (&str, &str) = ("composer/installers", "^1.0 || ^2.0");

/// Late override of a version's `require` or `replace` map
pub type DependencyExtension =
    Box<dyn Fn(&Package, &Release, &mut BTreeMap<String, String>) + Send + Sync>;

/// One version of one package as Composer sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionData {
    pub name: String,
    pub version: String,
    pub version_normalized: String,
    pub dist: Dist,
    #[serde(default)]
    pub require: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub replace: BTreeMap<String, String>,
    #[serde(rename = "type")]
    pub package_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub homepage: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub license: String,
}

/// `{"packages": {name: {version: data}}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposerRepository {
    pub packages: BTreeMap<String, BTreeMap<String, VersionData>>,
}

impl ComposerRepository {
    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    pub fn version_count(&self) -> usize {
        self.packages.values().map(BTreeMap::len).sum()
    }
}

pub struct ComposerRepositoryTransformer {
    packages: ComposerPackageTransformer,
    store: Arc<dyn ManagedPackageStore>,
    releases: Option<Arc<ReleaseManager>>,
    base_url: String,
    require_extensions: Vec<DependencyExtension>,
    replace_extensions: Vec<DependencyExtension>,
}

impl ComposerRepositoryTransformer {
    pub fn new(
        packages: ComposerPackageTransformer,
        store: Arc<dyn ManagedPackageStore>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            packages,
            store,
            releases: None,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            require_extensions: Vec::new(),
            replace_extensions: Vec::new(),
        }
    }

    /// Fill `dist.shasum` from artifacts already in storage.
    pub fn with_release_manager(mut self, releases: Arc<ReleaseManager>) -> Self {
        self.releases = Some(releases);
        self
    }

    pub fn add_require_extension(&mut self, extension: DependencyExtension) -> &mut Self {
        self.require_extensions.push(extension);
        self
    }

    pub fn add_replace_extension(&mut self, extension: DependencyExtension) -> &mut Self {
        self.replace_extensions.push(extension);
        self
    }

    pub fn package_transformer(&self) -> &ComposerPackageTransformer {
        &self.packages
    }

    fn is_public(&self, package: &Package) -> bool {
        package
            .managed_post_id()
            .is_some_and(|id| self.store.is_package_public(id))
    }

    pub fn transform(
        &self,
        repository: &dyn PackageRepository,
        context: &RequestContext,
    ) -> Result<ComposerRepository> {
        let show_private = context.can(Capability::ManageOptions);
        let mut output = ComposerRepository::default();

        for package in repository.all()?.iter() {
            if !package.has_releases() {
                debug!(slug = package.slug(), "skipping package without releases");
                continue;
            }
            if !show_private && !self.is_public(package) {
                debug!(slug = package.slug(), "skipping non-public package");
                continue;
            }

            let transformed = self.packages.transform(package);
            let versions = output.packages.entry(transformed.name().to_string()).or_default();
            for release in transformed.releases() {
                // Same package from several sources: the first source listed wins
                versions
                    .entry(release.version().to_string())
                    .or_insert_with(|| self.version_data(&transformed, release));
            }
        }

        Ok(output)
    }

    fn dist(&self, package: &Package, release: &Release) -> Dist {
        let mut dist = Dist::zip(format!(
            "{}/dist/{}/{}",
            self.base_url,
            package.slug(),
            release.version()
        ));
        if let Some(releases) = &self.releases {
            if releases.exists(release) {
                dist.shasum = releases.checksum(release).ok();
                dist.artifactmtime = releases.artifact_mtime(release).map(|t| t.to_string());
            }
        }
        dist
    }

    fn require(&self, package: &Package, release: &Release) -> BTreeMap<String, String> {
        let mut require = release.meta().require.clone();
        require.extend(self.packages.transform_dependency_packages(package.required_packages()));

        let (name, range) = match package.package_type() {
            PackageType::WpCore => WP_CORE_INSTALLER,
            _ => COMPOSER_INSTALLERS,
        };
        require.insert(name.to_string(), range.to_string());

        for extension in &self.require_extensions {
            extension(package, release, &mut require);
        }
        require
    }

    fn replace(&self, package: &Package, release: &Release) -> BTreeMap<String, String> {
        let mut replace = release.meta().replace.clone();
        replace.extend(self.packages.transform_dependency_packages(package.replaced_packages()));
        for extension in &self.replace_extensions {
            extension(package, release, &mut replace);
        }
        replace
    }

    fn version_data(&self, package: &Package, release: &Release) -> VersionData {
        let meta = release.meta();
        let version = release.version().to_string();

        VersionData {
            name: package.name().to_string(),
            version_normalized: version::normalize(&version).unwrap_or_else(|| version.clone()),
            version,
            dist: self.dist(package, release).for_wire(),
            require: self.require(package, release),
            replace: self.replace(package, release),
            package_type: package.package_type().composer_type().to_string(),
            authors: if meta.authors.is_empty() {
                package.authors().to_vec()
            } else {
                meta.authors.clone()
            },
            description: meta
                .description
                .clone()
                .unwrap_or_else(|| package.description().to_string()),
            keywords: if meta.keywords.is_empty() {
                package.keywords().to_vec()
            } else {
                meta.keywords.clone()
            },
            homepage: package.homepage().to_string(),
            license: meta.license.clone().unwrap_or_else(|| package.license().to_string()),
        }
    }
}
