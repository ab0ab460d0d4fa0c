//! Administrator-managed package entries
//!
//! A managed entry is the administrator's configuration for one package: its
//! source, visibility, overriding metadata, required and replaced packages,
//! and for manual packages the uploaded release files. Entries live in
//! `managed.json`:
//!
//! ```json
//! {
//!   "packages": [
//!     {
//!       "id": 12,
//!       "slug": "acme-widgets",
//!       "type": "plugin",
//!       "source_type": "packagist.org",
//!       "source_name": "acme/widgets",
//!       "version_range": "^2.0"
//!     }
//!   ]
//! }
//! ```

use crate::error::{Error, Result};
use crate::package::{Author, DependencyEntry, PackageKind, PackageType, SourceType, Visibility};
use crate::version::Stability;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Release file uploaded for a manual package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualRelease {
    pub version: String,
    /// Zip path; relative paths resolve against the managed file's directory
    pub file: PathBuf,
}

/// Dependency on another package, by managed entry or by Composer name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagedDependency {
    pub managed_post_id: Option<u64>,
    pub composer_package_name: Option<String>,
    pub version_range: Option<String>,
    pub stability: Stability,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagedPackage {
    pub id: u64,
    pub slug: String,
    #[serde(rename = "type")]
    pub package_type: PackageType,
    pub source_type: SourceType,
    /// Composer name on the external repository (`vendor/name`)
    pub source_name: String,
    pub kind: PackageKind,
    pub visibility: Visibility,
    pub name: String,
    pub description: String,
    pub homepage: String,
    pub authors: Vec<Author>,
    pub license: String,
    pub keywords: Vec<String>,
    pub requires_at_least: String,
    pub tested_up_to: String,
    pub requires_php: String,
    /// Constraint limiting which external versions are exposed
    pub version_range: String,
    /// Lowest stability of external versions exposed
    pub stability: Stability,
    /// Composer repository URL for `vcs` sources
    pub repository_url: String,
    pub releases: Vec<ManualRelease>,
    pub required_packages: Vec<ManagedDependency>,
    pub replaced_packages: Vec<ManagedDependency>,
}

impl Default for ManagedPackage {
    fn default() -> Self {
        Self {
            id: 0,
            slug: String::new(),
            package_type: PackageType::Plugin,
            source_type: SourceType::LocalManual,
            source_name: String::new(),
            kind: PackageKind::Package,
            visibility: Visibility::Public,
            name: String::new(),
            description: String::new(),
            homepage: String::new(),
            authors: Vec::new(),
            license: String::new(),
            keywords: Vec::new(),
            requires_at_least: String::new(),
            tested_up_to: String::new(),
            requires_php: String::new(),
            version_range: "*".to_string(),
            stability: Stability::Stable,
            repository_url: String::new(),
            releases: Vec::new(),
            required_packages: Vec::new(),
            replaced_packages: Vec::new(),
        }
    }
}

/// Exact-match selection of managed entries; unset fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagedCriteria {
    pub package_type: Option<PackageType>,
    pub source_types: Vec<SourceType>,
    pub kind: Option<PackageKind>,
    pub slug: Option<String>,
    pub source_name: Option<String>,
}

impl ManagedCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn package_type(mut self, package_type: PackageType) -> Self {
        self.package_type = Some(package_type);
        self
    }

    pub fn source_types(mut self, source_types: &[SourceType]) -> Self {
        self.source_types = source_types.to_vec();
        self
    }

    pub fn kind(mut self, kind: PackageKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    pub fn matches(&self, package: &ManagedPackage) -> bool {
        self.package_type.is_none_or(|t| t == package.package_type)
            && (self.source_types.is_empty() || self.source_types.contains(&package.source_type))
            && self.kind.is_none_or(|k| k == package.kind)
            && self.slug.as_deref().is_none_or(|s| s == package.slug)
            && self
                .source_name
                .as_deref()
                .is_none_or(|s| s == package.source_name)
    }
}

pub trait ManagedPackageStore: Send + Sync {
    /// Ids of entries matching `criteria`, in ascending order.
    fn get_package_ids_by(&self, criteria: &ManagedCriteria) -> Vec<u64>;

    fn get_post_package_source_type(&self, id: u64) -> Option<SourceType>;

    fn get_package_data(&self, id: u64) -> Option<ManagedPackage>;

    /// Whether anonymous viewers may see the entry's package.
    fn is_package_public(&self, id: u64) -> bool;

    /// Drop anything held in memory and read the backing data again.
    fn reinitialize(&self) -> Result<()>;
}

/// Turn managed dependency records into package dependency entries.
///
/// Entries pointing at another managed entry take that entry's slug as their
/// name; the Composer transformer later prefixes it with the vendor. Entries
/// that resolve to nothing are dropped.
pub fn resolve_dependencies(
    store: &dyn ManagedPackageStore,
    dependencies: &[ManagedDependency],
) -> Vec<DependencyEntry> {
    dependencies
        .iter()
        .filter_map(|dep| {
            let name = match (&dep.composer_package_name, dep.managed_post_id) {
                (Some(name), _) if !name.is_empty() => name.clone(),
                (_, Some(id)) => match store.get_package_data(id) {
                    Some(target) => target.slug,
                    None => {
                        tracing::warn!(
                            managed_post_id = id,
                            "dependency on unknown managed package"
                        );
                        return None;
                    }
                },
                _ => return None,
            };
            let range = dep
                .version_range
                .clone()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| "*".to_string());
            let mut entry = DependencyEntry::new(name, range).with_stability(dep.stability);
            entry.managed_post_id = dep.managed_post_id;
            Some(entry)
        })
        .collect()
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ManagedFile {
    #[serde(default)]
    packages: Vec<ManagedPackage>,
}

/// Managed entries read from a JSON file
#[derive(Debug)]
pub struct FileManagedStore {
    path: PathBuf,
    packages: RwLock<Vec<ManagedPackage>>,
}

impl FileManagedStore {
    /// Open the store. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let packages = Self::load(&path)?;
        Ok(Self {
            path,
            packages: RwLock::new(packages),
        })
    }

    pub fn from_packages(packages: Vec<ManagedPackage>) -> Self {
        Self {
            path: PathBuf::new(),
            packages: RwLock::new(packages),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<Vec<ManagedPackage>> {
        if path.as_os_str().is_empty() || !path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read managed packages at {}: {}",
                path.display(),
                e
            ))
        })?;
        let file: ManagedFile = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse managed packages {}: {}",
                path.display(),
                e
            ))
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let mut packages = file.packages;
        for package in &mut packages {
            for release in &mut package.releases {
                if release.file.is_relative() {
                    release.file = base.join(&release.file);
                }
            }
        }
        packages.sort_by_key(|p| p.id);
        Ok(packages)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<ManagedPackage>> {
        // A poisoned lock still holds a fully loaded list
        self.packages.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl ManagedPackageStore for FileManagedStore {
    fn get_package_ids_by(&self, criteria: &ManagedCriteria) -> Vec<u64> {
        self.read()
            .iter()
            .filter(|p| criteria.matches(p))
            .map(|p| p.id)
            .collect()
    }

    fn get_post_package_source_type(&self, id: u64) -> Option<SourceType> {
        self.read().iter().find(|p| p.id == id).map(|p| p.source_type)
    }

    fn get_package_data(&self, id: u64) -> Option<ManagedPackage> {
        self.read().iter().find(|p| p.id == id).cloned()
    }

    fn is_package_public(&self, id: u64) -> bool {
        self.read()
            .iter()
            .find(|p| p.id == id)
            .is_some_and(|p| p.visibility == Visibility::Public)
    }

    fn reinitialize(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        let packages = Self::load(&self.path)?;
        let mut guard = self.packages.write().unwrap_or_else(|e| e.into_inner());
        *guard = packages;
        Ok(())
    }
}
