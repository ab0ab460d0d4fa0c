//! Package repositories
//!
//! A repository is a read-only collection of packages from one source
//! category (installed plugins, manual themes, external parts, ...).
//! Querying is always `all()` followed by exact-match filtering on a typed
//! [`Criteria`].
//!
//! Category repositories are composed with [`CachedRepository`],
//! [`FilteredRepository`] and [`MultiRepository`]; see [`registry`] for the
//! application-facing composition.

pub mod cached;
pub mod filtered;
pub mod installed;
pub mod managed;
pub mod multi;
pub mod registry;

pub use cached::CachedRepository;
pub use filtered::FilteredRepository;
pub use installed::{InstalledPlugins, InstalledThemes};
pub use managed::ManagedRepository;
pub use multi::MultiRepository;
pub use registry::Repositories;

use crate::error::Result;
use crate::package::{Package, PackageKind, PackageType, SourceType, Visibility};
use std::sync::Arc;

/// Shared, immutable result of `all()`
pub type Packages = Arc<Vec<Package>>;

/// AND of exact matches on package fields; unset fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    pub slug: Option<String>,
    pub basename: Option<String>,
    pub source_type: Option<SourceType>,
    pub source_name: Option<String>,
    pub package_type: Option<PackageType>,
    pub managed_post_id: Option<u64>,
    pub kind: Option<PackageKind>,
    pub visibility: Option<Visibility>,
    pub is_managed: Option<bool>,
}

/// `acme/acme.php`: a slug that is really a plugin basename
fn looks_like_basename(value: &str) -> bool {
    value.contains('/') && value.ends_with(".php")
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match on slug. A basename-shaped value matches on basename instead.
    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        let slug = slug.into();
        if looks_like_basename(&slug) {
            self.basename = Some(slug);
        } else {
            self.slug = Some(slug);
        }
        self
    }

    pub fn basename(mut self, basename: impl Into<String>) -> Self {
        self.basename = Some(basename.into());
        self
    }

    pub fn source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = Some(source_type);
        self
    }

    pub fn source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    pub fn package_type(mut self, package_type: PackageType) -> Self {
        self.package_type = Some(package_type);
        self
    }

    pub fn managed_post_id(mut self, id: u64) -> Self {
        self.managed_post_id = Some(id);
        self
    }

    pub fn kind(mut self, kind: PackageKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn is_managed(mut self, is_managed: bool) -> Self {
        self.is_managed = Some(is_managed);
        self
    }

    pub fn matches(&self, package: &Package) -> bool {
        // Fields may also be set directly, so alias here as well
        let (slug, basename) = match self.slug.as_deref() {
            Some(s) if looks_like_basename(s) => (None, Some(s)),
            other => (other, self.basename.as_deref()),
        };

        slug.is_none_or(|s| s == package.slug())
            && basename.is_none_or(|b| Some(b) == package.basename())
            && self.source_type.is_none_or(|t| t == package.source_type())
            && self
                .source_name
                .as_deref()
                .is_none_or(|n| n == package.source_name())
            && self.package_type.is_none_or(|t| t == package.package_type())
            && self
                .managed_post_id
                .is_none_or(|id| Some(id) == package.managed_post_id())
            && self.kind.is_none_or(|k| k == package.kind())
            && self.visibility.is_none_or(|v| v == package.visibility())
            && self.is_managed.is_none_or(|m| m == package.is_managed())
    }
}

pub trait PackageRepository: Send + Sync {
    /// Every package, sorted by slug for category repositories.
    fn all(&self) -> Result<Packages>;

    /// Drop any cached state so the next `all()` sees fresh data.
    fn reinitialize(&self) -> Result<()> {
        Ok(())
    }

    fn matching(&self, criteria: &Criteria) -> Result<Vec<Package>> {
        Ok(self
            .all()?
            .iter()
            .filter(|p| criteria.matches(p))
            .cloned()
            .collect())
    }

    fn contains(&self, criteria: &Criteria) -> Result<bool> {
        Ok(self.all()?.iter().any(|p| criteria.matches(p)))
    }

    fn first_where(&self, criteria: &Criteria) -> Result<Option<Package>> {
        Ok(self.all()?.iter().find(|p| criteria.matches(p)).cloned())
    }

    /// View of this repository narrowed by `predicate`.
    fn with_filter<F>(self, predicate: F) -> FilteredRepository<Self>
    where
        Self: Sized,
        F: Fn(&Package) -> bool + Send + Sync + 'static,
    {
        FilteredRepository::new(self, predicate)
    }
}

impl<R: PackageRepository + ?Sized> PackageRepository for Arc<R> {
    fn all(&self) -> Result<Packages> {
        (**self).all()
    }

    fn reinitialize(&self) -> Result<()> {
        (**self).reinitialize()
    }
}

/// Sort by slug and freeze a freshly built package list.
pub(crate) fn sorted(mut packages: Vec<Package>) -> Packages {
    packages.sort_by(|a, b| a.slug().cmp(b.slug()));
    Arc::new(packages)
}

/// Repository over a fixed list of packages
#[derive(Debug, Clone)]
pub struct StaticRepository {
    packages: Packages,
}

impl StaticRepository {
    pub fn new(packages: Vec<Package>) -> Self {
        Self {
            packages: sorted(packages),
        }
    }
}

impl PackageRepository for StaticRepository {
    fn all(&self) -> Result<Packages> {
        Ok(Arc::clone(&self.packages))
    }
}
