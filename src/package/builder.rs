//! Staged package construction
//!
//! Each repository assembles its packages through a cascade of stages:
//!
//! 1. identity: [`from_basename`](PackageBuilder::from_basename),
//!    [`from_slug`](PackageBuilder::from_slug), or an installed
//!    [`PluginFile`]/theme directory
//! 2. administrator data: [`from_manager`](PackageBuilder::from_manager)
//! 3. live inspection: [`from_source`](PackageBuilder::from_source),
//!    [`from_readme`](PackageBuilder::from_readme),
//!    [`from_external`](PackageBuilder::from_external)
//! 4. releases: installed, stored, manual uploads, external dists
//!
//! Stages only fill fields that are still empty, so whatever ran first wins.
//! The `set_*` methods always overwrite.

use super::headers::{self, PluginFile, SourceHeaders};
use super::license::normalize_license;
use super::readme::Readme;
use super::{
    Author, DependencyEntry, Package, PackageIdentity, PackageKind, PackageType, SourceType,
    Visibility,
};
use crate::error::{Error, Result};
use crate::external::ExternalRelease;
use crate::managed::{ManagedPackage, ManualRelease};
use crate::release::{self, Release, ReleaseMeta, ReleaseSource};
use crate::storage::Storage;
use crate::version::{self, Constraint, Stability};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Release queued until `build()` knows the final identity
#[derive(Debug)]
struct PendingRelease {
    version: String,
    source: ReleaseSource,
    meta: ReleaseMeta,
    file: Option<String>,
}

fn fill(field: &mut String, value: &str) {
    let value = value.trim();
    if field.is_empty() && !value.is_empty() {
        *field = value.to_string();
    }
}

fn fill_list<T: Clone>(field: &mut Vec<T>, values: &[T]) {
    if field.is_empty() && !values.is_empty() {
        *field = values.to_vec();
    }
}

/// Slug implied by a plugin basename: its directory, or the file stem for
/// single-file plugins.
pub fn slug_from_basename(basename: &str) -> String {
    match basename.split_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => basename.trim_end_matches(".php").to_string(),
    }
}

#[derive(Debug)]
pub struct PackageBuilder {
    package: Package,
    pending: Vec<PendingRelease>,
}

impl PackageBuilder {
    pub fn new(package_type: PackageType, source_type: SourceType) -> Self {
        Self {
            package: Package {
                name: String::new(),
                slug: String::new(),
                package_type,
                source_type,
                source_name: String::new(),
                kind: PackageKind::Package,
                basename: None,
                directory: None,
                description: String::new(),
                homepage: String::new(),
                authors: Vec::new(),
                license: String::new(),
                keywords: Vec::new(),
                requires_at_least: String::new(),
                tested_up_to: String::new(),
                requires_php: String::new(),
                is_installed: false,
                installed_version: None,
                releases: BTreeMap::new(),
                required_packages: Vec::new(),
                replaced_packages: Vec::new(),
                managed_post_id: None,
                visibility: Visibility::Public,
            },
            pending: Vec::new(),
        }
    }

    // Setters

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.package.name = name.into();
        self
    }

    pub fn set_slug(&mut self, slug: impl Into<String>) -> &mut Self {
        self.package.slug = slug.into();
        self
    }

    pub fn set_source_name(&mut self, source_name: impl Into<String>) -> &mut Self {
        self.package.source_name = source_name.into();
        self
    }

    pub fn set_basename(&mut self, basename: impl Into<String>) -> &mut Self {
        self.package.basename = Some(basename.into());
        self
    }

    pub fn set_directory(&mut self, directory: impl Into<PathBuf>) -> &mut Self {
        self.package.directory = Some(directory.into());
        self
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.package.description = description.into();
        self
    }

    pub fn set_homepage(&mut self, homepage: impl Into<String>) -> &mut Self {
        self.package.homepage = homepage.into();
        self
    }

    pub fn set_authors(&mut self, authors: Vec<Author>) -> &mut Self {
        self.package.authors = authors;
        self
    }

    pub fn set_license(&mut self, license: impl Into<String>) -> &mut Self {
        self.package.license = license.into();
        self
    }

    pub fn set_keywords(&mut self, keywords: Vec<String>) -> &mut Self {
        self.package.keywords = keywords;
        self
    }

    pub fn set_requires_at_least(&mut self, version: impl Into<String>) -> &mut Self {
        self.package.requires_at_least = version.into();
        self
    }

    pub fn set_tested_up_to(&mut self, version: impl Into<String>) -> &mut Self {
        self.package.tested_up_to = version.into();
        self
    }

    pub fn set_requires_php(&mut self, version: impl Into<String>) -> &mut Self {
        self.package.requires_php = version.into();
        self
    }

    pub fn set_installed(&mut self, version: impl Into<String>) -> &mut Self {
        self.package.is_installed = true;
        self.package.installed_version = Some(version.into());
        self
    }

    pub fn set_managed_post_id(&mut self, id: u64) -> &mut Self {
        self.package.managed_post_id = Some(id);
        self
    }

    pub fn set_visibility(&mut self, visibility: Visibility) -> &mut Self {
        self.package.visibility = visibility;
        self
    }

    pub fn set_kind(&mut self, kind: PackageKind) -> &mut Self {
        self.package.kind = kind;
        self
    }

    pub fn set_required_packages(&mut self, entries: Vec<DependencyEntry>) -> &mut Self {
        self.package.required_packages = entries;
        self
    }

    pub fn set_replaced_packages(&mut self, entries: Vec<DependencyEntry>) -> &mut Self {
        self.package.replaced_packages = entries;
        self
    }

    // Identity stages

    /// Identity from a plugin basename (`acme/acme.php`).
    pub fn from_basename(&mut self, basename: &str) -> &mut Self {
        if self.package.basename.is_none() {
            self.package.basename = Some(basename.to_string());
        }
        fill(&mut self.package.slug, &slug_from_basename(basename));
        fill(&mut self.package.source_name, basename);
        self
    }

    pub fn from_slug(&mut self, slug: &str) -> &mut Self {
        fill(&mut self.package.slug, slug);
        fill(&mut self.package.source_name, slug);
        self
    }

    /// Identity and live data from an installed plugin.
    pub fn from_plugin_file(&mut self, plugin: &PluginFile) -> &mut Self {
        self.from_basename(&plugin.basename);
        if self.package.directory.is_none() {
            self.package.directory = Some(plugin.source.clone());
        }
        self.package.is_installed = true;
        let headers = headers::parse_plugin_headers(&plugin.file);
        self.from_source(&headers)
    }

    /// Identity and live data from an installed theme directory.
    pub fn from_theme_dir(&mut self, theme_dir: &Path) -> &mut Self {
        if let Some(name) = theme_dir.file_name().and_then(|n| n.to_str()) {
            self.from_slug(name);
        }
        if self.package.directory.is_none() {
            self.package.directory = Some(theme_dir.to_path_buf());
        }
        self.package.is_installed = true;
        let headers = headers::parse_theme_headers(theme_dir);
        self.from_source(&headers)
    }

    // Data stages

    /// Administrator configuration. Runs before any live inspection so its
    /// values take precedence.
    pub fn from_manager(&mut self, managed: &ManagedPackage) -> &mut Self {
        let package = &mut self.package;
        if package.managed_post_id.is_none() {
            package.managed_post_id = Some(managed.id);
        }
        package.visibility = managed.visibility;
        package.kind = managed.kind;

        fill(&mut package.slug, &managed.slug);
        fill(&mut package.source_name, &managed.source_name);
        fill(&mut package.name, &managed.name);
        fill(&mut package.description, &managed.description);
        fill(&mut package.homepage, &managed.homepage);
        fill(&mut package.license, &managed.license);
        fill(&mut package.requires_at_least, &managed.requires_at_least);
        fill(&mut package.tested_up_to, &managed.tested_up_to);
        fill(&mut package.requires_php, &managed.requires_php);
        fill_list(&mut package.authors, &managed.authors);
        fill_list(&mut package.keywords, &managed.keywords);
        self
    }

    /// Plugin headers or theme stylesheet headers.
    pub fn from_source(&mut self, headers: &SourceHeaders) -> &mut Self {
        let package = &mut self.package;
        fill(&mut package.name, &headers.name);
        fill(&mut package.homepage, &headers.uri);
        fill(&mut package.description, &headers.description);
        fill(&mut package.license, &headers.license);
        fill(&mut package.requires_at_least, &headers.requires_at_least);
        fill(&mut package.tested_up_to, &headers.tested_up_to);
        fill(&mut package.requires_php, &headers.requires_php);
        fill_list(&mut package.keywords, &headers.tags);

        if package.authors.is_empty() && !headers.author.is_empty() {
            package.authors.push(Author {
                name: headers.author.clone(),
                homepage: Some(headers.author_uri.clone()).filter(|u| !u.is_empty()),
                ..Author::default()
            });
        }

        if package.installed_version.is_none() && !headers.version.is_empty() {
            package.installed_version = Some(headers.version.clone());
        }
        self
    }

    pub fn from_readme(&mut self, readme: &Readme) -> &mut Self {
        let package = &mut self.package;
        fill(&mut package.name, &readme.name);
        fill(&mut package.description, &readme.short_description);
        fill(&mut package.license, &readme.license);
        fill(&mut package.requires_at_least, &readme.requires_at_least);
        fill(&mut package.tested_up_to, &readme.tested_up_to);
        fill(&mut package.requires_php, &readme.requires_php);
        fill_list(&mut package.keywords, &readme.tags);
        if package.authors.is_empty() {
            package.authors = readme.contributors.iter().map(Author::named).collect();
        }
        self
    }

    /// Package-level metadata published upstream (usually the newest release).
    pub fn from_external(&mut self, external: &ExternalRelease) -> &mut Self {
        let package = &mut self.package;
        fill(&mut package.description, &external.description);
        fill(&mut package.homepage, &external.homepage);
        if let Some(license) = external.license.first() {
            fill(&mut package.license, license);
        }
        fill_list(&mut package.keywords, &external.keywords);
        fill_list(&mut package.authors, &external.authors);
        self
    }

    pub fn with_required_packages(&mut self, entries: Vec<DependencyEntry>) -> &mut Self {
        fill_list(&mut self.package.required_packages, &entries);
        self
    }

    pub fn with_replaced_packages(&mut self, entries: Vec<DependencyEntry>) -> &mut Self {
        fill_list(&mut self.package.replaced_packages, &entries);
        self
    }

    // Release stages

    fn has_pending(&self, version: &str) -> bool {
        let normalized = version::normalize(version);
        self.pending.iter().any(|p| {
            p.version == version
                || (normalized.is_some() && version::normalize(&p.version) == normalized)
        })
    }

    fn push_release(
        &mut self,
        version: &str,
        source: ReleaseSource,
        meta: ReleaseMeta,
        file: Option<String>,
    ) -> &mut Self {
        let version = version.trim();
        if version.is_empty() {
            return self;
        }
        if self.has_pending(version) {
            debug!(
                slug = %self.package.slug,
                version,
                "release already present, keeping first source"
            );
            return self;
        }
        self.pending.push(PendingRelease {
            version: version.to_string(),
            source,
            meta,
            file,
        });
        self
    }

    pub fn add_release(&mut self, version: &str, source: ReleaseSource) -> &mut Self {
        self.push_release(version, source, ReleaseMeta::default(), None)
    }

    pub fn add_release_with_meta(
        &mut self,
        version: &str,
        source: ReleaseSource,
        meta: ReleaseMeta,
    ) -> &mut Self {
        self.push_release(version, source, meta, None)
    }

    /// Release for the installed version, built from the installed source.
    pub fn add_installed_release(&mut self) -> &mut Self {
        let (Some(version), Some(path)) = (
            self.package.installed_version.clone(),
            self.package.directory.clone(),
        ) else {
            return self;
        };
        if !self.package.is_installed {
            return self;
        }
        if version::normalize(&version).is_none() {
            debug!(
                slug = %self.package.slug,
                version = %version,
                "installed version is not a valid version"
            );
            return self;
        }
        self.add_release(&version, ReleaseSource::Local { path })
    }

    /// Releases whose artifacts are already in storage.
    pub fn add_cached_releases(&mut self, storage: &dyn Storage) -> Result<&mut Self> {
        let slug = self.package.slug.clone();
        if slug.is_empty() {
            return Ok(self);
        }
        for file in storage.list_files(&slug)? {
            if let Some(version) = release::parse_artifact_path(&slug, &file) {
                let version = version.to_string();
                self.push_release(
                    &version,
                    ReleaseSource::Stored,
                    ReleaseMeta::default(),
                    Some(file),
                );
            }
        }
        Ok(self)
    }

    /// Zip files uploaded for a manual package.
    pub fn add_manual_releases(&mut self, releases: &[ManualRelease]) -> &mut Self {
        for manual in releases {
            self.add_release(
                &manual.version,
                ReleaseSource::LocalArchive {
                    path: manual.file.clone(),
                },
            );
        }
        self
    }

    /// External versions allowed by `constraint` and at least `minimum` stable.
    pub fn add_external_releases(
        &mut self,
        releases: &[ExternalRelease],
        constraint: &Constraint,
        minimum: Stability,
    ) -> &mut Self {
        for external in releases {
            let Some(dist) = external.dist.clone() else {
                continue;
            };
            if !constraint.matches(&external.version)
                || version::stability_of(&external.version) < minimum
            {
                continue;
            }
            let meta = ReleaseMeta {
                dist: None,
                require: external.require.clone(),
                replace: external.replace.clone(),
                authors: external.authors.clone(),
                description: Some(external.description.clone()).filter(|d| !d.is_empty()),
                license: external.license.first().cloned(),
                keywords: external.keywords.clone(),
            };
            self.add_release_with_meta(&external.version, ReleaseSource::External { dist }, meta);
        }
        self
    }

    /// Finish the package. Fails only when no slug could be determined.
    pub fn build(self) -> Result<Package> {
        let mut package = self.package;

        package.slug = package.slug.trim().to_string();
        if package.slug.is_empty() {
            return Err(Error::PackageBuild(format!(
                "{} package from {} has no slug",
                package.package_type, package.source_type
            )));
        }
        if package.name.is_empty() {
            package.name = package.slug.clone();
        }
        if package.source_name.is_empty() {
            package.source_name = package.slug.clone();
        }
        package.license = normalize_license(&package.license);

        let keywords: BTreeSet<String> = package
            .keywords
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        package.keywords = keywords.into_iter().collect();

        let identity = PackageIdentity {
            slug: package.slug.clone(),
            source_type: package.source_type,
            package_type: package.package_type,
        };

        for pending in self.pending {
            let file = pending.file.unwrap_or_else(|| {
                let descriptor = release::source_descriptor(
                    package.source_type,
                    &package.source_name,
                    &pending.version,
                    &pending.source,
                );
                release::artifact_path(&package.slug, &pending.version, &descriptor)
            });
            let mut meta = pending.meta;
            meta.license = meta.license.map(|l| normalize_license(&l));
            let built =
                Release::new(identity.clone(), &pending.version, pending.source, file, meta);
            package.releases.insert(pending.version, built);
        }

        Ok(package)
    }
}
