//! Package model
//!
//! A [`Package`] is one resolvable unit (plugin, theme, part or WordPress
//! core) with its metadata and release set. Packages are only created through
//! [`builder::PackageBuilder`] and are read-only afterwards.

pub mod builder;
pub mod headers;
pub mod license;
pub mod readme;

pub use builder::PackageBuilder;

use crate::error::{Error, Result};
use crate::release::Release;
use crate::version::{self, Stability};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// What kind of WordPress code a package holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageType {
    #[default]
    #[serde(rename = "plugin")]
    Plugin,
    #[serde(rename = "mu-plugin")]
    MuPlugin,
    #[serde(rename = "dropin-plugin")]
    DropinPlugin,
    #[serde(rename = "theme")]
    Theme,
    #[serde(rename = "wp-core")]
    WpCore,
}

impl PackageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageType::Plugin => "plugin",
            PackageType::MuPlugin => "mu-plugin",
            PackageType::DropinPlugin => "dropin-plugin",
            PackageType::Theme => "theme",
            PackageType::WpCore => "wp-core",
        }
    }

    /// Composer `type` understood by composer/installers
    pub fn composer_type(&self) -> &'static str {
        match self {
            PackageType::Plugin => "wordpress-plugin",
            PackageType::MuPlugin => "wordpress-muplugin",
            PackageType::DropinPlugin => "wordpress-dropin",
            PackageType::Theme => "wordpress-theme",
            PackageType::WpCore => "wordpress-core",
        }
    }

    pub fn is_plugin(&self) -> bool {
        matches!(
            self,
            PackageType::Plugin | PackageType::MuPlugin | PackageType::DropinPlugin
        )
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a package comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    #[serde(rename = "local.plugin")]
    LocalPlugin,
    #[serde(rename = "local.theme")]
    LocalTheme,
    #[default]
    #[serde(rename = "local.manual")]
    LocalManual,
    #[serde(rename = "packagist.org")]
    Packagist,
    #[serde(rename = "wpackagist.org")]
    WPackagist,
    #[serde(rename = "vcs")]
    Vcs,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::LocalPlugin => "local.plugin",
            SourceType::LocalTheme => "local.theme",
            SourceType::LocalManual => "local.manual",
            SourceType::Packagist => "packagist.org",
            SourceType::WPackagist => "wpackagist.org",
            SourceType::Vcs => "vcs",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "local.plugin" => Some(SourceType::LocalPlugin),
            "local.theme" => Some(SourceType::LocalTheme),
            "local.manual" => Some(SourceType::LocalManual),
            "packagist.org" => Some(SourceType::Packagist),
            "wpackagist.org" => Some(SourceType::WPackagist),
            "vcs" => Some(SourceType::Vcs),
            _ => None,
        }
    }

    /// Sources resolved through an external Composer repository
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            SourceType::Packagist | SourceType::WPackagist | SourceType::Vcs
        )
    }

    /// Sources backed by an installed plugin or theme directory
    pub fn is_installed(&self) -> bool {
        matches!(self, SourceType::LocalPlugin | SourceType::LocalTheme)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which managed catalogue a package belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    #[default]
    Package,
    /// Plugin-only building block kept in a separate catalogue
    Part,
}

impl PackageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageKind::Package => "package",
            PackageKind::Part => "part",
        }
    }
}

/// Who may see a package in the repository listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Draft,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Draft => "draft",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Author {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A required or replaced package entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEntry {
    pub composer_package_name: String,
    #[serde(default = "default_range")]
    pub version_range: String,
    #[serde(default)]
    pub stability: Stability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_post_id: Option<u64>,
}

fn default_range() -> String {
    "*".to_string()
}

impl DependencyEntry {
    pub fn new(name: impl Into<String>, version_range: impl Into<String>) -> Self {
        Self {
            composer_package_name: name.into(),
            version_range: version_range.into(),
            stability: Stability::Stable,
            managed_post_id: None,
        }
    }

    pub fn with_stability(mut self, stability: Stability) -> Self {
        self.stability = stability;
        self
    }
}

/// Identity a release keeps of the package it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageIdentity {
    pub slug: String,
    pub source_type: SourceType,
    pub package_type: PackageType,
}

/// One resolvable package
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub(crate) name: String,
    pub(crate) slug: String,
    pub(crate) package_type: PackageType,
    pub(crate) source_type: SourceType,
    pub(crate) source_name: String,
    pub(crate) kind: PackageKind,
    pub(crate) basename: Option<String>,
    pub(crate) directory: Option<PathBuf>,
    pub(crate) description: String,
    pub(crate) homepage: String,
    pub(crate) authors: Vec<Author>,
    pub(crate) license: String,
    pub(crate) keywords: Vec<String>,
    pub(crate) requires_at_least: String,
    pub(crate) tested_up_to: String,
    pub(crate) requires_php: String,
    pub(crate) is_installed: bool,
    pub(crate) installed_version: Option<String>,
    pub(crate) releases: BTreeMap<String, Release>,
    pub(crate) required_packages: Vec<DependencyEntry>,
    pub(crate) replaced_packages: Vec<DependencyEntry>,
    pub(crate) managed_post_id: Option<u64>,
    pub(crate) visibility: Visibility,
}

impl Package {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn package_type(&self) -> PackageType {
        self.package_type
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn kind(&self) -> PackageKind {
        self.kind
    }

    /// Plugin file relative to the plugins directory (`acme/acme.php`)
    pub fn basename(&self) -> Option<&str> {
        self.basename.as_deref()
    }

    /// Local source directory of an installed package
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn homepage(&self) -> &str {
        &self.homepage
    }

    pub fn authors(&self) -> &[Author] {
        &self.authors
    }

    pub fn license(&self) -> &str {
        &self.license
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn requires_at_least(&self) -> &str {
        &self.requires_at_least
    }

    pub fn tested_up_to(&self) -> &str {
        &self.tested_up_to
    }

    pub fn requires_php(&self) -> &str {
        &self.requires_php
    }

    pub fn is_installed(&self) -> bool {
        self.is_installed
    }

    pub fn installed_version(&self) -> Option<&str> {
        self.installed_version.as_deref()
    }

    pub fn required_packages(&self) -> &[DependencyEntry] {
        &self.required_packages
    }

    pub fn replaced_packages(&self) -> &[DependencyEntry] {
        &self.replaced_packages
    }

    pub fn managed_post_id(&self) -> Option<u64> {
        self.managed_post_id
    }

    pub fn is_managed(&self) -> bool {
        self.managed_post_id.is_some()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn identity(&self) -> PackageIdentity {
        PackageIdentity {
            slug: self.slug.clone(),
            source_type: self.source_type,
            package_type: self.package_type,
        }
    }

    /// Releases ordered by version, lowest first
    pub fn releases(&self) -> Vec<&Release> {
        let mut releases: Vec<&Release> = self.releases.values().collect();
        releases.sort_by(|a, b| version::compare(a.version(), b.version()));
        releases
    }

    pub fn has_releases(&self) -> bool {
        !self.releases.is_empty()
    }

    pub fn has_release(&self, version: &str) -> bool {
        self.find_release(version).is_some()
    }

    fn find_release(&self, version: &str) -> Option<&Release> {
        if let Some(release) = self.releases.get(version) {
            return Some(release);
        }
        let normalized = version::normalize(version)?;
        self.releases
            .values()
            .find(|r| version::normalize(r.version()).as_deref() == Some(normalized.as_str()))
    }

    /// Release for an exact version (raw or normalized form).
    pub fn get_release(&self, version: &str) -> Result<&Release> {
        self.find_release(version)
            .ok_or_else(|| Error::invalid_release(&self.slug, version))
    }

    /// Highest release by version order, not insertion order.
    pub fn get_latest_release(&self) -> Result<&Release> {
        self.releases
            .values()
            .max_by(|a, b| version::compare(a.version(), b.version()))
            .ok_or_else(|| Error::invalid_release(&self.slug, "latest"))
    }

    /// Highest release with at least the given stability.
    pub fn get_latest_release_with_stability(&self, minimum: Stability) -> Option<&Release> {
        self.releases
            .values()
            .filter(|r| version::stability_of(r.version()) >= minimum)
            .max_by(|a, b| version::compare(a.version(), b.version()))
    }

    pub fn get_latest_version(&self) -> Option<&str> {
        self.get_latest_release().ok().map(|r| r.version())
    }

    /// Release for the version currently installed on the site.
    pub fn get_installed_release(&self) -> Result<&Release> {
        let installed = match (&self.is_installed, &self.installed_version) {
            (true, Some(v)) => v,
            _ => return Err(Error::PackageNotInstalled(self.slug.clone())),
        };
        self.get_release(installed)
    }

    /// Release for a version or the literal `latest`.
    pub fn resolve_release(&self, version: &str) -> Result<&Release> {
        if version == "latest" {
            self.get_latest_release()
        } else {
            self.get_release(version)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::ReleaseSource;

    fn package_with_versions(versions: &[&str]) -> Package {
        let mut builder = PackageBuilder::new(PackageType::Plugin, SourceType::LocalManual);
        builder.set_slug("acme");
        for v in versions {
            builder.add_release(v, ReleaseSource::Stored);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_latest_release_is_highest_version() {
        let package = package_with_versions(&["1.0.0", "0.4.0", "0.3.2"]);
        assert_eq!(package.get_latest_release().unwrap().version(), "1.0.0");

        let reordered = package_with_versions(&["0.3.2", "1.0.0", "0.4.0"]);
        assert_eq!(reordered.get_latest_release().unwrap().version(), "1.0.0");
    }

    #[test]
    fn test_releases_sorted_by_version() {
        let package = package_with_versions(&["0.10.0", "0.9.0", "0.2.0"]);
        let versions: Vec<&str> = package.releases().iter().map(|r| r.version()).collect();
        assert_eq!(versions, vec!["0.2.0", "0.9.0", "0.10.0"]);
    }

    #[test]
    fn test_unknown_version_is_invalid() {
        let package = package_with_versions(&["1.0.0"]);
        let err = package.get_release("2.0.0").unwrap_err();
        assert!(matches!(err, Error::InvalidReleaseVersion { .. }));
    }

    #[test]
    fn test_release_lookup_accepts_normalized_form() {
        let package = package_with_versions(&["1.2"]);
        assert_eq!(package.get_release("1.2.0.0").unwrap().version(), "1.2");
        assert!(package.has_release("v1.2.0"));
    }

    #[test]
    fn test_no_releases_latest_is_invalid() {
        let package = package_with_versions(&[]);
        assert!(!package.has_releases());
        assert!(matches!(
            package.get_latest_release(),
            Err(Error::InvalidReleaseVersion { .. })
        ));
        assert!(package.get_latest_version().is_none());
    }

    #[test]
    fn test_installed_release_requires_installed_flag() {
        let package = package_with_versions(&["1.0.0"]);
        assert!(matches!(
            package.get_installed_release(),
            Err(Error::PackageNotInstalled(_))
        ));
    }

    #[test]
    fn test_resolve_latest_token() {
        let package = package_with_versions(&["1.0.0", "2.0.0-beta1"]);
        assert_eq!(package.resolve_release("latest").unwrap().version(), "2.0.0-beta1");
        assert_eq!(
            package
                .get_latest_release_with_stability(Stability::Stable)
                .unwrap()
                .version(),
            "1.0.0"
        );
    }

    #[test]
    fn test_package_type_composer_types() {
        assert_eq!(PackageType::Plugin.composer_type(), "wordpress-plugin");
        assert_eq!(PackageType::WpCore.composer_type(), "wordpress-core");
        assert!(PackageType::MuPlugin.is_plugin());
        assert!(!PackageType::Theme.is_plugin());
    }

    #[test]
    fn test_source_type_round_trip_names() {
        for source in [
            SourceType::LocalPlugin,
            SourceType::LocalTheme,
            SourceType::LocalManual,
            SourceType::Packagist,
            SourceType::WPackagist,
            SourceType::Vcs,
        ] {
            assert_eq!(SourceType::parse(source.as_str()), Some(source));
        }
        assert!(SourceType::Vcs.is_external());
        assert!(!SourceType::LocalManual.is_external());
    }
}
