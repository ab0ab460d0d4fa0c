//! Composer names for packages
//!
//! Every package is published as `{vendor}/{slug}`, where the slug is
//! lowercased and stripped of characters Composer rejects. Dependency
//! entries are projected onto `require`/`replace` maps: managed slugs get
//! the vendor prefix and non-stable entries carry an `@stability` flag.

use crate::package::{DependencyEntry, Package};
use crate::version::Stability;
use std::collections::BTreeMap;

/// Projects packages onto Composer names under one vendor
#[derive(Debug, Clone)]
pub struct ComposerPackageTransformer {
    vendor: String,
}

impl ComposerPackageTransformer {
    pub fn new(vendor: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
        }
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Lowercase the slug and drop anything outside `[a-z0-9_.-]`.
    pub fn normalize_slug(slug: &str) -> String {
        slug.to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_.-".contains(*c))
            .collect()
    }

    /// `{vendor}/{normalized-slug}`
    pub fn composer_name(&self, slug: &str) -> String {
        format!("{}/{}", self.vendor, Self::normalize_slug(slug))
    }

    /// Copy of the package named the way Composer clients will see it.
    pub fn transform(&self, package: &Package) -> Package {
        let mut transformed = package.clone();
        transformed.name = self.composer_name(package.slug());
        transformed
    }

    /// Flatten dependency entries into a Composer `require`/`replace` map.
    ///
    /// Entries that point at another managed package by slug get the vendor
    /// prefix. `@stability` is appended only for non-stable entries.
    pub fn transform_dependency_packages(
        &self,
        entries: &[DependencyEntry],
    ) -> BTreeMap<String, String> {
        entries
            .iter()
            .filter(|entry| !entry.composer_package_name.trim().is_empty())
            .map(|entry| {
                let name = if entry.managed_post_id.is_some()
                    && !entry.composer_package_name.contains('/')
                {
                    self.composer_name(&entry.composer_package_name)
                } else {
                    entry.composer_package_name.clone()
                };

                let range = match entry.version_range.trim() {
                    "" => "*",
                    range => range,
                };
                let constraint = if entry.stability == Stability::Stable {
                    range.to_string()
                } else {
                    format!("{}@{}", range, entry.stability.as_str())
                };
                (name, constraint)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{PackageBuilder, PackageType, SourceType};

    #[test]
    fn test_normalize_slug() {
        assert_eq!(ComposerPackageTransformer::normalize_slug("AcmeCode"), "acmecode");
        assert_eq!(ComposerPackageTransformer::normalize_slug("My Plugin!_v2.x"), "myplugin_v2.x");
        assert_eq!(ComposerPackageTransformer::normalize_slug("über-tool"), "ber-tool");
    }

    #[test]
    fn test_transform_names_package() {
        let mut builder = PackageBuilder::new(PackageType::Plugin, SourceType::LocalManual);
        builder.set_slug("AcmeCode").set_name("Acme Code");
        let package = builder.build().unwrap();

        let transformer = ComposerPackageTransformer::new("pressody-records");
        let transformed = transformer.transform(&package);
        assert_eq!(transformed.name(), "pressody-records/acmecode");
        assert_eq!(transformed.slug(), "AcmeCode");
        assert_eq!(package.name(), "Acme Code");
    }

    #[test]
    fn test_dependency_map() {
        let mut managed = DependencyEntry::new("acme-block", "^1.0");
        managed.managed_post_id = Some(7);
        let entries = vec![
            DependencyEntry::new("wpackagist-plugin/akismet", "^5.0"),
            DependencyEntry::new("acme/beta", "^2.0").with_stability(Stability::Beta),
            DependencyEntry::new("acme/any", ""),
            managed,
        ];

        let map = ComposerPackageTransformer::new("vendor").transform_dependency_packages(&entries);
        assert_eq!(map["wpackagist-plugin/akismet"], "^5.0");
        assert_eq!(map["acme/beta"], "^2.0@beta");
        assert_eq!(map["acme/any"], "*");
        assert_eq!(map["vendor/acme-block"], "^1.0");
    }
}
