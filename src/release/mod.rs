//! Releases: one version of a package
//!
//! A [`Release`] knows where its bytes come from ([`ReleaseSource`]) and where
//! the built artifact lives in storage ([`Release::file`]). The storage path
//! is deterministic:
//!
//! ```text
//! {slug}/{slug}-{version}-{hash}.zip
//! ```
//!
//! where `hash` is the first 12 hex digits of the SHA-256 of the release's
//! source descriptor. A different upstream dist for the same version lands
//! at a different path, so stale artifacts are never served for it.

pub mod archiver;
pub mod manager;
pub mod validator;

pub use manager::ReleaseManager;

use crate::hash;
use crate::package::{Author, PackageIdentity, SourceType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Digits of the source hash kept in artifact file names
const HASH_LENGTH: usize = 12;

/// Composer `dist` entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dist {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shasum: Option<String>,
    /// Internal bookkeeping; stripped before anything is written for Composer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifactmtime: Option<String>,
}

impl Dist {
    pub fn zip(url: impl Into<String>) -> Self {
        Self {
            kind: "zip".to_string(),
            url: url.into(),
            ..Self::default()
        }
    }

    /// Copy safe to expose to Composer clients
    pub fn for_wire(&self) -> Self {
        Self {
            artifactmtime: None,
            ..self.clone()
        }
    }
}

/// How the bytes of a release are obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseSource {
    /// Installed plugin/theme directory, or a single-file plugin
    Local { path: PathBuf },
    /// Zip (or tarball) already on disk, e.g. a manual upload
    LocalArchive { path: PathBuf },
    /// Dist published by an external Composer repository
    External { dist: Dist },
    /// Artifact that only exists in storage
    Stored,
}

impl ReleaseSource {
    pub fn kind(&self) -> &'static str {
        match self {
            ReleaseSource::Local { .. } => "local",
            ReleaseSource::LocalArchive { .. } => "archive",
            ReleaseSource::External { .. } => "external",
            ReleaseSource::Stored => "stored",
        }
    }
}

/// Per-release metadata; set fields override the package's own
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseMeta {
    pub dist: Option<Dist>,
    pub require: BTreeMap<String, String>,
    pub replace: BTreeMap<String, String>,
    pub authors: Vec<Author>,
    pub description: Option<String>,
    pub license: Option<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    package: PackageIdentity,
    version: String,
    source: ReleaseSource,
    file: String,
    meta: ReleaseMeta,
}

impl Release {
    pub fn new(
        package: PackageIdentity,
        version: impl Into<String>,
        source: ReleaseSource,
        file: impl Into<String>,
        meta: ReleaseMeta,
    ) -> Self {
        Self {
            package,
            version: version.into(),
            source,
            file: file.into(),
            meta,
        }
    }

    pub fn package(&self) -> &PackageIdentity {
        &self.package
    }

    pub fn slug(&self) -> &str {
        &self.package.slug
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn source(&self) -> &ReleaseSource {
        &self.source
    }

    /// Storage-relative path of the artifact
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn meta(&self) -> &ReleaseMeta {
        &self.meta
    }

    pub fn with_dist(mut self, dist: Dist) -> Self {
        self.meta.dist = Some(dist);
        self
    }
}

/// String hashed into the artifact name. Anything that changes the bytes of
/// the artifact must change the descriptor.
pub fn source_descriptor(
    source_type: SourceType,
    source_name: &str,
    version: &str,
    source: &ReleaseSource,
) -> String {
    let mut descriptor = format!("{}|{}|{}", source_type.as_str(), source_name, version);
    if let ReleaseSource::External { dist } = source {
        descriptor.push('|');
        descriptor.push_str(dist.reference.as_deref().unwrap_or(&dist.url));
    }
    descriptor
}

/// Deterministic storage path for an artifact
pub fn artifact_path(slug: &str, version: &str, descriptor: &str) -> String {
    let hash = hash::sha256_string(descriptor);
    let version = version.replace(['/', '\\'], "-");
    format!(
        "{slug}/{slug}-{version}-{hash}.zip",
        slug = slug,
        version = version,
        hash = &hash[..HASH_LENGTH]
    )
}

/// Version encoded in a stored artifact path, if it is one of ours.
pub fn parse_artifact_path<'a>(slug: &str, file: &'a str) -> Option<&'a str> {
    let name = file.rsplit('/').next()?;
    let rest = name.strip_prefix(slug)?.strip_prefix('-')?;
    let rest = rest.strip_suffix(".zip")?;
    let (version, hash) = rest.rsplit_once('-')?;
    let is_hash = hash.len() == HASH_LENGTH && hash.chars().all(|c| c.is_ascii_hexdigit());
    if version.is_empty() || !is_hash {
        return None;
    }
    Some(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_path_shape() {
        let descriptor = source_descriptor(
            SourceType::LocalPlugin,
            "acme/acme.php",
            "1.4.2",
            &ReleaseSource::Stored,
        );
        let path = artifact_path("acme", "1.4.2", &descriptor);
        assert!(path.starts_with("acme/acme-1.4.2-"));
        assert!(path.ends_with(".zip"));
        assert_eq!(parse_artifact_path("acme", &path), Some("1.4.2"));
    }

    #[test]
    fn test_external_reference_changes_path() {
        let a = ReleaseSource::External {
            dist: Dist {
                reference: Some("aaa".into()),
                ..Dist::zip("https://repo.test/acme.zip")
            },
        };
        let b = ReleaseSource::External {
            dist: Dist {
                reference: Some("bbb".into()),
                ..Dist::zip("https://repo.test/acme.zip")
            },
        };
        let da = source_descriptor(SourceType::Packagist, "acme/acme", "1.0", &a);
        let db = source_descriptor(SourceType::Packagist, "acme/acme", "1.0", &b);
        let pa = artifact_path("acme", "1.0", &da);
        let pb = artifact_path("acme", "1.0", &db);
        assert_ne!(pa, pb);
    }

    #[test]
    fn test_parse_artifact_path_rejects_foreign_files() {
        assert_eq!(parse_artifact_path("acme", "acme/readme.txt"), None);
        assert_eq!(parse_artifact_path("acme", "acme/other-1.0.0-0123456789ab.zip"), None);
        assert_eq!(parse_artifact_path("acme", "acme/acme-1.0.0-xyz.zip"), None);
        assert_eq!(
            parse_artifact_path("acme", "acme/acme-2.0.0-beta1-0123456789ab.zip"),
            Some("2.0.0-beta1")
        );
    }

    #[test]
    fn test_wire_dist_drops_mtime() {
        let dist = Dist {
            artifactmtime: Some("1700000000".into()),
            ..Dist::zip("https://records.test/dist/acme/1.0.0")
        };
        let json = serde_json::to_value(dist.for_wire()).unwrap();
        assert!(json.get("artifactmtime").is_none());
        assert_eq!(json["type"], "zip");
    }
}
