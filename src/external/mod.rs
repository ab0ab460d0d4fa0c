//! Externally tracked packages
//!
//! Packages whose releases come from another Composer repository
//! (packagist.org, wpackagist.org, or a VCS-backed repository). Their
//! metadata is fetched through a [`ComposerClient`] and kept in a
//! [`MetadataCache`] so repository listings don't hit the network on every
//! pass.

pub mod cache;
pub mod client;

pub use cache::MetadataCache;
pub use client::{ComposerClient, HttpComposerClient};

use crate::package::{Author, SourceType};
use crate::release::Dist;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// One version of an external package, as published in Composer metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRelease {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub version_normalized: String,
    #[serde(rename = "type", default)]
    pub package_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub license: Vec<String>,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default, deserialize_with = "map_or_empty")]
    pub require: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "map_or_empty")]
    pub replace: BTreeMap<String, String>,
    #[serde(default)]
    pub dist: Option<Dist>,
}

/// Composer writes an empty object as `[]` in older metadata.
fn map_or_empty<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k, v.to_string())))
            .collect(),
        _ => BTreeMap::new(),
    })
}

fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    })
}

/// Expand `"minified": "composer/2.0"` version lists: every entry only holds
/// the keys that changed from the previous one, `"__unset"` removes a key.
pub fn expand_minified(versions: &[Value]) -> Vec<Value> {
    let mut expanded = Vec::with_capacity(versions.len());
    let mut previous = Map::new();

    for entry in versions {
        let Some(changes) = entry.as_object() else {
            continue;
        };
        for (key, value) in changes {
            if value.as_str() == Some("__unset") {
                previous.remove(key);
            } else {
                previous.insert(key.clone(), value.clone());
            }
        }
        expanded.push(Value::Object(previous.clone()));
    }

    expanded
}

/// Releases of `package_name` in a Composer 2 (`p2/`) metadata document.
pub fn parse_p2_document(document: &Value, package_name: &str) -> Vec<ExternalRelease> {
    let Some(entries) = document
        .get("packages")
        .and_then(|p| p.get(package_name))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    let minified = document.get("minified").and_then(Value::as_str) == Some("composer/2.0");
    let entries = if minified {
        expand_minified(entries)
    } else {
        entries.clone()
    };

    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<ExternalRelease>(entry) {
            Ok(release) => Some(release),
            Err(e) => {
                debug!(package = package_name, error = %e, "skipping unreadable version entry");
                None
            }
        })
        .collect()
}

/// External metadata lookups, served from cache when fresh
pub struct ExternalMetadata {
    cache: MetadataCache,
    client: Arc<dyn ComposerClient>,
    offline: bool,
}

impl ExternalMetadata {
    pub fn new(cache: MetadataCache, client: Arc<dyn ComposerClient>) -> Self {
        Self {
            cache,
            client,
            offline: false,
        }
    }

    /// Never fetch; use whatever the cache holds, however old.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Releases for an external package.
    ///
    /// Network failures are logged and fall back to stale cache data (or no
    /// releases), so one unreachable upstream never breaks a listing.
    pub fn releases(
        &self,
        source_type: SourceType,
        package_name: &str,
        repository_url: Option<&str>,
    ) -> Vec<ExternalRelease> {
        let cached = self.cache.get(source_type, package_name);
        if let Some(entry) = &cached {
            if self.offline || self.cache.is_fresh(entry) {
                return entry.releases.clone();
            }
        } else if self.offline {
            return Vec::new();
        }

        match self.refresh(source_type, package_name, repository_url) {
            Ok(releases) => releases,
            Err(e) => {
                warn!(package = package_name, error = %e, "cannot refresh external metadata");
                cached.map(|entry| entry.releases).unwrap_or_default()
            }
        }
    }

    /// Fetch metadata from upstream and store it in the cache.
    pub fn refresh(
        &self,
        source_type: SourceType,
        package_name: &str,
        repository_url: Option<&str>,
    ) -> crate::error::Result<Vec<ExternalRelease>> {
        let url = repository_url
            .filter(|u| !u.is_empty())
            .or_else(|| client::default_repository_url(source_type))
            .ok_or_else(|| {
                crate::error::Error::Config(format!(
                    "No repository URL for {} package {}",
                    source_type, package_name
                ))
            })?;

        let releases = self.client.fetch_releases(url, package_name)?;
        self.cache.put(source_type, package_name, &releases)?;
        debug!(package = package_name, versions = releases.len(), "refreshed external metadata");
        Ok(releases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expand_minified() {
        let versions = vec![
            json!({
                "name": "acme/widgets",
                "version": "2.0.0",
                "description": "Widgets",
                "require": {"php": ">=7.4"}
            }),
            json!({"version": "1.0.0", "require": "__unset"}),
        ];
        let expanded = expand_minified(&versions);
        assert_eq!(expanded[1]["name"], "acme/widgets");
        assert_eq!(expanded[1]["description"], "Widgets");
        assert!(expanded[1].get("require").is_none());
        assert_eq!(expanded[0]["require"]["php"], ">=7.4");
    }

    #[test]
    fn test_parse_p2_document() {
        let document = json!({
            "minified": "composer/2.0",
            "packages": {
                "wpackagist-plugin/akismet": [
                    {
                        "name": "wpackagist-plugin/akismet",
                        "version": "5.3",
                        "version_normalized": "5.3.0.0",
                        "type": "wordpress-plugin",
                        "license": "GPL-2.0-or-later",
                        "require": [],
                        "dist": {"type": "zip", "url": "https://downloads.test/akismet.5.3.zip"}
                    },
                    {
                        "version": "5.2",
                        "version_normalized": "5.2.0.0",
                        "dist": {"type": "zip", "url": "https://downloads.test/akismet.5.2.zip"}
                    }
                ]
            }
        });

        let releases = parse_p2_document(&document, "wpackagist-plugin/akismet");
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[1].name, "wpackagist-plugin/akismet");
        assert_eq!(releases[1].package_type, "wordpress-plugin");
        assert_eq!(releases[0].license, vec!["GPL-2.0-or-later"]);
        assert!(releases[0].require.is_empty());
        assert_eq!(
            releases[1].dist.as_ref().unwrap().url,
            "https://downloads.test/akismet.5.2.zip"
        );
    }

    #[test]
    fn test_parse_unknown_package_is_empty() {
        let document = json!({"packages": {}});
        assert!(parse_p2_document(&document, "acme/missing").is_empty());
    }
}
