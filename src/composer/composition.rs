//! composer.json assembly
//!
//! A site composition starts from a starter template. Requested packages are
//! checked against the transformed repository and added to `require`. User
//! overrides are applied per top-level property: scalar-like properties are
//! overwritten, structural ones (`require`, `repositories`, `extra`, ...) are
//! merged into the template's value.

use super::repository::ComposerRepository;
use crate::error::{Error, Result};
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::warn;

/// Properties an override replaces outright
const OVERWRITE_PROPERTIES: &[&str] = &[
    "name",
    "type",
    "license",
    "description",
    "keywords",
    "homepage",
    "authors",
    "support",
    "minimum-stability",
    "prefer-stable",
];

/// Properties an override is merged into
const MERGE_PROPERTIES: &[&str] = &[
    "require",
    "require-dev",
    "repositories",
    "config",
    "extra",
    "scripts",
    "autoload",
    "conflict",
    "replace",
    "provide",
    "suggest",
];

/// A package asked for by name, with an optional constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedPackage {
    pub name: String,
    pub version: String,
}

impl RequestedPackage {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parse `vendor/name` or `vendor/name:constraint`.
    pub fn parse(value: &str) -> Self {
        match value.split_once(':') {
            Some((name, version)) if !version.trim().is_empty() => {
                Self::new(name.trim(), version.trim())
            }
            Some((name, _)) => Self::new(name.trim(), "*"),
            None => Self::new(value.trim(), "*"),
        }
    }
}

pub struct CompositionBuilder {
    template: Value,
}

impl CompositionBuilder {
    /// Builder using the built-in starter template pointed at `repository_url`.
    pub fn new(repository_url: &str) -> Self {
        Self {
            template: starter_template(repository_url),
        }
    }

    pub fn with_template(template: Value) -> Self {
        Self { template }
    }

    /// Builder using a template from disk, with the repository entry added.
    pub fn from_template_file(path: &Path, repository_url: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read composition template {}: {}",
                path.display(),
                e
            ))
        })?;
        let mut template: Value = serde_json::from_str(&content)?;
        if !template.is_object() {
            return Err(Error::Config(format!(
                "Composition template {} is not a JSON object",
                path.display()
            )));
        }
        merge_value(
            &mut template["repositories"],
            json!([{ "type": "composer", "url": repository_url }]),
        );
        Ok(Self { template })
    }

    pub fn template(&self) -> &Value {
        &self.template
    }

    /// Assemble composer.json for `requested`, then apply `overrides`.
    ///
    /// Fails with `PackageNotFound` when a requested name is not in
    /// `repository`.
    pub fn build(
        &self,
        repository: &ComposerRepository,
        requested: &[RequestedPackage],
        overrides: Option<&Value>,
    ) -> Result<Value> {
        let mut composition = self.template.clone();
        if !composition.is_object() {
            return Err(Error::Config("Composition template is not a JSON object".to_string()));
        }

        let mut require = Map::new();
        for package in requested {
            if !repository.contains(&package.name) {
                return Err(Error::PackageNotFound(package.name.clone()));
            }
            require.insert(package.name.clone(), Value::String(package.version.clone()));
        }
        merge_value(&mut composition["require"], Value::Object(require));

        if let Some(Value::Object(overrides)) = overrides {
            for (key, value) in overrides {
                if OVERWRITE_PROPERTIES.contains(&key.as_str()) {
                    composition[key.as_str()] = value.clone();
                } else if MERGE_PROPERTIES.contains(&key.as_str()) {
                    merge_value(&mut composition[key.as_str()], value.clone());
                } else {
                    warn!(property = key.as_str(), "ignoring unsupported composition property");
                }
            }
        }

        Ok(composition)
    }
}

/// Objects merge key by key (incoming wins), arrays append entries not
/// already present, anything else is replaced.
fn merge_value(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Object(target), Value::Object(incoming)) => {
            for (key, value) in incoming {
                merge_value(target.entry(key).or_insert(Value::Null), value);
            }
        }
        (Value::Array(target), Value::Array(incoming)) => {
            for value in incoming {
                if !target.contains(&value) {
                    target.push(value);
                }
            }
        }
        (target, incoming) => *target = incoming,
    }
}

fn starter_template(repository_url: &str) -> Value {
    json!({
        "name": "pressody/site",
        "type": "project",
        "license": "MIT",
        "description": "WordPress site composed from a pressody-records repository",
        "repositories": [
            { "type": "composer", "url": repository_url },
            {
                "type": "composer",
                "url": "https://wpackagist.org",
                "only": ["wpackagist-plugin/*", "wpackagist-theme/*"]
            }
        ],
        "require": {
            "php": ">=7.4",
            "composer/installers": "^1.0 || ^2.0",
            "roots/wordpress-core-installer": "^1.0 || ^2.0"
        },
        "minimum-stability": "dev",
        "prefer-stable": true,
        "config": {
            "optimize-autoloader": true,
            "preferred-install": "dist",
            "allow-plugins": {
                "composer/installers": true,
                "roots/wordpress-core-installer": true
            }
        },
        "extra": {
            "installer-paths": {
                "web/app/mu-plugins/{$name}/": ["type:wordpress-muplugin"],
                "web/app/plugins/{$name}/": ["type:wordpress-plugin"],
                "web/app/themes/{$name}/": ["type:wordpress-theme"]
            },
            "wordpress-install-dir": "web/wp"
        }
    })
}
