//! records.toml configuration file parsing
//!
//! Handles loading and validating site configuration from `records.toml`.
//! All fields have sensible defaults, so an empty or missing config file works.
//! Relative paths are resolved against the directory holding the config file.

pub mod root;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the site configuration file
pub const CONFIG_FILE: &str = "records.toml";

/// Site configuration loaded from records.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Composer repository settings
    pub repository: RepositorySection,
    /// Where installed plugins, themes and managed entries live
    pub site: SiteSection,
    /// Artifact storage and metadata cache
    pub storage: StorageSection,
    /// composer.json composition settings
    pub composition: CompositionSection,
}

/// Layout of the root packages.json
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexFormat {
    /// Single `includes` map pointing at a content-hashed include file
    #[default]
    Includes,
    /// Composer 1 `providers-url` with content-hashed provider includes
    Providers,
}

/// Composer repository settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositorySection {
    /// Vendor prefix of every generated Composer package name
    pub vendor: String,
    /// Public base URL the repository is served from
    pub base_url: String,
    /// Directory packages.json and its include files are written to
    pub packages_path: PathBuf,
    /// Root document layout
    pub format: IndexFormat,
    /// How many generations of content-hashed include files to keep
    pub history_size: usize,
    /// Emit `available-package-patterns` instead of listing every name
    pub available_package_patterns: Vec<String>,
    /// Salt for the obfuscated post-id download identifiers
    pub hashid_salt: String,
}

impl Default for RepositorySection {
    fn default() -> Self {
        Self {
            vendor: "pressody-records".to_string(),
            base_url: "http://localhost".to_string(),
            packages_path: PathBuf::from("public"),
            format: IndexFormat::Includes,
            history_size: 5,
            available_package_patterns: Vec::new(),
            hashid_salt: "pressody-records".to_string(),
        }
    }
}

/// Site layout
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteSection {
    /// Installed plugins directory
    pub plugins_dir: PathBuf,
    /// Must-use plugins directory (single-file plugins)
    pub mu_plugins_dir: Option<PathBuf>,
    /// Installed themes directory
    pub themes_dir: PathBuf,
    /// JSON file holding the administrator-managed package entries
    pub managed_file: PathBuf,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            plugins_dir: PathBuf::from("wp-content/plugins"),
            mu_plugins_dir: None,
            themes_dir: PathBuf::from("wp-content/themes"),
            managed_file: PathBuf::from("managed.json"),
        }
    }
}

/// Artifact storage settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageSection {
    /// Root directory of stored release artifacts
    pub root: PathBuf,
    /// Cache of external Composer metadata (defaults to the user cache dir)
    pub cache_dir: Option<PathBuf>,
    /// Seconds cached external metadata stays fresh
    pub metadata_ttl: u64,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from("storage/packages"),
            cache_dir: None,
            metadata_ttl: 12 * 60 * 60,
        }
    }
}

/// composer.json composition settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CompositionSection {
    /// JSON file replacing the built-in starter template
    pub template: Option<PathBuf>,
}

/// Absolute paths derived from a config and the directory it was loaded from
#[derive(Debug, Clone)]
pub struct SitePaths {
    pub root: PathBuf,
    pub plugins_dir: PathBuf,
    pub mu_plugins_dir: Option<PathBuf>,
    pub themes_dir: PathBuf,
    pub managed_file: PathBuf,
    pub storage_root: PathBuf,
    pub cache_dir: PathBuf,
    pub packages_path: PathBuf,
}

impl Config {
    /// Resolve every configured path against `root`.
    pub fn paths(&self, root: &Path) -> SitePaths {
        let resolve = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                root.join(p)
            }
        };

        let cache_dir = match &self.storage.cache_dir {
            Some(dir) => resolve(dir),
            None => default_cache_dir(),
        };

        SitePaths {
            root: root.to_path_buf(),
            plugins_dir: resolve(&self.site.plugins_dir),
            mu_plugins_dir: self.site.mu_plugins_dir.as_deref().map(resolve),
            themes_dir: resolve(&self.site.themes_dir),
            managed_file: resolve(&self.site.managed_file),
            storage_root: resolve(&self.storage.root),
            cache_dir,
            packages_path: resolve(&self.repository.packages_path),
        }
    }
}

/// Default external metadata cache: `~/.cache/pressody-records/`
fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("pressody-records")
}

/// Load configuration from records.toml in the site root.
///
/// Returns `None` if the config file doesn't exist.
/// Returns an error if the file exists but is invalid TOML.
pub fn load_config(site_root: &Path) -> Result<Option<Config>> {
    let config_path = site_root.join(CONFIG_FILE);

    if !config_path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        Error::Config(format!(
            "Failed to read records.toml at {}: {}",
            config_path.display(),
            e
        ))
    })?;

    let config: Config = toml::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "Failed to parse records.toml: {}",
            format_toml_error(&e)
        ))
    })?;

    validate_config(&config)?;

    Ok(Some(config))
}

/// Format TOML parse error with position information
fn format_toml_error(err: &toml::de::Error) -> String {
    if let Some(span) = err.span() {
        format!("at position {}-{}: {}", span.start, span.end, err.message())
    } else {
        err.message().to_string()
    }
}

/// Validate configuration values.
///
/// Directories are not checked for existence; a fresh site may not have
/// created its storage yet.
fn validate_config(config: &Config) -> Result<()> {
    let vendor = &config.repository.vendor;
    if vendor.is_empty()
        || !vendor
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_.-".contains(c))
    {
        return Err(Error::Config(format!(
            "Invalid repository vendor '{}': use lowercase letters, digits, '_', '.' or '-'",
            vendor
        )));
    }

    if config.repository.history_size == 0 {
        return Err(Error::Config(
            "repository.history_size must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Generate a template records.toml with commented defaults.
pub fn generate_config_template() -> &'static str {
    r#"# pressody-records site configuration

[repository]
vendor = "pressody-records"
base_url = "http://localhost"
packages_path = "public"
# format = "providers"
# history_size = 5
# available_package_patterns = ["pressody-records/*"]

[site]
plugins_dir = "wp-content/plugins"
themes_dir = "wp-content/themes"
managed_file = "managed.json"
# mu_plugins_dir = "wp-content/mu-plugins"

[storage]
root = "storage/packages"
# cache_dir = "storage/cache"
# metadata_ttl = 43200
"#
}
