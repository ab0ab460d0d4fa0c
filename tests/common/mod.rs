//! Shared fixtures for integration tests

#![allow(dead_code)]

use records::config::{self, Config};
use records::external::{ComposerClient, ExternalRelease};
use records::release::Dist;
use records::site::{NetworkMode, Site};
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

pub const CONFIG: &str = r#"
[repository]
vendor = "pressody-records"
base_url = "https://records.test"
packages_path = "public"
history_size = 2

[site]
plugins_dir = "plugins"
mu_plugins_dir = "mu-plugins"
themes_dir = "themes"
managed_file = "managed.json"

[storage]
root = "storage"
cache_dir = "cache"
"#;

pub fn write_plugin(root: &Path, basename: &str, name: &str, version: &str) {
    let path = root.join("plugins").join(basename);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        path,
        format!(
            "<?php\n/*\nPlugin Name: {}\nVersion: {}\nDescription: {} plugin\n\
             Author: Acme\nLicense: GPLv2 or later\n*/\n",
            name, version, name
        ),
    )
    .unwrap();
}

pub fn write_theme(root: &Path, slug: &str, name: &str, version: &str) {
    let dir = root.join("themes").join(slug);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("style.css"),
        format!("/*\nTheme Name: {}\nVersion: {}\n*/\n", name, version),
    )
    .unwrap();
}

/// Zip with the given `(name, contents)` entries.
pub fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
    for (name, contents) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// A site with two installed plugins, one theme and a managed catalogue:
///
/// - id 1 `acme`: manual plugin, public, same slug as the installed plugin
/// - id 2 `secret`: manual plugin, private
/// - id 3 `blocks`: manual part, public
pub fn site_fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    fs::write(root.join(config::CONFIG_FILE), CONFIG).unwrap();
    write_plugin(root, "acme/acme.php", "Acme", "1.4.2");
    write_plugin(root, "zeta/zeta.php", "Zeta", "2.0");
    write_theme(root, "twentyacme", "Twenty Acme", "1.1");

    write_zip(&root.join("uploads/acme-1.5.0.zip"), &[("acme/acme.php", "<?php // 1.5.0")]);
    write_zip(&root.join("uploads/secret-0.1.0.zip"), &[("secret/secret.php", "<?php")]);
    write_zip(&root.join("uploads/blocks-0.3.0.zip"), &[("blocks/blocks.php", "<?php")]);

    let managed = json!({
        "packages": [
            {
                "id": 1,
                "slug": "acme",
                "name": "Acme Managed",
                "releases": [{ "version": "1.5.0", "file": "uploads/acme-1.5.0.zip" }],
                "required_packages": [{ "managed_post_id": 3, "version_range": "^0.3" }]
            },
            {
                "id": 2,
                "slug": "secret",
                "visibility": "private",
                "releases": [{ "version": "0.1.0", "file": "uploads/secret-0.1.0.zip" }]
            },
            {
                "id": 3,
                "slug": "blocks",
                "kind": "part",
                "releases": [{ "version": "0.3.0", "file": "uploads/blocks-0.3.0.zip" }]
            }
        ]
    });
    fs::write(
        root.join("managed.json"),
        serde_json::to_string_pretty(&managed).unwrap(),
    )
    .unwrap();

    temp
}

/// Client that serves fixed zips and counts downloads
#[derive(Default)]
pub struct CountingClient {
    pub downloads: AtomicUsize,
    pub entries: Vec<(String, String)>,
}

impl CountingClient {
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        Self {
            downloads: AtomicUsize::new(0),
            entries: entries
                .iter()
                .map(|(n, c)| (n.to_string(), c.to_string()))
                .collect(),
        }
    }

    pub fn count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

impl ComposerClient for CountingClient {
    fn fetch_releases(
        &self,
        _url: &str,
        name: &str,
    ) -> records::error::Result<Vec<ExternalRelease>> {
        Ok(vec![ExternalRelease {
            name: name.to_string(),
            version: "3.0.0".to_string(),
            dist: Some(Dist::zip("https://dl.test/widgets-3.0.0.zip")),
            ..ExternalRelease::default()
        }])
    }

    fn download(&self, _dist: &Dist, dest: &Path) -> records::error::Result<()> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let entries: Vec<(&str, &str)> = self
            .entries
            .iter()
            .map(|(n, c)| (n.as_str(), c.as_str()))
            .collect();
        write_zip(dest, &entries);
        Ok(())
    }
}

/// Open the fixture offline with a stub client.
pub fn open_site(root: &Path) -> Site {
    let config: Config = config::load_config(root).unwrap().unwrap();
    let client: Arc<dyn ComposerClient> = Arc::new(CountingClient::default());
    Site::with_client(root, config, client, NetworkMode::Offline).unwrap()
}

pub fn storage_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root.join("storage"))
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}
