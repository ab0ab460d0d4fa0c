//! Composer repository client
//!
//! Fetches Composer 2 metadata (`p2/{name}.json` and `p2/{name}~dev.json`)
//! and downloads dists. Timeouts and HTTP errors are handled here; nothing
//! above this layer retries.

use super::{parse_p2_document, ExternalRelease};
use crate::error::{Error, Result};
use crate::hash;
use crate::package::SourceType;
use crate::release::Dist;
use reqwest::blocking::{Client, Response};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// HTTP client timeout for metadata requests and downloads
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const PACKAGIST_URL: &str = "https://repo.packagist.org";
pub const WPACKAGIST_URL: &str = "https://wpackagist.org";

/// Repository a source type resolves against when no URL is configured
pub fn default_repository_url(source_type: SourceType) -> Option<&'static str> {
    match source_type {
        SourceType::Packagist => Some(PACKAGIST_URL),
        SourceType::WPackagist => Some(WPACKAGIST_URL),
        _ => None,
    }
}

pub trait ComposerClient: Send + Sync {
    /// Every published version of `package_name` (stable and dev).
    fn fetch_releases(
        &self,
        repository_url: &str,
        package_name: &str,
    ) -> Result<Vec<ExternalRelease>>;

    /// Download a dist to `dest`, verifying its shasum when one is published.
    fn download(&self, dist: &Dist, dest: &Path) -> Result<()>;
}

pub struct HttpComposerClient {
    client: Client,
}

impl HttpComposerClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("pressody-records/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Send a GET request with standardized error handling
    fn send_request(&self, url: &str) -> Result<Response> {
        self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                Error::Network(format!("Request timed out: {}", url))
            } else if e.is_connect() {
                Error::Network(format!("Connection failed: {}", url))
            } else {
                Error::Network(format!("HTTP error: {}", e))
            }
        })
    }

    /// Fetch a metadata document; `None` when the repository has no such file.
    fn fetch_document(&self, url: &str) -> Result<Option<serde_json::Value>> {
        let response = self.send_request(url)?;
        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Network(format!("HTTP {} for {}", status.as_u16(), url)));
        }
        response
            .json()
            .map(Some)
            .map_err(|e| Error::Network(format!("Invalid metadata from {}: {}", url, e)))
    }
}

impl ComposerClient for HttpComposerClient {
    fn fetch_releases(
        &self,
        repository_url: &str,
        package_name: &str,
    ) -> Result<Vec<ExternalRelease>> {
        let base = repository_url.trim_end_matches('/');
        let stable_url = format!("{}/p2/{}.json", base, package_name);
        let dev_url = format!("{}/p2/{}~dev.json", base, package_name);

        let stable = self
            .fetch_document(&stable_url)?
            .ok_or_else(|| Error::PackageNotFound(format!("{} at {}", package_name, base)))?;

        let mut releases = parse_p2_document(&stable, package_name);
        // Not every repository splits dev versions out
        if let Some(dev) = self.fetch_document(&dev_url)? {
            releases.extend(parse_p2_document(&dev, package_name));
        }
        Ok(releases)
    }

    fn download(&self, dist: &Dist, dest: &Path) -> Result<()> {
        let mut response = self.send_request(&dist.url)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!(
                "HTTP {} for {}",
                status.as_u16(),
                dist.url
            )));
        }

        let mut file = File::create(dest)?;
        response
            .copy_to(&mut file)
            .map_err(|e| Error::Network(format!("Failed to read {}: {}", dist.url, e)))?;

        if let Some(expected) = dist.shasum.as_deref().filter(|s| !s.is_empty()) {
            let actual = hash::sha1_file(dest)?;
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(Error::invalid_artifact(
                    &dist.url,
                    format!("checksum mismatch: expected {}, got {}", expected, actual),
                ));
            }
        }
        Ok(())
    }
}
