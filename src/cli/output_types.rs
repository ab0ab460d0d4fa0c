//! Output types for CLI commands
//!
//! Every command builds one of these and prints it with
//! [`CommandOutput::to_json`] when `--format json` is given.

use serde::Serialize;
use std::path::PathBuf;

/// Trait for command outputs that can be serialized to JSON
pub trait CommandOutput: Serialize {
    /// Get the command name
    fn command_name(&self) -> &'static str;

    /// Serialize to pretty-printed JSON string
    fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

// =============================================================================
// InitOutput
// =============================================================================

/// Output for `records init` command
#[derive(Debug, Serialize)]
pub struct InitOutput {
    /// 'success' or 'error'
    pub status: String,
    /// Site root
    pub path: PathBuf,
    /// Files and directories created
    pub created: Vec<PathBuf>,
}

impl CommandOutput for InitOutput {
    fn command_name(&self) -> &'static str {
        "init"
    }
}

// =============================================================================
// ListOutput
// =============================================================================

/// Output for `records list` command
#[derive(Debug, Serialize)]
pub struct ListOutput {
    pub package_count: usize,
    pub packages: Vec<ListPackageInfo>,
}

#[derive(Debug, Serialize)]
pub struct ListPackageInfo {
    pub slug: String,
    pub name: String,
    pub composer_name: String,
    #[serde(rename = "type")]
    pub package_type: String,
    pub source_type: String,
    pub kind: String,
    pub visibility: String,
    pub managed_post_id: Option<u64>,
    pub installed_version: Option<String>,
    pub latest_version: Option<String>,
    pub versions: Vec<String>,
}

impl CommandOutput for ListOutput {
    fn command_name(&self) -> &'static str {
        "list"
    }
}

// =============================================================================
// BuildOutput
// =============================================================================

/// Output for `records build` command
#[derive(Debug, Serialize)]
pub struct BuildOutput {
    pub root: PathBuf,
    pub packages: usize,
    pub versions: usize,
    pub files_written: usize,
    pub files_pruned: usize,
    pub include_private: bool,
}

impl CommandOutput for BuildOutput {
    fn command_name(&self) -> &'static str {
        "build"
    }
}

// =============================================================================
// ReleaseOutput
// =============================================================================

/// Output for `records release` command
#[derive(Debug, Serialize)]
pub struct ReleaseOutput {
    pub identifier: String,
    pub version: String,
    pub path: PathBuf,
    pub filename: String,
    pub size: u64,
    pub sha1: String,
}

impl CommandOutput for ReleaseOutput {
    fn command_name(&self) -> &'static str {
        "release"
    }
}

// =============================================================================
// RefreshOutput
// =============================================================================

/// Output for `records refresh` command
#[derive(Debug, Serialize)]
pub struct RefreshOutput {
    pub refreshed: Vec<RefreshedPackage>,
    pub failed: Vec<RefreshFailure>,
}

#[derive(Debug, Serialize)]
pub struct RefreshedPackage {
    pub name: String,
    pub source_type: String,
    pub versions: usize,
}

#[derive(Debug, Serialize)]
pub struct RefreshFailure {
    pub name: String,
    pub source_type: String,
    pub error: String,
}

impl CommandOutput for RefreshOutput {
    fn command_name(&self) -> &'static str {
        "refresh"
    }
}
