//! Command implementations for the `records` binary

pub mod build;
pub mod composition;
pub mod init;
pub mod list;
pub mod output_format;
pub mod output_types;
pub mod refresh;
pub mod release;

use crate::error::Result;
use crate::site::{NetworkMode, Site};
use clap::Args;
use std::path::PathBuf;

/// Options shared by every command that works on a site
#[derive(Args, Debug, Clone, Default)]
pub struct SiteArgs {
    /// Site root (default: search upward from the current directory)
    #[arg(long, value_name = "PATH", env = "RECORDS_SITE")]
    pub site: Option<PathBuf>,

    /// Never fetch external metadata; use the cache only
    #[arg(long)]
    pub offline: bool,
}

impl SiteArgs {
    pub fn network_mode(&self) -> NetworkMode {
        if self.offline {
            NetworkMode::Offline
        } else {
            NetworkMode::Online
        }
    }

    pub fn open(&self) -> Result<Site> {
        match &self.site {
            Some(root) => Site::open(root, self.network_mode()),
            None => Site::find(self.network_mode()),
        }
    }
}
