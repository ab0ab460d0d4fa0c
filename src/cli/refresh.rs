//! `records refresh` command implementation
//!
//! Fetches upstream metadata for every externally tracked managed package
//! and stores it in the metadata cache. One failing upstream does not stop
//! the others.

use crate::cli::output_format::OutputFormat;
use crate::cli::output_types::{CommandOutput, RefreshFailure, RefreshOutput, RefreshedPackage};
use crate::cli::SiteArgs;
use crate::error::{Error, Result};
use crate::managed::ManagedCriteria;
use crate::package::SourceType;
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

const EXTERNAL_SOURCES: &[SourceType] =
    &[SourceType::Packagist, SourceType::WPackagist, SourceType::Vcs];

#[derive(Args)]
pub struct RefreshArgs {
    /// Output format: human (default) or json
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub site: SiteArgs,
}

pub fn execute(args: &RefreshArgs) -> Result<()> {
    if args.site.offline {
        return Err(Error::Config("refresh needs network access; drop --offline".to_string()));
    }

    let site = args.site.open()?;
    let store = site.store();
    let entries: Vec<_> = store
        .get_package_ids_by(&ManagedCriteria::new().source_types(EXTERNAL_SOURCES))
        .into_iter()
        .filter_map(|id| store.get_package_data(id))
        .collect();

    let progress = if args.format.is_machine_readable() {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(entries.len() as u64);
        if let Ok(style) = ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}") {
            bar.set_style(style);
        }
        bar
    };

    let mut output = RefreshOutput {
        refreshed: Vec::new(),
        failed: Vec::new(),
    };

    for entry in &entries {
        progress.set_message(entry.source_name.clone());
        let repository_url = Some(entry.repository_url.as_str()).filter(|u| !u.is_empty());
        match site
            .metadata()
            .refresh(entry.source_type, &entry.source_name, repository_url)
        {
            Ok(releases) => output.refreshed.push(RefreshedPackage {
                name: entry.source_name.clone(),
                source_type: entry.source_type.as_str().to_string(),
                versions: releases.len(),
            }),
            Err(e) => output.failed.push(RefreshFailure {
                name: entry.source_name.clone(),
                source_type: entry.source_type.as_str().to_string(),
                error: e.to_string(),
            }),
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    match args.format {
        OutputFormat::Json => println!("{}", output.to_json()),
        OutputFormat::Human => {
            for package in &output.refreshed {
                println!("{} {} ({} versions)", "✓".green(), package.name, package.versions);
            }
            for failure in &output.failed {
                println!("{} {}: {}", "✗".red(), failure.name, failure.error);
            }
            if entries.is_empty() {
                println!("No external packages to refresh.");
            }
        }
    }

    if output.failed.is_empty() {
        Ok(())
    } else {
        Err(Error::Network(format!(
            "{} of {} package(s) could not be refreshed",
            output.failed.len(),
            entries.len()
        )))
    }
}
