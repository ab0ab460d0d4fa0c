//! `records composition` command implementation
//!
//! Prints (or writes) a composer.json requiring the given packages from this
//! repository. Names are checked against what the repository publishes.

use crate::cli::SiteArgs;
use crate::composer::RequestedPackage;
use crate::context::RequestContext;
use crate::error::{Error, Result};
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Args)]
#[command(after_help = "\
Examples:
  records composition pressody-records/akismet
  records composition pressody-records/acme:^2.0 --overrides site.json -o composer.json")]
pub struct CompositionArgs {
    /// Packages to require, as NAME or NAME:CONSTRAINT
    #[arg(required = true, value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// JSON file with composer.json properties to apply
    #[arg(long, value_name = "FILE")]
    pub overrides: Option<PathBuf>,

    /// Allow private and draft packages
    #[arg(long)]
    pub include_private: bool,

    /// Write to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub site: SiteArgs,
}

pub fn execute(args: &CompositionArgs) -> Result<()> {
    let site = args.site.open()?;
    let context = if args.include_private {
        RequestContext::administrator()
    } else {
        RequestContext::anonymous()
    };

    let overrides: Option<Value> = match &args.overrides {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read overrides {}: {}", path.display(), e))
            })?;
            Some(serde_json::from_str(&content)?)
        }
        None => None,
    };

    let requested: Vec<RequestedPackage> = args
        .packages
        .iter()
        .map(|p| RequestedPackage::parse(p))
        .collect();
    let repository = site
        .repository_transformer()
        .transform(&site.repositories().everything(), &context)?;
    let composition = site
        .composition_builder()?
        .build(&repository, &requested, overrides.as_ref())?;

    let json = serde_json::to_string_pretty(&composition)?;
    match &args.output {
        Some(path) => std::fs::write(path, format!("{}\n", json))?,
        None => println!("{}", json),
    }

    Ok(())
}
