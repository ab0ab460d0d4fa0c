//! `records release` command implementation
//!
//! Makes sure the artifact for one release is in storage and prints where it
//! is. The identifier is a slug or a hashid; the version defaults to
//! `latest`.

use crate::cli::output_format::OutputFormat;
use crate::cli::output_types::{CommandOutput, ReleaseOutput};
use crate::cli::SiteArgs;
use crate::context::RequestContext;
use crate::error::Result;
use crate::hash;
use clap::Args;
use colored::Colorize;

#[derive(Args)]
#[command(after_help = "\
Examples:
  records release akismet                 Store the latest release
  records release akismet 5.3.1           Store a specific version")]
pub struct ReleaseArgs {
    /// Package slug or hashid
    pub identifier: String,

    /// Release version, or 'latest'
    #[arg(default_value = "latest")]
    pub version: String,

    /// Output format: human (default) or json
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub site: SiteArgs,
}

pub fn execute(args: &ReleaseArgs) -> Result<()> {
    let site = args.site.open()?;
    let service = site.download_service();
    let response = service.download(
        &RequestContext::administrator(),
        &args.identifier,
        &args.version,
    )?;

    let output = ReleaseOutput {
        identifier: args.identifier.clone(),
        version: args.version.clone(),
        sha1: hash::sha1_file(&response.path)?,
        path: response.path,
        filename: response.filename,
        size: response.content_length,
    };

    match args.format {
        OutputFormat::Json => println!("{}", output.to_json()),
        OutputFormat::Human => {
            println!("{} {}", "✓".green(), output.path.display());
            println!("  {} bytes, sha1 {}", output.size, output.sha1);
        }
    }

    Ok(())
}
