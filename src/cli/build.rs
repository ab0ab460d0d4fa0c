//! `records build` command implementation
//!
//! Writes packages.json, its include files and the Composer 2 metadata for
//! every package and part. Only public packages are published unless
//! `--include-private` is given.

use crate::cli::output_format::OutputFormat;
use crate::cli::output_types::{BuildOutput, CommandOutput};
use crate::cli::SiteArgs;
use crate::context::RequestContext;
use crate::error::Result;
use clap::Args;
use colored::Colorize;

#[derive(Args)]
#[command(after_help = "\
Examples:
  records build                           Publish public packages
  records build --include-private         Publish everything (private mirrors)")]
pub struct BuildArgs {
    /// Publish private and draft packages too
    #[arg(long)]
    pub include_private: bool,

    /// Output format: human (default) or json
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub site: SiteArgs,
}

pub fn execute(args: &BuildArgs) -> Result<()> {
    let site = args.site.open()?;
    let context = if args.include_private {
        RequestContext::administrator()
    } else {
        RequestContext::anonymous()
    };

    let everything = site.repositories().everything();
    let repository = site.repository_transformer().transform(&everything, &context)?;
    let summary = site.packages_json_writer().write(&repository)?;

    let output = BuildOutput {
        root: summary.root,
        packages: summary.packages,
        versions: summary.versions,
        files_written: summary.files_written,
        files_pruned: summary.files_pruned,
        include_private: args.include_private,
    };

    match args.format {
        OutputFormat::Json => println!("{}", output.to_json()),
        OutputFormat::Human => {
            println!(
                "{} Wrote {} ({} package(s), {} version(s))",
                "✓".green(),
                output.root.display(),
                output.packages,
                output.versions
            );
            if output.files_pruned > 0 {
                println!("  pruned {} old include file(s)", output.files_pruned);
            }
        }
    }

    Ok(())
}
