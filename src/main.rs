use anyhow::Context;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Parser, Subcommand};
use colored::Colorize;
use records::cli;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "records")]
#[command(version)]
#[command(before_help = concat!("\u{25b8} records ", env!("CARGO_PKG_VERSION")))]
#[command(about = "Private Composer repository for WordPress plugins, themes and parts")]
#[command(
    long_about = "records aggregates installed, managed and externally tracked WordPress \
packages into a Composer repository, builds release zips on demand and writes packages.json."
)]
#[command(after_help = "\
Getting started:
  records init                       Create records.toml in current directory
  records list                       Show every package the site provides
  records build                      Write packages.json for Composer clients
  records release akismet            Build and store the latest akismet zip

Logging: set RECORDS_LOG (e.g. RECORDS_LOG=debug) or pass --verbose")]
struct Cli {
    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    // === Site (1-9) ===
    /// Initialize a new site
    #[command(display_order = 1)]
    Init(cli::init::InitArgs),
    /// List packages or parts
    #[command(display_order = 2)]
    List(cli::list::ListArgs),

    // === Repository (10-19) ===
    /// Write packages.json and its include files
    #[command(display_order = 10)]
    Build(cli::build::BuildArgs),
    /// Store the artifact for a release and print its path
    #[command(display_order = 11)]
    Release(cli::release::ReleaseArgs),
    /// Fetch external package metadata into the cache
    #[command(display_order = 12)]
    Refresh(cli::refresh::RefreshArgs),
    /// Assemble a composer.json for requested packages
    #[command(display_order = 13)]
    Composition(cli::composition::CompositionArgs),
}

/// Handle clap parse errors with suggestions for common mistakes
fn handle_parse_error(mut err: clap::Error) -> ! {
    if err.kind() == ErrorKind::InvalidSubcommand {
        if let Some(ContextValue::String(cmd)) = err.get(ContextKind::InvalidSubcommand) {
            let suggestions = match cmd.as_str() {
                "download" | "store" | "dist" => Some(vec![
                    "use 'records release' to build an artifact: records release akismet".into(),
                ]),
                "publish" | "generate" | "write" => Some(vec![
                    "use 'records build' to write packages.json".into(),
                ]),
                "update" | "fetch" => Some(vec![
                    "use 'records refresh' to update external metadata".into(),
                ]),
                _ => None,
            };
            if let Some(suggestions) = suggestions {
                err.insert(ContextKind::Suggested, ContextValue::StyledStrs(suggestions));
            }
        }
    }
    err.exit()
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("records=debug")
    } else {
        EnvFilter::try_from_env("RECORDS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(command: &Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init(args) => cli::init::execute(args).context("init failed"),
        Commands::List(args) => cli::list::execute(args).context("cannot list packages"),
        Commands::Build(args) => cli::build::execute(args).context("build failed"),
        Commands::Release(args) => cli::release::execute(args)
            .with_context(|| format!("cannot store release {} {}", args.identifier, args.version)),
        Commands::Refresh(args) => cli::refresh::execute(args).context("refresh failed"),
        Commands::Composition(args) => {
            cli::composition::execute(args).context("cannot assemble composition")
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => handle_parse_error(e),
    };

    init_logging(cli.verbose);

    if let Err(e) = run(&cli.command) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}
