//! `records init` command implementation
//!
//! Creates a minimal site:
//! - records.toml (configuration with commented defaults)
//! - managed.json (empty managed package catalogue)
//!
//! Storage and the output directory are created on demand by `records build`
//! and `records release`.

use crate::cli::output_format::OutputFormat;
use crate::cli::output_types::{CommandOutput, InitOutput};
use crate::config::{self, Config};
use crate::error::{Error, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

const EMPTY_MANAGED: &str = "{\n  \"packages\": []\n}\n";

#[derive(Args)]
#[command(after_help = "\
Examples:
  records init                            Initialize in current directory
  records init mysite                     Create a new site directory")]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Overwrite existing site files
    #[arg(long)]
    pub force: bool,

    /// Output format: human (default) or json
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,
}

pub fn execute(args: &InitArgs) -> Result<()> {
    let path = args.path.as_deref().unwrap_or_else(|| Path::new("."));
    let created = create_site(path, args.force)?;

    let output = InitOutput {
        status: "success".to_string(),
        path: path.canonicalize().unwrap_or_else(|_| path.to_path_buf()),
        created,
    };

    match args.format {
        OutputFormat::Json => println!("{}", output.to_json()),
        OutputFormat::Human => {
            println!("{} Initialized site at {}", "✓".green(), output.path.display());
            for file in &output.created {
                println!("  created {}", file.display());
            }
            println!();
            println!("Edit {} to point at your plugins and themes,", config::CONFIG_FILE);
            println!("then run 'records list' to see what was found.");
        }
    }

    Ok(())
}

/// Write the site files, returning the paths created.
pub fn create_site(path: &Path, force: bool) -> Result<Vec<PathBuf>> {
    let config_path = path.join(config::CONFIG_FILE);
    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists at {}. Use --force to overwrite.",
            config::CONFIG_FILE,
            path.display()
        )));
    }

    fs::create_dir_all(path)?;
    let mut created = Vec::new();

    fs::write(&config_path, config::generate_config_template())?;
    created.push(config_path);

    let managed_path = path.join(&Config::default().site.managed_file);
    if force || !managed_path.exists() {
        fs::write(&managed_path, EMPTY_MANAGED)?;
        created.push(managed_path);
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_site() {
        let temp = TempDir::new().unwrap();
        let created = create_site(temp.path(), false).unwrap();
        assert_eq!(created.len(), 2);
        assert!(config::root::is_site_root(temp.path()));
        assert!(config::load_config(temp.path()).unwrap().is_some());
    }

    #[test]
    fn test_existing_site_needs_force() {
        let temp = TempDir::new().unwrap();
        create_site(temp.path(), false).unwrap();
        assert!(matches!(create_site(temp.path(), false), Err(Error::Config(_))));
        assert!(create_site(temp.path(), true).is_ok());
    }
}
