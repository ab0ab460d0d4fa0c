//! `records list` command implementation
//!
//! Lists every package the site's repositories produce, one line per package
//! and source. The same plugin installed locally and managed manually shows
//! up twice.

use crate::cli::output_format::{column, OutputFormat};
use crate::cli::output_types::{CommandOutput, ListOutput, ListPackageInfo};
use crate::cli::SiteArgs;
use crate::composer::ComposerPackageTransformer;
use crate::error::Result;
use crate::package::{Package, PackageType};
use crate::repository::{Criteria, PackageRepository};
use clap::{Args, ValueEnum};
use colored::Colorize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TypeFilter {
    Plugin,
    MuPlugin,
    Theme,
    WpCore,
}

impl From<TypeFilter> for PackageType {
    fn from(filter: TypeFilter) -> Self {
        match filter {
            TypeFilter::Plugin => PackageType::Plugin,
            TypeFilter::MuPlugin => PackageType::MuPlugin,
            TypeFilter::Theme => PackageType::Theme,
            TypeFilter::WpCore => PackageType::WpCore,
        }
    }
}

#[derive(Args)]
#[command(after_help = "\
Examples:
  records list                            List packages
  records list --parts                    List parts instead
  records list --type theme --managed     Managed themes only")]
pub struct ListArgs {
    /// List parts instead of packages
    #[arg(long)]
    pub parts: bool,

    /// Only packages of this type
    #[arg(long = "type", value_enum)]
    pub package_type: Option<TypeFilter>,

    /// Only packages with a managed entry
    #[arg(long)]
    pub managed: bool,

    /// Output format: human (default) or json
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub site: SiteArgs,
}

pub fn execute(args: &ListArgs) -> Result<()> {
    let site = args.site.open()?;
    let repository = if args.parts {
        site.repositories().parts()
    } else {
        site.repositories().packages()
    };

    let mut criteria = Criteria::new();
    if let Some(filter) = args.package_type {
        criteria = criteria.package_type(filter.into());
    }
    if args.managed {
        criteria = criteria.is_managed(true);
    }

    let transformer = site.package_transformer();
    let packages = repository.matching(&criteria)?;
    let output = ListOutput {
        package_count: packages.len(),
        packages: packages.iter().map(|p| package_info(p, &transformer)).collect(),
    };

    match args.format {
        OutputFormat::Json => println!("{}", output.to_json()),
        OutputFormat::Human => print_human(&output, args.parts),
    }

    Ok(())
}

fn package_info(package: &Package, transformer: &ComposerPackageTransformer) -> ListPackageInfo {
    ListPackageInfo {
        slug: package.slug().to_string(),
        name: package.name().to_string(),
        composer_name: transformer.composer_name(package.slug()),
        package_type: package.package_type().as_str().to_string(),
        source_type: package.source_type().as_str().to_string(),
        kind: package.kind().as_str().to_string(),
        visibility: package.visibility().as_str().to_string(),
        managed_post_id: package.managed_post_id(),
        installed_version: package.installed_version().map(str::to_string),
        latest_version: package.get_latest_version().map(str::to_string),
        versions: package.releases().iter().map(|r| r.version().to_string()).collect(),
    }
}

fn print_human(output: &ListOutput, parts: bool) {
    let noun = if parts { "part" } else { "package" };
    if output.packages.is_empty() {
        println!("No {}s found.", noun);
        return;
    }

    let slug_width = output.packages.iter().map(|p| p.slug.len()).max().unwrap_or(10).min(40);
    let source_width = output.packages.iter().map(|p| p.source_type.len()).max().unwrap_or(10);

    for package in &output.packages {
        let latest = package.latest_version.as_deref().unwrap_or("-");
        let marker = match (package.managed_post_id, package.visibility.as_str()) {
            (Some(_), "public") => "managed".green().to_string(),
            (Some(_), visibility) => format!("managed, {}", visibility).yellow().to_string(),
            (None, _) => String::new(),
        };

        println!(
            "{}  {}  {:10}  {:>3} release(s)  {}",
            column(&package.slug, slug_width).bold(),
            column(&package.source_type, source_width),
            latest,
            package.versions.len(),
            marker
        );
    }

    println!();
    println!("{} {}(s)", output.package_count, noun);
}
