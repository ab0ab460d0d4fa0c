//! Composer projection of the package repositories
//!
//! - [`package`]: Composer names and dependency maps for single packages
//! - [`repository`]: the `{"packages": {name: {version: data}}}` document
//! - [`packages_json`]: the files Composer clients fetch (`packages.json`,
//!   include files and Composer 2 `p2/` metadata)
//! - [`composition`]: composer.json assembly for a set of requested packages

pub mod composition;
pub mod package;
pub mod packages_json;
pub mod repository;

pub use composition::{CompositionBuilder, RequestedPackage};
pub use package::ComposerPackageTransformer;
pub use packages_json::{PackagesJsonWriter, WriteSummary};
pub use repository::{ComposerRepository, ComposerRepositoryTransformer, VersionData};
