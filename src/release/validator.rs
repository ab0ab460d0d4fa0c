//! Artifact validators
//!
//! Validators run on a freshly built artifact before it is moved into
//! storage. They never return `false`: a failure is always an
//! [`Error::InvalidPackageArtifact`].

use crate::error::{Error, Result};
use crate::release::Release;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

pub trait ArtifactValidator: Send + Sync {
    fn validate(&self, artifact: &Path, release: &Release) -> Result<()>;
}

fn open_archive(artifact: &Path) -> Result<zip::ZipArchive<File>> {
    let file = File::open(artifact)
        .map_err(|e| Error::invalid_artifact(artifact.display(), format!("unreadable: {}", e)))?;
    zip::ZipArchive::new(file).map_err(|e| {
        Error::invalid_artifact(artifact.display(), format!("not a zip archive: {}", e))
    })
}

/// The artifact must be a readable, non-empty zip archive.
#[derive(Debug, Default)]
pub struct ZipValidator;

impl ArtifactValidator for ZipValidator {
    fn validate(&self, artifact: &Path, release: &Release) -> Result<()> {
        let mut archive = open_archive(artifact)?;
        if archive.is_empty() {
            return Err(Error::invalid_artifact(
                artifact.display(),
                format!("empty archive for {} {}", release.slug(), release.version()),
            ));
        }
        for i in 0..archive.len() {
            archive.by_index(i).map_err(|e| {
                Error::invalid_artifact(artifact.display(), format!("corrupt entry {}: {}", i, e))
            })?;
        }
        Ok(())
    }
}

/// Rejects archives whose top level holds `__MACOSX` or a dot-directory.
#[derive(Debug, Default)]
pub struct HiddenDirectoryValidator;

impl ArtifactValidator for HiddenDirectoryValidator {
    fn validate(&self, artifact: &Path, _release: &Release) -> Result<()> {
        let archive = open_archive(artifact)?;

        let top_level: BTreeSet<&str> = archive
            .file_names()
            .filter_map(|name| {
                let (first, rest) = name.split_once('/')?;
                // Only directories count; a top-level ".distignore" file is fine
                (!rest.is_empty() || name.ends_with('/')).then_some(first)
            })
            .collect();

        for dir in top_level {
            if dir == "__MACOSX" || (dir.starts_with('.') && dir != ".") {
                return Err(Error::invalid_artifact(
                    artifact.display(),
                    format!("contains hidden directory {}/", dir),
                ));
            }
        }
        Ok(())
    }
}

/// Validators every built artifact goes through
pub fn default_validators() -> Vec<Box<dyn ArtifactValidator>> {
    vec![Box::new(ZipValidator), Box::new(HiddenDirectoryValidator)]
}
