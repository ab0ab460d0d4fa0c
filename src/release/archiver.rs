//! Building zip artifacts
//!
//! Local sources are archived with every entry under a `{slug}/` prefix,
//! which is what Composer's WordPress installers expect. Paths listed in
//! `.distignore` or marked `export-ignore` in `.gitattributes` are left out,
//! as is VCS metadata.
//!
//! Downloaded or uploaded tarballs are repacked into zip so storage only ever
//! holds one format.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use glob::Pattern;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tar::Archive;
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Never archived, whatever the ignore files say
const ALWAYS_EXCLUDED: &[&str] = &[".git", ".svn", ".hg", ".DS_Store"];

/// An exclusion rule read from an ignore file
#[derive(Debug)]
struct Exclusion {
    pattern: Pattern,
    /// Rule contained a `/` and matches whole relative paths only
    anchored: bool,
}

impl Exclusion {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            return None;
        }
        let rule = line.trim_end_matches('/');
        let anchored = rule.contains('/');
        let pattern = Pattern::new(rule.trim_start_matches('/')).ok()?;
        Some(Self { pattern, anchored })
    }

    fn matches(&self, relative: &str) -> bool {
        if self.anchored {
            self.pattern.matches(relative)
        } else {
            relative.rsplit('/').next().is_some_and(|name| self.pattern.matches(name))
        }
    }
}

fn read_exclusions(source: &Path) -> Vec<Exclusion> {
    let mut rules = Vec::new();

    if let Ok(content) = std::fs::read_to_string(source.join(".distignore")) {
        rules.extend(content.lines().filter_map(Exclusion::parse));
    }

    if let Ok(content) = std::fs::read_to_string(source.join(".gitattributes")) {
        for line in content.lines() {
            let mut parts = line.split_whitespace();
            let Some(path) = parts.next() else {
                continue;
            };
            if parts.any(|attr| attr == "export-ignore") {
                rules.extend(Exclusion::parse(path));
            }
        }
    }

    rules
}

fn file_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644)
}

fn zip_error(dest: &Path, e: impl std::fmt::Display) -> Error {
    Error::FileOperationFailed(format!("Failed to write archive {}: {}", dest.display(), e))
}

/// Archive a plugin/theme directory or a single plugin file into `dest`.
pub fn archive_source(source: &Path, slug: &str, dest: &Path) -> Result<()> {
    if !source.exists() {
        return Err(Error::FileOperationFailed(format!(
            "Source does not exist: {}",
            source.display()
        )));
    }

    let file = File::create(dest).map_err(|e| zip_error(dest, e))?;
    let mut writer = ZipWriter::new(file);

    if source.is_file() {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        writer
            .start_file(format!("{}/{}", slug, name), file_options())
            .map_err(|e| zip_error(dest, e))?;
        let mut input = File::open(source)?;
        std::io::copy(&mut input, &mut writer)?;
        writer.finish().map_err(|e| zip_error(dest, e))?;
        return Ok(());
    }

    let exclusions = read_exclusions(source);
    let mut count = 0usize;

    let walker = WalkDir::new(source)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let relative = relative_path(source, entry.path());
            let name = entry.file_name().to_string_lossy();
            !ALWAYS_EXCLUDED.contains(&name.as_ref())
                && !exclusions.iter().any(|rule| rule.matches(&relative))
        });

    for entry in walker {
        let entry = entry.map_err(|e| zip_error(dest, e))?;
        let relative = relative_path(source, entry.path());
        let name = format!("{}/{}", slug, relative);

        if entry.file_type().is_dir() {
            writer
                .add_directory(name, file_options())
                .map_err(|e| zip_error(dest, e))?;
        } else if entry.file_type().is_file() {
            writer
                .start_file(name, file_options())
                .map_err(|e| zip_error(dest, e))?;
            let mut input = File::open(entry.path())?;
            std::io::copy(&mut input, &mut writer)?;
            count += 1;
        }
    }

    writer.finish().map_err(|e| zip_error(dest, e))?;
    debug!(source = %source.display(), files = count, "archived source");
    Ok(())
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    Tar,
}

/// Sniff an archive's format from its leading bytes.
pub fn detect_format(path: &Path) -> Result<Option<ArchiveFormat>> {
    let mut head = [0u8; 262];
    let mut file = File::open(path)?;
    let mut read = 0;
    while read < head.len() {
        let n = file.read(&mut head[read..])?;
        if n == 0 {
            break;
        }
        read += n;
    }
    let head = &head[..read];

    if head.starts_with(b"PK\x03\x04") || head.starts_with(b"PK\x05\x06") {
        Ok(Some(ArchiveFormat::Zip))
    } else if head.starts_with(&[0x1f, 0x8b]) {
        Ok(Some(ArchiveFormat::TarGz))
    } else if head.len() >= 262 && &head[257..262] == b"ustar" {
        Ok(Some(ArchiveFormat::Tar))
    } else {
        Ok(None)
    }
}

/// Produce a zip at `dest` from a zip or tarball at `source`.
///
/// Zips are copied as they are. Unknown formats are copied too and left for
/// the validators to reject.
pub fn repack_to_zip(source: &Path, dest: &Path) -> Result<()> {
    match detect_format(source)? {
        Some(ArchiveFormat::TarGz) => {
            let reader = GzDecoder::new(File::open(source)?);
            tar_to_zip(Archive::new(reader), dest)
        }
        Some(ArchiveFormat::Tar) => tar_to_zip(Archive::new(File::open(source)?), dest),
        Some(ArchiveFormat::Zip) | None => {
            std::fs::copy(source, dest).map_err(|e| {
                Error::FileOperationFailed(format!(
                    "Failed to copy {} to {}: {}",
                    source.display(),
                    dest.display(),
                    e
                ))
            })?;
            Ok(())
        }
    }
}

fn tar_to_zip<R: Read>(mut archive: Archive<R>, dest: &Path) -> Result<()> {
    let file = File::create(dest).map_err(|e| zip_error(dest, e))?;
    let mut writer = ZipWriter::new(file);

    let entries = archive.entries().map_err(|e| {
        Error::invalid_artifact(dest.display(), format!("unreadable tarball: {}", e))
    })?;

    for entry in entries {
        let mut entry = entry
            .map_err(|e| Error::invalid_artifact(dest.display(), format!("bad tar entry: {}", e)))?;
        let path = entry
            .path()
            .map_err(|e| Error::invalid_artifact(dest.display(), format!("bad tar path: {}", e)))?
            .to_string_lossy()
            .trim_start_matches("./")
            .to_string();
        if path.is_empty() || path.starts_with("pax_global_header") {
            continue;
        }

        let kind = entry.header().entry_type();
        if kind.is_dir() {
            writer
                .add_directory(path, file_options())
                .map_err(|e| zip_error(dest, e))?;
        } else if kind.is_file() {
            writer
                .start_file(path, file_options())
                .map_err(|e| zip_error(dest, e))?;
            let mut buf = Vec::new();
            entry.read_to_end(&mut buf)?;
            writer.write_all(&buf)?;
        }
    }

    writer.finish().map_err(|e| zip_error(dest, e))?;
    Ok(())
}
