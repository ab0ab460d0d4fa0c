//! Site root detection
//!
//! Walks up the directory tree looking for `records.toml`.

use crate::config::CONFIG_FILE;
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Find the site root by walking up from the given directory.
///
/// Returns the first directory containing `records.toml`, or None.
pub fn find_site_root(start_dir: &Path) -> Result<Option<PathBuf>> {
    // Canonicalize to resolve symlinks and get an absolute path
    let mut current = start_dir
        .canonicalize()
        .unwrap_or_else(|_| start_dir.to_path_buf());

    loop {
        if is_site_root(&current) {
            return Ok(Some(current));
        }

        match current.parent() {
            Some(parent) if parent != current => current = parent.to_path_buf(),
            _ => break,
        }
    }

    Ok(None)
}

/// Find the site root starting from the current working directory.
pub fn find_site_root_from_cwd() -> Result<Option<PathBuf>> {
    let cwd = std::env::current_dir()?;
    find_site_root(&cwd)
}

/// Check if a directory holds a site configuration.
pub fn is_site_root(dir: &Path) -> bool {
    dir.join(CONFIG_FILE).exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_root_with_config() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "").unwrap();

        let root = find_site_root(temp.path()).unwrap().unwrap();
        assert_eq!(root, temp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_find_root_walk_up() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("wp-content").join("plugins");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "").unwrap();

        let root = find_site_root(&nested).unwrap().unwrap();
        assert_eq!(root, temp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_no_site_found() {
        let temp = TempDir::new().unwrap();
        assert!(find_site_root(temp.path()).unwrap().is_none());
        assert!(!is_site_root(temp.path()));
    }
}
