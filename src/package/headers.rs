//! Plugin and theme file headers
//!
//! WordPress describes an installed plugin in the comment block of its main
//! PHP file and a theme in the header of `style.css`:
//!
//! ```text
//! /**
//!  * Plugin Name: Acme Widgets
//!  * Version:     1.4.2
//!  * Author:      Acme Code
//!  */
//! ```
//!
//! Only the first 8 KiB of a file are read. Missing or malformed headers
//! produce empty fields, never an error.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Bytes of a file inspected for headers
const HEADER_BYTES: usize = 8 * 1024;

/// Headers read from plugin and theme files
const KNOWN_HEADERS: &[&str] = &[
    "Plugin Name",
    "Plugin URI",
    "Theme Name",
    "Theme URI",
    "Version",
    "Description",
    "Author",
    "Author URI",
    "License",
    "Tags",
    "Requires at least",
    "Tested up to",
    "Requires PHP",
];

lazy_static! {
    static ref COMMENT_CLOSE: Regex = Regex::new(r"\s*(?:\*/|\?>).*$").unwrap();
    static ref HEADER_PATTERNS: HashMap<&'static str, Regex> = KNOWN_HEADERS
        .iter()
        .map(|header| (*header, Regex::new(&header_pattern(header)).unwrap()))
        .collect();
}

fn header_pattern(header: &str) -> String {
    format!(r"(?mi)^[ \t/*#@]*{}:(.*)$", regex::escape(header))
}

/// Header values shared by plugins and themes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceHeaders {
    pub name: String,
    pub uri: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub author_uri: String,
    pub license: String,
    pub tags: Vec<String>,
    pub requires_at_least: String,
    pub tested_up_to: String,
    pub requires_php: String,
}

impl SourceHeaders {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

/// Read a single header value from file contents.
pub fn header_value(content: &str, header: &str) -> String {
    match HEADER_PATTERNS.get(header) {
        Some(re) => capture_header(re, content),
        None => Regex::new(&header_pattern(header))
            .map(|re| capture_header(&re, content))
            .unwrap_or_default(),
    }
}

fn capture_header(re: &Regex, content: &str) -> String {
    re.captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| COMMENT_CLOSE.replace(m.as_str(), "").trim().to_string())
        .unwrap_or_default()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Read the leading bytes of a file as text; unreadable files yield "".
fn read_head(path: &Path) -> String {
    let mut buf = Vec::with_capacity(HEADER_BYTES);
    let result = std::fs::File::open(path)
        .and_then(|f| f.take(HEADER_BYTES as u64).read_to_end(&mut buf));
    match result {
        Ok(_) => String::from_utf8_lossy(&buf).replace('\r', "\n"),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "cannot read headers");
            String::new()
        }
    }
}

/// Parse plugin headers from a PHP file.
pub fn parse_plugin_headers(path: &Path) -> SourceHeaders {
    let content = read_head(path);
    SourceHeaders {
        name: header_value(&content, "Plugin Name"),
        uri: header_value(&content, "Plugin URI"),
        version: header_value(&content, "Version"),
        description: header_value(&content, "Description"),
        author: header_value(&content, "Author"),
        author_uri: header_value(&content, "Author URI"),
        license: header_value(&content, "License"),
        tags: split_list(&header_value(&content, "Tags")),
        requires_at_least: header_value(&content, "Requires at least"),
        tested_up_to: header_value(&content, "Tested up to"),
        requires_php: header_value(&content, "Requires PHP"),
    }
}

/// Parse theme headers from a theme directory's `style.css`.
pub fn parse_theme_headers(theme_dir: &Path) -> SourceHeaders {
    let content = read_head(&theme_dir.join("style.css"));
    SourceHeaders {
        name: header_value(&content, "Theme Name"),
        uri: header_value(&content, "Theme URI"),
        version: header_value(&content, "Version"),
        description: header_value(&content, "Description"),
        author: header_value(&content, "Author"),
        author_uri: header_value(&content, "Author URI"),
        license: header_value(&content, "License"),
        tags: split_list(&header_value(&content, "Tags")),
        requires_at_least: header_value(&content, "Requires at least"),
        tested_up_to: header_value(&content, "Tested up to"),
        requires_php: header_value(&content, "Requires PHP"),
    }
}

/// An installed plugin found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginFile {
    /// Path relative to the plugins directory (`acme/acme.php` or `hello.php`)
    pub basename: String,
    /// Absolute path of the main plugin file
    pub file: PathBuf,
    /// What gets archived: the plugin directory, or the file itself for
    /// single-file plugins
    pub source: PathBuf,
}

fn has_plugin_header(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("php")
        && !header_value(&read_head(path), "Plugin Name").is_empty()
}

fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.flatten().map(|e| e.path()).collect(),
        Err(_) => return Vec::new(),
    };
    entries.sort();
    entries
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Find installed plugins the way WordPress does: PHP files with a
/// `Plugin Name` header at the top level or one directory deep.
pub fn find_plugin_files(plugins_dir: &Path) -> Vec<PluginFile> {
    let mut plugins = Vec::new();

    for entry in sorted_entries(plugins_dir) {
        if is_hidden(&entry) {
            continue;
        }
        let name = match entry.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };

        if entry.is_dir() {
            let main = sorted_entries(&entry)
                .into_iter()
                .find(|f| f.is_file() && has_plugin_header(f));
            if let Some(file) = main {
                let file_name = file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string();
                plugins.push(PluginFile {
                    basename: format!("{}/{}", name, file_name),
                    file,
                    source: entry.clone(),
                });
            }
        } else if entry.is_file() && has_plugin_header(&entry) {
            plugins.push(PluginFile {
                basename: name,
                file: entry.clone(),
                source: entry.clone(),
            });
        }
    }

    plugins
}

/// Find installed themes: directories holding a `style.css` with a
/// `Theme Name` header.
pub fn find_theme_dirs(themes_dir: &Path) -> Vec<PathBuf> {
    sorted_entries(themes_dir)
        .into_iter()
        .filter(|p| p.is_dir() && !is_hidden(p))
        .filter(|p| !parse_theme_headers(p).name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PLUGIN: &str = "<?php\n/**\n * Plugin Name: Acme Widgets\
        \n * Plugin URI: https://acme.test/widgets\n * Description: Widgets for everyone.\
        \n * Version: 1.4.2\n * Author: Acme Code\n * Author URI: https://acme.test\
        \n * License: GPLv2 or later\n * Requires at least: 5.8\n * Requires PHP: 7.4\
        \n */\n";

    #[test]
    fn test_parse_plugin_headers() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("acme.php");
        fs::write(&file, PLUGIN).unwrap();

        let headers = parse_plugin_headers(&file);
        assert_eq!(headers.name, "Acme Widgets");
        assert_eq!(headers.version, "1.4.2");
        assert_eq!(headers.author_uri, "https://acme.test");
        assert_eq!(headers.requires_php, "7.4");
        assert_eq!(headers.license, "GPLv2 or later");
    }

    #[test]
    fn test_header_on_closing_comment_line() {
        let content = "/* Theme Name: Twenty Acme */";
        assert_eq!(header_value(content, "Theme Name"), "Twenty Acme");
    }

    #[test]
    fn test_parsed_headers_are_precompiled() {
        let content = "/*\nPlugin Name: Acme\nX-Custom: yes\n*/";
        for header in KNOWN_HEADERS {
            assert!(HEADER_PATTERNS.contains_key(header));
        }
        assert_eq!(header_value(content, "Plugin Name"), "Acme");
        assert_eq!(header_value(content, "X-Custom"), "yes");
    }

    #[test]
    fn test_missing_file_degrades_to_empty() {
        let headers = parse_plugin_headers(Path::new("/nonexistent/plugin.php"));
        assert!(headers.is_empty());
        assert!(headers.version.is_empty());
    }

    #[test]
    fn test_find_plugin_files() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("acme")).unwrap();
        fs::write(temp.path().join("acme/acme.php"), PLUGIN).unwrap();
        fs::write(temp.path().join("acme/helpers.php"), "<?php // helpers").unwrap();
        fs::write(
            temp.path().join("hello.php"),
            "<?php\n/*\nPlugin Name: Hello\nVersion: 1.7\n*/",
        )
        .unwrap();
        fs::write(temp.path().join("index.php"), "<?php // Silence is golden.").unwrap();
        fs::create_dir(temp.path().join("empty")).unwrap();

        let plugins = find_plugin_files(temp.path());
        let basenames: Vec<&str> = plugins.iter().map(|p| p.basename.as_str()).collect();
        assert_eq!(basenames, vec!["acme/acme.php", "hello.php"]);
        assert_eq!(plugins[0].source, temp.path().join("acme"));
        assert_eq!(plugins[1].source, temp.path().join("hello.php"));
    }

    #[test]
    fn test_find_theme_dirs() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("twentyacme")).unwrap();
        fs::write(
            temp.path().join("twentyacme/style.css"),
            "/*\nTheme Name: Twenty Acme\nVersion: 2.0\nTags: blog, one-column\n*/",
        )
        .unwrap();
        fs::create_dir(temp.path().join("broken")).unwrap();

        let themes = find_theme_dirs(temp.path());
        assert_eq!(themes, vec![temp.path().join("twentyacme")]);

        let headers = parse_theme_headers(&themes[0]);
        assert_eq!(headers.version, "2.0");
        assert_eq!(headers.tags, vec!["blog", "one-column"]);
    }
}
