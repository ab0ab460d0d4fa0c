//! WordPress `readme.txt` parsing
//!
//! Only the header block and the short description are used:
//!
//! ```text
//! === Acme Widgets ===
//! Contributors: acme, jdoe
//! Tags: widgets, blocks
//! Requires at least: 5.8
//! Tested up to: 6.4
//! Requires PHP: 7.4
//! License: GPLv2 or later
//!
//! Widgets for everyone.
//!
//! == Description ==
//! ```

use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Readme {
    pub name: String,
    pub contributors: Vec<String>,
    pub tags: Vec<String>,
    pub requires_at_least: String,
    pub tested_up_to: String,
    pub requires_php: String,
    pub stable_tag: String,
    pub license: String,
    pub short_description: String,
}

impl Readme {
    /// Read and parse a readme; a missing or unreadable file is an empty readme.
    pub fn from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut readme = Readme::default();
        let mut lines = content.lines().map(str::trim).peekable();

        // Skip leading blank lines, then the optional "=== Name ===" title
        while lines.peek().is_some_and(|l| l.is_empty()) {
            lines.next();
        }
        if let Some(title) = lines.peek() {
            if title.starts_with("===") {
                readme.name = title.trim_matches('=').trim().to_string();
                lines.next();
            }
        }

        // Header block: "Key: value" lines until the first blank line
        for line in lines.by_ref() {
            if line.is_empty() {
                break;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_lowercase().as_str() {
                "contributors" => readme.contributors = split_list(value),
                "tags" => readme.tags = split_list(value),
                "requires at least" => readme.requires_at_least = value.to_string(),
                "tested up to" => readme.tested_up_to = value.to_string(),
                "requires php" => readme.requires_php = value.to_string(),
                "stable tag" => readme.stable_tag = value.to_string(),
                "license" => readme.license = value.to_string(),
                _ => {}
            }
        }

        // Short description: first paragraph before any "== Section =="
        let mut paragraph = Vec::new();
        for line in lines {
            if line.starts_with("==") {
                break;
            }
            if line.is_empty() {
                if paragraph.is_empty() {
                    continue;
                }
                break;
            }
            paragraph.push(line);
        }
        readme.short_description = paragraph.join(" ");

        readme
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
