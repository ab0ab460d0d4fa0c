//! Composer-compatible version handling
//!
//! Release versions come from plugin headers, stored artifact names and
//! external Composer metadata, so they arrive in every shape Composer accepts
//! (`1.2`, `v1.2.3`, `2.0-beta1`, `dev-main`, `1.x-dev`, `20240115`).
//! This module normalizes them to Composer's four-component form, derives
//! their stability and orders them.

pub mod constraint;

pub use constraint::Constraint;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Placeholder component Composer uses for `x` in branch versions
const BRANCH_COMPONENT: u64 = 9_999_999;

lazy_static! {
    static ref CLASSICAL: Regex = Regex::new(concat!(
        r"^(\d{1,5})(\.\d+)?(\.\d+)?(\.\d+)?",
        r"(?:[-._]?(stable|beta|b|rc|alpha|a|patch|pl|p)((?:[.-]?\d+)*))?(?:[-.]?(dev))?$",
    ))
    .unwrap();
    static ref DATE: Regex = Regex::new(concat!(
        r"^(\d{4}(?:[.:-]?\d{2}){1,6}(?:[.:-]?\d{1,3}){0,2})",
        r"(?:[-._]?(stable|beta|b|rc|alpha|a|patch|pl|p)((?:[.-]?\d+)*))?(?:[-.]?(dev))?$",
    ))
    .unwrap();
    static ref BRANCH: Regex = Regex::new(
        r"^v?(\d+)(\.(?:\d+|[x*]))?(\.(?:\d+|[x*]))?(\.(?:\d+|[x*]))?[.-]dev$"
    )
    .unwrap();
}

/// Release stability, ordered from least to most stable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    /// Development branch
    Dev,
    /// Alpha pre-release
    Alpha,
    /// Beta pre-release
    Beta,
    /// Release candidate
    #[serde(rename = "RC")]
    Rc,
    /// Stable release
    #[default]
    Stable,
}

impl Stability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stability::Dev => "dev",
            Stability::Alpha => "alpha",
            Stability::Beta => "beta",
            Stability::Rc => "RC",
            Stability::Stable => "stable",
        }
    }

    /// Parse a stability flag as written in managed entries (`stable`, `RC`, ...).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "stable" | "" => Some(Stability::Stable),
            "rc" => Some(Stability::Rc),
            "beta" => Some(Stability::Beta),
            "alpha" => Some(Stability::Alpha),
            "dev" => Some(Stability::Dev),
            _ => None,
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a version string the way Composer does.
///
/// Returns `None` for strings Composer would reject.
pub fn normalize(version: &str) -> Option<String> {
    let trimmed = version.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_lowercase();
    if let Some(branch) = lower.strip_prefix("dev-") {
        if branch.is_empty() {
            return None;
        }
        return Some(format!("dev-{}", &trimmed[4..]));
    }

    let without_prefix = lower.strip_prefix('v').unwrap_or(&lower);

    if let Some(caps) = CLASSICAL.captures(without_prefix) {
        let mut parts: Vec<String> = (1..=4)
            .map(|i| {
                caps.get(i)
                    .map(|m| trim_leading_zeros(m.as_str().trim_start_matches('.')))
                    .unwrap_or_else(|| "0".to_string())
            })
            .collect();
        parts.truncate(4);
        return Some(with_modifier(
            parts.join("."),
            caps.get(5).map(|m| m.as_str()),
            caps.get(6).map(|m| m.as_str()),
            caps.get(7).is_some(),
        ));
    }

    if let Some(caps) = DATE.captures(without_prefix) {
        let date = caps
            .get(1)
            .map(|m| m.as_str())
            .unwrap_or_default()
            .replace([':', '-'], ".");
        return Some(with_modifier(
            date,
            caps.get(2).map(|m| m.as_str()),
            caps.get(3).map(|m| m.as_str()),
            caps.get(4).is_some(),
        ));
    }

    if let Some(caps) = BRANCH.captures(without_prefix) {
        let mut parts = Vec::with_capacity(4);
        for i in 1..=4 {
            match caps.get(i) {
                Some(m) => {
                    let part = m.as_str().trim_start_matches('.');
                    if part == "x" || part == "*" {
                        parts.push(BRANCH_COMPONENT.to_string());
                    } else {
                        parts.push(part.to_string());
                    }
                }
                None => parts.push(BRANCH_COMPONENT.to_string()),
            }
        }
        return Some(format!("{}-dev", parts.join(".")));
    }

    None
}

fn trim_leading_zeros(part: &str) -> String {
    let trimmed = part.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn with_modifier(base: String, modifier: Option<&str>, number: Option<&str>, dev: bool) -> String {
    let mut out = base;
    if let Some(modifier) = modifier {
        let label = match modifier {
            "stable" => "",
            "a" | "alpha" => "alpha",
            "b" | "beta" => "beta",
            "rc" => "RC",
            "p" | "pl" | "patch" => "patch",
            other => other,
        };
        if !label.is_empty() {
            out.push('-');
            out.push_str(label);
            if let Some(number) = number {
                out.push_str(number.trim_start_matches(['.', '-']));
            }
        }
    }
    if dev {
        out.push_str("-dev");
    }
    out
}

/// Stability of a raw or normalized version string.
pub fn stability_of(version: &str) -> Stability {
    let lower = version.trim().to_lowercase();
    if lower.starts_with("dev-") || lower.ends_with("-dev") || lower.ends_with(".dev") {
        return Stability::Dev;
    }

    let normalized = normalize(&lower).unwrap_or(lower);
    if let Some((_, modifier)) = normalized.split_once('-') {
        let modifier = modifier.to_lowercase();
        if modifier.starts_with("rc") {
            return Stability::Rc;
        }
        if modifier.starts_with("beta") {
            return Stability::Beta;
        }
        if modifier.starts_with("alpha") {
            return Stability::Alpha;
        }
    }
    Stability::Stable
}

/// A parsed, comparable version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    normalized: String,
    parts: Vec<u64>,
    branch: Option<String>,
    modifier_rank: u8,
    modifier_number: u64,
}

impl Version {
    /// Parse any Composer-acceptable version string.
    pub fn parse(version: &str) -> Option<Self> {
        let normalized = normalize(version)?;

        if let Some(branch) = normalized.strip_prefix("dev-") {
            return Some(Self {
                branch: Some(branch.to_string()),
                normalized,
                parts: Vec::new(),
                modifier_rank: 0,
                modifier_number: 0,
            });
        }

        let (numeric, modifier) = match normalized.split_once('-') {
            Some((n, m)) => (n, Some(m)),
            None => (normalized.as_str(), None),
        };

        let parts = numeric
            .split('.')
            .map(|p| p.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;

        let (modifier_rank, modifier_number) = match modifier {
            None => (4, 0),
            Some(m) => modifier_rank(m),
        };

        Some(Self {
            normalized,
            parts,
            branch: None,
            modifier_rank,
            modifier_number,
        })
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn stability(&self) -> Stability {
        stability_of(&self.normalized)
    }

    /// Leading numeric components (empty for `dev-` branches)
    pub fn parts(&self) -> &[u64] {
        &self.parts
    }

    /// Build a version from numeric components (used for constraint bounds).
    pub(crate) fn from_parts(parts: &[u64], dev: bool) -> Self {
        let mut padded = parts.to_vec();
        padded.resize(4, 0);
        let mut normalized = padded
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(".");
        if dev {
            normalized.push_str("-dev");
        }
        Self {
            normalized,
            parts: padded,
            branch: None,
            modifier_rank: if dev { 0 } else { 4 },
            modifier_number: 0,
        }
    }
}

/// Rank of a normalized modifier: dev < alpha < beta < RC < (none) < patch
fn modifier_rank(modifier: &str) -> (u8, u64) {
    let lower = modifier.to_lowercase();
    let (rank, rest) = if lower.ends_with("dev") {
        (0, "")
    } else if let Some(rest) = lower.strip_prefix("alpha") {
        (1, rest)
    } else if let Some(rest) = lower.strip_prefix("beta") {
        (2, rest)
    } else if let Some(rest) = lower.strip_prefix("rc") {
        (3, rest)
    } else if let Some(rest) = lower.strip_prefix("patch") {
        (5, rest)
    } else {
        (4, "")
    };
    let number = rest
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap_or(0);
    (rank, number)
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // Named branches sort below every numbered version
        match (&self.branch, &other.branch) {
            (Some(a), Some(b)) => return a.cmp(b),
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => {}
        }

        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }

        self.modifier_rank
            .cmp(&other.modifier_rank)
            .then(self.modifier_number.cmp(&other.modifier_number))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

/// Compare two raw version strings; unparseable versions sort lowest.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (Version::parse(a), Version::parse(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_classical() {
        assert_eq!(normalize("1").as_deref(), Some("1.0.0.0"));
        assert_eq!(normalize("1.2").as_deref(), Some("1.2.0.0"));
        assert_eq!(normalize("v1.2.3").as_deref(), Some("1.2.3.0"));
        assert_eq!(normalize("1.2.3.4").as_deref(), Some("1.2.3.4"));
        assert_eq!(normalize("01.02").as_deref(), Some("1.2.0.0"));
    }

    #[test]
    fn test_normalize_modifiers() {
        assert_eq!(normalize("1.0-beta2").as_deref(), Some("1.0.0.0-beta2"));
        assert_eq!(normalize("1.0.0-b2").as_deref(), Some("1.0.0.0-beta2"));
        assert_eq!(normalize("2.0RC1").as_deref(), Some("2.0.0.0-RC1"));
        assert_eq!(normalize("1.0.0-alpha").as_deref(), Some("1.0.0.0-alpha"));
        assert_eq!(normalize("1.0-stable").as_deref(), Some("1.0.0.0"));
        assert_eq!(normalize("1.0.0-pl3").as_deref(), Some("1.0.0.0-patch3"));
    }

    #[test]
    fn test_normalize_branches_and_dates() {
        assert_eq!(normalize("dev-main").as_deref(), Some("dev-main"));
        assert_eq!(
            normalize("1.x-dev").as_deref(),
            Some("1.9999999.9999999.9999999-dev")
        );
        assert_eq!(normalize("20240115").as_deref(), Some("20240115"));
        assert_eq!(normalize("2024-01-15").as_deref(), Some("2024.01.15"));
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(normalize("").is_none());
        assert!(normalize("latest").is_none());
        assert!(normalize("dev-").is_none());
        assert!(normalize("1.0.0.0.0").is_none());
    }

    #[test]
    fn test_stability() {
        assert_eq!(stability_of("1.0.0"), Stability::Stable);
        assert_eq!(stability_of("1.0.0-RC1"), Stability::Rc);
        assert_eq!(stability_of("1.0-beta"), Stability::Beta);
        assert_eq!(stability_of("1.0.0-alpha3"), Stability::Alpha);
        assert_eq!(stability_of("dev-main"), Stability::Dev);
        assert_eq!(stability_of("1.x-dev"), Stability::Dev);
    }

    #[test]
    fn test_stability_parse() {
        assert_eq!(Stability::parse("RC"), Some(Stability::Rc));
        assert_eq!(Stability::parse(""), Some(Stability::Stable));
        assert_eq!(Stability::parse("bogus"), None);
        assert!(Stability::Dev < Stability::Stable);
    }

    #[test]
    fn test_ordering() {
        assert_eq!(compare("1.0.0", "0.4.0"), Ordering::Greater);
        assert_eq!(compare("0.10.0", "0.9.9"), Ordering::Greater);
        assert_eq!(compare("1.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare("1.0.0-beta1", "1.0.0"), Ordering::Less);
        assert_eq!(compare("1.0.0-beta2", "1.0.0-beta10"), Ordering::Less);
        assert_eq!(compare("1.0.0-RC1", "1.0.0-beta3"), Ordering::Greater);
        assert_eq!(compare("1.0.0-patch1", "1.0.0"), Ordering::Greater);
        assert_eq!(compare("dev-main", "0.0.1"), Ordering::Less);
    }

    #[test]
    fn test_max_is_semantic_not_lexical() {
        let versions = ["0.4.0", "1.0.0", "0.3.2", "0.10.1"];
        let max = versions
            .iter()
            .max_by(|a, b| compare(a, b))
            .copied()
            .unwrap();
        assert_eq!(max, "1.0.0");
    }
}
