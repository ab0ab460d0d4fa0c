//! License normalization
//!
//! Plugin headers and readmes spell licenses freely ("GPLv2 or later",
//! "GPL-2.0+", "GNU General Public License v3"). Composer expects SPDX
//! identifiers, so recognizable spellings are mapped; anything else is kept
//! as written.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref GPL: Regex = Regex::new(concat!(
        r"^(?:gnu)?(?:generalpubliclicen[sc]e|gpl)(?:v|version|-)?([123])(?:\.0)?",
        r"(\+|orlater|orany(?:later)?(?:version)?|-or-later|only)?$",
    ))
    .unwrap();
    static ref LGPL: Regex = Regex::new(concat!(
        r"^(?:gnu)?(?:lessergeneralpubliclicen[sc]e|lgpl)(?:v|version|-)?([23])(?:\.[01])?",
        r"(\+|orlater|-or-later)?$",
    ))
    .unwrap();
}

/// Normalize a license string to its SPDX identifier where recognizable.
pub fn normalize_license(license: &str) -> String {
    let trimmed = license.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let compact: String = trimmed
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect();

    if let Some(caps) = LGPL.captures(&compact) {
        let major = &caps[1];
        let minor = if major == "2" { "1" } else { "0" };
        let later = caps.get(2).is_some();
        return format!(
            "LGPL-{}.{}-{}",
            major,
            minor,
            if later { "or-later" } else { "only" }
        );
    }

    if let Some(caps) = GPL.captures(&compact) {
        let later = caps.get(2).is_some_and(|m| m.as_str() != "only");
        return format!(
            "GPL-{}.0-{}",
            &caps[1],
            if later { "or-later" } else { "only" }
        );
    }

    let spdx = match compact.as_str() {
        "gpl" | "gnugpl" => "GPL-2.0-or-later",
        "mit" | "mitlicense" | "expat" => "MIT",
        "apache2" | "apache2.0" | "apache-2.0" | "apachelicense2.0" | "apachev2" => "Apache-2.0",
        "bsd" | "bsd-3-clause" | "bsd3" | "newbsd" => "BSD-3-Clause",
        "bsd-2-clause" | "bsd2" | "simplifiedbsd" => "BSD-2-Clause",
        "mpl2" | "mpl-2.0" | "mpl2.0" => "MPL-2.0",
        "proprietary" | "commercial" => "proprietary",
        _ => return trimmed.to_string(),
    };
    spdx.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpl_spellings() {
        assert_eq!(normalize_license("GPLv2 or later"), "GPL-2.0-or-later");
        assert_eq!(normalize_license("GPL-2.0+"), "GPL-2.0-or-later");
        assert_eq!(normalize_license("GPL v2"), "GPL-2.0-only");
        assert_eq!(normalize_license("GPL-2.0-or-later"), "GPL-2.0-or-later");
        assert_eq!(normalize_license("GPLv3"), "GPL-3.0-only");
        assert_eq!(
            normalize_license("GNU General Public License v3 or later"),
            "GPL-3.0-or-later"
        );
        assert_eq!(normalize_license("GPL"), "GPL-2.0-or-later");
    }

    #[test]
    fn test_other_licenses() {
        assert_eq!(normalize_license("MIT"), "MIT");
        assert_eq!(normalize_license("Apache 2.0"), "Apache-2.0");
        assert_eq!(normalize_license("LGPLv2.1"), "LGPL-2.1-only");
        assert_eq!(normalize_license("Commercial"), "proprietary");
    }

    #[test]
    fn test_unknown_kept_verbatim() {
        assert_eq!(normalize_license("  Acme Custom License "), "Acme Custom License");
        assert_eq!(normalize_license(""), "");
    }
}
