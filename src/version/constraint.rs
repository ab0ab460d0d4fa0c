//! Composer version constraints
//!
//! Managed external packages carry a constraint (`^2.0`, `>=1.4 <3`,
//! `~1.2 || ^2.0`) that limits which upstream releases are exposed.
//! Only matching is supported; nothing here resolves dependencies.

use crate::version::Version;

/// A single bound in a conjunction
#[derive(Debug, Clone, PartialEq, Eq)]
enum Bound {
    Any,
    Eq(Version),
    Ne(Version),
    Gt(Version),
    Ge(Version),
    Lt(Version),
    Le(Version),
}

impl Bound {
    fn matches(&self, version: &Version) -> bool {
        match self {
            Bound::Any => true,
            Bound::Eq(v) => version == v || version.cmp(v).is_eq(),
            Bound::Ne(v) => !version.cmp(v).is_eq(),
            Bound::Gt(v) => version > v,
            Bound::Ge(v) => version >= v,
            Bound::Lt(v) => version < v,
            Bound::Le(v) => version <= v,
        }
    }
}

/// Parsed constraint: OR of AND-groups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    raw: String,
    alternatives: Vec<Vec<Bound>>,
}

impl Constraint {
    /// Parse a Composer constraint string. Returns `None` when any part of
    /// the expression is not understood.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Some(Self::any());
        }

        let mut alternatives = Vec::new();

        for group in trimmed.split("||").flat_map(|g| g.split(" | ")) {
            let group = group.trim();
            if group.is_empty() {
                return None;
            }
            alternatives.push(parse_group(group)?);
        }

        Some(Self {
            raw: trimmed.to_string(),
            alternatives,
        })
    }

    /// Constraint matching everything
    pub fn any() -> Self {
        Self {
            raw: "*".to_string(),
            alternatives: vec![vec![Bound::Any]],
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether a raw version string satisfies the constraint.
    pub fn matches(&self, version: &str) -> bool {
        match Version::parse(version) {
            Some(v) => self.matches_version(&v),
            None => false,
        }
    }

    pub fn matches_version(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|group| group.iter().all(|bound| bound.matches(version)))
    }
}

fn parse_group(group: &str) -> Option<Vec<Bound>> {
    // Hyphen range: "1.0 - 2.0"
    if let Some((low, high)) = group.split_once(" - ") {
        let low = Version::parse(strip_flags(low.trim()))?;
        let high = Version::parse(strip_flags(high.trim()))?;
        return Some(vec![Bound::Ge(low), Bound::Le(high)]);
    }

    let mut bounds = Vec::new();
    for atom in group.split([' ', ',']).filter(|a| !a.is_empty()) {
        bounds.extend(parse_atom(strip_flags(atom))?);
    }
    if bounds.is_empty() {
        bounds.push(Bound::Any);
    }
    Some(bounds)
}

/// Drop stability flags (`@dev`, `@beta`); they only affect resolution.
fn strip_flags(atom: &str) -> &str {
    match atom.split_once('@') {
        Some((constraint, _)) if !constraint.is_empty() => constraint,
        Some(_) => "*",
        None => atom,
    }
}

fn parse_atom(atom: &str) -> Option<Vec<Bound>> {
    if atom == "*" || atom == "x" {
        return Some(vec![Bound::Any]);
    }

    let operators: [(&str, fn(Version) -> Bound); 8] = [
        (">=", Bound::Ge),
        ("<=", Bound::Le),
        ("!=", Bound::Ne),
        ("<>", Bound::Ne),
        ("==", Bound::Eq),
        (">", Bound::Gt),
        ("<", Bound::Lt),
        ("=", Bound::Eq),
    ];
    for (prefix, make) in operators {
        if let Some(rest) = atom.strip_prefix(prefix) {
            return Some(vec![make(Version::parse(rest.trim())?)]);
        }
    }

    if let Some(rest) = atom.strip_prefix('^') {
        let parts = numeric_parts(rest)?;
        let low = Version::parse(rest)?;
        let mut upper = parts.clone();
        // First non-zero component is the one that may not change
        let pivot = upper.iter().position(|p| *p != 0).unwrap_or(upper.len() - 1);
        upper.truncate(pivot + 1);
        upper[pivot] += 1;
        return Some(vec![Bound::Ge(low), Bound::Lt(Version::from_parts(&upper, true))]);
    }

    if let Some(rest) = atom.strip_prefix('~') {
        let parts = numeric_parts(rest)?;
        let low = Version::parse(rest)?;
        let mut upper = parts.clone();
        if upper.len() > 1 {
            upper.pop();
        }
        let last = upper.len() - 1;
        upper[last] += 1;
        return Some(vec![Bound::Ge(low), Bound::Lt(Version::from_parts(&upper, true))]);
    }

    if atom.ends_with(".*") || atom.ends_with(".x") {
        let base = &atom[..atom.len() - 2];
        let mut parts = numeric_parts(base)?;
        let low = Version::from_parts(&parts, true);
        let last = parts.len() - 1;
        parts[last] += 1;
        return Some(vec![Bound::Ge(low), Bound::Lt(Version::from_parts(&parts, true))]);
    }

    Some(vec![Bound::Eq(Version::parse(atom)?)])
}

/// Numeric components exactly as written (`1.2` -> [1, 2])
fn numeric_parts(version: &str) -> Option<Vec<u64>> {
    let version = version.trim().trim_start_matches(['v', 'V']);
    let numeric = version.split(['-', '+']).next()?;
    let parts = numeric
        .split('.')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    if parts.is_empty() || parts.len() > 4 {
        return None;
    }
    Some(parts)
}
