//! npm-style semver range matching on top of the `semver` crate.
//!
//! npm ranges differ from Cargo requirements in a few places: bare versions
//! are exact, partial versions are wildcards, comparators are separated by
//! whitespace, alternatives by `||`, and `a - b` is an inclusive range. This
//! module translates those forms into [`semver::VersionReq`]s.

use semver::{Version, VersionReq};

/// A parsed npm range: a version matches when any alternative matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmRange {
    alternatives: Vec<VersionReq>,
}

impl NpmRange {
    /// Parses an npm range such as `^1.2.0`, `>=1 <2`, `1.x || 2.0.0`.
    ///
    /// Returns `None` when the string is not a semver range (dist-tags,
    /// protocols, paths).
    #[must_use]
    pub fn parse(range: &str) -> Option<Self> {
        let alternatives = range
            .split("||")
            .map(|alternative| translate_comparator_set(alternative.trim()))
            .map(|translated| translated.and_then(|req| VersionReq::parse(&req).ok()))
            .collect::<Option<Vec<_>>>()?;

        Some(Self { alternatives })
    }

    /// Returns true if `version` satisfies any alternative.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }
}

/// Returns true if `range` is a valid npm semver range.
#[must_use]
pub fn is_valid_range(range: &str) -> bool {
    NpmRange::parse(range).is_some()
}

/// Returns true if `range` accepts `version`. Unparseable input never matches.
#[must_use]
pub fn satisfies(range: &str, version: &str) -> bool {
    let Ok(version) = Version::parse(version.trim_start_matches('v')) else {
        return false;
    };
    NpmRange::parse(range).is_some_and(|range| range.matches(&version))
}

fn translate_comparator_set(set: &str) -> Option<String> {
    if set.is_empty() {
        return Some("*".to_string());
    }

    if let Some((low, high)) = set.split_once(" - ") {
        let low = translate_bare(low.trim(), ">=")?;
        let high = translate_bare(high.trim(), "<=")?;
        return Some(format!("{low}, {high}"));
    }

    let mut comparators = Vec::new();
    let mut pending_operator: Option<&str> = None;
    for token in set.split_whitespace() {
        // ">= 1.2.3" is legal npm syntax
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~')) {
            pending_operator = Some(token);
            continue;
        }
        let token = match pending_operator.take() {
            Some(op) => format!("{op}{token}"),
            None => token.to_string(),
        };
        comparators.push(translate_comparator(&token)?);
    }

    if pending_operator.is_some() || comparators.is_empty() {
        return None;
    }
    Some(comparators.join(", "))
}

fn translate_comparator(token: &str) -> Option<String> {
    let split = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '^' | '~'))
        .unwrap_or(token.len());
    let (operator, version) = token.split_at(split);
    let version = version.trim_start_matches(['v', 'V']);

    if operator.is_empty() {
        return translate_bare(version, "=");
    }
    if !is_version_like(version) {
        return None;
    }
    Some(format!("{operator}{}", wildcard_parts(version)))
}

/// Translates an operator-less version. Full versions get `exact_op`,
/// partial versions become wildcards.
fn translate_bare(version: &str, exact_op: &str) -> Option<String> {
    let version = version.trim_start_matches(['v', 'V']);
    if matches!(version, "*" | "x" | "X" | "") {
        return Some("*".to_string());
    }
    if !is_version_like(version) {
        return None;
    }

    let core = version.split(['-', '+']).next().unwrap_or(version);
    let parts: Vec<&str> = core.split('.').collect();
    let has_wildcard = parts.iter().any(|p| matches!(*p, "*" | "x" | "X"));

    if parts.len() == 3 && !has_wildcard {
        Some(format!("{exact_op}{version}"))
    } else if exact_op == "=" {
        let mut padded = wildcard_parts(core);
        if !has_wildcard {
            padded.push_str(".*");
        }
        Some(padded)
    } else if exact_op == ">=" {
        let mut full: Vec<&str> = parts
            .iter()
            .take_while(|p| !matches!(**p, "*" | "x" | "X"))
            .copied()
            .collect();
        full.resize(3, "0");
        Some(format!(">={}", full.join(".")))
    } else {
        // "<=1.2" means "<1.3.0"
        let fixed: Vec<u64> = parts
            .iter()
            .take_while(|p| !matches!(**p, "*" | "x" | "X"))
            .map(|p| p.parse().ok())
            .collect::<Option<_>>()?;
        match fixed.as_slice() {
            [major] => Some(format!("<{}.0.0", major + 1)),
            [major, minor] => Some(format!("<{major}.{}.0", minor + 1)),
            _ => Some("*".to_string()),
        }
    }
}

fn wildcard_parts(version: &str) -> String {
    version
        .split('.')
        .map(|p| if matches!(p, "x" | "X") { "*" } else { p })
        .collect::<Vec<_>>()
        .join(".")
}

fn is_version_like(version: &str) -> bool {
    version
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '*' | 'x' | 'X'))
}
