//! Version comparison and package specs for batch checks.

use crate::{RelwatchError, Result};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Parse a version string, tolerating a leading `v` and missing minor/patch.
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let trimmed = raw.trim().trim_start_matches(['v', 'V']);
    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    // "8.3" / "21" style cycles
    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.parse::<u64>().is_err()) {
        return None;
    }
    let mut padded = parts.clone();
    while padded.len() < 3 {
        padded.push("0");
    }
    Version::parse(&padded.join(".")).ok()
}

/// Whether `latest` is newer than `current`.
///
/// Falls back to string inequality when either side is not a version number,
/// and reports no update when the current version is unknown.
pub fn has_update(current: Option<&str>, latest: &str) -> bool {
    let Some(current) = current else {
        return false;
    };
    match (parse_lenient(current), parse_lenient(latest)) {
        (Some(current), Some(latest)) => latest > current,
        _ => current.trim() != latest.trim(),
    }
}

/// A package to check: `[type:]name[@current]`.
///
/// `kind` stays a raw string so that unknown registry types can still be
/// reported per package instead of failing the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            current_version: None,
        }
    }

    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = Some(version.into());
        self
    }
}

impl FromStr for PackageSpec {
    type Err = RelwatchError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (kind, rest) = match s.split_once(':') {
            Some((kind, rest)) => (kind.trim().to_string(), rest.trim()),
            None => ("npm".to_string(), s),
        };

        // An '@' at position 0 is an npm scope, not a version separator.
        let (name, current) = match rest.rfind('@') {
            Some(idx) if idx > 0 => (&rest[..idx], Some(rest[idx + 1..].to_string())),
            _ => (rest, None),
        };

        if name.is_empty() || kind.is_empty() {
            return Err(RelwatchError::Validation {
                field: "packages".into(),
                message: format!("cannot parse package spec '{}'", s),
            });
        }

        Ok(Self {
            name: name.to_string(),
            kind,
            current_version: current.filter(|v| !v.is_empty()),
        })
    }
}
