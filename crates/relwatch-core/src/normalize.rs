//! Projection of upstream JSON into canonical records.
//!
//! Missing fields are never errors here; they collapse to [`NOT_AVAILABLE`]
//! (or `false`). Only a failed fetch, or an endoflife payload with nothing in
//! it, yields a record with `status = "error"`.

use crate::models::{
    CanonicalPackageRecord, CanonicalUpdateRecord, RecordStatus, ReleaseRecord, NOT_AVAILABLE,
};
use crate::network::{FetchResult, SourceKind};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

/// Message attached to GitHub lookups that came back with an HTTP error.
pub const GITHUB_NOT_FOUND: &str = "Repository not found or has no releases";

/// Any canonical record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Update(CanonicalUpdateRecord),
    Package(CanonicalPackageRecord),
    Release(ReleaseRecord),
}

impl Normalized {
    pub fn status(&self) -> RecordStatus {
        match self {
            Normalized::Update(r) => r.status,
            Normalized::Package(r) => r.status,
            Normalized::Release(r) => r.status,
        }
    }
}

/// Normalize the result of fetching `identifier` from `kind`.
pub fn normalize(kind: SourceKind, identifier: &str, result: FetchResult) -> Normalized {
    match kind {
        SourceKind::Npm => Normalized::Package(normalize_npm(identifier, result)),
        SourceKind::Packagist => Normalized::Package(normalize_packagist(identifier, result)),
        SourceKind::Pypi => Normalized::Package(normalize_pypi(identifier, result)),
        SourceKind::Github => Normalized::Release(normalize_github(result)),
        SourceKind::Endoflife => {
            Normalized::Update(normalize_endoflife(&language_label(identifier), result))
        }
    }
}

/// Human-readable name of an endoflife.date product, used in error messages.
pub fn language_label(slug: &str) -> String {
    match slug {
        "php" => "PHP".to_string(),
        "nodejs" => "Node.js".to_string(),
        "java" => "Java".to_string(),
        "python" => "Python".to_string(),
        other => other.to_string(),
    }
}

/// Take the first cycle of an endoflife.date response.
///
/// The upstream lists cycles newest first; this is trusted, not re-sorted.
pub fn normalize_endoflife(label: &str, result: FetchResult) -> CanonicalUpdateRecord {
    let origin = SourceKind::Endoflife.origin();
    let error_message = format!("Failed to fetch {} updates", label);

    let data = match result {
        Ok(data) => data,
        Err(failure) => {
            debug!("endoflife lookup for {} failed: {}", label, failure);
            return CanonicalUpdateRecord::failed(origin, error_message);
        }
    };

    let Some(latest) = data.as_array().and_then(|cycles| cycles.first()) else {
        return CanonicalUpdateRecord::failed(origin, error_message);
    };

    CanonicalUpdateRecord {
        cycle: text(latest.get("cycle")),
        release_date: text(latest.get("releaseDate")),
        eol: text(latest.get("eol")),
        latest_version: text(latest.get("latest")),
        latest_release_date: text(latest.get("latestReleaseDate")),
        support: text(latest.get("support")),
        extended_support: flag(latest.get("extendedSupport")),
        source: origin.to_string(),
        status: RecordStatus::Success,
        error: None,
    }
}

/// npm: `dist-tags.latest` and its publish time.
pub fn normalize_npm(requested: &str, result: FetchResult) -> CanonicalPackageRecord {
    let origin = SourceKind::Npm.origin();
    let data = match result {
        Ok(data) => data,
        Err(_) => {
            return CanonicalPackageRecord::failed(requested, origin, "Failed to fetch npm package")
        }
    };

    let latest = data
        .pointer("/dist-tags/latest")
        .and_then(Value::as_str);
    let updated_at = latest
        .and_then(|version| data.get("time").and_then(|time| time.get(version)))
        .map(|v| text(Some(v)))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    CanonicalPackageRecord {
        name: name_or(data.get("name"), requested),
        version: latest.unwrap_or(NOT_AVAILABLE).to_string(),
        description: text(data.get("description")),
        updated_at,
        source: origin.to_string(),
        status: RecordStatus::Success,
        error: None,
    }
}

/// PyPI: `info.version`, with the upload time of its first file.
pub fn normalize_pypi(requested: &str, result: FetchResult) -> CanonicalPackageRecord {
    let origin = SourceKind::Pypi.origin();
    let data = match result {
        Ok(data) => data,
        Err(_) => {
            return CanonicalPackageRecord::failed(requested, origin, "Failed to fetch PyPI package")
        }
    };

    let info = data.get("info");
    let version = text(info.and_then(|i| i.get("version")));
    let updated_at = data
        .get("releases")
        .and_then(|releases| releases.get(&version))
        .and_then(|files| files.get(0))
        .and_then(|file| file.get("upload_time"))
        .map(|v| text(Some(v)))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    CanonicalPackageRecord {
        name: name_or(info.and_then(|i| i.get("name")), requested),
        version,
        description: text(info.and_then(|i| i.get("summary"))),
        updated_at,
        source: origin.to_string(),
        status: RecordStatus::Success,
        error: None,
    }
}

/// Packagist: first stable version key in registry order.
pub fn normalize_packagist(requested: &str, result: FetchResult) -> CanonicalPackageRecord {
    let origin = SourceKind::Packagist.origin();
    let data = match result {
        Ok(data) => data,
        Err(_) => {
            return CanonicalPackageRecord::failed(
                requested,
                origin,
                "Failed to fetch Packagist package",
            )
        }
    };

    let package = data.get("package");
    let versions = package
        .and_then(|p| p.get("versions"))
        .and_then(Value::as_object);
    let keys: Vec<&str> = versions
        .map(|v| v.keys().map(String::as_str).collect())
        .unwrap_or_default();

    let version = pick_packagist_version(&keys).unwrap_or(NOT_AVAILABLE);
    let updated_at = versions
        .and_then(|v| v.get(version))
        .and_then(|entry| entry.get("time"))
        .map(|v| text(Some(v)))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    CanonicalPackageRecord {
        name: name_or(package.and_then(|p| p.get("name")), requested),
        version: version.to_string(),
        description: text(package.and_then(|p| p.get("description"))),
        updated_at,
        source: origin.to_string(),
        status: RecordStatus::Success,
        error: None,
    }
}

/// First version key that is not a dev/alpha/beta/rc build, else the very
/// first key.
///
/// Order is the registry's; versions are not compared numerically.
pub fn pick_packagist_version<'a>(keys: &[&'a str]) -> Option<&'a str> {
    keys.iter()
        .copied()
        .find(|version| !unstable_pattern().is_match(version))
        .or_else(|| keys.first().copied())
}

fn unstable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)dev|alpha|beta|rc").expect("static regex"))
}

/// GitHub: the `releases/latest` payload.
pub fn normalize_github(result: FetchResult) -> ReleaseRecord {
    let origin = SourceKind::Github.origin();
    let data = match result {
        Ok(data) => data,
        Err(failure) if failure.is_http_status() => {
            return ReleaseRecord::failed(origin, GITHUB_NOT_FOUND, failure.status)
        }
        Err(failure) => {
            return ReleaseRecord::failed(
                origin,
                format!("Failed to fetch GitHub information: {}", failure.message),
                None,
            )
        }
    };

    ReleaseRecord {
        tag_name: text(data.get("tag_name")),
        name: text(data.get("name")),
        published_at: text(data.get("published_at")),
        body: text(data.get("body")),
        html_url: text(data.get("html_url")),
        download_url: text(data.get("zipball_url")),
        source: origin.to_string(),
        status: RecordStatus::Success,
        error: None,
        status_code: None,
    }
}

/// Render a scalar as a string; anything absent or structured becomes `N/A`.
fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// endoflife flags are either booleans or the date the support ends.
fn flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        _ => false,
    }
}

fn name_or(value: Option<&Value>, requested: &str) -> String {
    value
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| requested.to_string())
}
