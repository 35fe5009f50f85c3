//! Canonical record shapes produced by the normalizer.
//!
//! Every record is fully populated: upstream gaps become `"N/A"` (or `false`),
//! never a missing key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder for any value the upstream did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

/// Whether a record was built from a successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Success,
    Error,
}

/// Release-cycle information for a language or runtime (endoflife.date shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalUpdateRecord {
    pub cycle: String,
    pub release_date: String,
    pub eol: String,
    pub latest_version: String,
    pub latest_release_date: String,
    pub support: String,
    pub extended_support: bool,
    pub source: String,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CanonicalUpdateRecord {
    /// Fully defaulted record describing a failed lookup.
    pub fn failed(source: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            cycle: NOT_AVAILABLE.into(),
            release_date: NOT_AVAILABLE.into(),
            eol: NOT_AVAILABLE.into(),
            latest_version: NOT_AVAILABLE.into(),
            latest_release_date: NOT_AVAILABLE.into(),
            support: NOT_AVAILABLE.into(),
            extended_support: false,
            source: source.into(),
            status: RecordStatus::Error,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RecordStatus::Success
    }
}

/// Latest-version summary for a package on one registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPackageRecord {
    pub name: String,
    pub version: String,
    pub description: String,
    pub updated_at: String,
    pub source: String,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CanonicalPackageRecord {
    pub fn failed(
        name: impl Into<String>,
        source: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: NOT_AVAILABLE.into(),
            description: NOT_AVAILABLE.into(),
            updated_at: NOT_AVAILABLE.into(),
            source: source.into(),
            status: RecordStatus::Error,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RecordStatus::Success
    }
}

/// Latest GitHub release of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub tag_name: String,
    pub name: String,
    pub published_at: String,
    pub body: String,
    pub html_url: String,
    pub download_url: String,
    pub source: String,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Upstream HTTP status when GitHub answered with an error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl ReleaseRecord {
    pub fn failed(
        source: impl Into<String>,
        error: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self {
            tag_name: NOT_AVAILABLE.into(),
            name: NOT_AVAILABLE.into(),
            published_at: NOT_AVAILABLE.into(),
            body: NOT_AVAILABLE.into(),
            html_url: NOT_AVAILABLE.into(),
            download_url: NOT_AVAILABLE.into(),
            source: source.into(),
            status: RecordStatus::Error,
            error: Some(error.into()),
            status_code,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RecordStatus::Success
    }
}

/// Placeholder answer for library lookups, which have no backing source yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStub {
    pub name: String,
    pub status: String,
    pub message: String,
}

impl LibraryStub {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "not_implemented".into(),
            message: "Library-specific lookup is not implemented".into(),
        }
    }
}

/// Result of checking one package in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpdateOutcome {
    Package(CanonicalPackageRecord),
    Release(ReleaseRecord),
    Unsupported { error: String },
}

impl UpdateOutcome {
    pub fn unsupported() -> Self {
        UpdateOutcome::Unsupported {
            error: "unsupported package type".into(),
        }
    }

    /// The version the outcome reports as latest, if any.
    pub fn latest_version(&self) -> Option<&str> {
        let version = match self {
            UpdateOutcome::Package(record) if record.is_success() => record.version.as_str(),
            UpdateOutcome::Release(record) if record.is_success() => record.tag_name.as_str(),
            _ => return None,
        };
        (version != NOT_AVAILABLE).then_some(version)
    }
}

/// Language release cycles served by the languages endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageUpdates {
    pub php: CanonicalUpdateRecord,
    pub javascript: CanonicalUpdateRecord,
    pub java: CanonicalUpdateRecord,
}

/// `LanguageUpdates` together with the moment they were fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSnapshot {
    pub data: LanguageUpdates,
    pub cached_at: DateTime<Utc>,
}

/// One package looked up on every package registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageUpdates {
    pub package: String,
    pub npm: CanonicalPackageRecord,
    pub packagist: CanonicalPackageRecord,
    pub pypi: CanonicalPackageRecord,
}
