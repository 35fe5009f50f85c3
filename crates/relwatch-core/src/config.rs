//! Centralized configuration for relwatch.
//!
//! Constants for upstream access, cache lifetimes and request throttling, plus
//! the runtime knobs (`UpstreamEndpoints`, `ServiceConfig`) that tests and the
//! CLI override.

use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "relwatch";
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const USER_AGENT: &'static str = concat!("relwatch/", env!("CARGO_PKG_VERSION"));
    pub const GITHUB_ACCEPT: &'static str = "application/vnd.github.v3+json";

    pub const NPM_REGISTRY_BASE: &'static str = "https://registry.npmjs.org";
    pub const PACKAGIST_BASE: &'static str = "https://packagist.org";
    pub const PYPI_BASE: &'static str = "https://pypi.org";
    pub const GITHUB_API_BASE: &'static str = "https://api.github.com";
    pub const ENDOFLIFE_BASE: &'static str = "https://endoflife.date";
}

/// Cache lifetimes per endpoint family.
pub struct CacheTtl;

impl CacheTtl {
    /// Language aggregate, package-aggregate and batch checks.
    pub const AGGREGATE: Duration = Duration::from_secs(3600);
    /// Single package and GitHub release lookups.
    pub const SINGLE: Duration = Duration::from_secs(1800);
    /// Upper bound on how long the in-memory store keeps anything.
    pub const MEMORY_MAX: Duration = Duration::from_secs(3600);
    pub const MEMORY_MAX_ENTRIES: u64 = 10_000;
}

/// Inbound request throttling.
pub struct RateLimitConfig;

impl RateLimitConfig {
    pub const MAX_REQUESTS: u32 = 60;
    pub const WINDOW: Duration = Duration::from_secs(60);
    pub const EXCEEDED_MESSAGE: &'static str = "Rate limit exceeded. Try again in 1 minute.";
}

/// Base URLs of the upstream registries.
///
/// Defaults point at the public services; tests swap in a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamEndpoints {
    pub npm: String,
    pub packagist: String,
    pub pypi: String,
    pub github: String,
    pub endoflife: String,
}

impl UpstreamEndpoints {
    /// Point every source at the same base URL.
    pub fn all(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            npm: base.clone(),
            packagist: base.clone(),
            pypi: base.clone(),
            github: base.clone(),
            endoflife: base,
        }
    }
}

impl Default for UpstreamEndpoints {
    fn default() -> Self {
        Self {
            npm: NetworkConfig::NPM_REGISTRY_BASE.to_string(),
            packagist: NetworkConfig::PACKAGIST_BASE.to_string(),
            pypi: NetworkConfig::PYPI_BASE.to_string(),
            github: NetworkConfig::GITHUB_API_BASE.to_string(),
            endoflife: NetworkConfig::ENDOFLIFE_BASE.to_string(),
        }
    }
}

/// Runtime configuration for [`UpdateService`](crate::UpdateService).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub endpoints: UpstreamEndpoints,
    pub request_timeout: Duration,
    pub aggregate_ttl: Duration,
    pub single_ttl: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoints: UpstreamEndpoints::default(),
            request_timeout: NetworkConfig::REQUEST_TIMEOUT,
            aggregate_ttl: CacheTtl::AGGREGATE,
            single_ttl: CacheTtl::SINGLE,
        }
    }
}
