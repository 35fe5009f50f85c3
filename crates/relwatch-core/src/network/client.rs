//! HTTP client for the upstream registries.
//!
//! Wraps reqwest with:
//! - A fixed per-request timeout and user-agent
//! - Source-specific headers (GitHub v3 media type)
//! - Failures returned as [`FetchFailure`] values instead of errors

use super::source::SourceKind;
use crate::config::{NetworkConfig, UpstreamEndpoints};
use crate::{RelwatchError, Result};
use reqwest::{header, Client};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// A failed upstream fetch.
///
/// `status` carries the HTTP status when the upstream answered with a non-2xx
/// code; it is `None` for transport errors, timeouts and unreadable bodies.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} fetch failed: {message}")]
pub struct FetchFailure {
    pub kind: SourceKind,
    pub status: Option<u16>,
    pub message: String,
}

impl FetchFailure {
    pub fn new(kind: SourceKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    /// Whether the upstream answered with an HTTP error status.
    pub fn is_http_status(&self) -> bool {
        self.status.is_some()
    }
}

/// Outcome of one upstream call.
pub type FetchResult = std::result::Result<Value, FetchFailure>;

/// HTTP client for npm, Packagist, PyPI, GitHub and endoflife.date.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    endpoints: UpstreamEndpoints,
    timeout: Duration,
}

impl RegistryClient {
    /// Create a client against the given upstream bases with the default timeout.
    pub fn new(endpoints: UpstreamEndpoints) -> Result<Self> {
        Self::with_timeout(endpoints, NetworkConfig::REQUEST_TIMEOUT)
    }

    /// Create a client with a custom per-request timeout.
    pub fn with_timeout(endpoints: UpstreamEndpoints, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(NetworkConfig::USER_AGENT)
            .build()
            .map_err(|e| RelwatchError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                cause: Some(e.to_string()),
            })?;

        Ok(Self {
            client,
            endpoints,
            timeout,
        })
    }

    pub fn endpoints(&self) -> &UpstreamEndpoints {
        &self.endpoints
    }

    /// Issue one GET against `kind` for `identifier`.
    ///
    /// Never fails outright: every problem is folded into a [`FetchFailure`].
    pub async fn fetch(&self, kind: SourceKind, identifier: &str) -> FetchResult {
        let url = kind
            .url(&self.endpoints, identifier)
            .map_err(|e| FetchFailure::new(kind, None, e.to_string()))?;

        debug!("GET {} ({})", url, kind);

        let mut request = self.client.get(&url);
        if kind == SourceKind::Github {
            request = request.header(header::ACCEPT, NetworkConfig::GITHUB_ACCEPT);
        }

        let response = request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("request to {} timed out after {:?}", extract_domain(&url), self.timeout)
            } else {
                format!("GET {} failed: {}", url, e)
            };
            warn!("{}", message);
            FetchFailure::new(kind, None, message)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("GET {} returned {}", url, status);
            return Err(FetchFailure::new(
                kind,
                Some(status.as_u16()),
                format!("{} returned {}", extract_domain(&url), status),
            ));
        }

        response.json::<Value>().await.map_err(|e| {
            warn!("Failed to decode response from {}: {}", url, e);
            FetchFailure::new(kind, None, format!("invalid JSON from {}: {}", url, e))
        })
    }
}

/// Extract domain from a URL.
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.host_str().unwrap_or("unknown").to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> RegistryClient {
        RegistryClient::new(UpstreamEndpoints::all(server.uri())).unwrap()
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://api.github.com/repos/foo/bar"),
            "api.github.com"
        );
        assert_eq!(extract_domain("invalid-url"), "unknown");
    }

    #[tokio::test]
    async fn test_fetch_success_returns_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/react"))
            .and(header_eq("user-agent", NetworkConfig::USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "react",
                "dist-tags": { "latest": "18.3.1" }
            })))
            .mount(&server)
            .await;

        let value = client_for(&server)
            .await
            .fetch(SourceKind::Npm, "react")
            .await
            .unwrap();
        assert_eq!(value["dist-tags"]["latest"], "18.3.1");
    }

    #[tokio::test]
    async fn test_github_sends_accept_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/tokio-rs/tokio/releases/latest"))
            .and(header_eq("accept", NetworkConfig::GITHUB_ACCEPT))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tag_name": "tokio-1.40.0"
            })))
            .mount(&server)
            .await;

        let value = client_for(&server)
            .await
            .fetch(SourceKind::Github, "tokio-rs/tokio")
            .await
            .unwrap();
        assert_eq!(value["tag_name"], "tokio-1.40.0");
    }

    #[tokio::test]
    async fn test_non_success_status_is_failure_value() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pypi/nope/json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let failure = client_for(&server)
            .await
            .fetch(SourceKind::Pypi, "nope")
            .await
            .unwrap_err();
        assert_eq!(failure.kind, SourceKind::Pypi);
        assert_eq!(failure.status, Some(404));
        assert!(failure.is_http_status());
    }

    #[tokio::test]
    async fn test_invalid_body_is_failure_without_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/php.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let failure = client_for(&server)
            .await
            .fetch(SourceKind::Endoflife, "php")
            .await
            .unwrap_err();
        assert_eq!(failure.status, None);
    }

    #[tokio::test]
    async fn test_timeout_is_failure_without_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = RegistryClient::with_timeout(
            UpstreamEndpoints::all(server.uri()),
            Duration::from_millis(50),
        )
        .unwrap();
        let failure = client.fetch(SourceKind::Npm, "slow").await.unwrap_err();
        assert_eq!(failure.status, None);
        assert!(failure.message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_bad_identifier_is_failure_value() {
        let client = RegistryClient::new(UpstreamEndpoints::default()).unwrap();
        let failure = client
            .fetch(SourceKind::Github, "not-a-pair")
            .await
            .unwrap_err();
        assert_eq!(failure.kind, SourceKind::Github);
        assert_eq!(failure.status, None);
    }
}
