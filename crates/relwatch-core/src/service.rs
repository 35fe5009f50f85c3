//! Update service: the operations behind the HTTP endpoints and the CLI.
//!
//! Each operation is a cache-aside lookup whose producer fetches from the
//! upstream registries and normalizes what comes back.

use crate::audit::{UpdateLogEntry, UpdateLogStore};
use crate::cache::{CacheAside, CacheStore};
use crate::config::ServiceConfig;
use crate::error::Result;
use crate::models::{
    has_update, CanonicalUpdateRecord, LanguageSnapshot, LanguageUpdates, LibraryStub,
    PackageSpec, PackageUpdates, ReleaseRecord, UpdateOutcome,
};
use crate::network::{RegistryClient, SourceKind};
use crate::normalize::{
    language_label, normalize_endoflife, normalize_github, normalize_npm, normalize_packagist,
    normalize_pypi,
};
use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Cache key of the languages aggregate.
pub const LANGUAGE_UPDATES_KEY: &str = "language_updates";

pub fn package_key(name: &str) -> String {
    format!("package_{}", name)
}

pub fn github_key(owner: &str, repo: &str) -> String {
    format!("github_{}_{}", owner, repo)
}

pub fn update_check_key(name: &str) -> String {
    format!("update_check_{}", name)
}

pub fn language_update_key(slug: &str) -> String {
    format!("language_update_{}", slug)
}

/// Result of checking one package from a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageCheck {
    #[serde(flatten)]
    pub package: PackageSpec,
    pub has_update: bool,
    pub result: UpdateOutcome,
}

/// Aggregates release information from every upstream behind one cache.
pub struct UpdateService {
    client: RegistryClient,
    cache: CacheAside,
    audit: Option<Arc<UpdateLogStore>>,
    aggregate_ttl: Duration,
    single_ttl: Duration,
}

impl UpdateService {
    /// Create a service using `store` for every cached answer.
    pub fn new(config: ServiceConfig, store: Arc<dyn CacheStore>) -> Result<Self> {
        let client = RegistryClient::with_timeout(config.endpoints, config.request_timeout)?;
        Ok(Self {
            client,
            cache: CacheAside::new(store),
            audit: None,
            aggregate_ttl: config.aggregate_ttl,
            single_ttl: config.single_ttl,
        })
    }

    /// Record every freshly checked package to `audit`.
    pub fn with_audit(mut self, audit: Arc<UpdateLogStore>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn cache(&self) -> &CacheAside {
        &self.cache
    }

    pub fn audit(&self) -> Option<&Arc<UpdateLogStore>> {
        self.audit.as_ref()
    }

    /// Current release cycle of PHP, Node.js and Java.
    pub async fn language_updates(&self) -> LanguageSnapshot {
        self.cache
            .get_or_fetch(LANGUAGE_UPDATES_KEY, self.aggregate_ttl, || async {
                info!("Fetching language updates");
                let (php, javascript, java) = tokio::join!(
                    self.language("php"),
                    self.language("nodejs"),
                    self.language("java"),
                );
                LanguageSnapshot {
                    data: LanguageUpdates {
                        php,
                        javascript,
                        java,
                    },
                    cached_at: Utc::now(),
                }
            })
            .await
    }

    /// Placeholder records for each requested library, keyed by name.
    pub fn library_updates(&self, names: &[String]) -> BTreeMap<String, LibraryStub> {
        names
            .iter()
            .map(|name| (name.clone(), LibraryStub::new(name.as_str())))
            .collect()
    }

    /// `name` looked up on npm, Packagist and PyPI at once.
    pub async fn package_updates(&self, name: &str) -> PackageUpdates {
        self.cache
            .get_or_fetch(&package_key(name), self.single_ttl, || async {
                info!("Fetching package {} from all registries", name);
                let (npm, packagist, pypi) = tokio::join!(
                    self.client.fetch(SourceKind::Npm, name),
                    self.client.fetch(SourceKind::Packagist, name),
                    self.client.fetch(SourceKind::Pypi, name),
                );
                PackageUpdates {
                    package: name.to_string(),
                    npm: normalize_npm(name, npm),
                    packagist: normalize_packagist(name, packagist),
                    pypi: normalize_pypi(name, pypi),
                }
            })
            .await
    }

    /// Latest release of `owner/repo`.
    pub async fn github_release(&self, owner: &str, repo: &str) -> ReleaseRecord {
        self.cache
            .get_or_fetch(&github_key(owner, repo), self.single_ttl, || async {
                info!("Fetching latest release of {}/{}", owner, repo);
                self.release(&format!("{}/{}", owner, repo)).await
            })
            .await
    }

    /// Check every package in `specs`, in order.
    pub async fn check_for_updates(&self, specs: &[PackageSpec]) -> Vec<PackageCheck> {
        join_all(specs.iter().map(|spec| self.check_one(spec))).await
    }

    /// Current release cycle for each endoflife.date slug.
    pub async fn check_for_language_updates(
        &self,
        slugs: &[String],
    ) -> BTreeMap<String, CanonicalUpdateRecord> {
        let records = join_all(slugs.iter().map(|slug| self.language_cached(slug))).await;
        slugs.iter().cloned().zip(records).collect()
    }

    async fn check_one(&self, spec: &PackageSpec) -> PackageCheck {
        let outcome: UpdateOutcome = self
            .cache
            .get_or_fetch(&update_check_key(&spec.name), self.aggregate_ttl, || async {
                let outcome = self.outcome_for(spec).await;
                self.audit_check(spec, &outcome);
                outcome
            })
            .await;

        let has_update = outcome
            .latest_version()
            .is_some_and(|latest| has_update(spec.current_version.as_deref(), latest));

        PackageCheck {
            package: spec.clone(),
            has_update,
            result: outcome,
        }
    }

    async fn outcome_for(&self, spec: &PackageSpec) -> UpdateOutcome {
        let kind = match spec.kind.parse::<SourceKind>() {
            Ok(kind) => kind,
            Err(e) => {
                warn!("Skipping {}: {}", spec.name, e);
                return UpdateOutcome::unsupported();
            }
        };

        let name = spec.name.as_str();
        match kind {
            SourceKind::Npm => {
                UpdateOutcome::Package(normalize_npm(name, self.client.fetch(kind, name).await))
            }
            SourceKind::Packagist => UpdateOutcome::Package(normalize_packagist(
                name,
                self.client.fetch(kind, name).await,
            )),
            SourceKind::Pypi => {
                UpdateOutcome::Package(normalize_pypi(name, self.client.fetch(kind, name).await))
            }
            SourceKind::Github => UpdateOutcome::Release(self.release(name).await),
            SourceKind::Endoflife => {
                warn!("Skipping {}: language slugs are not package types", name);
                UpdateOutcome::unsupported()
            }
        }
    }

    fn audit_check(&self, spec: &PackageSpec, outcome: &UpdateOutcome) {
        let Some(audit) = &self.audit else {
            return;
        };
        if let Err(e) = audit.record(&UpdateLogEntry::from_outcome(spec, outcome)) {
            warn!("Failed to record update check for {}: {}", spec.name, e);
        }
    }

    async fn language_cached(&self, slug: &str) -> CanonicalUpdateRecord {
        self.cache
            .get_or_fetch(&language_update_key(slug), self.aggregate_ttl, || {
                self.language(slug)
            })
            .await
    }

    async fn language(&self, slug: &str) -> CanonicalUpdateRecord {
        let result = self.client.fetch(SourceKind::Endoflife, slug).await;
        normalize_endoflife(&language_label(slug), result)
    }

    async fn release(&self, repository: &str) -> ReleaseRecord {
        normalize_github(self.client.fetch(SourceKind::Github, repository).await)
    }
}
