//! relwatch core library.
//!
//! Aggregates release metadata for languages, packages and GitHub
//! repositories from npm, Packagist, PyPI, GitHub and endoflife.date, and
//! normalizes it into a small set of canonical records.
//!
//! # Example
//!
//! ```rust,no_run
//! use relwatch_core::{MemoryStore, ServiceConfig, UpdateService};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> relwatch_core::Result<()> {
//!     let service = UpdateService::new(ServiceConfig::default(), Arc::new(MemoryStore::new()))?;
//!     let updates = service.package_updates("react").await;
//!     println!("react {}", updates.npm.version);
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod normalize;
pub mod service;

pub use audit::{UpdateLogEntry, UpdateLogStore};
pub use cache::{CacheAside, CacheStore, MemoryStore, SqliteStore};
pub use config::{ServiceConfig, UpstreamEndpoints};
pub use error::{RelwatchError, Result};
pub use network::{FetchFailure, FetchResult, RegistryClient, SourceKind};
pub use service::{PackageCheck, UpdateService};
