//! Upstream registry access.
//!
//! This module provides:
//! - `SourceKind` and the percent-encoding URL builder per registry
//! - `RegistryClient`, a single-GET client that reports failures as values

mod client;
mod source;

pub use client::{extract_domain, FetchFailure, FetchResult, RegistryClient};
pub use source::SourceKind;
