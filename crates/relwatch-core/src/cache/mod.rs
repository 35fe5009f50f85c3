//! Caching for normalized upstream answers.
//!
//! This module provides:
//! - `CacheStore`, the injected byte store with per-entry TTL
//! - `MemoryStore` (mini-moka) and `SqliteStore` (persistent) implementations
//! - `CacheAside`, read-through lookups with single-flight on miss

mod coordinator;
mod memory;
mod sqlite;
mod traits;

pub use coordinator::CacheAside;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::CacheStore;
