//! Cache store trait.

use crate::error::Result;
use std::time::Duration;

/// Key-value storage with per-entry TTL.
///
/// Values are opaque bytes; [`CacheAside`](super::CacheAside) owns the
/// serialization. All operations are synchronous to match rusqlite's API.
pub trait CacheStore: Send + Sync {
    /// Get cached bytes by key.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store bytes under `key`, expiring `ttl` from now.
    ///
    /// Overwrites any existing entry with the same key.
    fn put(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Delete a specific key. Returns whether anything was removed.
    fn invalidate(&self, key: &str) -> Result<bool>;

    /// Drop every entry.
    fn clear(&self) -> Result<()>;
}
