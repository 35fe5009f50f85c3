//! In-memory cache store on top of mini-moka.

use super::traits::CacheStore;
use crate::config::CacheTtl;
use crate::error::Result;
use mini_moka::sync::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct StoredValue {
    bytes: Arc<Vec<u8>>,
    expires_at: Instant,
}

/// Bounded in-process store.
///
/// Each entry keeps its own expiry. The mini-moka TTL is only an upper bound,
/// so a `put` with a TTL longer than `max_ttl` is cut short.
pub struct MemoryStore {
    entries: Cache<String, StoredValue>,
    max_ttl: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_limits(CacheTtl::MEMORY_MAX, CacheTtl::MEMORY_MAX_ENTRIES)
    }

    pub fn with_limits(max_ttl: Duration, max_entries: u64) -> Self {
        Self {
            entries: Cache::builder()
                .time_to_live(max_ttl)
                .max_capacity(max_entries)
                .build(),
            max_ttl,
        }
    }

    pub fn max_ttl(&self) -> Duration {
        self.max_ttl
    }

    /// Approximate number of live entries.
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let key = key.to_string();
        match self.entries.get(&key) {
            Some(stored) if stored.expires_at > Instant::now() => Ok(Some(stored.bytes.to_vec())),
            Some(_) => {
                self.entries.invalidate(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            StoredValue {
                bytes: Arc::new(value.to_vec()),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        let existed = self.entries.contains_key(&key);
        self.entries.invalidate(&key);
        Ok(existed)
    }

    fn clear(&self) -> Result<()> {
        self.entries.invalidate_all();
        Ok(())
    }
}
