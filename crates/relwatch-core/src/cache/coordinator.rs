//! Cache-aside lookups with per-key single-flight.

use super::traits::CacheStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

type Gate = Arc<AsyncMutex<()>>;

/// Read-through cache in front of an injected [`CacheStore`].
///
/// Concurrent misses on the same key run the producer once: later callers
/// wait on the key's gate and then read what the first caller stored.
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
    inflight: Mutex<HashMap<String, Gate>>,
}

impl CacheAside {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Return the live value under `key`, or run `producer`, store its result
    /// for `ttl` and return it.
    ///
    /// Store failures never fail the lookup: a broken read counts as a miss
    /// and a broken write is logged and skipped.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &str, ttl: Duration, producer: F) -> T
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(hit) = self.lookup(key) {
            debug!("Cache hit for {}", key);
            return hit;
        }

        let _flight = self.enter(key).await;

        // Someone else may have filled the entry while we waited.
        if let Some(hit) = self.lookup(key) {
            debug!("Cache hit for {} after waiting on in-flight fetch", key);
            return hit;
        }

        debug!("Cache miss for {}", key);
        let value = producer().await;
        self.save(key, &value, ttl);
        value
    }

    /// Drop a cached value.
    pub fn invalidate(&self, key: &str) -> bool {
        self.store.invalidate(key).unwrap_or_else(|e| {
            warn!("Failed to invalidate {}: {}", key, e);
            false
        })
    }

    /// Number of keys with a fetch in progress.
    pub fn inflight_count(&self) -> usize {
        self.gates().len()
    }

    fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.store.get(key) {
            Ok(bytes) => bytes?,
            Err(e) => {
                warn!("Cache read for {} failed: {}", key, e);
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    fn save<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to serialize cache entry {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.store.put(key, &bytes, ttl) {
            warn!("Cache write for {} failed: {}", key, e);
        }
    }

    async fn enter<'a>(&'a self, key: &'a str) -> Flight<'a> {
        let gate = self
            .gates()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let permit = gate.clone().lock_owned().await;
        Flight {
            owner: self,
            key,
            gate,
            permit: Some(permit),
        }
    }

    fn release(&self, key: &str, gate: &Gate) {
        let mut gates = self.gates();
        // One reference is the map's, one is the caller's.
        if Arc::strong_count(gate) <= 2 && gates.get(key).is_some_and(|g| Arc::ptr_eq(g, gate)) {
            gates.remove(key);
        }
    }

    fn gates(&self) -> std::sync::MutexGuard<'_, HashMap<String, Gate>> {
        self.inflight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Holds a key's gate for the duration of a fetch; cleans the map on drop,
/// including when the fetching future is cancelled.
struct Flight<'a> {
    owner: &'a CacheAside,
    key: &'a str,
    gate: Gate,
    permit: Option<OwnedMutexGuard<()>>,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        self.permit.take();
        self.owner.release(self.key, &self.gate);
    }
}
