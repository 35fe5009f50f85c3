//! SQLite-backed cache store, for caches that should survive a restart.

use super::traits::CacheStore;
use crate::error::{RelwatchError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// SQLite-based cache store.
///
/// Thread-safe via internal mutex on the connection. Expiry is stored as unix
/// milliseconds so comparisons happen in SQL.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a cache database at `db_path`.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| RelwatchError::io_with_path(e, parent))?;
        }

        let conn = Connection::open(db_path).map_err(|e| RelwatchError::Database {
            message: format!("Failed to open cache database: {}", e),
            source: Some(e),
        })?;

        // WAL for concurrent readers
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| RelwatchError::Database {
                message: format!("Failed to set pragmas: {}", e),
                source: Some(e),
            })?;

        Self::from_connection(conn)
    }

    /// Non-persistent store, mostly for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                cached_at TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cache_expires
                ON cache_entries(expires_at);
            "#,
        )
        .map_err(|e| RelwatchError::Database {
            message: format!("Failed to initialize cache schema: {}", e),
            source: Some(e),
        })?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RelwatchError::database(format!("Failed to lock database: {}", e)))
    }

    /// Store bytes with an explicit expiration time.
    pub fn put_with_expiry(&self, key: &str, value: &[u8], expires_at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO cache_entries
            (key, value, cached_at, expires_at, size_bytes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                key,
                value,
                Utc::now().to_rfc3339(),
                expires_at.timestamp_millis(),
                value.len() as i64
            ],
        )
        .map_err(|e| RelwatchError::Database {
            message: format!("Failed to set cache entry: {}", e),
            source: Some(e),
        })?;
        Ok(())
    }

    /// Remove expired entries. Returns the number removed.
    pub fn cleanup_expired(&self) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn
            .execute(
                "DELETE FROM cache_entries WHERE expires_at <= ?1",
                params![Utc::now().timestamp_millis()],
            )
            .map_err(|e| RelwatchError::Database {
                message: format!("Failed to cleanup expired entries: {}", e),
                source: Some(e),
            })?;

        if deleted > 0 {
            debug!("Cleaned up {} expired cache entries", deleted);
        }
        Ok(deleted)
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl CacheStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM cache_entries WHERE key = ?1 AND expires_at > ?2",
            params![key, Utc::now().timestamp_millis()],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| RelwatchError::Database {
            message: format!("Failed to query cache entry: {}", e),
            source: Some(e),
        })
    }

    fn put(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default();
        self.put_with_expiry(key, value, expires_at)
    }

    fn invalidate(&self, key: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn
            .execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
            .map_err(|e| RelwatchError::Database {
                message: format!("Failed to invalidate cache entry: {}", e),
                source: Some(e),
            })?;
        Ok(deleted > 0)
    }

    fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM cache_entries", [])
            .map_err(|e| RelwatchError::Database {
                message: format!("Failed to clear cache entries: {}", e),
                source: Some(e),
            })?;
        debug!("Cleared all cache data");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, SqliteStore) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("cache").join("relwatch.sqlite");
        let store = SqliteStore::new(&db_path).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_set_and_get() {
        let (_temp, store) = create_test_store();
        store
            .put("package_react", b"hello world", Duration::from_secs(3600))
            .unwrap();

        let value = store.get("package_react").unwrap();
        assert_eq!(value.unwrap(), b"hello world");
    }

    #[test]
    fn test_expired_entries_are_invisible() {
        let (_temp, store) = create_test_store();
        let expired_at = Utc::now() - chrono::Duration::seconds(1);
        store
            .put_with_expiry("old", b"old data", expired_at)
            .unwrap();

        assert!(store.get("old").unwrap().is_none());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_cleanup_expired() {
        let (_temp, store) = create_test_store();
        let past = Utc::now() - chrono::Duration::seconds(100);
        store.put_with_expiry("old1", b"data", past).unwrap();
        store.put_with_expiry("old2", b"data", past).unwrap();
        store
            .put("new1", b"data", Duration::from_secs(3600))
            .unwrap();

        assert_eq!(store.cleanup_expired().unwrap(), 2);
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.get("new1").unwrap().is_some());
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("relwatch.sqlite");
        {
            let store = SqliteStore::new(&db_path).unwrap();
            store
                .put("github_rust-lang_rust", b"{}", Duration::from_secs(1800))
                .unwrap();
        }
        let store = SqliteStore::new(&db_path).unwrap();
        assert!(store.get("github_rust-lang_rust").unwrap().is_some());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let store = SqliteStore::in_memory().unwrap();
        store.put("a", b"1", Duration::from_secs(60)).unwrap();
        store.put("b", b"2", Duration::from_secs(60)).unwrap();

        assert!(store.invalidate("a").unwrap());
        assert!(!store.invalidate("a").unwrap());

        store.clear().unwrap();
        assert!(store.is_empty().unwrap());
    }
}
