//! Audit log of batch update checks.
//!
//! Every package checked through
//! [`UpdateService::check_for_updates`](crate::UpdateService::check_for_updates)
//! can be recorded here together with the outcome it produced.

use crate::error::{RelwatchError, Result};
use crate::models::{has_update, PackageSpec, UpdateOutcome};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// One recorded check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateLogEntry {
    /// Row id; `None` until stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub package_name: String,
    pub package_type: String,
    pub current_version: Option<String>,
    pub latest_version: Option<String>,
    pub has_update: bool,
    /// The full outcome as JSON.
    pub metadata: serde_json::Value,
    pub checked_at: DateTime<Utc>,
}

impl UpdateLogEntry {
    /// Build the log entry for `spec` having produced `outcome`.
    pub fn from_outcome(spec: &PackageSpec, outcome: &UpdateOutcome) -> Self {
        let latest = outcome.latest_version().map(str::to_string);
        let has_update = latest
            .as_deref()
            .is_some_and(|latest| has_update(spec.current_version.as_deref(), latest));

        Self {
            id: None,
            package_name: spec.name.clone(),
            package_type: spec.kind.clone(),
            current_version: spec.current_version.clone(),
            latest_version: latest,
            has_update,
            metadata: serde_json::to_value(outcome).unwrap_or(serde_json::Value::Null),
            checked_at: Utc::now(),
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let metadata: Option<String> = row.get(6)?;
        let checked_at: String = row.get(7)?;
        Ok(Self {
            id: Some(row.get(0)?),
            package_name: row.get(1)?,
            package_type: row.get(2)?,
            current_version: row.get(3)?,
            latest_version: row.get(4)?,
            has_update: row.get(5)?,
            metadata: metadata
                .and_then(|m| serde_json::from_str(&m).ok())
                .unwrap_or(serde_json::Value::Null),
            checked_at: DateTime::parse_from_rfc3339(&checked_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

/// SQLite-backed `update_logs` table.
pub struct UpdateLogStore {
    conn: Arc<Mutex<Connection>>,
}

impl UpdateLogStore {
    /// Open (or create) the audit database at `db_path`.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| RelwatchError::io_with_path(e, parent))?;
        }

        let conn = Connection::open(db_path).map_err(|e| RelwatchError::Database {
            message: format!("Failed to open audit database: {}", e),
            source: Some(e),
        })?;
        info!("Audit log at {}", db_path.display());
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS update_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package_name TEXT NOT NULL,
                package_type TEXT NOT NULL,
                current_version TEXT,
                latest_version TEXT,
                has_update INTEGER NOT NULL,
                metadata TEXT,
                checked_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_update_logs_package
                ON update_logs(package_name, checked_at);
            "#,
        )
        .map_err(|e| RelwatchError::Database {
            message: format!("Failed to initialize audit schema: {}", e),
            source: Some(e),
        })?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RelwatchError::database(format!("Failed to lock audit database: {}", e)))
    }

    /// Insert `entry` and return its row id.
    pub fn record(&self, entry: &UpdateLogEntry) -> Result<i64> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO update_logs
            (package_name, package_type, current_version, latest_version, has_update,
             metadata, checked_at, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
            params![
                entry.package_name,
                entry.package_type,
                entry.current_version,
                entry.latest_version,
                entry.has_update,
                serde_json::to_string(&entry.metadata)?,
                entry.checked_at.to_rfc3339(),
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Recorded update check #{} for {}", id, entry.package_name);
        Ok(id)
    }

    /// Most recent entries first.
    pub fn recent(&self, limit: usize) -> Result<Vec<UpdateLogEntry>> {
        self.query(
            "SELECT id, package_name, package_type, current_version, latest_version, has_update,
                    metadata, checked_at
             FROM update_logs ORDER BY checked_at DESC, id DESC LIMIT ?1",
            params![limit as i64],
        )
    }

    /// Most recent entries for one package.
    pub fn for_package(&self, package_name: &str, limit: usize) -> Result<Vec<UpdateLogEntry>> {
        self.query(
            "SELECT id, package_name, package_type, current_version, latest_version, has_update,
                    metadata, checked_at
             FROM update_logs WHERE package_name = ?1
             ORDER BY checked_at DESC, id DESC LIMIT ?2",
            params![package_name, limit as i64],
        )
    }

    fn query(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<UpdateLogEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, UpdateLogEntry::from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(RelwatchError::from)
    }
}
