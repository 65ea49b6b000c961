//! Shared SQLite plumbing for the ledgers.
//!
//! Each ledger opens a fresh connection per operation under a single
//! mutex. Write volume is one row per model attempt, so the open cost is
//! acceptable and no connection outlives a call.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::debug;

use aurarouter_core::{Error, Result};

/// A single-file SQLite database guarded by one mutex.
pub struct LedgerDb {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LedgerDb {
    /// Create the parent directory and apply `schema_sql`.
    pub fn open(path: impl AsRef<Path>, schema_sql: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| Error::Storage(e.to_string()))?;
            }
        }

        let db = Self {
            path,
            lock: Mutex::new(()),
        };
        db.with_connection(|conn| {
            conn.execute_batch("PRAGMA journal_mode = WAL;")
                .map_err(|e| Error::Database(e.to_string()))?;
            conn.execute_batch(schema_sql)
                .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))
        })?;
        debug!("Ledger ready at {}", db.path.display());
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against a connection opened for this call only.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let _guard = self.lock.lock();
        let conn = Connection::open(&self.path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        f(&conn)
    }
}

pub(crate) fn to_millis(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
