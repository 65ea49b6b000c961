//! Privacy audit ledger.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::{debug, info};

use aurarouter_core::{Error, Result};

use crate::schema::PRIVACY_SCHEMA_SQL;
use crate::sqlite::{from_millis, to_millis, LedgerDb};
use crate::types::*;

pub const PRIVACY_DB_FILE: &str = "privacy.db";

/// Append-only ledger of privacy audit hits.
pub struct PrivacyStore {
    db: LedgerDb,
}

impl PrivacyStore {
    /// Open `privacy.db` inside `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_at(data_dir.as_ref().join(PRIVACY_DB_FILE))
    }

    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let db = LedgerDb::open(path, PRIVACY_SCHEMA_SQL)?;
        let store = Self { db };
        info!(
            "PrivacyStore initialized: {} events, path={}",
            store.count()?,
            store.db.path().display()
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        self.db.path()
    }

    /// Append one audit event. Returns the new row id.
    pub fn record(&self, event: &PrivacyEvent) -> Result<i64> {
        let matches_json = serde_json::to_string(&event.matches)?;
        let max_severity = event
            .max_severity()
            .map(|s| s.as_str())
            .unwrap_or("low");

        let id = self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO privacy_events (timestamp, model_id, provider, matches_json, \
                 max_severity, prompt_length, prompt_hash, recommendation) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    to_millis(&event.timestamp),
                    event.model_id,
                    event.provider,
                    matches_json,
                    max_severity,
                    event.prompt_length as i64,
                    event.prompt_hash,
                    event.recommendation,
                ],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
            Ok(conn.last_insert_rowid())
        })?;
        debug!(
            "Privacy event {} recorded: model={}, matches={}",
            id,
            event.model_id,
            event.matches.len()
        );
        Ok(id)
    }

    /// Events in `range`, oldest first.
    pub fn query(&self, range: TimeRange) -> Result<Vec<PrivacyEvent>> {
        let (lo, hi) = range.bounds_millis();
        self.db.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM privacy_events WHERE timestamp >= ?1 AND timestamp < ?2 \
                     ORDER BY timestamp, id",
                )
                .map_err(|e| Error::Database(e.to_string()))?;
            let rows = stmt
                .query_map(params![lo, hi], |row| Ok(Self::row_to_event(row)))
                .map_err(|e| Error::Database(e.to_string()))?;
            Ok(rows.filter_map(|r| r.ok()).collect())
        })
    }

    /// Event counts by highest severity and by pattern name.
    pub fn summary(&self, range: TimeRange) -> Result<PrivacySummary> {
        let events = self.query(range)?;
        let mut summary = PrivacySummary::default();

        for event in &events {
            summary.total_events += 1;
            if let Some(severity) = event.max_severity() {
                *summary
                    .by_severity
                    .entry(severity.as_str().to_string())
                    .or_insert(0) += 1;
            }
            let mut names = event.pattern_names();
            names.sort_unstable();
            names.dedup();
            for name in names {
                *summary.by_pattern.entry(name.to_string()).or_insert(0) += 1;
            }
        }

        Ok(summary)
    }

    pub fn count(&self) -> Result<i64> {
        self.db.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM privacy_events", [], |row| row.get(0))
                .map_err(|e| Error::Database(e.to_string()))
        })
    }

    /// Retention purge: delete events strictly older than `cutoff`.
    pub fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let deleted = self.db.with_connection(|conn| {
            conn.execute(
                "DELETE FROM privacy_events WHERE timestamp < ?1",
                params![to_millis(&cutoff)],
            )
            .map_err(|e| Error::Database(e.to_string()))
        })?;
        if deleted > 0 {
            info!(
                "Purged {} privacy events older than {}",
                deleted,
                cutoff.to_rfc3339()
            );
        }
        Ok(deleted)
    }

    fn row_to_event(row: &rusqlite::Row<'_>) -> PrivacyEvent {
        PrivacyEvent {
            id: row.get("id").ok(),
            timestamp: from_millis(row.get("timestamp").unwrap_or(0)),
            model_id: row.get("model_id").unwrap_or_default(),
            provider: row.get("provider").unwrap_or_default(),
            matches: row
                .get::<_, String>("matches_json")
                .ok()
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            prompt_length: row.get::<_, i64>("prompt_length").unwrap_or(0).max(0) as usize,
            prompt_hash: row.get("prompt_hash").ok().flatten(),
            recommendation: row.get("recommendation").unwrap_or_default(),
        }
    }
}
