//! Usage ledger.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::{debug, info};

use aurarouter_core::{Error, Result};

use crate::schema::USAGE_SCHEMA_SQL;
use crate::sqlite::{from_millis, to_millis, LedgerDb};
use crate::types::*;

pub const USAGE_DB_FILE: &str = "usage.db";

/// Append-only ledger with one row per completed model attempt.
pub struct UsageStore {
    db: LedgerDb,
}

impl UsageStore {
    /// Open `usage.db` inside `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_at(data_dir.as_ref().join(USAGE_DB_FILE))
    }

    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let db = LedgerDb::open(path, USAGE_SCHEMA_SQL)?;
        let store = Self { db };
        info!(
            "UsageStore initialized: {} rows, path={}",
            store.count()?,
            store.db.path().display()
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        self.db.path()
    }

    /// Append one row. Returns the new row id.
    pub fn record(&self, record: &UsageRecord) -> Result<i64> {
        let id = self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO usage (timestamp, model_id, provider, role, intent, input_tokens, \
                 output_tokens, elapsed_s, success, is_cloud) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    to_millis(&record.timestamp),
                    record.model_id,
                    record.provider,
                    record.role,
                    record.intent,
                    record.input_tokens as i64,
                    record.output_tokens as i64,
                    record.elapsed_secs,
                    record.success,
                    record.is_cloud,
                ],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
            Ok(conn.last_insert_rowid())
        })?;
        debug!(
            "Usage row {} recorded: model={}, role={}, tokens={}/{}",
            id, record.model_id, record.role, record.input_tokens, record.output_tokens
        );
        Ok(id)
    }

    /// Rows in `range`, oldest first.
    pub fn query(&self, range: TimeRange) -> Result<Vec<UsageRecord>> {
        let (lo, hi) = range.bounds_millis();
        self.db.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM usage WHERE timestamp >= ?1 AND timestamp < ?2 \
                     ORDER BY timestamp, id",
                )
                .map_err(|e| Error::Database(e.to_string()))?;
            let rows = stmt
                .query_map(params![lo, hi], |row| Ok(Self::row_to_record(row)))
                .map_err(|e| Error::Database(e.to_string()))?;
            Ok(rows.filter_map(|r| r.ok()).collect())
        })
    }

    /// Token totals per (model, provider) in `range`.
    pub fn token_totals(&self, range: TimeRange) -> Result<Vec<ModelTokenTotals>> {
        let (lo, hi) = range.bounds_millis();
        self.db.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT model_id, provider, SUM(input_tokens), SUM(output_tokens), COUNT(*) \
                     FROM usage WHERE timestamp >= ?1 AND timestamp < ?2 \
                     GROUP BY model_id, provider ORDER BY model_id",
                )
                .map_err(|e| Error::Database(e.to_string()))?;
            let rows = stmt
                .query_map(params![lo, hi], |row| {
                    Ok(ModelTokenTotals {
                        model_id: row.get(0)?,
                        provider: row.get(1)?,
                        input_tokens: row.get::<_, i64>(2)?.max(0) as u64,
                        output_tokens: row.get::<_, i64>(3)?.max(0) as u64,
                        calls: row.get::<_, i64>(4)?.max(0) as u64,
                    })
                })
                .map_err(|e| Error::Database(e.to_string()))?;
            Ok(rows.filter_map(|r| r.ok()).collect())
        })
    }

    /// Attempt and token counts in `range`.
    pub fn summary(&self, range: TimeRange) -> Result<UsageSummary> {
        let (lo, hi) = range.bounds_millis();
        self.db.with_connection(|conn| {
            conn.query_row(
                "SELECT COUNT(*), \
                        COALESCE(SUM(success), 0), \
                        COALESCE(SUM(is_cloud), 0), \
                        COALESCE(SUM(input_tokens), 0), \
                        COALESCE(SUM(output_tokens), 0), \
                        COALESCE(SUM(elapsed_s), 0.0) \
                 FROM usage WHERE timestamp >= ?1 AND timestamp < ?2",
                params![lo, hi],
                |row| {
                    let attempts = row.get::<_, i64>(0)?.max(0) as u64;
                    let cloud = row.get::<_, i64>(2)?.max(0) as u64;
                    Ok(UsageSummary {
                        attempts,
                        successes: row.get::<_, i64>(1)?.max(0) as u64,
                        cloud_attempts: cloud,
                        local_attempts: attempts.saturating_sub(cloud),
                        input_tokens: row.get::<_, i64>(3)?.max(0) as u64,
                        output_tokens: row.get::<_, i64>(4)?.max(0) as u64,
                        total_elapsed_secs: row.get(5)?,
                    })
                },
            )
            .map_err(|e| Error::Database(e.to_string()))
        })
    }

    pub fn count(&self) -> Result<i64> {
        self.db.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM usage", [], |row| row.get(0))
                .map_err(|e| Error::Database(e.to_string()))
        })
    }

    /// Retention purge: delete rows strictly older than `cutoff`.
    pub fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let deleted = self.db.with_connection(|conn| {
            conn.execute(
                "DELETE FROM usage WHERE timestamp < ?1",
                params![to_millis(&cutoff)],
            )
            .map_err(|e| Error::Database(e.to_string()))
        })?;
        if deleted > 0 {
            info!("Purged {} usage rows older than {}", deleted, cutoff.to_rfc3339());
        }
        Ok(deleted)
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> UsageRecord {
        UsageRecord {
            id: row.get("id").ok(),
            timestamp: from_millis(row.get("timestamp").unwrap_or(0)),
            model_id: row.get("model_id").unwrap_or_default(),
            provider: row.get("provider").unwrap_or_default(),
            role: row.get("role").unwrap_or_default(),
            intent: row.get("intent").ok().flatten(),
            input_tokens: row.get::<_, i64>("input_tokens").unwrap_or(0).max(0) as u64,
            output_tokens: row.get::<_, i64>("output_tokens").unwrap_or(0).max(0) as u64,
            elapsed_secs: row.get("elapsed_s").unwrap_or(0.0),
            success: row.get("success").unwrap_or(false),
            is_cloud: row.get("is_cloud").unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn test_store() -> (UsageStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = UsageStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn row(model: &str, ts: DateTime<Utc>, input: u64, output: u64, cloud: bool) -> UsageRecord {
        UsageRecord {
            id: None,
            timestamp: ts,
            model_id: model.into(),
            provider: if cloud { "claude".into() } else { "ollama".into() },
            role: "coding".into(),
            intent: Some("SIMPLE_CODE".into()),
            input_tokens: input,
            output_tokens: output,
            elapsed_secs: 1.5,
            success: true,
            is_cloud: cloud,
        }
    }

    #[test]
    fn test_record_and_query() {
        let (store, _dir) = test_store();
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let id = store.record(&row("cloud_a", ts, 100, 50, true)).unwrap();
        assert!(id > 0);

        let rows = store.query(TimeRange::all()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, Some(id));
        assert_eq!(rows[0].timestamp, ts);
        assert_eq!(rows[0].model_id, "cloud_a");
        assert_eq!(rows[0].intent.as_deref(), Some("SIMPLE_CODE"));
        assert_eq!(rows[0].input_tokens, 100);
        assert!(rows[0].is_cloud);
    }

    #[test]
    fn test_query_by_range() {
        let (store, _dir) = test_store();
        let day1 = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let day2 = day1 + Duration::days(1);
        let day3 = day1 + Duration::days(2);
        store.record(&row("a", day1, 1, 1, true)).unwrap();
        store.record(&row("b", day2, 1, 1, true)).unwrap();
        store.record(&row("c", day3, 1, 1, true)).unwrap();

        let mid = store.query(TimeRange::between(day2, day3)).unwrap();
        assert_eq!(mid.len(), 1);
        assert_eq!(mid[0].model_id, "b");

        let since = store.query(TimeRange::since(day2)).unwrap();
        assert_eq!(since.len(), 2);
    }

    #[test]
    fn test_token_totals_grouped() {
        let (store, _dir) = test_store();
        let ts = Utc::now();
        store.record(&row("cloud_a", ts, 100, 10, true)).unwrap();
        store.record(&row("cloud_a", ts, 200, 20, true)).unwrap();
        store.record(&row("local_b", ts, 5, 5, false)).unwrap();

        let totals = store.token_totals(TimeRange::all()).unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].model_id, "cloud_a");
        assert_eq!(totals[0].input_tokens, 300);
        assert_eq!(totals[0].output_tokens, 30);
        assert_eq!(totals[0].calls, 2);
    }

    #[test]
    fn test_summary() {
        let (store, _dir) = test_store();
        let ts = Utc::now();
        store.record(&row("cloud_a", ts, 100, 10, true)).unwrap();
        let mut failed = row("local_b", ts, 0, 0, false);
        failed.success = false;
        store.record(&failed).unwrap();

        let summary = store.summary(TimeRange::all()).unwrap();
        assert_eq!(summary.attempts, 2);
        assert_eq!(summary.successes, 1);
        assert_eq!(summary.cloud_attempts, 1);
        assert_eq!(summary.local_attempts, 1);
        assert_eq!(summary.input_tokens, 100);
    }

    #[test]
    fn test_empty_summary() {
        let (store, _dir) = test_store();
        let summary = store.summary(TimeRange::all()).unwrap();
        assert_eq!(summary, UsageSummary::default());
    }

    #[test]
    fn test_purge_before() {
        let (store, _dir) = test_store();
        let old = Utc::now() - Duration::days(90);
        store.record(&row("a", old, 1, 1, true)).unwrap();
        store.record(&row("b", Utc::now(), 1, 1, true)).unwrap();

        let deleted = store.purge_before(Utc::now() - Duration::days(30)).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let dir = TempDir::new().unwrap();
        {
            let store = UsageStore::open(dir.path()).unwrap();
            store.record(&row("a", Utc::now(), 1, 1, true)).unwrap();
        }
        let store = UsageStore::open(dir.path()).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }
}
