//! Ledger schema SQL.

/// Usage ledger: one row per completed model attempt.
pub const USAGE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS usage (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER NOT NULL,
    model_id TEXT NOT NULL,
    provider TEXT NOT NULL,
    role TEXT NOT NULL,
    intent TEXT,
    input_tokens INTEGER NOT NULL DEFAULT 0,
    output_tokens INTEGER NOT NULL DEFAULT 0,
    elapsed_s REAL NOT NULL DEFAULT 0,
    success INTEGER NOT NULL,
    is_cloud INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_usage_timestamp ON usage(timestamp);
CREATE INDEX IF NOT EXISTS idx_usage_model ON usage(model_id);
"#;

/// Privacy ledger: one row per audit hit on a cloud-bound prompt.
pub const PRIVACY_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS privacy_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER NOT NULL,
    model_id TEXT NOT NULL,
    provider TEXT NOT NULL,
    matches_json TEXT NOT NULL,
    max_severity TEXT NOT NULL,
    prompt_length INTEGER NOT NULL,
    prompt_hash TEXT,
    recommendation TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_privacy_timestamp ON privacy_events(timestamp);
"#;
