//! AuraRouter Store: append-only SQLite ledgers.
//!
//! `UsageStore` keeps one row per completed model attempt; `PrivacyStore`
//! keeps one row per privacy audit hit. Rows are never updated; the only
//! deletion path is `purge_before`.

pub mod audit;
pub mod schema;
pub mod sqlite;
pub mod types;
pub mod usage;

pub use audit::PrivacyStore;
pub use types::*;
pub use usage::UsageStore;
