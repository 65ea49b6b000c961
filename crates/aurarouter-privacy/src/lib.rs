//! Privacy auditing: regex-based detection of sensitive content.
//!
//! Scans prompts bound for cloud models against a built-in pattern set
//! (email, API keys, cloud access keys, national IDs, confidentiality
//! markers, private IP ranges) plus caller-supplied patterns. Matched text
//! is redacted before it leaves this crate.

pub mod auditor;
pub mod patterns;

pub use auditor::PrivacyAuditor;
pub use aurarouter_store::{PatternMatch, PrivacyEvent, Severity};
pub use patterns::{builtin_patterns, redact, PrivacyPattern};
