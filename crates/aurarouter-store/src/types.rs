//! Ledger row types and query ranges.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a privacy pattern hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One usage ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub model_id: String,
    pub provider: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub elapsed_secs: f64,
    pub success: bool,
    pub is_cloud: bool,
}

/// A single pattern hit inside a prompt. `redacted` never holds the full match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub name: String,
    pub severity: Severity,
    pub redacted: String,
    pub position: usize,
}

/// One privacy ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub model_id: String,
    pub provider: String,
    pub matches: Vec<PatternMatch>,
    pub prompt_length: usize,
    /// SHA-256 hex digest of the prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_hash: Option<String>,
    pub recommendation: String,
}

impl PrivacyEvent {
    pub fn max_severity(&self) -> Option<Severity> {
        self.matches.iter().map(|m| m.severity).max()
    }

    pub fn pattern_names(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.name.as_str()).collect()
    }
}

/// Half-open `[start, end)` time window. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// The last `days` days. Spans too large for the calendar cover everything.
    pub fn last_days(days: i64) -> Self {
        checked_days_ago(days).map(Self::since).unwrap_or_default()
    }

    pub(crate) fn bounds_millis(&self) -> (i64, i64) {
        (
            self.start.map(|t| t.timestamp_millis()).unwrap_or(i64::MIN),
            self.end.map(|t| t.timestamp_millis()).unwrap_or(i64::MAX),
        )
    }
}

fn checked_days_ago(days: i64) -> Option<DateTime<Utc>> {
    Duration::try_days(days).and_then(|span| Utc::now().checked_sub_signed(span))
}

/// `days` days before now, saturating at the earliest representable instant.
pub fn days_ago(days: i64) -> DateTime<Utc> {
    checked_days_ago(days).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Token totals for one model over a range, used for re-pricing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelTokenTotals {
    pub model_id: String,
    pub provider: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub calls: u64,
}

/// Aggregate view of the usage ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageSummary {
    pub attempts: u64,
    pub successes: u64,
    pub cloud_attempts: u64,
    pub local_attempts: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_elapsed_secs: f64,
}

/// Aggregate view of the privacy ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrivacySummary {
    pub total_events: u64,
    /// Events keyed by their highest-severity match.
    pub by_severity: BTreeMap<String, u64>,
    /// Events in which each pattern appeared.
    pub by_pattern: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(Severity::parse("HIGH"), Some(Severity::High));
        assert_eq!(Severity::parse("critical"), None);
    }

    #[test]
    fn test_event_helpers() {
        let event = PrivacyEvent {
            id: None,
            timestamp: Utc::now(),
            model_id: "cloud".into(),
            provider: "claude".into(),
            matches: vec![
                PatternMatch {
                    name: "email_address".into(),
                    severity: Severity::Medium,
                    redacted: "use****".into(),
                    position: 3,
                },
                PatternMatch {
                    name: "ssn".into(),
                    severity: Severity::High,
                    redacted: "123****".into(),
                    position: 20,
                },
            ],
            prompt_length: 40,
            prompt_hash: None,
            recommendation: String::new(),
        };
        assert_eq!(event.max_severity(), Some(Severity::High));
        assert_eq!(event.pattern_names(), vec!["email_address", "ssn"]);
    }

    #[test]
    fn test_open_range_bounds() {
        let (lo, hi) = TimeRange::all().bounds_millis();
        assert_eq!(lo, i64::MIN);
        assert_eq!(hi, i64::MAX);
    }

    #[test]
    fn test_day_spans_never_overflow() {
        assert_eq!(TimeRange::last_days(200_000_000), TimeRange::all());
        assert_eq!(TimeRange::last_days(i64::MAX), TimeRange::all());
        assert_eq!(days_ago(200_000_000), DateTime::<Utc>::MIN_UTC);

        let week = TimeRange::last_days(7);
        let start = week.start.unwrap();
        assert!(start < Utc::now() - Duration::days(6));
        assert!(start > Utc::now() - Duration::days(8));
        assert_eq!(week.end, None);
        assert!(days_ago(1) < Utc::now());
    }
}
