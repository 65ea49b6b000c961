//! Built-in sensitive-data patterns and redaction.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use aurarouter_core::{CustomPattern, Error, Result};
use aurarouter_store::Severity;

/// A named detection pattern with its severity.
#[derive(Debug, Clone, Serialize)]
pub struct PrivacyPattern {
    pub name: String,
    pub severity: Severity,
    pub description: String,
    #[serde(skip)]
    pub regex: Regex,
}

impl PrivacyPattern {
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        severity: Severity,
        description: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let regex = Regex::new(pattern)
            .map_err(|e| Error::Pattern(format!("{}: {}", name, e)))?;
        Ok(Self {
            name,
            severity,
            description: description.into(),
            regex,
        })
    }

    /// Build from a config entry. Unknown severities fall back to medium.
    pub fn from_custom(custom: &CustomPattern) -> Result<Self> {
        let severity = Severity::parse(&custom.severity).unwrap_or_else(|| {
            tracing::warn!(
                "Custom pattern '{}' has unknown severity '{}', using medium",
                custom.name,
                custom.severity
            );
            Severity::Medium
        });
        Self::new(&custom.name, &custom.pattern, severity, &custom.description)
    }

    fn builtin(name: &str, regex: &Regex, severity: Severity, description: &str) -> Self {
        Self {
            name: name.to_string(),
            severity,
            description: description.to_string(),
            regex: regex.clone(),
        }
    }
}

// Compiled regex patterns (compiled once, reused).
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap());
static API_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:sk|pk|rk)-[A-Za-z0-9_-]{20,}").unwrap());
static CREDENTIAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:api[_-]?key|secret|access[_-]?token|password)\s*[:=]\s*['"]?[A-Za-z0-9_\-./+]{12,}"#)
        .unwrap()
});
static GITHUB_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bgh[pousr]_[A-Za-z0-9]{36,}\b").unwrap());
static AWS_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b").unwrap());
static GOOGLE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bAIza[0-9A-Za-z_-]{35}").unwrap());
static PRIVATE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-----BEGIN (?:[A-Z]+ )?PRIVATE KEY-----").unwrap());
static SSN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());
static CC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d{4}[-\s]?){3}\d{4}\b").unwrap());
static CONFIDENTIAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:confidential|internal use only|do not distribute|trade secret|proprietary and confidential)\b")
        .unwrap()
});
static PRIVATE_IP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:10\.\d{1,3}\.\d{1,3}\.\d{1,3}|192\.168\.\d{1,3}\.\d{1,3}|172\.(?:1[6-9]|2\d|3[01])\.\d{1,3}\.\d{1,3})\b",
    )
    .unwrap()
});

/// The fixed built-in pattern set.
pub fn builtin_patterns() -> Vec<PrivacyPattern> {
    vec![
        PrivacyPattern::builtin("email_address", &EMAIL_RE, Severity::Medium, "Email address"),
        PrivacyPattern::builtin("api_key", &API_KEY_RE, Severity::High, "Secret-key shaped token"),
        PrivacyPattern::builtin(
            "credential_assignment",
            &CREDENTIAL_RE,
            Severity::High,
            "Credential assigned to a key/secret/password field",
        ),
        PrivacyPattern::builtin("github_token", &GITHUB_TOKEN_RE, Severity::High, "GitHub token"),
        PrivacyPattern::builtin("aws_access_key", &AWS_KEY_RE, Severity::High, "AWS access key id"),
        PrivacyPattern::builtin("google_api_key", &GOOGLE_KEY_RE, Severity::High, "Google API key"),
        PrivacyPattern::builtin("private_key", &PRIVATE_KEY_RE, Severity::High, "PEM private key header"),
        PrivacyPattern::builtin("ssn", &SSN_RE, Severity::High, "US social security number"),
        PrivacyPattern::builtin("credit_card", &CC_RE, Severity::High, "Payment card number"),
        PrivacyPattern::builtin(
            "confidential_marker",
            &CONFIDENTIAL_RE,
            Severity::Medium,
            "Document confidentiality marker",
        ),
        PrivacyPattern::builtin("private_ip", &PRIVATE_IP_RE, Severity::Low, "RFC 1918 address"),
    ]
}

/// Mask a matched value, keeping only a short prefix.
pub fn redact(text: &str) -> String {
    let len = text.chars().count();
    let keep = if len > 6 { 3 } else { 1.min(len) };
    let prefix: String = text.chars().take(keep).collect();
    format!("{}****", prefix)
}
