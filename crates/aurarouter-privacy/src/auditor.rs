//! Stateless prompt auditor.

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::debug;

use aurarouter_core::{resolve_hosting_tier, HostingTier, PrivacyConfig, Result};
use aurarouter_store::{PatternMatch, PrivacyEvent, Severity};

use crate::patterns::{builtin_patterns, redact, PrivacyPattern};

/// Scans prompts for sensitive content before they reach a cloud model.
pub struct PrivacyAuditor {
    patterns: Vec<PrivacyPattern>,
}

impl PrivacyAuditor {
    /// Auditor with the built-in pattern set only.
    pub fn new() -> Self {
        Self {
            patterns: builtin_patterns(),
        }
    }

    /// Built-in patterns extended with the config's custom patterns.
    pub fn from_config(config: &PrivacyConfig) -> Result<Self> {
        let mut auditor = Self::new();
        for custom in &config.custom_patterns {
            auditor.add_pattern(PrivacyPattern::from_custom(custom)?);
        }
        Ok(auditor)
    }

    pub fn add_pattern(&mut self, pattern: PrivacyPattern) {
        self.patterns.push(pattern);
    }

    pub fn patterns(&self) -> &[PrivacyPattern] {
        &self.patterns
    }

    /// All non-overlapping pattern hits in `text`, by position.
    pub fn scan(&self, text: &str) -> Vec<PatternMatch> {
        let mut hits: Vec<(usize, usize, &PrivacyPattern)> = Vec::new();
        for pattern in &self.patterns {
            for m in pattern.regex.find_iter(text) {
                hits.push((m.start(), m.end(), pattern));
            }
        }

        // Sort by position, longest match first for overlapping
        hits.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut matches = Vec::new();
        let mut last_end = 0;
        for (start, end, pattern) in hits {
            if start < last_end {
                continue;
            }
            last_end = end;
            matches.push(PatternMatch {
                name: pattern.name.clone(),
                severity: pattern.severity,
                redacted: redact(&text[start..end]),
                position: start,
            });
        }
        matches
    }

    /// Audit a prompt bound for `model_id`.
    ///
    /// Returns `None` for local models (never audited) and for prompts
    /// with no hits.
    pub fn audit(
        &self,
        prompt: &str,
        model_id: &str,
        provider: &str,
        hosting_tier: Option<HostingTier>,
    ) -> Option<PrivacyEvent> {
        if !resolve_hosting_tier(hosting_tier, provider).is_cloud() {
            return None;
        }

        let matches = self.scan(prompt);
        if matches.is_empty() {
            return None;
        }

        debug!(
            "Privacy audit for {}: {} matches",
            model_id,
            matches.len()
        );

        Some(PrivacyEvent {
            id: None,
            timestamp: Utc::now(),
            model_id: model_id.to_string(),
            provider: provider.to_string(),
            recommendation: Self::recommendation(&matches),
            prompt_length: prompt.chars().count(),
            prompt_hash: Some(hex::encode(Sha256::digest(prompt.as_bytes()))),
            matches,
        })
    }

    fn recommendation(matches: &[PatternMatch]) -> String {
        let mut names: Vec<&str> = matches.iter().map(|m| m.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();

        let worst = matches
            .iter()
            .map(|m| m.severity)
            .max()
            .unwrap_or(Severity::Low);
        match worst {
            Severity::High => format!(
                "Route to a local or private-tagged model; prompt contains high-severity data ({})",
                names.join(", ")
            ),
            Severity::Medium => format!(
                "Prefer a local model or redact before sending to cloud ({})",
                names.join(", ")
            ),
            Severity::Low => format!(
                "Review before sending to cloud ({})",
                names.join(", ")
            ),
        }
    }
}

impl Default for PrivacyAuditor {
    fn default() -> Self {
        Self::new()
    }
}
