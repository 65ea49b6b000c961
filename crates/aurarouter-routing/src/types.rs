//! Fabric and pipeline types.

use std::time::Duration;

use serde::Serialize;

pub const INTENT_SIMPLE_CODE: &str = "SIMPLE_CODE";
pub const INTENT_COMPLEX_REASONING: &str = "COMPLEX_REASONING";
pub const DEFAULT_COMPLEXITY: u8 = 5;

/// Prefix of the string `execute` returns when cloud spend blocked the chain.
pub const BUDGET_EXCEEDED_PREFIX: &str = "BUDGET_EXCEEDED";

/// Why one chain entry succeeded or was passed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    PrivacyBlocked,
    BudgetBlocked,
    BackendError,
    EmptyResponse,
}

/// Telemetry for one chain entry, delivered to the attempt callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReport {
    pub role: String,
    pub model_id: String,
    pub success: bool,
    /// Zero when a gate skipped the backend.
    pub elapsed: Duration,
    pub outcome: AttemptOutcome,
}

/// Result of walking a role chain.
#[derive(Debug, Clone, PartialEq)]
pub enum FabricOutcome {
    Success { text: String, model_id: String },
    /// Chain blocked by cloud spend with no local fallback; carries the sentinel message.
    BudgetExceeded(String),
    Exhausted,
}

impl FabricOutcome {
    /// Collapse to the `execute` return value.
    pub fn into_text(self) -> Option<String> {
        match self {
            FabricOutcome::Success { text, .. } => Some(text),
            FabricOutcome::BudgetExceeded(message) => Some(message),
            FabricOutcome::Exhausted => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FabricOutcome::Success { .. })
    }
}

/// One fabric call.
#[derive(Debug, Clone, Copy)]
pub struct ExecuteRequest<'a> {
    pub role: &'a str,
    pub prompt: &'a str,
    pub json_mode: bool,
    /// Intent label written to the usage ledger.
    pub intent: Option<&'a str>,
}

impl<'a> ExecuteRequest<'a> {
    pub fn new(role: &'a str, prompt: &'a str) -> Self {
        Self {
            role,
            prompt,
            json_mode: false,
            intent: None,
        }
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }

    pub fn with_intent(mut self, intent: &'a str) -> Self {
        self.intent = Some(intent);
        self
    }
}

/// Router classification of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriageResult {
    pub intent: String,
    /// 1..=10.
    pub complexity: u8,
}

impl Default for TriageResult {
    fn default() -> Self {
        Self {
            intent: INTENT_SIMPLE_CODE.to_string(),
            complexity: DEFAULT_COMPLEXITY,
        }
    }
}

impl TriageResult {
    pub fn is_complex(&self) -> bool {
        self.intent.eq_ignore_ascii_case(INTENT_COMPLEX_REASONING)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReviewVerdict {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    pub verdict: ReviewVerdict,
    pub feedback: String,
    pub correction_hints: Vec<String>,
}

impl ReviewResult {
    pub fn pass() -> Self {
        Self {
            verdict: ReviewVerdict::Pass,
            feedback: String::new(),
            correction_hints: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict == ReviewVerdict::Pass
    }
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutcome {
    pub run_id: String,
    pub triage: TriageResult,
    /// Role the execution steps ran under.
    pub role: String,
    pub steps: Vec<String>,
    pub output: Option<String>,
    pub review_rounds: u32,
    pub final_verdict: Option<ReviewVerdict>,
}
