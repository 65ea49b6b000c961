//! Routing pipeline: triage, planning, execution and the review loop.
//!
//! Every function here fails open: a missing role, a dead backend or an
//! unparseable reply degrades to a documented default, never an error.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use aurarouter_core::RouterConfig;

use crate::decode::{extract_json_array, extract_json_object, plan_steps, Decoded};
use crate::fabric::ComputeFabric;
use crate::prompts;
use crate::triage::TriageRouter;
use crate::types::*;
use crate::verbs::SemanticVerbRegistry;

/// Classify `task` via the `router` role.
///
/// Falls back to `SIMPLE_CODE` / complexity 5 on any failure. The intent
/// label is passed through synonym resolution.
pub fn analyze_intent(
    fabric: &ComputeFabric,
    task: &str,
    custom_verbs: Option<&HashMap<String, Vec<String>>>,
) -> TriageResult {
    let prompt = prompts::classify_prompt(task);
    let reply = fabric.execute_request(&ExecuteRequest::new("router", &prompt).json(), |_| {});

    let decoded = Decoded::from_reply(reply.as_deref(), parse_triage, TriageResult::default);
    if let Some(reason) = decoded.fallback_reason() {
        warn!("Intent classification fell back to defaults: {}", reason);
    }

    let mut triage = decoded.into_inner();
    triage.intent = SemanticVerbRegistry::resolve_synonym(&triage.intent, custom_verbs);
    triage
}

fn parse_triage(reply: &str) -> Result<TriageResult, String> {
    let map = extract_json_object(reply)?;
    let intent = map
        .get("intent")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or("missing intent")?;
    let complexity = map
        .get("complexity")
        .and_then(parse_complexity)
        .unwrap_or(DEFAULT_COMPLEXITY);
    Ok(TriageResult {
        intent: intent.to_string(),
        complexity,
    })
}

/// Complexity as an integer 1..=10; numbers, floats and numeric strings accepted.
fn parse_complexity(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(1.0, 10.0) as u8)
}

/// Ask the `reasoning` role for an ordered step list.
///
/// Falls back to a single step: the task itself.
pub fn generate_plan(fabric: &ComputeFabric, task: &str, context: &str) -> Vec<String> {
    let prompt = prompts::plan_prompt(task, context);
    let reply = fabric.execute("reasoning", &prompt, false, |_| {});

    let decoded = Decoded::from_reply(reply.as_deref(), parse_steps, || vec![task.to_string()]);
    if let Some(reason) = decoded.fallback_reason() {
        warn!("Plan generation fell back to a single step: {}", reason);
    }
    decoded.into_inner()
}

fn parse_steps(reply: &str) -> Result<Vec<String>, String> {
    let steps = plan_steps(&extract_json_array(reply)?);
    if steps.is_empty() {
        return Err("plan has no steps".into());
    }
    Ok(steps)
}

/// Ask the `reviewer` role to grade `output`. Fails open to PASS.
pub fn review_output(fabric: &ComputeFabric, task: &str, output: &str) -> ReviewResult {
    let prompt = prompts::review_prompt(task, output);
    let reply = fabric.execute_request(&ExecuteRequest::new("reviewer", &prompt).json(), |_| {});

    let decoded = Decoded::from_reply(reply.as_deref(), parse_review, ReviewResult::pass);
    if let Some(reason) = decoded.fallback_reason() {
        warn!("Review fell back to PASS: {}", reason);
    }
    decoded.into_inner()
}

fn parse_review(reply: &str) -> Result<ReviewResult, String> {
    let map = extract_json_object(reply)?;
    let verdict = match map.get("verdict").and_then(Value::as_str).map(str::trim) {
        Some(v) if v.eq_ignore_ascii_case("pass") => ReviewVerdict::Pass,
        Some(v) if v.eq_ignore_ascii_case("fail") => ReviewVerdict::Fail,
        Some(v) => return Err(format!("unknown verdict '{}'", v)),
        None => return Err("missing verdict".into()),
    };
    let feedback = map
        .get("feedback")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    let correction_hints: Vec<String> = map
        .get("correction_hints")
        .and_then(Value::as_array)
        .map(|hints| {
            hints
                .iter()
                .filter_map(Value::as_str)
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect()
        })
        .unwrap_or_default();
    Ok(ReviewResult {
        verdict,
        feedback,
        correction_hints,
    })
}

/// Ask the `reasoning` role how to fix a rejected output.
///
/// Falls back to a single `Redo: <feedback>` step.
pub fn generate_correction_plan(
    fabric: &ComputeFabric,
    task: &str,
    output: &str,
    review: &ReviewResult,
) -> Vec<String> {
    let prompt = prompts::correction_plan_prompt(task, output, review);
    let reply = fabric.execute("reasoning", &prompt, false, |_| {});

    let decoded = Decoded::from_reply(reply.as_deref(), parse_steps, || {
        vec![format!("Redo: {}", review.feedback)]
    });
    if let Some(reason) = decoded.fallback_reason() {
        warn!("Correction plan fell back to a redo step: {}", reason);
    }
    decoded.into_inner()
}

fn is_budget_sentinel(text: &str) -> bool {
    text.starts_with(BUDGET_EXCEEDED_PREFIX)
}

/// Role the execution steps run under: the triage pick when triage is on
/// and that role has a chain, else `coding`.
fn execution_role(config: &RouterConfig, complexity: u8) -> String {
    if config.triage.enabled {
        let router = TriageRouter::from_config(&config.triage);
        let role = router.select_role(complexity);
        if config.has_role(role) {
            return role.to_string();
        }
        warn!("Triage role '{}' has no chain, using 'coding'", role);
    }
    "coding".to_string()
}

/// Full task run: classify → execute (planned or direct) → review loop.
pub struct Pipeline<'a> {
    fabric: &'a ComputeFabric,
}

impl<'a> Pipeline<'a> {
    pub fn new(fabric: &'a ComputeFabric) -> Self {
        Self { fabric }
    }

    pub fn run(&self, task: &str) -> TaskOutcome {
        let run_id = Uuid::new_v4().to_string();
        let config = self.fabric.config();

        let triage = analyze_intent(self.fabric, task, Some(&config.semantic_verbs));
        let role = execution_role(&config, triage.complexity);
        info!(
            "[{}] Intent {} (complexity {}), executing via '{}'",
            run_id, triage.intent, triage.complexity, role
        );

        let (steps, mut output) = if triage.is_complex() {
            let steps = generate_plan(self.fabric, task, "");
            info!("[{}] Plan has {} steps", run_id, steps.len());
            let output = self.execute_steps(task, &steps, &role, &triage.intent);
            (steps, output)
        } else {
            let request = ExecuteRequest::new(&role, task).with_intent(&triage.intent);
            let output = self.fabric.execute_request(&request, |_| {});
            (vec![task.to_string()], output)
        };

        let mut review_rounds = 0;
        let mut final_verdict = None;
        let max_rounds = config.max_review_iterations();
        let reviewable = output.as_deref().map(|o| !is_budget_sentinel(o)).unwrap_or(false);

        if reviewable && max_rounds > 0 && config.has_role("reviewer") {
            for round in 1..=max_rounds {
                let Some(current) = output.clone() else { break };
                let review = review_output(self.fabric, task, &current);
                review_rounds = round;
                final_verdict = Some(review.verdict);
                if review.passed() {
                    info!("[{}] Review round {} passed", run_id, round);
                    break;
                }

                info!(
                    "[{}] Review round {} failed: {}",
                    run_id, round, review.feedback
                );
                let fixes = generate_correction_plan(self.fabric, task, &current, &review);
                if let Some(corrected) =
                    self.apply_corrections(task, &current, &fixes, &review, &role, &triage.intent)
                {
                    output = Some(corrected);
                }
            }
        }

        if output.is_none() {
            warn!("[{}] No output produced", run_id);
        }

        TaskOutcome {
            run_id,
            triage,
            role,
            steps,
            output,
            review_rounds,
            final_verdict,
        }
    }

    /// Execute plan steps in order, each seeing the work so far.
    fn execute_steps(
        &self,
        task: &str,
        steps: &[String],
        role: &str,
        intent: &str,
    ) -> Option<String> {
        let mut sections: Vec<String> = Vec::new();
        for (i, step) in steps.iter().enumerate() {
            let prompt =
                prompts::step_prompt(task, step, i + 1, steps.len(), &sections.join("\n\n"));
            let request = ExecuteRequest::new(role, &prompt).with_intent(intent);
            match self.fabric.execute_request(&request, |_| {}) {
                Some(text) if is_budget_sentinel(&text) => return Some(text),
                Some(text) => sections.push(format!("### Step {}: {}\n\n{}", i + 1, step, text)),
                None => warn!("Step {} produced no output: {}", i + 1, step),
            }
        }
        (!sections.is_empty()).then(|| sections.join("\n\n"))
    }

    /// Apply correction steps in sequence; `None` if none produced output.
    fn apply_corrections(
        &self,
        task: &str,
        current: &str,
        fixes: &[String],
        review: &ReviewResult,
        role: &str,
        intent: &str,
    ) -> Option<String> {
        let mut working = current.to_string();
        let mut changed = false;
        for fix in fixes {
            let prompt = prompts::correction_step_prompt(task, &working, fix, &review.feedback);
            let request = ExecuteRequest::new(role, &prompt).with_intent(intent);
            match self.fabric.execute_request(&request, |_| {}) {
                Some(text) if !is_budget_sentinel(&text) => {
                    working = text;
                    changed = true;
                }
                _ => warn!("Correction step produced no output: {}", fix),
            }
        }
        changed.then_some(working)
    }
}
