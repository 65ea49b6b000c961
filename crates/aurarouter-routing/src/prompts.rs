//! Prompt templates for the pipeline roles.

use crate::types::ReviewResult;

pub fn classify_prompt(task: &str) -> String {
    format!(
        r#"You are a task router. Classify the task below.

Return ONLY a JSON object with these fields:
- "intent": "SIMPLE_CODE" for a self-contained coding request that can be done in one pass,
  or "COMPLEX_REASONING" for work that needs planning across several steps
- "complexity": an integer from 1 (trivial) to 10 (very hard)

TASK:
{task}"#
    )
}

pub fn plan_prompt(task: &str, context: &str) -> String {
    let context = if context.trim().is_empty() {
        String::new()
    } else {
        format!("\nCONTEXT:\n{}\n", context.trim())
    };
    format!(
        r#"You are a senior engineer breaking a task into implementation steps.
{context}
TASK:
{task}

Return ONLY a JSON array of short step descriptions, in execution order."#
    )
}

pub fn step_prompt(task: &str, step: &str, index: usize, total: usize, previous: &str) -> String {
    let previous = if previous.trim().is_empty() {
        String::new()
    } else {
        format!("\nWORK SO FAR:\n{}\n", previous.trim())
    };
    format!(
        r#"Overall task: {task}
{previous}
Complete step {index} of {total}: {step}

Return only the work for this step."#
    )
}

pub fn review_prompt(task: &str, output: &str) -> String {
    format!(
        r#"You are a strict code reviewer. Check whether the OUTPUT fully and correctly solves the TASK.

TASK:
{task}

OUTPUT:
{output}

Return ONLY a JSON object:
{{"verdict": "PASS" or "FAIL", "feedback": "what is wrong or missing", "correction_hints": ["specific fix", ...]}}"#
    )
}

pub fn correction_plan_prompt(task: &str, output: &str, review: &ReviewResult) -> String {
    let hints = if review.correction_hints.is_empty() {
        "(none)".to_string()
    } else {
        review
            .correction_hints
            .iter()
            .map(|h| format!("- {}", h))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        r#"A reviewer rejected the output below.

TASK:
{task}

OUTPUT:
{output}

REVIEW FEEDBACK:
{feedback}

HINTS:
{hints}

Return ONLY a JSON array of corrective steps that produce a fixed, complete output."#,
        feedback = review.feedback
    )
}

pub fn correction_step_prompt(task: &str, output: &str, step: &str, feedback: &str) -> String {
    format!(
        r#"Overall task: {task}

CURRENT OUTPUT:
{output}

REVIEW FEEDBACK:
{feedback}

Apply this correction: {step}

Return the complete corrected output."#
    )
}
