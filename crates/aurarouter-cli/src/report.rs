//! Plain-text reports for the CLI commands.

use std::collections::BTreeMap;

use aurarouter_core::RouterConfig;
use aurarouter_routing::{SemanticVerbRegistry, TaskOutcome};
use aurarouter_savings::BudgetStatus;
use aurarouter_store::{PrivacySummary, UsageSummary};

/// Structural config problems followed by required roles with no chain.
pub fn validation_problems(config: &RouterConfig) -> Vec<String> {
    let mut problems = config.validate();
    for role in SemanticVerbRegistry::missing_required(config) {
        problems.push(format!("required role '{}' has no chain", role));
    }
    problems
}

pub fn print_validation(config: &RouterConfig, problems: &[String]) {
    println!("=== AuraRouter Config Report ===");
    println!();
    println!("Models:             {}", config.models.len());
    println!("Roles:              {}", config.roles.len());
    println!("Budget:             {}", if config.budget.enabled { "enabled" } else { "disabled" });
    println!("Privacy gate:       {}", if config.privacy.enabled { "enabled" } else { "disabled" });
    println!("Triage:             {}", if config.triage.enabled { "enabled" } else { "disabled" });

    if !problems.is_empty() {
        println!();
        println!("Problems:");
        for p in problems {
            println!("  - {}", p);
        }
    }

    println!();
    if problems.is_empty() {
        println!("Status: VALID");
    } else {
        println!("Status: INVALID");
    }
}

pub fn print_usage(
    days: i64,
    summary: &UsageSummary,
    spend_by_model: &BTreeMap<String, f64>,
    total_spend: f64,
    projection: f64,
    budget: &BudgetStatus,
) {
    println!("=== AuraRouter Usage (last {} days) ===", days);
    println!();
    println!("Attempts:           {}", summary.attempts);
    println!("Successes:          {}", summary.successes);
    println!("Cloud / local:      {} / {}", summary.cloud_attempts, summary.local_attempts);
    println!("Input tokens:       {}", summary.input_tokens);
    println!("Output tokens:      {}", summary.output_tokens);
    println!("Total spend:        ${:.4}", total_spend);
    println!("Month projection:   ${:.2}", projection);

    if !spend_by_model.is_empty() {
        println!();
        println!("Spend by model:");
        for (model, spend) in spend_by_model {
            println!("  {:<28} ${:.4}", model, spend);
        }
    }

    println!();
    println!("Budget:");
    if !budget.enabled {
        println!("  disabled");
        return;
    }
    println!("  Daily:            ${:.2} of {}", budget.daily_spend, limit(budget.daily_limit));
    println!("  Monthly:          ${:.2} of {}", budget.monthly_spend, limit(budget.monthly_limit));
    println!("  Cloud allowed:    {}", if budget.allowed { "YES" } else { "NO" });
}

fn limit(limit: Option<f64>) -> String {
    limit
        .map(|l| format!("${:.2}", l))
        .unwrap_or_else(|| "unlimited".into())
}

pub fn print_privacy(days: i64, summary: &PrivacySummary) {
    println!("=== AuraRouter Privacy Events (last {} days) ===", days);
    println!();
    println!("Events:             {}", summary.total_events);

    if !summary.by_severity.is_empty() {
        println!();
        println!("By severity:");
        for (severity, count) in &summary.by_severity {
            println!("  {:<12} {}", severity, count);
        }
    }
    if !summary.by_pattern.is_empty() {
        println!();
        println!("By pattern:");
        for (pattern, count) in &summary.by_pattern {
            println!("  {:<20} {}", pattern, count);
        }
    }
}

pub fn print_outcome(outcome: &TaskOutcome) {
    eprintln!(
        "run {} | intent {} (complexity {}) | role {} | {} step(s) | {} review round(s)",
        outcome.run_id,
        outcome.triage.intent,
        outcome.triage.complexity,
        outcome.role,
        outcome.steps.len(),
        outcome.review_rounds
    );
    if let Some(output) = &outcome.output {
        println!("{}", output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurarouter_core::ModelConfig;

    #[test]
    fn test_validation_reports_missing_required_roles() {
        let config = RouterConfig::default();
        let problems = validation_problems(&config);
        assert_eq!(problems.len(), 3);
        assert!(problems.iter().any(|p| p.contains("'router'")));
        assert!(problems.iter().any(|p| p.contains("'reasoning'")));
        assert!(problems.iter().any(|p| p.contains("'coding'")));
    }

    #[test]
    fn test_validation_clean_config() {
        let mut config = RouterConfig::default();
        config.models.insert("local".into(), ModelConfig::new("ollama"));
        for role in ["router", "reasoning", "coding"] {
            config.roles.insert(role.into(), vec!["local".into()]);
        }
        assert!(validation_problems(&config).is_empty());

        config.roles.insert("coding".into(), vec!["ghost".into()]);
        let problems = validation_problems(&config);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("ghost"));
    }

    #[test]
    fn test_limit_formatting() {
        assert_eq!(limit(Some(5.0)), "$5.00");
        assert_eq!(limit(None), "unlimited");
    }
}
