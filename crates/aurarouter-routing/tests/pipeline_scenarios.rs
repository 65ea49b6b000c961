mod common;

use std::sync::Arc;

use aurarouter_core::{BudgetConfig, RouterConfig, TriageRule};
use aurarouter_routing::{
    analyze_intent, generate_correction_plan, generate_plan, review_output, ComputeFabric,
    Pipeline, ReviewResult, ReviewVerdict, DEFAULT_COMPLEXITY, INTENT_COMPLEX_REASONING,
    INTENT_SIMPLE_CODE,
};
use aurarouter_savings::BudgetManager;

use common::{config, FixedSpend, ScriptedFactory, ScriptedProvider};

const SIMPLE: &str = r#"{"intent": "SIMPLE_CODE", "complexity": 3}"#;
const COMPLEX: &str = r#"{"intent": "COMPLEX_REASONING", "complexity": 8}"#;

/// Local models `router`, `reasoner`, `coder`, `reviewer` on their roles.
fn full_config() -> RouterConfig {
    config(
        &[
            ("router", "ollama"),
            ("reasoner", "ollama"),
            ("coder", "ollama"),
            ("reviewer", "ollama"),
        ],
        &[
            ("router", &["router"]),
            ("reasoning", &["reasoner"]),
            ("coding", &["coder"]),
            ("reviewer", &["reviewer"]),
        ],
    )
}

fn fabric(config: RouterConfig, providers: &[&Arc<ScriptedProvider>]) -> ComputeFabric {
    ComputeFabric::new(Arc::new(config), ScriptedFactory::with(providers))
}

#[test]
fn test_analyze_intent_falls_back_on_junk() {
    let router = ScriptedProvider::replying("router", "I think this is a coding task");
    let fabric = fabric(full_config(), &[&router]);

    let triage = analyze_intent(&fabric, "sort a list", None);
    assert_eq!(triage.intent, INTENT_SIMPLE_CODE);
    assert_eq!(triage.complexity, DEFAULT_COMPLEXITY);
    assert_eq!(router.calls(), 1);
}

#[test]
fn test_analyze_intent_without_router_role() {
    let fabric = fabric(config(&[], &[]), &[]);
    let triage = analyze_intent(&fabric, "sort a list", None);
    assert_eq!(triage.intent, INTENT_SIMPLE_CODE);
    assert_eq!(triage.complexity, DEFAULT_COMPLEXITY);
}

#[test]
fn test_analyze_intent_parses_fenced_reply() {
    let router = ScriptedProvider::replying(
        "router",
        "```json\n{\"intent\": \"COMPLEX_REASONING\", \"complexity\": 9}\n```",
    );
    let fabric = fabric(full_config(), &[&router]);

    let triage = analyze_intent(&fabric, "design a compiler", None);
    assert_eq!(triage.intent, INTENT_COMPLEX_REASONING);
    assert_eq!(triage.complexity, 9);
    assert!(router.prompts()[0].contains("design a compiler"));
}

#[test]
fn test_analyze_intent_resolves_synonyms() {
    let router = ScriptedProvider::new("router", |_, i| {
        Ok(match i {
            0 => r#"{"intent": "quick_fix", "complexity": 2}"#.to_string(),
            _ => r#"{"intent": "coder", "complexity": 2}"#.to_string(),
        })
    });
    let mut cfg = full_config();
    cfg.semantic_verbs
        .insert(INTENT_SIMPLE_CODE.into(), vec!["quick_fix".into()]);
    let verbs = cfg.semantic_verbs.clone();
    let fabric = fabric(cfg, &[&router]);

    assert_eq!(analyze_intent(&fabric, "t", Some(&verbs)).intent, INTENT_SIMPLE_CODE);
    assert_eq!(analyze_intent(&fabric, "t", Some(&verbs)).intent, "coding");
}

#[test]
fn test_generate_plan_and_fallback() {
    let reasoner = ScriptedProvider::new("reasoner", |_, i| {
        if i == 0 {
            Ok(r#"["write the parser", {"step": "add tests"}]"#.to_string())
        } else {
            Ok("no plan today, sorry".to_string())
        }
    });
    let fabric = fabric(full_config(), &[&reasoner]);

    assert_eq!(
        generate_plan(&fabric, "build a parser", ""),
        vec!["write the parser", "add tests"]
    );
    assert_eq!(generate_plan(&fabric, "build a parser", ""), vec!["build a parser"]);
}

#[test]
fn test_review_and_correction_fallbacks() {
    let reviewer = ScriptedProvider::replying("reviewer", "seems fine overall");
    let reasoner = ScriptedProvider::failing("reasoner");
    let fabric = fabric(full_config(), &[&reviewer, &reasoner]);

    let review = review_output(&fabric, "task", "output");
    assert!(review.passed());

    let failed = ReviewResult {
        verdict: ReviewVerdict::Fail,
        feedback: "handle empty input".into(),
        correction_hints: Vec::new(),
    };
    assert_eq!(
        generate_correction_plan(&fabric, "task", "output", &failed),
        vec!["Redo: handle empty input"]
    );
}

#[test]
fn test_review_loop_bounded_by_max_iterations() {
    let router = ScriptedProvider::replying("router", SIMPLE);
    let coder = ScriptedProvider::new("coder", |_, i| Ok(format!("output v{}", i + 1)));
    let reasoner = ScriptedProvider::replying("reasoner", "???");
    let reviewer = ScriptedProvider::replying(
        "reviewer",
        r#"{"verdict": "FAIL", "feedback": "missing edge cases", "correction_hints": []}"#,
    );
    let mut cfg = full_config();
    cfg.execution.max_review_iterations = 2;
    let fabric = fabric(cfg, &[&router, &coder, &reasoner, &reviewer]);

    let outcome = Pipeline::new(&fabric).run("write fizzbuzz");

    assert_eq!(reviewer.calls(), 2);
    assert_eq!(outcome.review_rounds, 2);
    assert_eq!(outcome.final_verdict, Some(ReviewVerdict::Fail));
    assert_eq!(outcome.output.as_deref(), Some("output v3"));
    assert!(coder.prompts()[1].contains("Apply this correction: Redo: missing edge cases"));
    assert!(coder.prompts()[1].contains("output v1"));
}

#[test]
fn test_review_pass_stops_loop() {
    let router = ScriptedProvider::replying("router", SIMPLE);
    let coder = ScriptedProvider::replying("coder", "fn fizzbuzz() {}");
    let reviewer = ScriptedProvider::replying("reviewer", r#"{"verdict": "PASS", "feedback": ""}"#);
    let fabric = fabric(full_config(), &[&router, &coder, &reviewer]);

    let outcome = Pipeline::new(&fabric).run("write fizzbuzz");

    assert_eq!(outcome.review_rounds, 1);
    assert_eq!(outcome.final_verdict, Some(ReviewVerdict::Pass));
    assert_eq!(outcome.output.as_deref(), Some("fn fizzbuzz() {}"));
    assert_eq!(coder.calls(), 1);
}

#[test]
fn test_junk_review_counts_as_pass() {
    let router = ScriptedProvider::replying("router", SIMPLE);
    let coder = ScriptedProvider::replying("coder", "fn fizzbuzz() {}");
    let reviewer = ScriptedProvider::replying("reviewer", "looks great to me");
    let fabric = fabric(full_config(), &[&router, &coder, &reviewer]);

    let outcome = Pipeline::new(&fabric).run("write fizzbuzz");
    assert_eq!(outcome.review_rounds, 1);
    assert_eq!(outcome.final_verdict, Some(ReviewVerdict::Pass));
}

#[test]
fn test_no_reviewer_role_skips_review() {
    let router = ScriptedProvider::replying("router", SIMPLE);
    let coder = ScriptedProvider::replying("coder", "fn fizzbuzz() {}");
    let mut cfg = full_config();
    cfg.roles.remove("reviewer");
    let fabric = fabric(cfg, &[&router, &coder]);

    let outcome = Pipeline::new(&fabric).run("write fizzbuzz");
    assert_eq!(outcome.review_rounds, 0);
    assert_eq!(outcome.final_verdict, None);
    assert_eq!(outcome.output.as_deref(), Some("fn fizzbuzz() {}"));
}

#[test]
fn test_zero_iterations_disables_review() {
    let router = ScriptedProvider::replying("router", SIMPLE);
    let coder = ScriptedProvider::replying("coder", "fn fizzbuzz() {}");
    let reviewer = ScriptedProvider::replying("reviewer", r#"{"verdict": "FAIL"}"#);
    let mut cfg = full_config();
    cfg.execution.max_review_iterations = 0;
    let fabric = fabric(cfg, &[&router, &coder, &reviewer]);

    let outcome = Pipeline::new(&fabric).run("write fizzbuzz");
    assert_eq!(outcome.review_rounds, 0);
    assert_eq!(reviewer.calls(), 0);
}

#[test]
fn test_complex_task_runs_plan_steps() {
    let router = ScriptedProvider::replying("router", COMPLEX);
    let reasoner =
        ScriptedProvider::replying("reasoner", r#"["design the schema", "write the handlers"]"#);
    let coder = ScriptedProvider::new("coder", |_, i| Ok(format!("step output {}", i + 1)));
    let mut cfg = full_config();
    cfg.roles.remove("reviewer");
    let fabric = fabric(cfg, &[&router, &reasoner, &coder]);

    let outcome = Pipeline::new(&fabric).run("build a todo api");

    assert_eq!(outcome.steps, vec!["design the schema", "write the handlers"]);
    let output = outcome.output.unwrap();
    assert!(output.contains("### Step 1: design the schema\n\nstep output 1"));
    assert!(output.contains("### Step 2: write the handlers\n\nstep output 2"));
    assert!(coder.prompts()[1].contains("WORK SO FAR"));
    assert!(coder.prompts()[1].contains("step 2 of 2"));
}

#[test]
fn test_complex_task_with_failed_plan_runs_task_as_one_step() {
    let router = ScriptedProvider::replying("router", COMPLEX);
    let reasoner = ScriptedProvider::failing("reasoner");
    let coder = ScriptedProvider::replying("coder", "the whole thing");
    let mut cfg = full_config();
    cfg.roles.remove("reviewer");
    let fabric = fabric(cfg, &[&router, &reasoner, &coder]);

    let outcome = Pipeline::new(&fabric).run("build a todo api");
    assert_eq!(outcome.steps, vec!["build a todo api"]);
    assert_eq!(
        outcome.output.as_deref(),
        Some("### Step 1: build a todo api\n\nthe whole thing")
    );
}

#[test]
fn test_triage_selects_execution_role() {
    let router = ScriptedProvider::replying("router", r#"{"intent": "SIMPLE_CODE", "complexity": 2}"#);
    let lite = ScriptedProvider::replying("lite", "small model answer");
    let coder = ScriptedProvider::replying("coder", "big model answer");
    let mut cfg = full_config();
    cfg.roles.remove("reviewer");
    cfg.models
        .insert("lite".into(), aurarouter_core::ModelConfig::new("ollama"));
    cfg.roles.insert("coding_lite".into(), vec!["lite".into()]);
    cfg.triage.enabled = true;
    cfg.triage.rules = vec![TriageRule {
        max_complexity: 3,
        preferred_role: "coding_lite".into(),
        description: String::new(),
    }];
    let fabric = fabric(cfg, &[&router, &lite, &coder]);

    let outcome = Pipeline::new(&fabric).run("rename a variable");
    assert_eq!(outcome.role, "coding_lite");
    assert_eq!(outcome.output.as_deref(), Some("small model answer"));
    assert_eq!(coder.calls(), 0);
}

#[test]
fn test_budget_sentinel_skips_review() {
    let router = ScriptedProvider::replying("router", SIMPLE);
    let cloud = ScriptedProvider::replying("cloud", "cloud answer");
    let reviewer = ScriptedProvider::replying("reviewer", r#"{"verdict": "FAIL"}"#);
    let mut cfg = full_config();
    cfg.models
        .insert("cloud".into(), aurarouter_core::ModelConfig::new("claude"));
    cfg.roles.insert("coding".into(), vec!["cloud".into()]);
    let budget = BudgetManager::new(
        BudgetConfig {
            enabled: true,
            daily_limit: Some(1.0),
            monthly_limit: None,
            cache_ttl_secs: 30,
        },
        FixedSpend::new(2.0),
    );
    let fabric = fabric(cfg, &[&router, &cloud, &reviewer]).with_budget(Arc::new(budget));

    let outcome = Pipeline::new(&fabric).run("write fizzbuzz");
    assert!(outcome.output.unwrap().starts_with("BUDGET_EXCEEDED"));
    assert_eq!(outcome.review_rounds, 0);
    assert_eq!(reviewer.calls(), 0);
    assert_eq!(cloud.calls(), 0);
}

#[test]
fn test_run_ids_are_unique() {
    let router = ScriptedProvider::replying("router", SIMPLE);
    let coder = ScriptedProvider::replying("coder", "fn fizzbuzz() {}");
    let mut cfg = full_config();
    cfg.roles.remove("reviewer");
    let fabric = fabric(cfg, &[&router, &coder]);
    let pipeline = Pipeline::new(&fabric);

    let first = pipeline.run("a");
    let second = pipeline.run("b");
    assert_eq!(first.run_id.len(), 36);
    assert_ne!(first.run_id, second.run_id);
}
