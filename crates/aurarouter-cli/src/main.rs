//! AuraRouter: role-based model routing with privacy and budget gates.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use aurarouter_core::RouterConfig;
use aurarouter_routing::Pipeline;
use aurarouter_store::{days_ago, TimeRange};

mod report;
mod state;

use state::RouterState;

const DEFAULT_REPORT_DAYS: i64 = 30;

fn print_help() {
    println!("AuraRouter: role-based model routing fabric");
    println!();
    println!("Usage: aurarouter [--config <path>] <command>");
    println!();
    println!("Commands:");
    println!("  run <task...>            Classify, execute and review a task");
    println!("  validate                 Check the configuration");
    println!("  usage [--days N]         Usage, spend and budget report");
    println!("  privacy [--days N]       Privacy gate events");
    println!("  purge --days N           Delete ledger rows older than N days");
    println!("  help                     Show this help message");
    println!();
    println!("The config path defaults to $AURAROUTER_CONFIG, then ./aurarouter.json.");
}

/// Value of `--days N`, if present.
fn parse_days(args: &[String]) -> anyhow::Result<Option<i64>> {
    let Some(pos) = args.iter().position(|a| a == "--days") else {
        return Ok(None);
    };
    let raw = args
        .get(pos + 1)
        .ok_or_else(|| anyhow::anyhow!("--days needs a value"))?;
    let days: i64 = raw
        .parse()
        .with_context(|| format!("invalid --days value '{}'", raw))?;
    if days < 0 {
        anyhow::bail!("--days must not be negative");
    }
    Ok(Some(days))
}

/// Task words after `run`, with `--days N` removed.
fn task_text(args: &[String]) -> String {
    let mut words = Vec::new();
    let mut rest = args.iter();
    while let Some(arg) = rest.next() {
        if arg == "--days" {
            rest.next();
            continue;
        }
        words.push(arg.as_str());
    }
    words.join(" ")
}

/// Pull `--config <path>` out of the argument list.
fn take_config_path(args: &mut Vec<String>) -> anyhow::Result<PathBuf> {
    match args.iter().position(|a| a == "--config") {
        Some(pos) => {
            if pos + 1 >= args.len() {
                anyhow::bail!("--config needs a path");
            }
            let path = PathBuf::from(args.remove(pos + 1));
            args.remove(pos);
            Ok(path)
        }
        None => Ok(RouterConfig::default_path()),
    }
}

fn load_state(path: &Path) -> anyhow::Result<RouterState> {
    let config = RouterConfig::load(path)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    RouterState::new(config).map_err(|e| anyhow::anyhow!("Failed to initialize router: {}", e))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = take_config_path(&mut args)?;

    let Some(command) = args.first().cloned() else {
        print_help();
        return Ok(());
    };

    match command.as_str() {
        "run" => {
            let task = task_text(&args[1..]);
            if task.trim().is_empty() {
                eprintln!("Usage: aurarouter run <task...>");
                std::process::exit(1);
            }
            let state = load_state(&config_path)?;
            let outcome = Pipeline::new(&state.fabric).run(&task);
            report::print_outcome(&outcome);
            if outcome.output.is_none() {
                eprintln!("No model produced output for this task.");
                std::process::exit(1);
            }
        }
        "validate" | "--validate" => {
            let config = RouterConfig::load(&config_path)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            let problems = report::validation_problems(&config);
            report::print_validation(&config, &problems);
            std::process::exit(if problems.is_empty() { 0 } else { 1 });
        }
        "usage" => {
            let days = parse_days(&args)?.unwrap_or(DEFAULT_REPORT_DAYS);
            let state = load_state(&config_path)?;
            let range = TimeRange::last_days(days);
            let summary = state.usage.summary(range)?;
            let by_model = state.costs.spend_by_model(range)?;
            let total = state.costs.total_spend(range)?;
            let projection = state.costs.monthly_projection()?;
            let budget = state.budget.status()?;
            report::print_usage(days, &summary, &by_model, total, projection, &budget);
        }
        "privacy" => {
            let days = parse_days(&args)?.unwrap_or(DEFAULT_REPORT_DAYS);
            let state = load_state(&config_path)?;
            let summary = state.privacy.summary(TimeRange::last_days(days))?;
            report::print_privacy(days, &summary);
        }
        "purge" => {
            let Some(days) = parse_days(&args)? else {
                eprintln!("Usage: aurarouter purge --days N");
                std::process::exit(1);
            };
            let state = load_state(&config_path)?;
            let cutoff = days_ago(days);
            let usage_rows = state.usage.purge_before(cutoff)?;
            let privacy_rows = state.privacy.purge_before(cutoff)?;
            info!("Purge complete");
            println!(
                "Deleted {} usage rows and {} privacy events older than {} days",
                usage_rows, privacy_rows, days
            );
        }
        "--help" | "-h" | "help" => print_help(),
        other => {
            eprintln!("Unknown command: {}. Use 'aurarouter help' for usage.", other);
            std::process::exit(1);
        }
    }

    Ok(())
}
