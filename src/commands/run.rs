//! `codexup run` - dispatch the agent for every configured target

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;

use crate::config::{RunConfig, RunOptions};
use crate::metrics::Summary;
use crate::runner::{execute_run, RunSettings};

/// Execute the run command
pub fn execute(
    config_path: &Path,
    prompt_path: &Path,
    limit: Option<usize>,
    dry_run: bool,
    use_examples: bool,
    quiet: bool,
) -> Result<()> {
    let config = RunConfig::load(config_path, RunOptions { use_examples, limit })
        .with_context(|| format!("Failed to load configuration: {}", config_path.display()))?;
    let template = fs::read_to_string(prompt_path)
        .with_context(|| format!("Failed to read prompt template: {}", prompt_path.display()))?;

    println!(
        "{} {} of {} target(s){}",
        "→".cyan().bold(),
        config.plan.len(),
        config.plan.declared().len(),
        if dry_run { " (dry run)" } else { "" }
    );

    let report = execute_run(
        &config,
        &template,
        RunSettings {
            dry_run,
            echo: !quiet,
        },
    )?;

    print_summary(&report.summary);
    println!("  {} {}", "Metrics:".dimmed(), report.metrics_path.display());
    println!("  {} {}", "Summary:".dimmed(), report.summary_path.display());

    let failed = report.failed_targets();
    if !failed.is_empty() {
        bail!("{} target(s) failed to dispatch: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

pub(crate) fn print_summary(summary: &Summary) {
    println!();
    println!("{}", "Run Summary".bold());
    println!(
        "  {} total, {} succeeded, {} failed, {} skipped",
        summary.targets_total,
        summary.targets_succeeded.to_string().green(),
        summary.targets_failed.to_string().red(),
        summary.targets_skipped
    );
    println!(
        "  {} matched, {} unmatched",
        summary.targets_matched, summary.targets_unmatched
    );
    let t = &summary.token_totals;
    println!(
        "  tokens: in {} / cached {} / out {}",
        t.input_tokens, t.cached_tokens, t.output_tokens
    );
    match summary.total_cost {
        Some(cost) => println!("  estimated cost: ${cost:.4}"),
        None => println!("  estimated cost: {}", "n/a".dimmed()),
    }
}
