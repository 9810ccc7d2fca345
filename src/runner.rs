//! The sequential run: one full pass per target, summary at the end
//!
//! Target iterator -> prompt renderer -> dispatcher -> session matcher ->
//! metrics aggregator. Template and prerequisite problems abort before the
//! first dispatch. Per-target failures are recorded and the run moves on.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::dispatch::{probe_render, Dispatcher, Invocation, Outcome};
use crate::metrics::{write_summary, MetricsRecord, MetricsSink, Summary};
use crate::prereqs::check_agent;
use crate::prompt::MarkerFactory;
use crate::session::SessionMatcher;

/// Run-time switches that come from the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSettings {
    pub dry_run: bool,
    /// Mirror agent output to the console
    pub echo: bool,
}

/// What a finished run produced
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    pub records: Vec<MetricsRecord>,
    pub summary: Summary,
    pub metrics_path: PathBuf,
    pub summary_path: PathBuf,
}

impl RunReport {
    /// Functions whose dispatch failed, in declaration order
    pub fn failed_targets(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.outcome.is_failure())
            .map(|r| r.function.as_str())
            .collect()
    }
}

/// Process every planned target once and write the summary.
pub fn execute_run(config: &RunConfig, template: &str, settings: RunSettings) -> Result<RunReport> {
    probe_render(template, config.use_examples).context("Prompt template is invalid")?;

    if !settings.dry_run {
        check_agent(&config.agent).context("Agent prerequisites not met")?;
    }

    fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory: {}", config.log_dir.display()))?;
    snapshot_prompt(&config.prompt_snapshot_path(), template)?;

    let markers = MarkerFactory::new();
    let run_id = markers.run_id().to_string();
    let metrics_path = config.metrics_path();
    let summary_path = config.summary_path();

    let dispatcher = Dispatcher {
        agent: &config.agent,
        template,
        use_examples: config.use_examples,
        examples_dir: &config.examples_dir,
        project_root: &config.project_root,
        log_dir: &config.log_dir,
        dry_run: settings.dry_run,
        echo: settings.echo,
        markers: &markers,
    };
    let matcher = SessionMatcher::new(&config.session_store);
    let pricing = config.agent.pricing.as_ref();

    tracing::info!(
        run_id = %run_id,
        targets = config.plan.len(),
        declared = config.plan.declared().len(),
        dry_run = settings.dry_run,
        session_store = %matcher.root().display(),
        "starting run"
    );

    let mut sink = MetricsSink::open(&metrics_path)?;
    let mut records = Vec::with_capacity(config.plan.len());

    for (index, target) in config.plan.iter().enumerate() {
        let span = tracing::info_span!("target", function = %target.function_name, index);
        let _enter = span.enter();

        let invocation = dispatcher
            .dispatch(target)
            .with_context(|| format!("Failed to render prompt for '{}'", target.function_name))?;
        tracing::debug!(marker = %invocation.marker, "dispatched");

        if settings.dry_run {
            print_dry_run(&invocation);
        }

        if index == 0 && invocation.outcome == Outcome::LaunchFailed {
            sink.close()?;
            let reason = invocation
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_default();
            bail!(
                "Agent could not be started for the first target '{}': {reason}",
                target.function_name
            );
        }

        let session = if invocation.should_scan_sessions() {
            matcher.find(&invocation.marker, invocation.started_wall)
        } else {
            None
        };
        if invocation.should_scan_sessions() && session.is_none() {
            tracing::info!("no session log matched");
        }

        let record = MetricsRecord::from_parts(&run_id, &invocation, session.as_ref(), pricing);
        sink.append(&record)?;
        if !settings.dry_run {
            print_target_result(&record);
        }
        records.push(record);
    }

    sink.close()?;

    let summary = Summary::from_records(Some(&run_id), &records);
    write_summary(&summary_path, &summary)?;
    tracing::info!(
        run_id = %run_id,
        succeeded = summary.targets_succeeded,
        failed = summary.targets_failed,
        matched = summary.targets_matched,
        "run finished"
    );

    Ok(RunReport {
        run_id,
        records,
        summary,
        metrics_path,
        summary_path,
    })
}

/// Keep the first template a proof tree was generated with
fn snapshot_prompt(path: &Path, template: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, template)
        .with_context(|| format!("Failed to write prompt snapshot: {}", path.display()))
}

fn print_dry_run(invocation: &Invocation) {
    println!(
        "{} {}",
        "[dry-run]".yellow().bold(),
        invocation.target.function_name.bold()
    );
    println!("  {} {}", "command:".dimmed(), invocation.command_line);
    println!("  {} {}", "log:".dimmed(), invocation.log_path.display());
}

fn print_target_result(record: &MetricsRecord) {
    let usage = match (&record.tokens, record.estimated_cost()) {
        (Some(t), Some(cost)) => format!(
            "in {} / cached {} / out {} tokens, ${cost:.4}",
            t.input_tokens.unwrap_or(0),
            t.cached_tokens.unwrap_or(0),
            t.output_tokens.unwrap_or(0)
        ),
        (Some(t), None) => format!(
            "in {} / cached {} / out {} tokens",
            t.input_tokens.unwrap_or(0),
            t.cached_tokens.unwrap_or(0),
            t.output_tokens.unwrap_or(0)
        ),
        (None, _) => "no session matched".dimmed().to_string(),
    };

    if record.success {
        println!(
            "{} {} ({:.1}s) {}",
            "✓".green().bold(),
            record.function,
            record.duration_sec,
            usage
        );
    } else {
        println!(
            "{} {} ({}) {}",
            "✗".red().bold(),
            record.function,
            record.error.as_deref().unwrap_or("failed"),
            usage
        );
    }
}
