//! `codexup summarize` - rebuild a summary and CSV from an existing metrics log

use anyhow::{bail, Result};
use colored::Colorize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use super::run::print_summary;
use crate::metrics::{read_records, write_csv, write_summary, Summary};

/// Execute the summarize command
pub fn execute(
    metrics_path: &Path,
    out: Option<PathBuf>,
    csv: Option<PathBuf>,
    run_id: Option<String>,
) -> Result<()> {
    let mut records = read_records(metrics_path)?;

    if let Some(id) = run_id.as_deref() {
        records.retain(|r| r.run_id == id);
        if records.is_empty() {
            bail!("No records for run '{id}' in {}", metrics_path.display());
        }
    }

    // Without a filter the summary is attributed to a run only if all records agree.
    let runs: BTreeSet<&str> = records.iter().map(|r| r.run_id.as_str()).collect();
    let summary_run = match run_id.as_deref() {
        Some(id) => Some(id.to_string()),
        None if runs.len() == 1 => runs.first().map(|s| s.to_string()),
        None => None,
    };
    if run_id.is_none() && runs.len() > 1 {
        tracing::info!(runs = runs.len(), "metrics log spans several runs");
    }

    let summary = Summary::from_records(summary_run.as_deref(), &records);
    let out = out.unwrap_or_else(|| default_summary_path(metrics_path));
    let csv = csv.unwrap_or_else(|| metrics_path.with_extension("csv"));

    write_summary(&out, &summary)?;
    write_csv(&csv, &records)?;

    print_summary(&summary);
    println!("  {} {}", "Summary:".dimmed(), out.display());
    println!("  {} {}", "CSV:".dimmed(), csv.display());
    Ok(())
}

/// `codex_metrics.jsonl` -> `codex_summary.json`; other names get a `_summary` suffix
pub fn default_summary_path(metrics_path: &Path) -> PathBuf {
    let stem = metrics_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = if stem.contains("metrics") {
        stem.replace("metrics", "summary")
    } else {
        format!("{stem}_summary")
    };
    metrics_path.with_file_name(format!("{name}.json"))
}
