//! Run summary - a fold over the metrics records of one run

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use super::pricing::CostBreakdown;
use super::record::MetricsRecord;
use crate::dispatch::Outcome;
use crate::session::TokenUsage;

/// Token counts summed over matched records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTotals {
    pub input_tokens: u64,
    pub cached_tokens: u64,
    pub output_tokens: u64,
    pub reasoning_tokens: u64,
    pub total_tokens: u64,
}

impl TokenTotals {
    fn add(&mut self, usage: &TokenUsage) {
        let add = |acc: &mut u64, v: Option<u64>| *acc = acc.saturating_add(v.unwrap_or(0));
        add(&mut self.input_tokens, usage.input_tokens);
        add(&mut self.cached_tokens, usage.cached_tokens);
        add(&mut self.output_tokens, usage.output_tokens);
        add(&mut self.reasoning_tokens, usage.reasoning_tokens);
        add(&mut self.total_tokens, usage.total_tokens);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub run_id: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub targets_total: usize,
    pub targets_succeeded: usize,
    pub targets_failed: usize,
    pub targets_skipped: usize,
    pub targets_matched: usize,
    pub targets_unmatched: usize,
    /// Mean agent wall time over targets that actually ran
    pub avg_duration_sec: Option<f64>,
    pub token_totals: TokenTotals,
    /// Sum over priced records, `None` when nothing was priced
    pub cost_totals: Option<CostBreakdown>,
    pub total_cost: Option<f64>,
}

impl Summary {
    pub fn from_records(run_id: Option<&str>, records: &[MetricsRecord]) -> Self {
        let mut token_totals = TokenTotals::default();
        let mut cost_totals: Option<CostBreakdown> = None;
        let mut succeeded = 0;
        let mut failed = 0;
        let mut skipped = 0;
        let mut matched = 0;
        let mut ran = 0usize;
        let mut duration_sum = 0.0;

        for record in records {
            match record.outcome {
                Outcome::Succeeded => succeeded += 1,
                Outcome::Skipped => skipped += 1,
                Outcome::Failed | Outcome::TimedOut | Outcome::LaunchFailed => failed += 1,
            }
            if record.outcome != Outcome::Skipped {
                ran += 1;
                duration_sum += record.duration_sec;
            }
            if record.matched {
                matched += 1;
            }
            if let Some(usage) = &record.tokens {
                token_totals.add(usage);
            }
            if let Some(costs) = &record.costs {
                cost_totals = Some(match cost_totals {
                    Some(acc) => acc.add(costs),
                    None => *costs,
                });
            }
        }

        Self {
            run_id: run_id.map(str::to_string),
            generated_at: Utc::now(),
            targets_total: records.len(),
            targets_succeeded: succeeded,
            targets_failed: failed,
            targets_skipped: skipped,
            targets_matched: matched,
            targets_unmatched: records.len() - matched,
            avg_duration_sec: (ran > 0).then(|| duration_sum / ran as f64),
            token_totals,
            cost_totals,
            total_cost: cost_totals.map(|c| c.total_cost),
        }
    }
}

/// Write the summary as pretty JSON, replacing any previous one atomically.
///
/// The file is staged beside the destination and renamed over it, so a
/// reader never sees a half-written summary.
pub fn write_summary(path: &Path, summary: &Summary) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create summary directory: {}", parent.display()))?;

    let json = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
    let mut staged = NamedTempFile::new_in(parent).context("Failed to create staging file for summary")?;
    staged
        .write_all(json.as_bytes())
        .and_then(|_| staged.write_all(b"\n"))
        .and_then(|_| staged.as_file().sync_all())
        .context("Failed to write summary")?;
    staged
        .persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write summary: {}", path.display()))?;
    Ok(())
}
