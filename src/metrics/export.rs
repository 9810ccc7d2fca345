//! Flat CSV export of a metrics log

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::path::Path;

use super::record::MetricsRecord;

/// Column names, in `CsvRow` field order
const CSV_HEADERS: &[&str] = &[
    "run_id",
    "function",
    "target_file",
    "outcome",
    "success",
    "exit_code",
    "duration_sec",
    "matched",
    "input_tokens",
    "cached_tokens",
    "output_tokens",
    "reasoning_tokens",
    "total_tokens",
    "estimated_cost",
    "session_path",
    "error",
];

/// One CSV row; nested usage and costs flattened into columns
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    run_id: &'a str,
    function: &'a str,
    target_file: String,
    outcome: String,
    success: bool,
    exit_code: Option<i32>,
    duration_sec: f64,
    matched: bool,
    input_tokens: Option<u64>,
    cached_tokens: Option<u64>,
    output_tokens: Option<u64>,
    reasoning_tokens: Option<u64>,
    total_tokens: Option<u64>,
    estimated_cost: Option<f64>,
    session_path: String,
    error: &'a str,
}

impl<'a> CsvRow<'a> {
    fn from_record(record: &'a MetricsRecord) -> Self {
        let tokens = record.tokens.unwrap_or_default();
        Self {
            run_id: &record.run_id,
            function: &record.function,
            target_file: record.target_file.display().to_string(),
            outcome: record.outcome.to_string(),
            success: record.success,
            exit_code: record.exit_code,
            duration_sec: record.duration_sec,
            matched: record.matched,
            input_tokens: tokens.input_tokens,
            cached_tokens: tokens.cached_tokens,
            output_tokens: tokens.output_tokens,
            reasoning_tokens: tokens.reasoning_tokens,
            total_tokens: tokens.total_tokens,
            estimated_cost: record.estimated_cost(),
            session_path: record
                .session_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            error: record.error.as_deref().unwrap_or(""),
        }
    }
}

/// Write `records` to `path` with a header row. Missing values are empty cells.
pub fn write_csv(path: &Path, records: &[MetricsRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create CSV: {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer
        .write_record(CSV_HEADERS)
        .with_context(|| format!("Failed to write CSV header: {}", path.display()))?;
    for record in records {
        writer
            .serialize(CsvRow::from_record(record))
            .with_context(|| format!("Failed to write CSV row for {}", record.function))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush CSV: {}", path.display()))?;
    Ok(())
}
