//! Per-target metrics record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::pricing::{estimate_cost, CostBreakdown, Pricing};
use crate::dispatch::{Invocation, Outcome};
use crate::session::{SessionRecord, TokenUsage};

/// One line of the metrics log.
///
/// Absent values are written as `null` rather than omitted, so every line has
/// the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub run_id: String,
    pub marker: String,
    pub function: String,
    pub target_file: PathBuf,
    pub proof_dir: PathBuf,
    pub log_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub duration_sec: f64,
    #[serde(default)]
    pub dry_run: bool,
    pub outcome: Outcome,
    pub success: bool,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    #[serde(default)]
    pub matched: bool,
    pub session_path: Option<PathBuf>,
    pub tokens: Option<TokenUsage>,
    pub costs: Option<CostBreakdown>,
}

impl MetricsRecord {
    /// Combine a dispatch with its session match and the configured rates
    pub fn from_parts(
        run_id: &str,
        invocation: &Invocation,
        session: Option<&SessionRecord>,
        pricing: Option<&Pricing>,
    ) -> Self {
        let tokens = session.map(|s| s.usage);
        let costs = estimate_cost(tokens.as_ref(), pricing);
        if tokens.is_some() && costs.is_none() {
            tracing::debug!(
                function = %invocation.target.function_name,
                "usage found but pricing is incomplete, cost left empty"
            );
        }

        Self {
            run_id: run_id.to_string(),
            marker: invocation.marker.as_str().to_string(),
            function: invocation.target.function_name.clone(),
            target_file: invocation.target.target_file.clone(),
            proof_dir: invocation.target.proof_dir.clone(),
            log_path: invocation.log_path.clone(),
            started_at: invocation.started_at,
            duration_sec: invocation.duration.as_secs_f64(),
            dry_run: invocation.dry_run,
            outcome: invocation.outcome,
            success: invocation.outcome.is_success(),
            exit_code: invocation.exit_code,
            error: invocation.error.as_ref().map(|e| e.to_string()),
            matched: session.is_some(),
            session_path: session.map(|s| s.session_path.clone()),
            tokens,
            costs,
        }
    }

    pub fn estimated_cost(&self) -> Option<f64> {
        self.costs.map(|c| c.total_cost)
    }
}
