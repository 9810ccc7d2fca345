//! Cost estimation from token usage and per-million-token rates

use serde::{Deserialize, Serialize};

use crate::session::TokenUsage;

/// Tokens covered by one pricing unit
pub const TOKENS_PER_UNIT: f64 = 1_000_000.0;

/// Rates per one million tokens. Any rate may be left out of the config, in
/// which case no cost is estimated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    #[serde(default)]
    pub input_per_unit: Option<f64>,
    #[serde(default)]
    pub cached_per_unit: Option<f64>,
    #[serde(default)]
    pub output_per_unit: Option<f64>,
}

impl Pricing {
    pub fn new(input_per_unit: f64, cached_per_unit: f64, output_per_unit: f64) -> Self {
        Self {
            input_per_unit: Some(input_per_unit),
            cached_per_unit: Some(cached_per_unit),
            output_per_unit: Some(output_per_unit),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.input_per_unit.is_some()
            && self.cached_per_unit.is_some()
            && self.output_per_unit.is_some()
    }
}

/// Estimated cost split by token kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub input_cost: f64,
    pub cached_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

impl CostBreakdown {
    /// Component-wise sum
    pub fn add(&self, other: &CostBreakdown) -> CostBreakdown {
        CostBreakdown {
            input_cost: self.input_cost + other.input_cost,
            cached_cost: self.cached_cost + other.cached_cost,
            output_cost: self.output_cost + other.output_cost,
            total_cost: self.total_cost + other.total_cost,
        }
    }
}

/// Estimate the cost of one run.
///
/// Returns `None` unless usage is present with input, cached and output
/// counts and every rate is configured. A missing value never turns into a
/// zero cost.
pub fn estimate_cost(usage: Option<&TokenUsage>, pricing: Option<&Pricing>) -> Option<CostBreakdown> {
    let usage = usage?;
    let pricing = pricing?;

    let input_cost = priced(usage.input_tokens?, pricing.input_per_unit?);
    let cached_cost = priced(usage.cached_tokens?, pricing.cached_per_unit?);
    let output_cost = priced(usage.output_tokens?, pricing.output_per_unit?);

    Some(CostBreakdown {
        input_cost,
        cached_cost,
        output_cost,
        total_cost: input_cost + cached_cost + output_cost,
    })
}

fn priced(tokens: u64, rate: f64) -> f64 {
    tokens as f64 / TOKENS_PER_UNIT * rate
}
