//! Metrics aggregator - per-target records, the append-only log and the run summary

pub mod export;
pub mod pricing;
pub mod record;
pub mod sink;
pub mod summary;

pub use export::write_csv;
pub use pricing::{estimate_cost, CostBreakdown, Pricing};
pub use record::MetricsRecord;
pub use sink::{read_records, MetricsSink};
pub use summary::{write_summary, Summary, TokenTotals};
