//! Session matcher - recovers token usage from the agent's own session logs
//!
//! The store is owned by the agent and only ever read here.

pub mod matcher;
pub mod scan;
pub mod usage;

pub use matcher::{select_best, SessionMatcher, SessionRecord};
pub use scan::{scan_store, Candidate, ScanResult};
pub use usage::{parse_usage_line, TokenUsage};
