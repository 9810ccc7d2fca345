//! Integration tests for codexup runs and metrics post-processing
//!
//! The agent is a small shell script that reads its prompt from stdin and
//! writes a rollout file into a scratch session store, so every test runs
//! the real dispatcher, matcher and aggregator.

pub mod helpers;
pub mod run_pipeline;
pub mod summarize;
