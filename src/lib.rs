pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod prereqs;
pub mod prompt;
pub mod runner;
pub mod session;
