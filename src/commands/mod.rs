//! Subcommand bodies for the codexup binary

pub mod run;
pub mod summarize;
