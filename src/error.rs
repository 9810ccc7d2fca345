//! Error taxonomy for codexup
//!
//! Configuration and template problems are fatal and surface before any target
//! runs. Dispatch problems are scoped to one target and get recorded in its
//! metrics record instead of stopping the run. A missing session match and an
//! incomplete pricing block are not errors at all; they show up as `None`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Malformed or missing run configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// All validation problems found in one pass
    #[error("Invalid configuration:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),

    #[error("Agent executable not found on PATH: {0}")]
    AgentNotFound(String),

    #[error("Required environment variable is not set: {0}")]
    MissingEnv(String),
}

/// Prompt template that cannot be rendered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unknown placeholder {{{name}}} at line {line}")]
    UnknownPlaceholder { name: String, line: usize },

    #[error("Section [{section}] opened at line {line} is never closed")]
    UnterminatedSection { section: String, line: usize },

    #[error("Closing marker [/{section}] at line {line} has no matching opener")]
    UnmatchedClose { section: String, line: usize },

    #[error("Section [{section}] at line {line} is nested inside another [{section}]")]
    NestedSection { section: String, line: usize },
}

/// Per-target agent dispatch failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Failed to launch agent `{program}`: {reason}")]
    Launch { program: String, reason: String },

    #[error("Agent exited with status {0}")]
    NonZeroExit(i32),

    #[error("Agent terminated by signal")]
    Signaled,

    #[error("Agent killed after {0:?} timeout")]
    TimedOut(Duration),
}
