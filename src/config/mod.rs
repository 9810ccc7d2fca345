//! Run configuration - YAML target list, paths, agent command and pricing
//!
//! The YAML file is parsed into loosely-typed raw structs first, every problem
//! is collected in one validation pass, and only then is the immutable
//! [`RunConfig`] built with all per-target paths resolved.

pub mod targets;
pub mod validation;

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::metrics::Pricing;

pub use targets::{TargetPlan, TargetSpec};
use validation::{validate_function_name, validate_rate};

/// Argument that receives the rendered prompt in the agent command line
pub const PROMPT_ARG: &str = "{PROMPT}";

/// Default agent invocation
pub const DEFAULT_AGENT_COMMAND: &[&str] = &["codex", "exec", "--full-auto", PROMPT_ARG];

/// Environment the default agent needs
pub const DEFAULT_REQUIRED_ENV: &[&str] = &["OPENAI_API_KEY"];

pub const DEFAULT_AGENT_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_SESSION_WAIT_SECS: u64 = 30;
pub const DEFAULT_SESSION_POLL_MS: u64 = 500;

pub const METRICS_FILE_NAME: &str = "codex_metrics.jsonl";
pub const SUMMARY_FILE_NAME: &str = "codex_summary.json";
pub const PROMPT_SNAPSHOT_FILE_NAME: &str = "prompt.txt";

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    project_root: Option<String>,
    proof_root: Option<String>,
    makefile_include_dir: Option<String>,
    #[serde(default)]
    examples_dir: Option<String>,
    #[serde(default)]
    agent: RawAgent,
    #[serde(default)]
    session_store: RawSessionStore,
    #[serde(default)]
    targets: Option<Vec<RawTarget>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAgent {
    command: Option<Vec<String>>,
    timeout_secs: Option<u64>,
    required_env: Option<Vec<String>>,
    pricing: Option<Pricing>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSessionStore {
    root: Option<String>,
    wait_secs: Option<u64>,
    poll_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTarget {
    function: Option<String>,
    file_path: Option<String>,
}

/// Options that come from the command line rather than the YAML file
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub use_examples: bool,
    pub limit: Option<usize>,
}

/// How the external agent is launched and priced
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Program followed by its arguments; `{PROMPT}` marks where the prompt goes
    pub command: Vec<String>,
    /// `None` waits forever
    pub timeout: Option<Duration>,
    pub required_env: Vec<String>,
    pub pricing: Option<Pricing>,
}

impl AgentConfig {
    pub fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or_default()
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_AGENT_COMMAND.iter().map(|s| s.to_string()).collect(),
            timeout: Some(Duration::from_secs(DEFAULT_AGENT_TIMEOUT_SECS)),
            required_env: DEFAULT_REQUIRED_ENV.iter().map(|s| s.to_string()).collect(),
            pricing: None,
        }
    }
}

/// Where the agent's own session logs live and how long to wait for them
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStoreConfig {
    pub root: PathBuf,
    pub wait: Duration,
    pub poll_interval: Duration,
}

/// Fully resolved configuration for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub project_root: PathBuf,
    /// `project_root` joined with the configured proof root
    pub proof_root: PathBuf,
    pub examples_dir: String,
    pub log_dir: PathBuf,
    pub use_examples: bool,
    pub agent: AgentConfig,
    pub session_store: SessionStoreConfig,
    pub plan: TargetPlan,
}

impl RunConfig {
    /// Load and validate a YAML run configuration
    pub fn load(path: &Path, options: RunOptions) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content, options)
    }

    /// Parse configuration content (for testing without file system)
    pub fn from_yaml_str(content: &str, options: RunOptions) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(content)?;
        build(raw, options)
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.log_dir.join(METRICS_FILE_NAME)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.log_dir.join(SUMMARY_FILE_NAME)
    }

    pub fn prompt_snapshot_path(&self) -> PathBuf {
        self.proof_root.join(PROMPT_SNAPSHOT_FILE_NAME)
    }
}

fn build(raw: RawConfig, options: RunOptions) -> Result<RunConfig, ConfigError> {
    let mut errors = Vec::new();

    let project_root = required(&raw.project_root, "project_root", &mut errors);
    let proof_root = required(&raw.proof_root, "proof_root", &mut errors);
    let makefile_include_dir = required(&raw.makefile_include_dir, "makefile_include_dir", &mut errors);

    let agent = build_agent(raw.agent, &mut errors);
    let session_store = build_session_store(raw.session_store, &mut errors);

    let raw_targets = raw.targets.unwrap_or_default();
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(raw_targets.len());
    for (idx, target) in raw_targets.into_iter().enumerate() {
        let function = match target.function.as_deref().map(str::trim) {
            Some(f) if !f.is_empty() => f.to_string(),
            _ => {
                errors.push(format!("targets[{idx}]: function is required"));
                continue;
            }
        };
        if let Err(e) = validate_function_name(&function) {
            errors.push(format!("targets[{idx}]: {e}"));
            continue;
        }
        if !seen.insert(function.clone()) {
            errors.push(format!("targets[{idx}]: duplicate function '{function}'"));
            continue;
        }
        let file_path = match target.file_path.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => {
                errors.push(format!("targets[{idx}] ({function}): file_path is required"));
                continue;
            }
        };
        resolved.push((function, file_path));
    }

    if !errors.is_empty() {
        return Err(ConfigError::Invalid(errors));
    }

    // Required fields were checked above; empty strings only remain on the error path.
    let project_root = PathBuf::from(project_root.unwrap_or_default());
    let proof_root = project_root.join(proof_root.unwrap_or_default());
    let makefile_include = project_root
        .join(makefile_include_dir.unwrap_or_default())
        .join("Makefile.include");
    let log_dir = proof_root.join("logs");

    let targets = resolved
        .into_iter()
        .map(|(function, file_path)| TargetSpec {
            target_file: project_root.join(&file_path),
            proof_dir: proof_root.join(&function),
            makefile_include: makefile_include.clone(),
            function_name: function,
        })
        .collect();

    Ok(RunConfig {
        project_root,
        proof_root,
        examples_dir: raw.examples_dir.unwrap_or_default(),
        log_dir,
        use_examples: options.use_examples,
        agent,
        session_store,
        plan: TargetPlan::new(targets, options.limit),
    })
}

fn required(value: &Option<String>, field: &str, errors: &mut Vec<String>) -> Option<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            errors.push(format!("{field} is required"));
            None
        }
    }
}

fn build_agent(raw: RawAgent, errors: &mut Vec<String>) -> AgentConfig {
    let defaults = AgentConfig::default();

    // Custom agents declare their own environment needs.
    let required_env = match (&raw.command, raw.required_env) {
        (_, Some(env)) => env,
        (Some(_), None) => Vec::new(),
        (None, None) => defaults.required_env,
    };

    let command = match raw.command {
        Some(cmd) if cmd.is_empty() || cmd[0].trim().is_empty() => {
            errors.push("agent.command must name a program".to_string());
            cmd
        }
        Some(cmd) => cmd,
        None => defaults.command,
    };

    let timeout = match raw.timeout_secs {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => defaults.timeout,
    };

    if let Some(pricing) = &raw.pricing {
        for (field, rate) in [
            ("input_per_unit", pricing.input_per_unit),
            ("cached_per_unit", pricing.cached_per_unit),
            ("output_per_unit", pricing.output_per_unit),
        ] {
            if let Err(e) = validate_rate(field, rate) {
                errors.push(format!("agent.{e}"));
            }
        }
    }

    AgentConfig {
        command,
        timeout,
        required_env,
        pricing: raw.pricing,
    }
}

fn build_session_store(raw: RawSessionStore, errors: &mut Vec<String>) -> SessionStoreConfig {
    let root = match raw.root.as_deref() {
        Some(root) => expand_home(root),
        None => default_session_root(),
    };
    let root = root.unwrap_or_else(|| {
        errors.push(
            "session_store.root is not set and no home directory could be determined".to_string(),
        );
        PathBuf::new()
    });

    SessionStoreConfig {
        root,
        wait: Duration::from_secs(raw.wait_secs.unwrap_or(DEFAULT_SESSION_WAIT_SECS)),
        poll_interval: Duration::from_millis(
            raw.poll_interval_ms.unwrap_or(DEFAULT_SESSION_POLL_MS).max(1),
        ),
    }
}

/// `$CODEX_HOME/sessions`, falling back to `~/.codex/sessions`
pub fn default_session_root() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os("CODEX_HOME").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(home).join("sessions"));
    }
    dirs::home_dir().map(|h| h.join(".codex").join("sessions"))
}

fn expand_home(path: &str) -> Option<PathBuf> {
    if path == "~" {
        return dirs::home_dir();
    }
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|h| h.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests;
