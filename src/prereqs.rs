//! Pre-flight checks before any agent is started

use std::env;
use std::path::PathBuf;

use crate::config::AgentConfig;
use crate::error::ConfigError;

/// Resolve the agent executable and check its required environment.
///
/// Returns the resolved executable path.
pub fn check_agent(agent: &AgentConfig) -> Result<PathBuf, ConfigError> {
    let program = agent.program();
    let resolved =
        which::which(program).map_err(|_| ConfigError::AgentNotFound(program.to_string()))?;

    if let Some(missing) = agent
        .required_env
        .iter()
        .find(|name| env::var_os(name).is_none_or(|v| v.is_empty()))
    {
        return Err(ConfigError::MissingEnv(missing.clone()));
    }

    tracing::debug!(agent = %resolved.display(), "agent prerequisites satisfied");
    Ok(resolved)
}
