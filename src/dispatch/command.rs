//! Agent command-line expansion

use shell_escape::escape;
use std::borrow::Cow;

use crate::config::{AgentConfig, PROMPT_ARG};

/// A concrete agent invocation ready to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Prompt fed on stdin when no argument takes it
    pub stdin: Option<String>,
}

impl PreparedCommand {
    /// Substitute the prompt into the configured command.
    ///
    /// Every `{PROMPT}` inside an argument is replaced. If no argument
    /// mentions it, the prompt goes to the agent's stdin instead.
    pub fn build(agent: &AgentConfig, prompt: &str) -> Self {
        let program = agent.program().to_string();
        let raw_args = agent.command.iter().skip(1);
        let takes_prompt = agent.command.iter().skip(1).any(|a| a.contains(PROMPT_ARG));

        let args = raw_args.map(|a| a.replace(PROMPT_ARG, prompt)).collect();
        let stdin = (!takes_prompt).then(|| prompt.to_string());

        Self {
            program,
            args,
            stdin,
        }
    }

    /// Shell-quoted rendering for display
    pub fn display(&self) -> String {
        let mut parts = vec![escape(Cow::Borrowed(self.program.as_str())).into_owned()];
        parts.extend(
            self.args
                .iter()
                .map(|a| escape(Cow::Borrowed(a.as_str())).into_owned()),
        );
        let line = parts.join(" ");
        match &self.stdin {
            Some(input) => format!("{line} < <prompt: {} bytes>", input.len()),
            None => line,
        }
    }
}
