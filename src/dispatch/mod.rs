//! Run dispatcher - one agent invocation per target
//!
//! For each target a fresh run marker is drawn, the prompt is rendered and
//! tagged with it, and the agent is run (or, in dry-run mode, only described).
//! Agent failures never escape as errors: they are folded into the returned
//! [`Invocation`] so the run can move on to the next target.

pub mod command;
pub mod executor;
pub mod invocation;

use chrono::Utc;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

use crate::config::{AgentConfig, TargetSpec};
use crate::error::{DispatchError, TemplateError};
use crate::prompt::{embed_marker, render_prompt, MarkerFactory, PromptFields};

pub use command::PreparedCommand;
pub use executor::{run_agent, ExecRequest, ExecResult};
pub use invocation::{Invocation, Outcome};

/// Per-run dispatch settings
#[derive(Debug, Clone)]
pub struct Dispatcher<'a> {
    pub agent: &'a AgentConfig,
    pub template: &'a str,
    pub use_examples: bool,
    pub examples_dir: &'a str,
    pub project_root: &'a Path,
    pub log_dir: &'a Path,
    pub dry_run: bool,
    pub echo: bool,
    pub markers: &'a MarkerFactory,
}

impl Dispatcher<'_> {
    /// Render the prompt for `target` and hand it to the agent.
    ///
    /// Only a template problem is returned as an error; the template is
    /// checked before the run starts, so in practice that cannot happen here.
    pub fn dispatch(&self, target: &TargetSpec) -> Result<Invocation, TemplateError> {
        let marker = self.markers.next_marker();
        let fields = PromptFields::for_target(target, self.examples_dir, self.log_dir);
        let prompt = embed_marker(
            &render_prompt(self.template, &fields, self.use_examples)?,
            &marker,
        );

        let command = PreparedCommand::build(self.agent, &prompt);
        let log_path = target.log_path(self.log_dir);
        let started_at = Utc::now();
        let started_wall = SystemTime::now();

        let base = Invocation {
            target: target.clone(),
            marker,
            started_at,
            started_wall,
            duration: Duration::ZERO,
            outcome: Outcome::Skipped,
            exit_code: None,
            error: None,
            log_path,
            command_line: command.display(),
            dry_run: self.dry_run,
        };

        if self.dry_run {
            tracing::debug!(function = %target.function_name, "dry run, agent not started");
            return Ok(base);
        }

        Ok(self.execute(base, &command))
    }

    fn execute(&self, mut invocation: Invocation, command: &PreparedCommand) -> Invocation {
        let clock = Instant::now();

        if let Err(e) = std::fs::create_dir_all(&invocation.target.proof_dir) {
            invocation.outcome = Outcome::LaunchFailed;
            invocation.error = Some(DispatchError::Launch {
                program: command.program.clone(),
                reason: format!(
                    "cannot create proof directory {}: {e}",
                    invocation.target.proof_dir.display()
                ),
            });
            return invocation;
        }

        let request = ExecRequest {
            command,
            cwd: self.project_root,
            log_path: &invocation.log_path,
            timeout: self.agent.timeout,
            echo: self.echo,
        };

        match run_agent(&request) {
            Ok(result) => {
                invocation.duration = result.duration;
                invocation.exit_code = result.exit_code();
                let (outcome, error) = classify(&result, self.agent.timeout);
                invocation.outcome = outcome;
                invocation.error = error;
            }
            Err(e) => {
                invocation.duration = clock.elapsed();
                invocation.outcome = Outcome::LaunchFailed;
                invocation.error = Some(e);
            }
        }

        tracing::info!(
            function = %invocation.target.function_name,
            outcome = %invocation.outcome,
            exit_code = ?invocation.exit_code,
            duration_ms = invocation.duration.as_millis() as u64,
            "agent finished"
        );
        invocation
    }
}

fn classify(result: &ExecResult, timeout: Option<Duration>) -> (Outcome, Option<DispatchError>) {
    if result.timed_out {
        let limit = timeout.unwrap_or_default();
        return (Outcome::TimedOut, Some(DispatchError::TimedOut(limit)));
    }
    match result.status {
        Some(status) if status.success() => (Outcome::Succeeded, None),
        Some(status) => match status.code() {
            Some(code) => (Outcome::Failed, Some(DispatchError::NonZeroExit(code))),
            None => (Outcome::Failed, Some(DispatchError::Signaled)),
        },
        None => (Outcome::Failed, Some(DispatchError::Signaled)),
    }
}

/// Marker-less render used to validate a template before any dispatch
pub fn probe_render(template: &str, use_examples: bool) -> Result<String, TemplateError> {
    let fields = PromptFields {
        target_file: "target.c".to_string(),
        function_name: "probe".to_string(),
        makefile_include: "Makefile.include".to_string(),
        proof_dir: "proof".to_string(),
        examples_dir: "examples".to_string(),
        log_dir: "logs".to_string(),
    };
    render_prompt(template, &fields, use_examples)
}
