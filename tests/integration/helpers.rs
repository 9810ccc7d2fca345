//! Shared fixtures: a scratch project, a session store and a shell-script agent

use codexup::config::{RunConfig, RunOptions};
use codexup::runner::{execute_run, RunReport, RunSettings};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const TEMPLATE: &str = "Harness {FUNCTION_NAME} in {TARGET_FILE}.\n[Examples]\nSee {EXAMPLES_DIR}.\n[/Examples]\nLogs go to {LOG_DIR}.\n";

/// Reads the prompt on stdin, pulls out the run marker and writes a rollout
/// file for it. Fails for `bar` without writing a session.
pub const AGENT_SCRIPT: &str = r#"#!/bin/sh
prompt=$(cat)
case "$prompt" in
  *"Harness bar "*) echo "bar is broken" >&2; exit 3 ;;
esac
marker=$(printf '%s\n' "$prompt" | sed -n 's/.*codexup-run: \(cxu-[0-9a-f-]*\) -->.*/\1/p')
dir="$SESSION_DIR/2025/09/01"
mkdir -p "$dir"
{
  printf '{"type":"session_meta","payload":{"instructions":"%s"}}\n' "$marker"
  printf '{"type":"event_msg","payload":{"type":"token_count","info":{"total_token_usage":{"input_tokens":1000,"output_tokens":10}}}}\n'
  printf '{"type":"event_msg","payload":{"type":"token_count","info":{"total_token_usage":{"input_tokens":2000000,"cached_input_tokens":0,"output_tokens":500000}}}}\n'
} > "$dir/rollout-$marker.jsonl"
echo "done with $marker"
"#;

pub struct Workspace {
    temp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("project").join("src")).unwrap();
        fs::create_dir_all(temp.path().join("sessions")).unwrap();
        let ws = Self { temp };
        ws.write_agent(AGENT_SCRIPT);
        ws
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn project(&self) -> PathBuf {
        self.root().join("project")
    }

    pub fn sessions(&self) -> PathBuf {
        self.root().join("sessions")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.project().join("proofs").join("logs")
    }

    pub fn agent_path(&self) -> PathBuf {
        self.root().join("agent.sh")
    }

    pub fn write_agent(&self, script: &str) {
        let script = script.replace("$SESSION_DIR", &self.sessions().display().to_string());
        fs::write(self.agent_path(), script).unwrap();
        fs::set_permissions(self.agent_path(), fs::Permissions::from_mode(0o755)).unwrap();
    }

    pub fn config(&self, functions: &[&str], limit: Option<usize>) -> RunConfig {
        let targets: String = functions
            .iter()
            .map(|f| format!("  - function: {f}\n    file_path: src/{f}.c\n"))
            .collect();
        let yaml = format!(
            r#"project_root: "{project}"
proof_root: proofs
makefile_include_dir: proofs
examples_dir: templates/examples
agent:
  command: ["{agent}"]
  timeout_secs: 30
  required_env: []
  pricing:
    input_per_unit: 1.75
    cached_per_unit: 0.175
    output_per_unit: 14.0
session_store:
  root: "{sessions}"
  wait_secs: 1
  poll_interval_ms: 50
targets:
{targets}"#,
            project = self.project().display(),
            agent = self.agent_path().display(),
            sessions = self.sessions().display(),
        );
        let path = self.root().join("run.yaml");
        fs::write(&path, yaml).unwrap();
        RunConfig::load(
            &path,
            RunOptions {
                use_examples: false,
                limit,
            },
        )
        .unwrap()
    }

    pub fn session_files(&self) -> Vec<PathBuf> {
        glob::glob(&format!("{}/**/*.jsonl", self.sessions().display()))
            .unwrap()
            .filter_map(Result::ok)
            .collect()
    }
}

pub fn run(config: &RunConfig, dry_run: bool) -> anyhow::Result<RunReport> {
    execute_run(config, TEMPLATE, RunSettings { dry_run, echo: false })
}
