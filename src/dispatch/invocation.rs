//! The record of one agent dispatch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use crate::config::TargetSpec;
use crate::error::DispatchError;
use crate::prompt::RunMarker;

/// How a dispatch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Agent exited with status 0
    Succeeded,
    /// Agent exited non-zero or was killed by a signal
    Failed,
    /// Agent was killed after the configured timeout
    TimedOut,
    /// Agent process could not be started
    LaunchFailed,
    /// Dry run, nothing executed
    Skipped,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        self == Outcome::Succeeded
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Outcome::Failed | Outcome::TimedOut | Outcome::LaunchFailed
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Succeeded => "succeeded",
            Outcome::Failed => "failed",
            Outcome::TimedOut => "timed out",
            Outcome::LaunchFailed => "launch failed",
            Outcome::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// One dispatch of the agent for one target
#[derive(Debug, Clone)]
pub struct Invocation {
    pub target: TargetSpec,
    pub marker: RunMarker,
    pub started_at: DateTime<Utc>,
    /// Wall-clock start, compared against session-log modification times
    pub started_wall: SystemTime,
    pub duration: Duration,
    pub outcome: Outcome,
    pub exit_code: Option<i32>,
    pub error: Option<DispatchError>,
    pub log_path: PathBuf,
    /// Shell-quoted command line, as shown for dry runs
    pub command_line: String,
    pub dry_run: bool,
}

impl Invocation {
    /// Whether the agent ran at all, so a session log may exist for it
    pub fn should_scan_sessions(&self) -> bool {
        !self.dry_run && !matches!(self.outcome, Outcome::LaunchFailed | Outcome::Skipped)
    }
}
