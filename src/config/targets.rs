//! Verification targets and the ordered, optionally truncated view over them

use serde::Serialize;
use std::path::{Path, PathBuf};

/// One function/file pair to generate a harness for.
///
/// Built once from the run configuration with every path already resolved
/// against the project root, and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetSpec {
    pub function_name: String,
    pub target_file: PathBuf,
    pub proof_dir: PathBuf,
    pub makefile_include: PathBuf,
}

impl TargetSpec {
    /// Per-target agent log: `<log_dir>/codex_<function>.log`
    pub fn log_path(&self, log_dir: &Path) -> PathBuf {
        log_dir.join(format!("codex_{}.log", self.function_name))
    }
}

/// Targets in declaration order plus an optional prefix limit.
///
/// `iter` can be called any number of times and always yields the same
/// prefix, so the plan doubles as a restartable sequence.
#[derive(Debug, Clone, Default)]
pub struct TargetPlan {
    targets: Vec<TargetSpec>,
    limit: Option<usize>,
}

impl TargetPlan {
    pub fn new(targets: Vec<TargetSpec>, limit: Option<usize>) -> Self {
        Self { targets, limit }
    }

    /// Lazily yield at most `limit` targets in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &TargetSpec> + '_ {
        self.targets.iter().take(self.limit.unwrap_or(usize::MAX))
    }

    /// Number of targets `iter` will yield
    pub fn len(&self) -> usize {
        match self.limit {
            Some(limit) => limit.min(self.targets.len()),
            None => self.targets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every declared target, ignoring the limit
    pub fn declared(&self) -> &[TargetSpec] {
        &self.targets
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}
