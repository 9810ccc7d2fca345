//! One read-only pass over the session-log store

use glob::{glob, Pattern};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use super::usage::{parse_usage_line, TokenUsage};

/// Allowance for coarse filesystem timestamps when filtering by start time
pub const MTIME_SLACK: Duration = Duration::from_secs(2);

/// A usage line found in a session file that mentions the marker
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    /// Zero-based line number within the file
    pub line: usize,
    pub usage: TokenUsage,
}

/// Result of scanning the store for one marker
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Files whose content contains the marker
    pub marker_files: Vec<PathBuf>,
    pub candidates: Vec<Candidate>,
}

/// Scan every `*.jsonl` file under `root` for `marker`.
///
/// With `since` set, files last modified before `since - MTIME_SLACK` are
/// skipped. A missing root or unreadable file is not an error; it simply
/// contributes nothing. Nothing under `root` is ever written.
pub fn scan_store(root: &Path, marker: &str, since: Option<SystemTime>) -> ScanResult {
    let mut result = ScanResult::default();
    if !root.is_dir() {
        tracing::debug!(root = %root.display(), "session store does not exist yet");
        return result;
    }

    let pattern = format!(
        "{}/**/*.jsonl",
        Pattern::escape(&root.to_string_lossy())
    );
    let paths = match glob(&pattern) {
        Ok(paths) => paths,
        Err(e) => {
            tracing::warn!(pattern = %pattern, error = %e, "invalid session store pattern");
            return result;
        }
    };

    let cutoff = since.map(|s| s.checked_sub(MTIME_SLACK).unwrap_or(s));

    for path in paths.filter_map(|p| p.ok()) {
        let modified = fs::metadata(&path).and_then(|m| m.modified()).ok();
        if let (Some(cutoff), Some(modified)) = (cutoff, modified) {
            if modified < cutoff {
                continue;
            }
        }

        let content = match fs::read(&path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "skipping unreadable session file");
                continue;
            }
        };
        if !content.contains(marker) {
            continue;
        }

        result.candidates.extend(
            content
                .lines()
                .enumerate()
                .filter_map(|(line, text)| parse_usage_line(text).map(|usage| (line, usage)))
                .map(|(line, usage)| Candidate {
                    path: path.clone(),
                    modified,
                    line,
                    usage,
                }),
        );
        result.marker_files.push(path);
    }

    result
}
