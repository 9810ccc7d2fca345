//! Marker lookup with bounded retry and a deterministic tie-break

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use super::scan::{scan_store, Candidate};
use super::usage::TokenUsage;
use crate::config::SessionStoreConfig;
use crate::prompt::RunMarker;

/// Upper bound on the delay between two scans
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Usage recovered for one dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub marker: String,
    pub session_path: PathBuf,
    /// Zero-based line of the chosen usage event
    pub line: usize,
    pub usage: TokenUsage,
}

/// Read-only lookup of run markers in the session-log store
#[derive(Debug, Clone)]
pub struct SessionMatcher {
    root: PathBuf,
    wait: Duration,
    poll_interval: Duration,
}

impl SessionMatcher {
    pub fn new(config: &SessionStoreConfig) -> Self {
        Self {
            root: config.root.clone(),
            wait: config.wait,
            poll_interval: config.poll_interval,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Wait for a usage record tagged with `marker`.
    ///
    /// The store is scanned immediately, then again with growing delays until
    /// the wait window has passed. Returns `None` when nothing turned up; that
    /// is an expected outcome, not a failure.
    pub fn find(&self, marker: &RunMarker, since: SystemTime) -> Option<SessionRecord> {
        let deadline = Instant::now() + self.wait;
        let mut attempt = 0u32;

        loop {
            if let Some(record) = self.scan_once(marker, Some(since)) {
                tracing::debug!(
                    marker = %marker,
                    path = %record.session_path.display(),
                    attempts = attempt + 1,
                    "session matched"
                );
                return Some(record);
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(marker = %marker, attempts = attempt + 1, "no session found");
                return None;
            }

            attempt += 1;
            let delay = poll_backoff(attempt, self.poll_interval, MAX_POLL_INTERVAL);
            thread::sleep(delay.min(deadline - now));
        }
    }

    /// A single scan without waiting
    pub fn scan_once(&self, marker: &RunMarker, since: Option<SystemTime>) -> Option<SessionRecord> {
        let result = scan_store(&self.root, marker.as_str(), since);
        if !result.marker_files.is_empty() && result.candidates.is_empty() {
            tracing::debug!(marker = %marker, "marker seen but no usage flushed yet");
        }
        select_best(result.candidates).map(|c| SessionRecord {
            marker: marker.as_str().to_string(),
            session_path: c.path,
            line: c.line,
            usage: c.usage,
        })
    }
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`, capped.
pub fn poll_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let multiplier = 2u32.saturating_pow(attempt - 1);
    base.saturating_mul(multiplier).min(max)
}

/// Pick one candidate: most populated fields, then highest token sum, then
/// newest file, then latest line, then greatest path.
pub fn select_best(candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates.into_iter().max_by(compare_candidates)
}

fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    a.usage
        .completeness()
        .cmp(&b.usage.completeness())
        .then_with(|| a.usage.token_sum().cmp(&b.usage.token_sum()))
        .then_with(|| a.modified.cmp(&b.modified))
        .then_with(|| a.line.cmp(&b.line))
        .then_with(|| a.path.cmp(&b.path))
}
