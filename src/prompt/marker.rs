//! Run markers - per-dispatch correlation tokens embedded in prompts
//!
//! The agent gives no direct answer about token usage. It only writes its
//! own session log, and that log contains the prompt verbatim. Each dispatch
//! gets a marker that is unique within the run and tags the prompt with it, so
//! the session matcher can later find the log written for that dispatch.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

const MARKER_PREFIX: &str = "cxu";

/// A unique token identifying one dispatch.
///
/// Always `cxu-<32 hex>-<8 hex>-<16 hex>`. The fixed length means no marker is
/// a prefix of another, so a plain substring search cannot cross-match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunMarker(String);

impl RunMarker {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues markers for one run: a run nonce, a run-scoped counter, and fresh
/// randomness per marker. Safe to share across threads.
#[derive(Debug)]
pub struct MarkerFactory {
    run_id: String,
    next_seq: AtomicU64,
}

impl MarkerFactory {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().simple().to_string(),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Identifier shared by every marker of this run
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn next_marker(&self) -> RunMarker {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let random = Uuid::new_v4().simple().to_string();
        RunMarker(format!(
            "{MARKER_PREFIX}-{}-{:08x}-{}",
            self.run_id,
            seq & 0xffff_ffff,
            &random[..16]
        ))
    }
}

impl Default for MarkerFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Append the marker to a rendered prompt as an HTML comment line.
///
/// The comment does not change what the agent is asked to do, and the marker
/// shows up verbatim in the agent's transcript.
pub fn embed_marker(prompt: &str, marker: &RunMarker) -> String {
    let separator = if prompt.is_empty() || prompt.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    format!("{prompt}{separator}\n<!-- codexup-run: {marker} -->\n")
}
