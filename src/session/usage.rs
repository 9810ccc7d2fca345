//! Token usage extraction from a single session-log line
//!
//! The agent writes one JSON object per line. Usage arrives as `token_count`
//! events whose cumulative totals live under `payload.info.total_token_usage`.
//! Older rollouts put the object directly under `info` or `payload`, so those
//! locations are accepted too.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token counts reported by the agent for one session.
///
/// Fields are copied verbatim; a field the agent did not report stays `None`
/// rather than being defaulted to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: Option<u64>,
    pub cached_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl TokenUsage {
    /// How many token fields are populated
    pub fn completeness(&self) -> usize {
        [
            self.input_tokens,
            self.cached_tokens,
            self.output_tokens,
            self.reasoning_tokens,
            self.total_tokens,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
    }

    /// Sum of input, cached and output tokens that are present
    pub fn token_sum(&self) -> u64 {
        [self.input_tokens, self.cached_tokens, self.output_tokens]
            .iter()
            .flatten()
            .fold(0u64, |acc, v| acc.saturating_add(*v))
    }
}

/// Parse one line of a session log, returning usage if it is a usage event.
///
/// Non-JSON lines and events of other types yield `None`.
pub fn parse_usage_line(line: &str) -> Option<TokenUsage> {
    let trimmed = line.trim();
    if trimmed.is_empty() || !trimmed.contains("token") {
        return None;
    }
    let value: Value = serde_json::from_str(trimmed).ok()?;
    if !is_token_count_event(&value) {
        return None;
    }

    let usage_obj = [
        &["payload", "info", "total_token_usage"][..],
        &["info", "total_token_usage"][..],
        &["payload", "total_token_usage"][..],
        &["total_token_usage"][..],
    ]
    .iter()
    .find_map(|path| get_path(&value, path).filter(|v| v.is_object()))?;

    let usage = TokenUsage {
        input_tokens: read_count(usage_obj, "input_tokens"),
        cached_tokens: read_count(usage_obj, "cached_input_tokens")
            .or_else(|| read_count(usage_obj, "cached_tokens")),
        output_tokens: read_count(usage_obj, "output_tokens"),
        reasoning_tokens: read_count(usage_obj, "reasoning_output_tokens")
            .or_else(|| read_count(usage_obj, "reasoning_tokens")),
        total_tokens: read_count(usage_obj, "total_tokens"),
    };

    if usage.input_tokens.is_none() && usage.output_tokens.is_none() {
        return None;
    }
    Some(usage)
}

fn is_token_count_event(value: &Value) -> bool {
    let is_token_count = |v: Option<&Value>| v.and_then(Value::as_str) == Some("token_count");
    is_token_count(get_path(value, &["payload", "type"])) || is_token_count(value.get("type"))
}

fn get_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |cur, key| cur.get(key))
}

fn read_count(obj: &Value, key: &str) -> Option<u64> {
    obj.get(key).and_then(Value::as_u64)
}
