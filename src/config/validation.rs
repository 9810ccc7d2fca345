//! Validation of user-supplied names that end up in file paths.
//!
//! Function names become part of `codex_<function>.log` and the proof
//! directory, so they are restricted to a path-safe alphabet.

/// Maximum allowed length for a target function name.
pub const MAX_FUNCTION_NAME_LENGTH: usize = 128;

/// Validates that a function name is safe for use in file paths.
///
/// A name is valid if:
/// - It is not empty
/// - It is no longer than MAX_FUNCTION_NAME_LENGTH characters
/// - It contains only alphanumeric characters, dashes, and underscores
pub fn validate_function_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("function name cannot be empty".to_string());
    }

    if name.len() > MAX_FUNCTION_NAME_LENGTH {
        return Err(format!(
            "function name too long: {} characters (max {MAX_FUNCTION_NAME_LENGTH})",
            name.len()
        ));
    }

    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid_chars {
        return Err(format!(
            "function name '{name}' contains invalid characters. Use only alphanumeric characters, dashes (-), and underscores (_)"
        ));
    }

    Ok(())
}

/// Validates a per-million-token rate from the pricing block.
pub fn validate_rate(field: &str, rate: Option<f64>) -> Result<(), String> {
    match rate {
        Some(r) if !r.is_finite() => Err(format!("pricing.{field} must be a finite number")),
        Some(r) if r < 0.0 => Err(format!("pricing.{field} cannot be negative ({r})")),
        _ => Ok(()),
    }
}
