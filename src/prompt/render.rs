//! Placeholder substitution for prompt templates
//!
//! Placeholders are `{NAME}` with an upper-case identifier. `{{` and `}}`
//! produce literal braces. Braces around anything else (C snippets, JSON)
//! pass through untouched. An upper-case placeholder that is not one of the
//! known fields is an error so a typo never reaches the agent.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::sections::{SectionedTemplate, EXAMPLES_SECTION};
use crate::config::TargetSpec;
use crate::error::TemplateError;

pub const TARGET_FILE: &str = "TARGET_FILE";
pub const FUNCTION_NAME: &str = "FUNCTION_NAME";
pub const MAKEFILE_INCLUDE: &str = "MAKEFILE_INCLUDE";
pub const PROOF_DIR: &str = "PROOF_DIR";
pub const EXAMPLES_DIR: &str = "EXAMPLES_DIR";
pub const LOG_DIR: &str = "LOG_DIR";

/// Values for every known placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptFields {
    pub target_file: String,
    pub function_name: String,
    pub makefile_include: String,
    pub proof_dir: String,
    pub examples_dir: String,
    pub log_dir: String,
}

impl PromptFields {
    pub fn for_target(target: &TargetSpec, examples_dir: &str, log_dir: &std::path::Path) -> Self {
        Self {
            target_file: target.target_file.display().to_string(),
            function_name: target.function_name.clone(),
            makefile_include: target.makefile_include.display().to_string(),
            proof_dir: target.proof_dir.display().to_string(),
            examples_dir: examples_dir.to_string(),
            log_dir: log_dir.display().to_string(),
        }
    }

    fn as_map(&self) -> BTreeMap<&'static str, &str> {
        BTreeMap::from([
            (TARGET_FILE, self.target_file.as_str()),
            (FUNCTION_NAME, self.function_name.as_str()),
            (MAKEFILE_INCLUDE, self.makefile_include.as_str()),
            (PROOF_DIR, self.proof_dir.as_str()),
            (EXAMPLES_DIR, self.examples_dir.as_str()),
            (LOG_DIR, self.log_dir.as_str()),
        ])
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([A-Z][A-Z0-9_]*)\}").expect("Invalid placeholder regex")
    })
}

/// Render a template for one target.
///
/// The `[Examples]` section is cut out first when `include_examples` is
/// false, so placeholders inside it are never looked at. Same inputs always
/// give the same output.
pub fn render_prompt(
    template: &str,
    fields: &PromptFields,
    include_examples: bool,
) -> Result<String, TemplateError> {
    let sectioned = SectionedTemplate::parse(template, EXAMPLES_SECTION)?;
    let text = if include_examples {
        sectioned.with_section()
    } else {
        sectioned.without_section()
    };
    substitute(&text, &fields.as_map())
}

/// Replace placeholders in `text` with values from `values`
pub fn substitute(text: &str, values: &BTreeMap<&str, &str>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in placeholder_regex().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let value: &str = match (whole.as_str(), caps.get(1)) {
            ("{{", _) => "{",
            ("}}", _) => "}",
            (_, Some(name)) => values.get(name.as_str()).copied().ok_or_else(|| {
                TemplateError::UnknownPlaceholder {
                    name: name.as_str().to_string(),
                    line: line_of(text, whole.start()),
                }
            })?,
            (other, None) => other,
        };
        out.push_str(&text[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}
