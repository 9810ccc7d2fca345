//! Optional template sections delimited by `[Name]` / `[/Name]` marker lines
//!
//! A marker must sit on its own line (surrounding whitespace is ignored).
//! Sections may appear more than once but never nest, and every opener needs
//! a closer. Anything else is a [`TemplateError`].

use crate::error::TemplateError;

/// Section toggled by the examples flag
pub const EXAMPLES_SECTION: &str = "Examples";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineRole {
    Outside,
    Open,
    Inside,
    Close,
}

/// A template split into lines tagged with their position relative to one
/// named section.
#[derive(Debug)]
pub struct SectionedTemplate<'a> {
    lines: Vec<(LineRole, &'a str)>,
}

impl<'a> SectionedTemplate<'a> {
    /// Tag every line of `template` against the section called `section`
    pub fn parse(template: &'a str, section: &str) -> Result<Self, TemplateError> {
        let open_marker = format!("[{section}]");
        let close_marker = format!("[/{section}]");

        let mut lines = Vec::new();
        let mut open_at: Option<usize> = None;

        for (idx, line) in template.split_inclusive('\n').enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim();

            let role = if trimmed == open_marker {
                if open_at.is_some() {
                    return Err(TemplateError::NestedSection {
                        section: section.to_string(),
                        line: line_no,
                    });
                }
                open_at = Some(line_no);
                LineRole::Open
            } else if trimmed == close_marker {
                if open_at.take().is_none() {
                    return Err(TemplateError::UnmatchedClose {
                        section: section.to_string(),
                        line: line_no,
                    });
                }
                LineRole::Close
            } else if open_at.is_some() {
                LineRole::Inside
            } else {
                LineRole::Outside
            };

            lines.push((role, line));
        }

        if let Some(line) = open_at {
            return Err(TemplateError::UnterminatedSection {
                section: section.to_string(),
                line,
            });
        }

        Ok(Self { lines })
    }

    /// Whether the section appears at all
    pub fn has_section(&self) -> bool {
        self.lines.iter().any(|(role, _)| *role == LineRole::Open)
    }

    /// Template text with every occurrence of the section cut out, markers included
    pub fn without_section(&self) -> String {
        self.collect(|role| role == LineRole::Outside)
    }

    /// Template text with the section kept under its `[Name]` header and the
    /// closing marker dropped
    pub fn with_section(&self) -> String {
        self.collect(|role| role != LineRole::Close)
    }

    fn collect(&self, keep: impl Fn(LineRole) -> bool) -> String {
        self.lines
            .iter()
            .filter(|(role, _)| keep(*role))
            .map(|(_, line)| *line)
            .collect()
    }
}
