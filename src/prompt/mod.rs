//! Prompt rendering: optional sections, placeholders and run markers

pub mod marker;
pub mod render;
pub mod sections;

pub use marker::{embed_marker, MarkerFactory, RunMarker};
pub use render::{render_prompt, PromptFields};
pub use sections::{SectionedTemplate, EXAMPLES_SECTION};
