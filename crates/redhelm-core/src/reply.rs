//! The fixed-schema reply the model must return, and its parser.
//!
//! The JSON schema shown to the model is generated from [`StructuredReply`]
//! itself, so the prompt and the parser can never disagree on field names or
//! types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use thiserror::Error;

/// Heading shown when the model leaves `title` empty.
pub const TITLE_PLACEHOLDER: &str = "No title";

/// A model reply constrained to the six fields redhelm knows how to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StructuredReply {
    /// Short heading for the answer.
    pub title: String,
    /// Main explanatory body.
    pub content: String,
    /// Condensed takeaway.
    pub summary: String,
    /// References, separated by commas or newlines.
    pub sources: String,
    /// Names of tools or techniques referenced in the answer.
    pub tools_used: Vec<String>,
    /// Shell commands or code to display verbatim.
    pub commands: String,
}

/// Failure to turn raw model output into a [`StructuredReply`].
#[derive(Error, Debug)]
pub enum ReplyError {
    /// Not valid JSON: syntax error, truncation, stray prose.
    #[error("Model output is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Valid JSON that does not match the reply schema.
    #[error("Model output does not match the reply schema: {0}")]
    SchemaViolation(#[source] serde_json::Error),
}

impl StructuredReply {
    /// Title to display, falling back to [`TITLE_PLACEHOLDER`].
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            TITLE_PLACEHOLDER
        } else {
            &self.title
        }
    }

    /// Whether there is anything in `commands` besides whitespace.
    pub fn has_commands(&self) -> bool {
        !self.commands.trim().is_empty()
    }

    /// Tools joined for a single display line, or `None` when there are none.
    pub fn tools_line(&self) -> Option<String> {
        if self.tools_used.is_empty() {
            None
        } else {
            Some(self.tools_used.join(", "))
        }
    }

    /// Split `sources` on commas and newlines into trimmed, non-empty entries.
    pub fn source_list(&self) -> Vec<String> {
        self.sources
            .split([',', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    /// Pretty-printed JSON Schema for the reply, as embedded in the prompt.
    pub fn json_schema() -> String {
        let schema = schemars::schema_for!(StructuredReply);
        serde_json::to_string_pretty(&schema).unwrap_or_default()
    }
}

/// Parse raw model output into a [`StructuredReply`].
///
/// A single markdown code fence wrapping the whole output is stripped before
/// parsing; nothing else is repaired. Every field must be present with its
/// declared type, and unknown fields are ignored.
pub fn parse_reply(raw: &str) -> Result<StructuredReply, ReplyError> {
    let json = strip_code_fence(raw);

    serde_json::from_str(json).map_err(|e| match e.classify() {
        Category::Data => ReplyError::SchemaViolation(e),
        Category::Syntax | Category::Eof | Category::Io => ReplyError::Malformed(e),
    })
}

/// Remove a ```` ``` ```` / ```` ```json ```` fence that wraps the entire text.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();

    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };

    // The opening line may carry an info string such as `json`; JSON that
    // starts right after the backticks is kept whole.
    match inner.split_once('\n') {
        Some((info, body)) if is_info_string(info) => body.trim(),
        _ => inner.trim(),
    }
}

fn is_info_string(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && !line.contains(['{', '['])
}
