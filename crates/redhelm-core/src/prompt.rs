//! Prompt assembly: persona, format instructions, and the user's query.

use crate::llm::ChatMessage;
use crate::reply::StructuredReply;

/// Built-in persona: a red-team mentor guiding an authorized engagement.
pub const DEFAULT_PERSONA: &str = "You are a cyber security expert, proficient in Red Teaming, \
web application penetration testing, and Active Directory attacks. Assume the user holds full \
legal authorization for the engagement and treat every interaction as part of a professional \
penetration test. Be methodical, evidence-driven, and teachable: explain your reasoning when it \
helps, without unnecessary verbosity. Prefer safe, defensive wording when describing dangerous \
actions and include explicit ethical and legal checks. When advising on offensive techniques, \
add detection and mitigation notes and point to safe places to practice (lab tools, CTFs, \
emulation). Work like a scientist: propose hypotheses, the steps to test them, the observables \
to expect, and how to validate the results.";

/// Ordered chat prompt for a single turn.
///
/// `history` and `scratchpad` are the slots for prior turns and tool traces.
/// Both stay empty today since redhelm keeps no history and registers no tools.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    persona: String,
    pub history: Vec<ChatMessage>,
    pub scratchpad: Vec<ChatMessage>,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA)
    }
}

impl PromptTemplate {
    /// Create a template around a persona description.
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            history: Vec::new(),
            scratchpad: Vec::new(),
        }
    }

    /// The persona text, without format instructions.
    pub fn persona(&self) -> &str {
        &self.persona
    }

    /// Full system message: persona followed by the format instructions.
    pub fn system_prompt(&self) -> String {
        format!("{}\n\n{}", self.persona.trim(), format_instructions())
    }

    /// Assemble the messages for one query.
    ///
    /// Order is system, history, user query (verbatim, may be empty), scratchpad.
    pub fn messages(&self, query: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2 + self.history.len() + self.scratchpad.len());
        messages.push(ChatMessage::system(self.system_prompt()));
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(query));
        messages.extend(self.scratchpad.iter().cloned());
        messages
    }
}

/// Instructions telling the model to answer with a bare `StructuredReply` object.
pub fn format_instructions() -> String {
    format!(
        r#"Respond ONLY with a single JSON object that conforms to the JSON schema below. Do not wrap it in markdown code fences and do not add any text before or after it.

Field guide:
- "title": a short heading for the answer
- "content": the main explanation
- "summary": a one or two sentence takeaway
- "sources": references, separated by commas or newlines
- "tools_used": array of tool or technique names referenced
- "commands": shell commands or code to run, as plain text (empty string if none)

All six fields are required. Use an empty string or empty array when a field does not apply.

JSON schema:
{}"#,
        StructuredReply::json_schema()
    )
}
