//! One query in, one validated reply out.

use tracing::{debug, info};

use crate::config::Config;
use crate::error::RedhelmResult;
use crate::llm::{build_model, ChatModel};
use crate::prompt::PromptTemplate;
use crate::reply::{parse_reply, StructuredReply};

/// A model paired with the prompt it is asked through.
pub struct Assistant {
    model: Box<dyn ChatModel>,
    prompt: PromptTemplate,
}

impl Assistant {
    pub fn new(model: Box<dyn ChatModel>, prompt: PromptTemplate) -> Self {
        Self { model, prompt }
    }

    /// Build the configured provider client with the configured persona.
    pub fn from_config(config: &Config) -> Self {
        Self::new(build_model(config), PromptTemplate::new(config.persona.clone()))
    }

    pub fn model_name(&self) -> String {
        self.model.name()
    }

    /// Ask a single question and validate the answer against the reply schema.
    ///
    /// Any failure (network, provider, malformed or non-conforming output)
    /// is returned as-is; nothing is repaired and the model is not re-prompted.
    pub async fn ask(&self, query: &str) -> RedhelmResult<StructuredReply> {
        let messages = self.prompt.messages(query);
        info!(model = %self.model.name(), messages = messages.len(), "Sending query");

        let raw = self.model.complete(&messages).await?;
        debug!(bytes = raw.len(), "Received model output");

        Ok(parse_reply(&raw)?)
    }
}
