//! Single-turn model invocation.
//!
//! A provider-neutral [`ChatModel`] trait with one HTTP client per supported
//! provider. No tools are registered, so every call is a single
//! request/response; [`RetryPolicy`] decides how transient failures are
//! retried.

pub mod anthropic;
pub mod gemini;
pub mod retry;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::RedhelmResult;

pub use anthropic::AnthropicClient;
pub use gemini::GeminiClient;
pub use retry::RetryPolicy;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A provider-neutral chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A language model that answers a list of messages with raw text.
///
/// Implementations own their retry and timeout behavior. This is also the
/// seam where tool calling would plug in.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Human-readable `provider/model` label, used in logs.
    fn name(&self) -> String;

    /// Send the messages and return the model's final text answer.
    async fn complete(&self, messages: &[ChatMessage]) -> RedhelmResult<String>;
}

/// Supported model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    Gemini,
    Anthropic,
}

impl Provider {
    /// Model used when none is configured.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => gemini::DEFAULT_MODEL,
            Self::Anthropic => anthropic::DEFAULT_MODEL,
        }
    }

    /// Public API endpoint root.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Gemini => gemini::DEFAULT_BASE_URL,
            Self::Anthropic => anthropic::DEFAULT_BASE_URL,
        }
    }

    /// Environment variables searched, in order, for the API key.
    pub fn api_key_vars(self) -> &'static [&'static str] {
        match self {
            Self::Gemini => &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
            Self::Anthropic => &["ANTHROPIC_API_KEY"],
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(format!(
                "unknown provider '{}' (expected 'gemini' or 'anthropic')",
                other
            )),
        }
    }
}

/// Build the client for the configured provider.
pub fn build_model(config: &Config) -> Box<dyn ChatModel> {
    match config.provider {
        Provider::Gemini => Box::new(GeminiClient::new(config)),
        Provider::Anthropic => Box::new(AnthropicClient::new(config)),
    }
}

/// Join every system message into one block, keeping the rest in order.
///
/// Both providers take the system prompt out-of-band rather than as a turn.
pub(crate) fn split_system(messages: &[ChatMessage]) -> (Option<String>, Vec<&ChatMessage>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let turns = messages.iter().filter(|m| m.role != Role::System).collect();

    let system = if system.is_empty() {
        None
    } else {
        Some(system.join("\n\n"))
    };
    (system, turns)
}
