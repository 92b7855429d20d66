//! # redhelm core
//!
//! Ask a hosted language model one question and get back a reply that is
//! guaranteed to match a fixed six-field schema.
//!
//! Pipeline: [`prompt`] assembles the messages, [`llm`] performs a single
//! request with an explicit retry policy, [`reply`] validates the output.

pub mod assistant;
pub mod config;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod reply;

pub use assistant::Assistant;
pub use config::{Config, ConfigOverrides};
pub use error::{RedhelmError, RedhelmResult};
pub use llm::{ChatMessage, ChatModel, Provider, RetryPolicy, Role};
pub use prompt::PromptTemplate;
pub use reply::{parse_reply, ReplyError, StructuredReply};
