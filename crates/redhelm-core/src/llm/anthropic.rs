//! Anthropic Messages API client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{split_system, ChatMessage, ChatModel, RetryPolicy, Role};
use crate::config::Config;
use crate::error::{RedhelmError, RedhelmResult};

/// Default Anthropic API root.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Default Claude model.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The Messages API requires an explicit output ceiling.
const MAX_TOKENS: u32 = 8192;

/// Client for the Anthropic Messages endpoint.
pub struct AnthropicClient {
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryPolicy,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

impl AnthropicClient {
    /// Create a client from resolved configuration.
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();

        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: config.retry,
            client,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    async fn send_once(&self, request: &MessagesRequest) -> RedhelmResult<String> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RedhelmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: MessagesResponse = response.json().await?;
        extract_text(body)
    }
}

#[async_trait]
impl ChatModel for AnthropicClient {
    fn name(&self) -> String {
        format!("anthropic/{}", self.model)
    }

    async fn complete(&self, messages: &[ChatMessage]) -> RedhelmResult<String> {
        let request = build_request(&self.model, messages);
        self.retry
            .run(|attempt| {
                debug!(model = %self.model, attempt, "Calling Anthropic API");
                self.send_once(&request)
            })
            .await
    }
}

fn build_request(model: &str, messages: &[ChatMessage]) -> MessagesRequest {
    let (system, turns) = split_system(messages);

    MessagesRequest {
        model: model.to_string(),
        max_tokens: MAX_TOKENS,
        temperature: 0.0,
        system,
        messages: turns
            .into_iter()
            .map(|m| Message {
                role: match m.role {
                    Role::Assistant => "assistant",
                    _ => "user",
                },
                content: m.content.clone(),
            })
            .collect(),
    }
}

/// Concatenate all text blocks of the response.
fn extract_text(response: MessagesResponse) -> RedhelmResult<String> {
    let text: String = response
        .content
        .into_iter()
        .filter(|c| c.content_type == "text")
        .filter_map(|c| c.text)
        .collect();

    if text.trim().is_empty() {
        return Err(RedhelmError::EmptyResponse);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_request_shape() {
        let messages = vec![ChatMessage::system("persona"), ChatMessage::user("scan example.com")];
        let body = serde_json::to_value(build_request("claude-test", &messages)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "claude-test",
                "max_tokens": 8192,
                "temperature": 0.0,
                "system": "persona",
                "messages": [{ "role": "user", "content": "scan example.com" }]
            })
        );
    }

    #[test]
    fn test_extract_text_skips_non_text_blocks() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "content": [
                { "type": "thinking", "thinking": "..." },
                { "type": "text", "text": "{\"title\":\"x\"}" }
            ],
            "stop_reason": "end_turn"
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "{\"title\":\"x\"}");
    }

    #[test]
    fn test_extract_text_empty() {
        let response: MessagesResponse = serde_json::from_value(json!({ "content": [] })).unwrap();
        assert!(matches!(extract_text(response), Err(RedhelmError::EmptyResponse)));
    }

    #[test]
    fn test_endpoint_and_name() {
        let config = Config::for_tests(crate::llm::Provider::Anthropic);
        let client = AnthropicClient::new(&config);
        assert_eq!(client.endpoint(), "http://localhost:9/v1/messages");
        assert_eq!(client.name(), "anthropic/claude-sonnet-4-20250514");
    }
}
