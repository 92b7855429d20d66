//! Google Gemini client (`generateContent` REST API).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{split_system, ChatMessage, ChatModel, RetryPolicy, Role};
use crate::config::Config;
use crate::error::{RedhelmError, RedhelmResult};

/// Default Gemini API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryPolicy,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GeminiClient {
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
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    async fn send_once(&self, request: &GenerateContentRequest) -> RedhelmResult<String> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
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

        let body: GenerateContentResponse = response.json().await?;
        extract_text(body)
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    fn name(&self) -> String {
        format!("gemini/{}", self.model)
    }

    async fn complete(&self, messages: &[ChatMessage]) -> RedhelmResult<String> {
        let request = build_request(messages);
        self.retry
            .run(|attempt| {
                debug!(model = %self.model, attempt, "Calling Gemini API");
                self.send_once(&request)
            })
            .await
    }
}

fn build_request(messages: &[ChatMessage]) -> GenerateContentRequest {
    let (system, turns) = split_system(messages);

    let contents = turns
        .into_iter()
        .map(|m| Content {
            role: Some(match m.role {
                Role::Assistant => "model".to_string(),
                _ => "user".to_string(),
            }),
            parts: vec![Part {
                text: Some(m.content.clone()),
            }],
        })
        .collect();

    GenerateContentRequest {
        system_instruction: system.map(|text| Content {
            role: None,
            parts: vec![Part { text: Some(text) }],
        }),
        contents,
        generation_config: GenerationConfig { temperature: 0.0 },
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> RedhelmResult<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(RedhelmError::EmptyResponse);
    }
    Ok(text)
}
