//! OpenAI Chat Completions backend for log summarization.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{api_key_from_env, ErrorSummary, SummarizeError, SummaryProvider, API_KEY_ENV_VAR};

/// Chat Completions endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Summarization is classification work, not creative generation; keep
/// sampling near-deterministic.
const TEMPERATURE: f32 = 0.1;

pub struct OpenAiProvider {
    /// HTTP client
    client: Client,
    /// Credential; absence surfaces on the first request, not at startup
    api_key: Option<String>,
    /// Model to use
    model: String,
    /// Response token budget
    max_tokens: u32,
}

impl OpenAiProvider {
    pub fn new(api_key: Option<String>, model: String, max_tokens: u32) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            max_tokens,
        }
    }

    /// Build from the environment. A missing key is not an error here.
    pub fn from_env(model: String, max_tokens: u32) -> Self {
        Self::new(api_key_from_env(), model, max_tokens)
    }

    fn build_request(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: TEMPERATURE,
            max_tokens: Some(self.max_tokens),
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

#[async_trait]
impl SummaryProvider for OpenAiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn summarize(&self, prompt: &str) -> Result<ErrorSummary, SummarizeError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(SummarizeError::MissingApiKey {
                env_var: API_KEY_ENV_VAR,
            });
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|err| SummarizeError::Transport {
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if status.as_u16() == 429 {
                "rate limited by the service".to_string()
            } else {
                format!("HTTP {status}: {body}")
            };
            return Err(SummarizeError::Transport { message });
        }

        let body: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|err| SummarizeError::Transport {
                    message: format!("unexpected response body: {err}"),
                })?;

        let content = body
            .choices
            .into_iter()
            .filter_map(|choice| choice.message.map(|m| m.content))
            .collect::<Vec<_>>()
            .join("");

        parse_summary(&content)
    }
}

/// Parse the model's message content as JSON and validate the shape.
pub fn parse_summary(content: &str) -> Result<ErrorSummary, SummarizeError> {
    let value: serde_json::Value =
        serde_json::from_str(content.trim()).map_err(|err| SummarizeError::Parse {
            message: err.to_string(),
        })?;
    ErrorSummary::from_value(&value)
}

// API types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChatMessage>,
}
