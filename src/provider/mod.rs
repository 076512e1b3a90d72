//! Summarization service seam.
//!
//! One backend talks to the OpenAI Chat Completions API; the trait keeps
//! the pipeline testable against a canned backend.

pub mod openai;

use async_trait::async_trait;
use serde_json::Value;

/// Model identifier used when neither the CLI nor the config supplies one.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Environment variable holding the service credential.
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

/// Validated summarization result: a one-sentence error description and an
/// ordered list of fix suggestions (possibly empty).
///
/// The client only produces this type through [`ErrorSummary::from_value`];
/// a response that does not validate is a [`SummarizeError::Validation`],
/// not a summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSummary {
    pub error: String,
    pub fix: Vec<String>,
}

impl ErrorSummary {
    /// Validate a parsed JSON value against the summary shape, collecting a
    /// structural diff for everything that does not match.
    pub fn from_value(value: &Value) -> Result<Self, SummarizeError> {
        let Some(object) = value.as_object() else {
            return Err(SummarizeError::Validation {
                diff: format!("expected a JSON object, found {}", json_kind(value)),
            });
        };

        let mut diffs = Vec::new();

        let error = match object.get("error") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::String(_)) => {
                diffs.push("`error` must be a non-empty sentence".to_string());
                String::new()
            }
            Some(other) => {
                diffs.push(format!("`error`: expected string, found {}", json_kind(other)));
                String::new()
            }
            None => {
                diffs.push("missing field `error`".to_string());
                String::new()
            }
        };

        let mut fix = Vec::new();
        match object.get("fix") {
            Some(Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    match item {
                        Value::String(s) if !s.trim().is_empty() => fix.push(s.clone()),
                        Value::String(_) => diffs.push(format!("`fix[{i}]` is empty")),
                        other => diffs.push(format!(
                            "`fix[{i}]`: expected string, found {}",
                            json_kind(other)
                        )),
                    }
                }
            }
            Some(other) => diffs.push(format!(
                "`fix`: expected array of strings, found {}",
                json_kind(other)
            )),
            None => diffs.push("missing field `fix`".to_string()),
        }

        if diffs.is_empty() {
            Ok(Self { error, fix })
        } else {
            Err(SummarizeError::Validation {
                diff: diffs.join("; "),
            })
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Failure taxonomy for one summarization attempt. None of these are
/// retried; the reporter renders each kind and the pipeline stops.
#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    #[error("API key not configured. Set the {env_var} environment variable.")]
    MissingApiKey { env_var: &'static str },

    #[error("request to the summarization service failed: {message}")]
    Transport { message: String },

    #[error("model response was not valid JSON: {message}")]
    Parse { message: String },

    #[error("model response has the wrong shape: {diff}")]
    Validation { diff: String },
}

/// Read the service credential from the environment.
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV_VAR).ok().filter(|s| !s.is_empty())
}

/// Backend that turns a prompt into a validated summary with a single
/// request. No retries happen at this layer.
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    /// Model identifier sent with requests.
    fn model_name(&self) -> &str;

    async fn summarize(&self, prompt: &str) -> Result<ErrorSummary, SummarizeError>;
}
