//! Client for the text-generation API. Every completion call goes through here.
//!
//! The session controller only sees the `CompletionService` trait. The default
//! backend speaks the OpenAI chat-completions wire format.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
#[cfg(test)]
pub mod scripted;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const TEMPERATURE: f32 = 0.2;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Completion returned empty content")]
    EmptyContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// One request: the system instruction (with the record snapshot already
/// rendered into it) followed by the transcript, oldest first.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Returns the raw model text for one turn.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<&'a ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Chat-completions client with retry on 429 and 5xx.
#[derive(Clone)]
pub struct OpenAiCompletionClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompletionClient {
    pub fn new(api_url: String, api_key: String, model: String) -> Result<Self, CompletionError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()?,
            api_url,
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let system = ChatMessage {
            role: ChatRole::System,
            content: request.system.clone(),
        };
        let body = ChatCompletionBody {
            model: &self.model,
            temperature: TEMPERATURE,
            messages: std::iter::once(&system)
                .chain(request.messages.iter())
                .collect(),
        };

        let mut last_error: Option<CompletionError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                warn!(
                    "Completion attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(CompletionError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                match classify_failure(status, text, attempt) {
                    FailureAction::Retry(e) => {
                        warn!("Completion API returned {status}: {e}");
                        last_error = Some(e);
                        continue;
                    }
                    FailureAction::Abort(e) => return Err(e),
                }
            }

            let parsed: ChatCompletionResponse = response.json().await?;
            if let Some(usage) = &parsed.usage {
                debug!(
                    "Completion succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            return first_text(parsed);
        }

        Err(last_error.unwrap_or(CompletionError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[derive(Debug)]
enum FailureAction {
    Retry(CompletionError),
    Abort(CompletionError),
}

/// Decides what a non-success response means. 429 and 5xx are retried;
/// anything else is returned with the API's own error message when present.
fn classify_failure(status: StatusCode, body: String, attempt: u32) -> FailureAction {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return FailureAction::Retry(CompletionError::RateLimited {
            retries: attempt + 1,
        });
    }
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    let error = CompletionError::Api {
        status: status.as_u16(),
        message,
    };
    if status.is_server_error() {
        FailureAction::Retry(error)
    } else {
        FailureAction::Abort(error)
    }
}

// 1s, 2s, 4s, ...
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(1000 * (1u64 << attempt.saturating_sub(1)))
}

fn first_text(response: ChatCompletionResponse) -> Result<String, CompletionError> {
    response
        .choices
        .into_iter()
        .filter_map(|c| c.message.content)
        .find(|text| !text.trim().is_empty())
        .ok_or(CompletionError::EmptyContent)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub(crate) fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
