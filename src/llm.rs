//! Chat-completion API client.
//!
//! [`CompletionClient`] is the seam the orchestrator talks to. The production
//! implementation, [`OpenAiClient`], posts to an OpenAI-compatible
//! `/chat/completions` endpoint with a blocking `ureq` request bounded by the
//! request timeout.

use crate::models::Turn;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// User-Agent header sent with every request
const USER_AGENT: &str = concat!("parley/", env!("CARGO_PKG_VERSION"));

/// Errors from a completion call. The orchestrator treats all of them alike.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Key rejected (401/403)
    #[error("API rejected the credentials (HTTP {0})")]
    Unauthorized(u16),

    /// Any other non-success status
    #[error("HTTP {0}: {1}")]
    Status(u16, String),

    /// Network failure, including timeouts
    #[error("request failed: {0}")]
    Network(String),

    /// Response body was not the expected shape
    #[error("failed to parse API response: {0}")]
    Parse(String),
}

/// One completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    /// Ordered messages, system instruction first
    pub messages: Vec<Turn>,
    pub timeout: Duration,
}

/// Anything that can turn a request into response text.
pub trait CompletionClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, TransportError>;
}

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: &'a [Turn],
}

/// Response from `/chat/completions` (only fields we care about).
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice; a null content is empty text.
    fn into_text(self) -> Result<String, TransportError> {
        self.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| TransportError::Parse("response has no choices".to_string()))
    }
}

/// Client for OpenAI-compatible chat-completion APIs.
pub struct OpenAiClient {
    api_key: String,
    api_base: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: api_base.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

impl CompletionClient for OpenAiClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, TransportError> {
        let body = serde_json::to_value(ChatRequestBody {
            model: &request.model,
            messages: &request.messages,
        })
        .map_err(|e| TransportError::Parse(e.to_string()))?;

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "calling completion API"
        );

        let response = ureq::post(&self.endpoint())
            .timeout(request.timeout)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .set("User-Agent", USER_AGENT)
            .send_json(body);

        match response {
            Ok(resp) => {
                let parsed: ChatResponse = resp
                    .into_json()
                    .map_err(|e| TransportError::Parse(e.to_string()))?;
                parsed.into_text()
            }
            Err(ureq::Error::Status(code @ (401 | 403), _)) => {
                Err(TransportError::Unauthorized(code))
            }
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err(TransportError::Status(code, body))
            }
            Err(e) => Err(TransportError::Network(e.to_string())),
        }
    }
}
