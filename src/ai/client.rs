//! Chat-completions client for OpenAI-compatible endpoints

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AiConfig;

/// Failure talking to the model endpoint, classified so callers can react
/// differently to each kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Model endpoint unreachable: {0}")]
    Transport(String),

    #[error("Model endpoint rejected credentials: {0}")]
    Auth(String),

    #[error("Model endpoint rate limit hit: {0}")]
    RateLimit(String),
}

impl GatewayError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, GatewayError::RateLimit(_))
    }
}

/// One prompt for the model. `context` travels as the system message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub context: Option<String>,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            context: None,
            max_tokens,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// A single round trip to a language model, with no retries
pub trait ChatTransport {
    fn send(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<String, GatewayError>> + Send;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for `POST /chat/completions`
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl OpenAiClient {
    /// Credential and endpoint are passed in explicitly so tests and
    /// alternative providers can substitute their own.
    pub fn new(config: &AiConfig, api_key: Option<String>, endpoint: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: endpoint.unwrap_or_else(|| config.endpoint.clone()),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(context) = request.context.as_deref() {
            messages.push(Message {
                role: "system",
                content: context,
            });
        }
        messages.push(Message {
            role: "user",
            content: &request.prompt,
        });

        ChatRequest {
            model: &self.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// Map a non-success HTTP status to its error class
pub fn classify_status(status: StatusCode, body: &str) -> GatewayError {
    let detail = if body.trim().is_empty() {
        status.to_string()
    } else {
        format!("{} {}", status, body.trim())
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimit(detail),
        _ => GatewayError::Transport(detail),
    }
}

fn first_choice(response: ChatResponse) -> Result<String, GatewayError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| GatewayError::Transport("No response content from model".to_string()))
}

impl ChatTransport for OpenAiClient {
    async fn send(&self, request: &CompletionRequest) -> Result<String, GatewayError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GatewayError::Auth("no API key configured".to_string()));
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&self.build_body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Transport(format!("request timed out: {}", e))
                } else {
                    GatewayError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("Failed to parse model response: {}", e)))?;

        first_choice(chat_response)
    }
}
