//! OpenAI-compatible provider implementation.
//!
//! Serves the local engines: vLLM and Ollama both expose an
//! OpenAI-compatible `/chat/completions` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stepwise_core::error::ProviderError;
use stepwise_core::message::{Message, Role};
use stepwise_core::provider::{CompletionConfig, ToolDefinition};
use tracing::debug;

use crate::anthropic::tool_turn_text;
use crate::http::{check_status, transport_error};

/// An OpenAI-compatible chat completions backend.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create a vLLM provider (convenience constructor).
    pub fn vllm(base_url: Option<&str>) -> Self {
        Self::new("vllm", base_url.unwrap_or("http://localhost:8002/v1"))
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new("ollama", base_url.unwrap_or("http://localhost:11434/v1"))
    }

    /// Send a bearer token with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| match m.role {
                Role::System => ApiMessage::new("system", m.content.clone()),
                Role::User => ApiMessage::new("user", m.content.clone()),
                Role::Assistant => ApiMessage::new("assistant", m.content.clone()),
                Role::Tool => ApiMessage::new("user", tool_turn_text(m)),
            })
            .collect()
    }
}

#[async_trait]
impl stepwise_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        messages: &[Message],
        config: &CompletionConfig,
        tools: &[ToolDefinition],
    ) -> std::result::Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": config.model,
            "messages": Self::to_api_messages(messages),
            "temperature": config.temperature,
            "max_tokens": config.max_tokens,
            "top_p": config.top_p,
            "stream": false,
        });

        if !config.stop.is_empty() {
            body["stop"] = serde_json::json!(config.stop);
        }

        debug!(
            provider = %self.name,
            model = %config.model,
            messages = messages.len(),
            tools = tools.len(),
            "Sending completion request"
        );

        let mut request = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(ref key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let response = check_status(&self.name, response).await?;

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                transport_error(e, self.timeout)
            } else {
                ProviderError::InvalidResponse(format!("Failed to parse response: {e}"))
            }
        })?;

        Ok(api_response.into_text())
    }
}

// --- OpenAI API types ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

impl ApiMessage {
    fn new(role: &str, content: String) -> Self {
        Self {
            role: role.into(),
            content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

impl ApiResponse {
    /// First choice's text; a response without one is an empty answer.
    fn into_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    #[serde(default)]
    message: Option<ApiResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
