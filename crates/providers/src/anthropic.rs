//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly (not OpenAI-compatible proxy).
//!
//! Features:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Tool results replayed as plain user turns, since tool calls travel as
//!   JSON inside the model's text rather than as native `tool_use` blocks

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stepwise_core::error::ProviderError;
use stepwise_core::message::{Message, Role};
use stepwise_core::provider::{CompletionConfig, ToolDefinition};
use tracing::{debug, warn};

use crate::http::{check_status, transport_error};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Split system content out of the transcript.
    /// Anthropic puts the system prompt in a top-level field, not in messages.
    fn extract_system(messages: &[Message]) -> (String, Vec<ApiMessage>) {
        let mut system_parts: Vec<&str> = Vec::new();
        let mut turns = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(&msg.content),
                Role::User => turns.push(ApiMessage::new("user", msg.content.clone())),
                Role::Assistant => {
                    turns.push(ApiMessage::new("assistant", msg.content.clone()));
                }
                Role::Tool => turns.push(ApiMessage::new("user", tool_turn_text(msg))),
            }
        }

        let system = if system_parts.is_empty() {
            DEFAULT_SYSTEM_PROMPT.to_string()
        } else {
            system_parts.join("\n\n")
        };

        (system, turns)
    }

    /// Join the text blocks of a response; other block types are ignored.
    fn response_text(resp: AnthropicResponse) -> String {
        let text: Vec<String> = resp
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text),
                ResponseContentBlock::Other => None,
            })
            .collect();

        if text.is_empty() {
            warn!(stop_reason = ?resp.stop_reason, "Anthropic response had no text content");
        }
        text.join("\n")
    }
}

/// How a tool message is shown to a backend that only understands
/// user/assistant turns.
pub(crate) fn tool_turn_text(msg: &Message) -> String {
    format!(
        "Tool '{}' returned:\n{}",
        msg.name.as_deref().unwrap_or_default(),
        msg.content
    )
}

#[async_trait]
impl stepwise_core::Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        messages: &[Message],
        config: &CompletionConfig,
        tools: &[ToolDefinition],
    ) -> std::result::Result<String, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let (system, api_messages) = Self::extract_system(messages);

        let mut body = serde_json::json!({
            "model": config.model,
            "system": system,
            "messages": api_messages,
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
        });

        if !config.stop.is_empty() {
            body["stop_sequences"] = serde_json::json!(config.stop);
        }

        debug!(
            provider = "anthropic",
            model = %config.model,
            messages = messages.len(),
            tools = tools.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let response = check_status(&self.name, response).await?;

        let api_resp: AnthropicResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                transport_error(e, self.timeout)
            } else {
                ProviderError::InvalidResponse(format!("Failed to parse Anthropic response: {e}"))
            }
        })?;

        Ok(Self::response_text(api_resp))
    }
}

// --- Anthropic API types ---

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
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ResponseContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}
