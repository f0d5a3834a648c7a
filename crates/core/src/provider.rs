//! Provider trait — the abstraction over model backends.
//!
//! A Provider takes the whole transcript and returns the model's raw text
//! for one turn. Tool calls are *not* native here: the model writes them as
//! JSON in its text and the agent crate extracts them.
//!
//! Implementations: Anthropic (cloud), OpenAI-compatible local engines.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;

/// Sampling parameters for one completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// The backend-native model name (routing prefix already stripped)
    pub model: String,

    /// Temperature (0.0 = deterministic, 2.0 = very creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Stop sequences
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    512
}
fn default_top_p() -> f32 {
    0.9
}

impl CompletionConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            stop: Vec::new(),
        }
    }
}

/// A tool the model may call, as advertised by the tool service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    #[serde(default)]
    pub description: String,

    /// JSON Schema describing the tool's parameters
    #[serde(default)]
    pub parameters: serde_json::Value,
}

/// The core Provider trait.
///
/// The reasoning loop calls `complete()` once per iteration without knowing
/// which backend is behind it. Implementations must be safe to share across
/// concurrent runs.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "anthropic", "vllm").
    fn name(&self) -> &str;

    /// Send the transcript and get the model's text back.
    ///
    /// A well-formed response without text yields `Ok(String::new())`.
    async fn complete(
        &self,
        messages: &[Message],
        config: &CompletionConfig,
        tools: &[ToolDefinition],
    ) -> std::result::Result<String, ProviderError>;
}
