//! Configuration loading, validation, and management for Stepwise.
//!
//! Loads configuration from `~/.stepwise/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use stepwise_core::provider::CompletionConfig;

/// The root configuration structure.
///
/// Maps directly to `~/.stepwise/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Anthropic API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model used when a run request names none
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Reasoning loop settings
    #[serde(default)]
    pub agent: AgentSettings,

    /// Model backend endpoints
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Tool execution service
    #[serde(default)]
    pub tool_service: ToolServiceConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_model() -> String {
    "claude-sonnet-4-5".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_model", &self.default_model)
            .field("agent", &self.agent)
            .field("providers", &self.providers)
            .field("tool_service", &self.tool_service)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Upper bound on model calls per run (1–20)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,

    /// Replace the generated system prompt entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,

    /// Log every iteration at info level
    #[serde(default)]
    pub verbose: bool,
}

fn default_max_iterations() -> u32 {
    5
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

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            stop: vec![],
            system_prompt_override: None,
            verbose: false,
        }
    }
}

impl AgentSettings {
    /// Completion parameters for a run against `model`.
    pub fn completion_for(&self, model: impl Into<String>) -> CompletionConfig {
        CompletionConfig {
            model: model.into(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            stop: self.stop.clone(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_anthropic_url")]
    pub anthropic_api_url: String,

    /// OpenAI-compatible endpoint of the local vLLM server
    #[serde(default = "default_vllm_url")]
    pub vllm_url: String,

    /// OpenAI-compatible endpoint of the local Ollama runtime
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Bearer token for the local engines, when they sit behind auth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_api_key: Option<String>,

    /// Per-call timeout for every backend
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ProvidersConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvidersConfig")
            .field("anthropic_api_url", &self.anthropic_api_url)
            .field("vllm_url", &self.vllm_url)
            .field("ollama_url", &self.ollama_url)
            .field("local_api_key", &redact(&self.local_api_key))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_anthropic_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_vllm_url() -> String {
    "http://localhost:8002/v1".into()
}
fn default_ollama_url() -> String {
    "http://localhost:11434/v1".into()
}
fn default_provider_timeout() -> u64 {
    60
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            anthropic_api_url: default_anthropic_url(),
            vllm_url: default_vllm_url(),
            ollama_url: default_ollama_url(),
            local_api_key: None,
            timeout_secs: default_provider_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolServiceConfig {
    #[serde(default = "default_tool_service_url")]
    pub url: String,

    /// Per-call timeout for `/execute` and `/tools`
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,
}

fn default_tool_service_url() -> String {
    "http://localhost:8001".into()
}
fn default_tool_timeout() -> u64 {
    30
}

impl Default for ToolServiceConfig {
    fn default() -> Self {
        Self {
            url: default_tool_service_url(),
            timeout_secs: default_tool_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.stepwise/config.toml).
    ///
    /// Environment overrides:
    /// - `STEPWISE_API_KEY`, then `ANTHROPIC_API_KEY` (when no key in file)
    /// - `STEPWISE_MODEL`
    /// - `STEPWISE_TOOL_SERVICE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("STEPWISE_API_KEY").or_else(|| lookup("ANTHROPIC_API_KEY"));
        }
        if self.providers.local_api_key.is_none() {
            self.providers.local_api_key = lookup("STEPWISE_LOCAL_API_KEY");
        }
        if let Some(model) = lookup("STEPWISE_MODEL") {
            self.default_model = model;
        }
        if let Some(url) = lookup("STEPWISE_TOOL_SERVICE_URL") {
            self.tool_service.url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".stepwise")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_model must not be empty".into(),
            ));
        }

        let agent = &self.agent;
        if !(1..=20).contains(&agent.max_iterations) {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be between 1 and 20".into(),
            ));
        }
        if !(0.0..=2.0).contains(&agent.temperature) {
            return Err(ConfigError::ValidationError(
                "agent.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if agent.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tokens must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&agent.top_p) {
            return Err(ConfigError::ValidationError(
                "agent.top_p must be between 0.0 and 1.0".into(),
            ));
        }
        if self.providers.timeout_secs == 0 || self.tool_service.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be at least 1 second".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: default_model(),
            agent: AgentSettings::default(),
            providers: ProvidersConfig::default(),
            tool_service: ToolServiceConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
