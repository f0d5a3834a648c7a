//! Provider router — selects the model backend for a run.
//!
//! The model identifier decides the backend once, before the loop starts:
//! `vllm/…` or anything mentioning `localhost` goes to vLLM, `ollama/…` to
//! Ollama, and everything else (optionally `anthropic/…`) to Anthropic.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use stepwise_core::error::ProviderError;
use stepwise_core::provider::Provider;
use tracing::{debug, warn};

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// The closed set of backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Anthropic,
    Vllm,
    Ollama,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Vllm => "vllm",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model identifier split into backend and backend-native model name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub kind: BackendKind,
    pub model: String,
}

/// Decide which backend serves `model`.
pub fn resolve_backend(model: &str) -> ResolvedModel {
    if let Some(rest) = model.strip_prefix("vllm/") {
        return ResolvedModel {
            kind: BackendKind::Vllm,
            model: rest.to_string(),
        };
    }
    if model.contains("localhost") {
        return ResolvedModel {
            kind: BackendKind::Vllm,
            model: model.to_string(),
        };
    }
    if let Some(rest) = model.strip_prefix("ollama/") {
        return ResolvedModel {
            kind: BackendKind::Ollama,
            model: rest.to_string(),
        };
    }
    ResolvedModel {
        kind: BackendKind::Anthropic,
        model: model.strip_prefix("anthropic/").unwrap_or(model).to_string(),
    }
}

/// Routes runs to the correct backend.
#[derive(Default)]
pub struct ProviderRouter {
    providers: HashMap<BackendKind, Arc<dyn Provider>>,
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend.
    pub fn register(&mut self, kind: BackendKind, provider: Arc<dyn Provider>) {
        self.providers.insert(kind, provider);
    }

    /// Get a specific backend.
    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn Provider>> {
        self.providers.get(&kind).cloned()
    }

    /// Resolve a model identifier to a backend handle and the model name
    /// that backend expects.
    pub fn resolve(&self, model: &str) -> Result<(Arc<dyn Provider>, String), ProviderError> {
        let resolved = resolve_backend(model);
        let provider = self.get(resolved.kind).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "no {} backend configured for model '{model}'",
                resolved.kind
            ))
        })?;
        debug!(backend = %resolved.kind, model = %resolved.model, "Resolved backend");
        Ok((provider, resolved.model))
    }

    /// List registered backend kinds.
    pub fn list(&self) -> Vec<BackendKind> {
        self.providers.keys().copied().collect()
    }
}

/// Build backends from configuration.
///
/// The local engines need no credentials and are always registered;
/// Anthropic only when an API key is available.
pub fn build_from_config(config: &stepwise_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new();
    let timeout = Duration::from_secs(config.providers.timeout_secs);

    match config.api_key {
        Some(ref api_key) => {
            let anthropic = AnthropicProvider::new(api_key)
                .with_base_url(&config.providers.anthropic_api_url)
                .with_timeout(timeout);
            router.register(BackendKind::Anthropic, Arc::new(anthropic));
        }
        None => warn!("No Anthropic API key configured, cloud models are unavailable"),
    }

    let local = |provider: OpenAiCompatProvider| {
        let provider = provider.with_timeout(timeout);
        match config.providers.local_api_key {
            Some(ref key) => provider.with_api_key(key),
            None => provider,
        }
    };
    let vllm = local(OpenAiCompatProvider::vllm(Some(&config.providers.vllm_url)));
    router.register(BackendKind::Vllm, Arc::new(vllm));

    let ollama = local(OpenAiCompatProvider::ollama(Some(&config.providers.ollama_url)));
    router.register(BackendKind::Ollama, Arc::new(ollama));

    router
}
