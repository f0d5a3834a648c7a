//! Shared test doubles for the loop tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};
use stepwise_core::error::{ProviderError, ToolError};
use stepwise_core::message::Message;
use stepwise_core::provider::{CompletionConfig, Provider, ToolDefinition};
use stepwise_core::tool::ToolService;

/// A mock provider that returns a sequence of scripted replies.
///
/// Panics if more calls are made than replies provided.
pub struct ScriptedProvider {
    responses: Mutex<Vec<Result<String, ProviderError>>>,
    seen: Mutex<Vec<usize>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Transcript length handed to each call.
    pub fn seen_lengths(&self) -> Vec<usize> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(
        &self,
        messages: &[Message],
        _config: &CompletionConfig,
        _tools: &[ToolDefinition],
    ) -> Result<String, ProviderError> {
        let mut seen = self.seen.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let index = seen.len();
        if index >= responses.len() {
            panic!(
                "ScriptedProvider: no more responses (call #{index}, have {})",
                responses.len()
            );
        }
        seen.push(messages.len());
        responses[index].clone()
    }
}

/// A tool service with canned results per tool name.
#[derive(Default)]
pub struct MockToolService {
    catalog: Vec<ToolDefinition>,
    results: HashMap<String, Result<Value, ToolError>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockToolService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(mut self, tool: &str, result: Result<Value, ToolError>) -> Self {
        self.results.insert(tool.to_string(), result);
        self
    }

    pub fn with_catalog(mut self, names: Vec<&str>) -> Self {
        self.catalog = names
            .into_iter()
            .map(|name| ToolDefinition {
                name: name.into(),
                description: format!("The {name} tool"),
                parameters: json!({"type": "object"}),
            })
            .collect();
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolService for MockToolService {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError> {
        Ok(self.catalog.clone())
    }

    async fn execute(&self, tool_name: &str, arguments: &Value) -> Result<Value, ToolError> {
        self.calls
            .lock()
            .unwrap()
            .push((tool_name.to_string(), arguments.clone()));
        self.results
            .get(tool_name)
            .cloned()
            .unwrap_or_else(|| {
                Err(ToolError::ExecutionFailed {
                    tool_name: tool_name.into(),
                    reason: format!("Unknown tool: {tool_name}"),
                })
            })
    }
}
