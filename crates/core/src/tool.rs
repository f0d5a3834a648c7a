//! ToolService trait — the abstraction over the external tool executor.
//!
//! Tools run out of process. The loop only needs to know which tools exist
//! (to describe them to the model) and how to run one by name.

use async_trait::async_trait;

use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// The tool execution service.
///
/// `execute` returns the result payload for successes *and* for
/// setup-required soft failures; only hard failures are `Err`.
#[async_trait]
pub trait ToolService: Send + Sync {
    /// Fetch the tool catalog.
    async fn list_tools(&self) -> std::result::Result<Vec<ToolDefinition>, ToolError>;

    /// Execute a tool with the given arguments.
    async fn execute(
        &self,
        tool_name: &str,
        arguments: &serde_json::Value,
    ) -> std::result::Result<serde_json::Value, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A simple in-process service for exercising the trait object.
    struct EchoService;

    #[async_trait]
    impl ToolService for EchoService {
        async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError> {
            Ok(vec![ToolDefinition {
                name: "echo".into(),
                description: "Echoes back the input".into(),
                parameters: json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                }),
            }])
        }

        async fn execute(
            &self,
            tool_name: &str,
            arguments: &serde_json::Value,
        ) -> Result<serde_json::Value, ToolError> {
            match tool_name {
                "echo" => Ok(arguments.clone()),
                other => Err(ToolError::ExecutionFailed {
                    tool_name: other.into(),
                    reason: "unknown tool".into(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn service_usable_as_trait_object() {
        let service: Box<dyn ToolService> = Box::new(EchoService);
        let tools = service.list_tools().await.unwrap();
        assert_eq!(tools[0].name, "echo");

        let result = service.execute("echo", &json!({"text": "hi"})).await.unwrap();
        assert_eq!(result["text"], "hi");

        let err = service.execute("nope", &json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }
}
