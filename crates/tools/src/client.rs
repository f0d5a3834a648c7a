//! HTTP client for the tool execution service.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use stepwise_core::error::ToolError;
use stepwise_core::provider::ToolDefinition;
use stepwise_core::tool::ToolService;
use tracing::{debug, warn};

use crate::envelope::{ExecuteEnvelope, classify_envelope};

/// Talks to the tool service over HTTP.
///
/// Holds only a pooled `reqwest::Client`, so one instance is shared by
/// every concurrent run.
pub struct ToolServiceClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl ToolServiceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Build from the `[tool_service]` config section.
    pub fn from_config(config: &stepwise_config::ToolServiceConfig) -> Self {
        Self::new(&config.url).with_timeout(Duration::from_secs(config.timeout_secs))
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn send_error(&self, tool_name: &str, e: reqwest::Error) -> ToolError {
        if e.is_timeout() {
            ToolError::Timeout {
                tool_name: tool_name.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else if e.is_connect() {
            ToolError::Unavailable(format!("{}: {e}", self.base_url))
        } else {
            ToolError::ExecutionFailed {
                tool_name: tool_name.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl ToolService for ToolServiceClient {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ToolError> {
        let url = format!("{}/tools", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ToolError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Unavailable(format!(
                "catalog request returned {status}"
            )));
        }

        response
            .json::<Vec<ToolDefinition>>()
            .await
            .map_err(|e| ToolError::InvalidResponse(e.to_string()))
    }

    async fn execute(&self, tool_name: &str, arguments: &Value) -> Result<Value, ToolError> {
        let url = format!("{}/execute", self.base_url);
        let body = serde_json::json!({
            "tool": tool_name,
            "arguments": arguments,
        });

        debug!(tool = tool_name, "Executing tool");

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.send_error(tool_name, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ToolError::ExecutionFailed {
                tool_name: tool_name.to_string(),
                reason: format!("HTTP {}: {error_body}", status.as_u16()),
            });
        }

        let envelope: ExecuteEnvelope = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.send_error(tool_name, e)
            } else {
                ToolError::InvalidResponse(e.to_string())
            }
        })?;

        classify_envelope(tool_name, envelope)
    }
}

/// Fetch the catalog, degrading any failure to an empty list.
pub async fn fetch_catalog_or_empty(service: &dyn ToolService) -> Vec<ToolDefinition> {
    match service.list_tools().await {
        Ok(tools) => {
            debug!(count = tools.len(), "Fetched tool catalog");
            tools
        }
        Err(e) => {
            warn!(error = %e, "Tool catalog unavailable, continuing without tools");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, routing::get, routing::post};
    use serde_json::json;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn tool_service() -> Router {
        Router::new()
            .route(
                "/tools",
                get(|| async {
                    Json(json!([
                        {
                            "name": "search_files",
                            "description": "Search local files",
                            "parameters": {"type": "object", "properties": {"query": {"type": "string"}}}
                        },
                        {"name": "send_email", "description": "Send an email", "parameters": {}}
                    ]))
                }),
            )
            .route(
                "/execute",
                post(|Json(call): Json<Value>| async move {
                    let tool = call["tool"].as_str().unwrap_or_default().to_string();
                    match tool.as_str() {
                        "search_files" => Json(json!({
                            "result": {"files": [], "query": call["arguments"]["query"]},
                            "error": null
                        })),
                        "send_email" => Json(json!({
                            "result": {"setupRequired": true, "message": "Connect Gmail first"},
                            "error": "Gmail not connected"
                        })),
                        "slow" => {
                            tokio::time::sleep(Duration::from_secs(5)).await;
                            Json(json!({"result": {}}))
                        }
                        _ => Json(json!({"result": null, "error": format!("Unknown tool: {tool}")})),
                    }
                }),
            )
    }

    #[test]
    fn from_config_uses_url_and_timeout() {
        let config = stepwise_config::ToolServiceConfig {
            url: "http://tools.local:9000/".into(),
            timeout_secs: 12,
        };
        let client = ToolServiceClient::from_config(&config);
        assert_eq!(client.base_url(), "http://tools.local:9000");
        assert_eq!(client.timeout, Duration::from_secs(12));
    }

    #[tokio::test]
    async fn lists_catalog() {
        let base = spawn(tool_service()).await;
        let client = ToolServiceClient::new(base);
        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "search_files");
        assert_eq!(tools[1].description, "Send an email");
    }

    #[tokio::test]
    async fn execute_success_returns_result() {
        let base = spawn(tool_service()).await;
        let client = ToolServiceClient::new(base);
        let result = client
            .execute("search_files", &json!({"query": "*.pdf"}))
            .await
            .unwrap();
        assert_eq!(result["files"], json!([]));
        assert_eq!(result["query"], "*.pdf");
    }

    #[tokio::test]
    async fn execute_setup_required_is_ok() {
        let base = spawn(tool_service()).await;
        let client = ToolServiceClient::new(base);
        let result = client.execute("send_email", &json!({})).await.unwrap();
        assert_eq!(result["setupRequired"], true);
    }

    #[tokio::test]
    async fn execute_error_envelope_is_hard_failure() {
        let base = spawn(tool_service()).await;
        let client = ToolServiceClient::new(base);
        let err = client.execute("nope", &json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
        assert!(err.to_string().contains("Unknown tool: nope"));
    }

    #[tokio::test]
    async fn execute_non_2xx_is_hard_failure() {
        let app = Router::new().route(
            "/execute",
            post(|| async { (axum::http::StatusCode::BAD_GATEWAY, "upstream gone") }),
        );
        let base = spawn(app).await;
        let client = ToolServiceClient::new(base);
        let err = client.execute("search_files", &json!({})).await.unwrap_err();
        match err {
            ToolError::ExecutionFailed { reason, .. } => {
                assert!(reason.contains("502"));
                assert!(reason.contains("upstream gone"));
            }
            other => panic!("expected ExecutionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn execute_times_out() {
        let base = spawn(tool_service()).await;
        let client = ToolServiceClient::new(base).with_timeout(Duration::from_millis(100));
        let err = client.execute("slow", &json!({})).await.unwrap_err();
        match err {
            ToolError::Timeout { tool_name, .. } => assert_eq!(tool_name, "slow"),
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable() {
        let client = ToolServiceClient::new("http://127.0.0.1:1");
        let err = client.execute("search_files", &json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Unavailable(_)));
    }

    #[tokio::test]
    async fn catalog_failure_degrades_to_empty() {
        let client = ToolServiceClient::new("http://127.0.0.1:1");
        let tools = fetch_catalog_or_empty(&client).await;
        assert!(tools.is_empty());
    }
}
