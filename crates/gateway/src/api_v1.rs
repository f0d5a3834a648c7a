//! HTTP API v1.
//!
//! Endpoints:
//!
//! - `POST /v1/agent/chat` — Run the loop for one user message, streamed as
//!   SSE (`stream: true`, the default) or collected into one JSON body
//! - `GET  /v1/tools`      — Tool catalog proxied from the tool service

use axum::{
    Router,
    extract::State,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::sse::{Event as SseEvent, Sse},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use stepwise_agent::{
    AgentConfig, AgentOrchestrator, AgentStep, RunInput, StreamFrame, Termination,
};
use stepwise_core::message::{Message, Transcript};
use stepwise_core::provider::ToolDefinition;
use stepwise_tools::fetch_catalog_or_empty;

use crate::SharedState;

/// Build the v1 API router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/agent/chat", post(chat_handler))
        .route("/tools", get(list_tools_handler))
        .with_state(state)
}

// ── Types ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, alias = "conversationHistory")]
    pub conversation_history: Vec<Message>,
    /// Falls back to `default_model` from config
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(default, alias = "maxIterations")]
    pub max_iterations: Option<u32>,
}

fn default_stream() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub steps: Vec<AgentStep>,
    pub history: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub iterations: u32,
    pub termination: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolDefinition>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(error: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

// ── Chat ──────────────────────────────────────────────────────────────────

/// `POST /v1/agent/chat` — run the reasoning loop for one message.
///
/// Everything that can be rejected is rejected here with a 400, before
/// the first model call. Once the loop starts, failures arrive as `error`
/// steps.
async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(|e| bad_request(e.body_text()))?;

    if payload.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }

    let model = payload
        .model
        .unwrap_or_else(|| state.config.default_model.clone());
    if model.trim().is_empty() {
        return Err(bad_request("model must not be empty"));
    }

    let history = Transcript::from_history(payload.conversation_history)
        .map_err(|e| bad_request(e.to_string()))?;

    let (provider, backend_model) = state
        .providers
        .resolve(&model)
        .map_err(|e| bad_request(e.to_string()))?;

    let mut config = AgentConfig::from_settings(&state.config.agent, backend_model);
    if let Some(max) = payload.max_iterations {
        config = config.with_max_iterations(max);
    }
    config.validate().map_err(|e| bad_request(e.to_string()))?;

    info!(
        model = %model,
        stream = payload.stream,
        history = history.len(),
        "v1/agent/chat request"
    );

    let agent = AgentOrchestrator::new(provider, state.tools.clone(), config);
    let input = RunInput::new(payload.message).with_history(history);

    if payload.stream {
        Ok(stream_run(&agent, input).into_response())
    } else {
        Ok(Json(collect_run(&agent, input).await).into_response())
    }
}

/// Stream steps as they happen, then the `done` frame.
///
/// Dropping the response (client disconnect) drops the receiver, which
/// cancels the run before its next iteration.
fn stream_run(
    agent: &AgentOrchestrator,
    input: RunInput,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>> + use<>> {
    let (rx, _handle) = agent.run_stream(input);

    let stream = ReceiverStream::new(rx)
        .map(StreamFrame::Step)
        .chain(tokio_stream::once(StreamFrame::Done))
        .map(|frame| Ok(SseEvent::default().data(frame.to_json())));

    Sse::new(stream)
}

async fn collect_run(agent: &AgentOrchestrator, input: RunInput) -> ChatResponse {
    let (steps, outcome) = agent.run_collect(input).await;

    let answer = steps.iter().rev().find_map(|step| match step {
        AgentStep::Answer { content, .. } => Some(content.clone()),
        _ => None,
    });
    let error = match outcome.termination {
        Termination::ModelFailed | Termination::EmptyAnswer => {
            steps.iter().rev().find_map(|step| match step {
                AgentStep::Error { error, .. } => Some(error.clone()),
                _ => None,
            })
        }
        _ => None,
    };

    let termination = serde_json::to_value(outcome.termination)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default();

    ChatResponse {
        steps,
        history: outcome.history,
        answer,
        error,
        iterations: outcome.iterations,
        termination,
    }
}

// ── Tools ─────────────────────────────────────────────────────────────────

/// `GET /v1/tools` — catalog from the tool service, empty when unreachable.
async fn list_tools_handler(State(state): State<SharedState>) -> Json<ToolsResponse> {
    let tools = fetch_catalog_or_empty(state.tools.as_ref()).await;
    if tools.is_empty() {
        warn!("Tool catalog is empty");
    }
    let count = tools.len();
    Json(ToolsResponse { tools, count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use crate::test_support;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use stepwise_agent::decode_stream;
    use tower::ServiceExt;

    fn chat_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/agent/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    const SEARCH_CALL: &str =
        r#"{"tool": "search_files", "args": {"query": "report"}, "reasoning": "find it"}"#;

    #[tokio::test]
    async fn streamed_chat_emits_steps_then_done() {
        let app = build_router(test_support::state(&[SEARCH_CALL, "Nothing found."], true));

        let response = app
            .oneshot(chat_request(json!({"message": "find my report"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/event-stream"));

        let frames = decode_stream(&body_string(response).await).unwrap();
        let types: Vec<_> = frames
            .iter()
            .map(|f| match f {
                StreamFrame::Step(step) => step.event_type(),
                StreamFrame::Done => "done",
            })
            .collect();
        assert_eq!(
            types,
            vec!["thinking", "tool_call", "tool_result", "thinking", "answer", "done"]
        );
    }

    #[tokio::test]
    async fn collected_chat_returns_history_and_answer() {
        let app = build_router(test_support::state(&["Hello there!"], true));

        let response = app
            .oneshot(chat_request(json!({
                "message": "hi",
                "stream": false,
                "conversationHistory": [
                    {"role": "user", "content": "earlier question"},
                    {"role": "assistant", "content": "earlier answer"}
                ]
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let chat: ChatResponse = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(chat.answer.as_deref(), Some("Hello there!"));
        assert!(chat.error.is_none());
        assert_eq!(chat.iterations, 1);
        assert_eq!(chat.termination, "answered");
        assert_eq!(chat.steps.len(), 2);
        // system + 2 prior + user + assistant
        assert_eq!(chat.history.len(), 5);
        assert_eq!(chat.history[3].content, "hi");
    }

    #[tokio::test]
    async fn collected_chat_reports_model_failure() {
        // Empty script: the first model call fails.
        let app = build_router(test_support::state(&[], true));

        let response = app
            .oneshot(chat_request(json!({"message": "hi", "stream": false})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let chat: ChatResponse = serde_json::from_str(&body_string(response).await).unwrap();
        assert!(chat.answer.is_none());
        assert!(chat.error.unwrap().starts_with("Model call failed:"));
        assert_eq!(chat.termination, "model_failed");
    }

    #[tokio::test]
    async fn tool_failure_does_not_end_the_run() {
        let app = build_router(test_support::state(&[SEARCH_CALL, "Sorry, tools are down."], false));

        let response = app
            .oneshot(chat_request(json!({"message": "find my report", "stream": false})))
            .await
            .unwrap();
        let chat: ChatResponse = serde_json::from_str(&body_string(response).await).unwrap();

        assert!(matches!(
            &chat.steps[2],
            AgentStep::Error { tool_name: Some(name), .. } if name == "search_files"
        ));
        assert_eq!(chat.answer.as_deref(), Some("Sorry, tools are down."));
    }

    #[tokio::test]
    async fn rejects_empty_message() {
        let app = build_router(test_support::state(&[], true));
        let response = app
            .oneshot(chat_request(json!({"message": "   "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("message must not be empty"));
    }

    #[tokio::test]
    async fn rejects_empty_model() {
        let app = build_router(test_support::state(&[], true));
        let response = app
            .oneshot(chat_request(json!({"message": "hi", "model": ""})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_unroutable_model() {
        // Only the Anthropic slot is registered in the test state.
        let app = build_router(test_support::state(&[], true));
        let response = app
            .oneshot(chat_request(json!({"message": "hi", "model": "ollama/llama3"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("ollama"));
    }

    #[tokio::test]
    async fn rejects_invalid_history_entry() {
        let app = build_router(test_support::state(&[], true));
        let response = app
            .oneshot(chat_request(json!({
                "message": "hi",
                "conversation_history": [{"role": "tool", "content": "orphan"}]
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_system_message_after_first_entry() {
        let app = build_router(test_support::state(&["unused"], true));
        let response = app
            .oneshot(chat_request(json!({
                "message": "hi",
                "conversation_history": [
                    {"role": "user", "content": "q"},
                    {"role": "system", "content": "late sys"}
                ]
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("position 1"));
    }

    #[tokio::test]
    async fn rejects_out_of_range_iterations() {
        let app = build_router(test_support::state(&[], true));
        let response = app
            .oneshot(chat_request(json!({"message": "hi", "maxIterations": 0})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_malformed_body() {
        let app = build_router(test_support::state(&[], true));
        let req = Request::builder()
            .method("POST")
            .uri("/v1/agent/chat")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn tools_endpoint_proxies_catalog() {
        let app = build_router(test_support::state(&[], true));
        let req = Request::builder()
            .uri("/v1/tools")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let tools: ToolsResponse = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(tools.count, 1);
        assert_eq!(tools.tools[0].name, "search_files");
    }

    #[tokio::test]
    async fn tools_endpoint_is_empty_when_service_is_down() {
        let app = build_router(test_support::state(&[], false));
        let req = Request::builder()
            .uri("/v1/tools")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let tools: ToolsResponse = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(tools.count, 0);
    }
}
