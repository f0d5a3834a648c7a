//! HTTP API gateway for Stepwise.
//!
//! Exposes the reasoning loop over HTTP: a health check and the v1 API
//! (`/v1/agent/chat` with SSE streaming, `/v1/tools`).
//!
//! Built on Axum for high performance async HTTP.

pub mod api_v1;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::HeaderValue,
    response::Json,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use stepwise_core::tool::ToolService;
use stepwise_providers::ProviderRouter;
use stepwise_tools::ToolServiceClient;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: stepwise_config::AppConfig,
    pub providers: ProviderRouter,
    pub tools: Arc<dyn ToolService>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(
        config: stepwise_config::AppConfig,
        providers: ProviderRouter,
        tools: Arc<dyn ToolService>,
    ) -> Self {
        Self {
            config,
            providers,
            tools,
            start_time: chrono::Utc::now(),
        }
    }

    /// Build backends and the tool client from configuration.
    pub fn from_config(config: stepwise_config::AppConfig) -> Self {
        let providers = stepwise_providers::build_from_config(&config);
        let tools = Arc::new(ToolServiceClient::from_config(&config.tool_service));
        Self::new(config, providers, tools)
    }
}

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - CORS for browser clients served from localhost
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            |origin: &HeaderValue, _parts: &axum::http::request::Parts| is_local_origin(origin),
        ))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn is_local_origin(origin: &HeaderValue) -> bool {
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    let host = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
        .unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    matches!(host, "localhost" | "127.0.0.1")
}

/// Start the gateway HTTP server.
pub async fn start(config: stepwise_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let tool_service_url = config.tool_service.url.clone();
    let default_model = config.default_model.clone();

    let state = Arc::new(GatewayState::from_config(config));
    let app = build_router(state);

    info!(
        addr = %addr,
        model = %default_model,
        tool_service = %tool_service_url,
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub uptime_secs: u64,
    /// `reachable` or `unreachable`
    pub tool_service: String,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.start_time)
        .num_seconds()
        .max(0) as u64;

    let tool_service = match state.tools.list_tools().await {
        Ok(_) => "reachable",
        Err(_) => "unreachable",
    };

    Json(HealthResponse {
        status: "ok".into(),
        service: "stepwise".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_secs: uptime,
        tool_service: tool_service.into(),
    })
}
