//! `stepwise ask` — Run one message through the loop in-process.

use std::sync::Arc;

use stepwise_agent::{AgentConfig, AgentOrchestrator, RunInput, Termination};
use stepwise_config::AppConfig;
use stepwise_tools::ToolServiceClient;
use tracing::debug;

use super::render::render_step;

pub async fn run(
    message: String,
    model: Option<String>,
    max_iterations: Option<u32>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let model = model.unwrap_or_else(|| config.default_model.clone());
    let router = stepwise_providers::build_from_config(&config);
    let (provider, backend_model) = router.resolve(&model).map_err(|e| {
        format!("{e}. Set ANTHROPIC_API_KEY or use a vllm/ or ollama/ model.")
    })?;
    debug!(model = %model, backend = provider.name(), "Resolved model");

    let mut agent_config = AgentConfig::from_settings(&config.agent, backend_model);
    if let Some(max) = max_iterations {
        agent_config = agent_config.with_max_iterations(max);
    }
    agent_config.verbose |= verbose;
    agent_config.validate()?;

    let tools = Arc::new(ToolServiceClient::from_config(&config.tool_service));
    let agent = AgentOrchestrator::new(provider, tools, agent_config);

    let (mut rx, handle) = agent.run_stream(RunInput::new(message));
    while let Some(step) = rx.recv().await {
        println!("{}", render_step(&step));
    }

    let outcome = handle.await?;
    match outcome.termination {
        Termination::Answered => Ok(()),
        Termination::Exhausted => Err(format!(
            "No answer after {} iteration(s)",
            outcome.iterations
        )
        .into()),
        other => Err(format!("Run ended without an answer ({other:?})").into()),
    }
}
