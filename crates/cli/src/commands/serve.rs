//! `stepwise serve` — Start the HTTP API server.

use stepwise_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Stepwise Gateway");
    println!("   Listening:    {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:        {}", config.default_model);
    println!("   Tool service: {}", config.tool_service.url);

    stepwise_gateway::start(config).await?;

    Ok(())
}
