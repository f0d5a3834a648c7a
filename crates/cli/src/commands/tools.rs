//! `stepwise tools` — Print the tool service catalog.

use stepwise_config::AppConfig;
use stepwise_core::tool::ToolService;
use stepwise_tools::ToolServiceClient;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let client = ToolServiceClient::from_config(&config.tool_service);

    let tools = client
        .list_tools()
        .await
        .map_err(|e| format!("Tool service at {}: {e}", client.base_url()))?;

    if tools.is_empty() {
        println!("No tools available at {}", client.base_url());
        return Ok(());
    }

    println!("{} tool(s) at {}", tools.len(), client.base_url());
    for tool in &tools {
        println!();
        println!("  {}", tool.name);
        for line in tool.description.lines() {
            println!("    {line}");
        }
    }

    Ok(())
}
