//! `stepwise status` — Report the health of a running gateway.

use stepwise_gateway::HealthResponse;

pub async fn run(url: String) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();
    let health = fetch_health(&client, &url)
        .await
        .map_err(|e| format!("Gateway at {url} is not healthy: {e}"))?;

    println!("Stepwise Status");
    println!("===============");
    println!("  Gateway:      {url}");
    println!("  Status:       {}", health.status);
    println!("  Service:      {} v{}", health.service, health.version);
    println!("  Uptime:       {}", format_uptime(health.uptime_secs));
    println!("  Tool service: {}", health.tool_service);

    Ok(())
}

async fn fetch_health(
    client: &reqwest::Client,
    url: &str,
) -> Result<HealthResponse, Box<dyn std::error::Error>> {
    let response = client
        .get(format!("{}/health", url.trim_end_matches('/')))
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()).into());
    }
    Ok(response.json().await?)
}

fn format_uptime(secs: u64) -> String {
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
