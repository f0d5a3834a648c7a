//! `stepwise init` — Write a default config file.

use stepwise_config::AppConfig;

pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    }

    if config_path.exists() && !force {
        println!("Config file already exists: {}", config_path.display());
        println!("Run `stepwise init --force` to overwrite it.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Wrote {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set ANTHROPIC_API_KEY, or point default_model at a local engine");
    println!("  2. Start the tool service on the configured url");
    println!("  3. Run `stepwise ask \"hello\"`");

    Ok(())
}
