//! Stepwise CLI — the main entry point.
//!
//! Commands:
//! - `init`   — Write a default config file
//! - `serve`  — Start the HTTP gateway
//! - `ask`    — Run one message through the loop in-process
//! - `chat`   — Interactive client for a running gateway
//! - `status` — Report a running gateway's health
//! - `tools`  — Print the tool service catalog

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "stepwise",
    about = "Stepwise — a streaming tool-using reasoning loop",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write ~/.stepwise/config.toml with default settings
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a single message through the reasoning loop and print each step
    Ask {
        /// The user message
        message: String,

        /// Model identifier (e.g. `claude-sonnet-4-5`, `vllm/qwen2`, `ollama/llama3`)
        #[arg(short, long)]
        model: Option<String>,

        /// Upper bound on model calls (1-20)
        #[arg(long)]
        max_iterations: Option<u32>,
    },

    /// Chat with a running gateway
    Chat {
        /// Gateway base URL
        #[arg(long, env = "STEPWISE_GATEWAY_URL", default_value = "http://127.0.0.1:8000")]
        url: String,

        /// Model identifier to request
        #[arg(short, long)]
        model: Option<String>,

        /// Ask for one collected JSON response instead of an SSE stream
        #[arg(long)]
        no_stream: bool,
    },

    /// Report the health of a running gateway
    Status {
        /// Gateway base URL
        #[arg(long, env = "STEPWISE_GATEWAY_URL", default_value = "http://127.0.0.1:8000")]
        url: String,
    },

    /// List the tools the tool service offers
    Tools,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init { force } => commands::init::run(force).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Ask {
            message,
            model,
            max_iterations,
        } => commands::ask::run(message, model, max_iterations, cli.verbose).await?,
        Commands::Chat {
            url,
            model,
            no_stream,
        } => commands::chat::run(url, model, !no_stream).await?,
        Commands::Status { url } => commands::status::run(url).await?,
        Commands::Tools => commands::tools::run().await?,
    }

    Ok(())
}
