//! Scout CLI, the main entry point.
//!
//! Commands:
//! - `serve`   Start the HTTP gateway
//! - `search`  Run one request through the pipeline and print the response
//! - `doctor`  Check configuration and collaborator health
//! - `init`    Write a starter config file

use clap::{Parser, Subcommand};
use scout_config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "scout",
    about = "Scout: answers from a knowledge base, personalised through gateway tools",
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
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Answer a single query and print the JSON response
    Search {
        /// The question to answer
        #[arg(short, long)]
        query: String,

        /// Personalise the answer for this user
        #[arg(short, long)]
        user_id: Option<String>,
    },

    /// Diagnose configuration and collaborator health
    Doctor,

    /// Write a default config file if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // RUST_LOG wins; otherwise the configured level, or debug with --verbose
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.log_level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    tracing::debug!(config = ?config, "Configuration loaded");

    match cli.command {
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Search { query, user_id } => {
            commands::search::run(config, query, user_id).await?
        }
        Commands::Doctor => commands::doctor::run(config).await?,
        Commands::Init => commands::init::run().await?,
    }

    Ok(())
}
