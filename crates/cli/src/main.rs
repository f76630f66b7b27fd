//! Orchestra CLI — the main entry point.
//!
//! Commands:
//! - `run`      — Pursue goals with the autonomous agent loop
//! - `serve`    — Start the WebSocket session gateway
//! - `onboard`  — Write the default config
//! - `config`   — Show the effective configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "orchestra",
    about = "Orchestra — autonomous think-act-observe agent loop",
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
    /// Run the agent until it finishes, exits, or hits the iteration cap
    Run {
        /// A goal for the agent (repeatable)
        #[arg(short, long = "goal", required = true)]
        goals: Vec<String>,

        /// Override the iteration cap
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Disable the request-human-input command
        #[arg(long)]
        no_human: bool,
    },

    /// Start the WebSocket session gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize configuration and workspace
    Onboard,

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

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
        Commands::Run {
            goals,
            max_iterations,
            no_human,
        } => commands::run::run(goals, max_iterations, no_human).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Config => commands::config::run().await?,
    }

    Ok(())
}
