//! ghost: latency-budgeted inline code completion backend.
//!
//! Routes completion requests to whichever LLM backend is actually
//! reachable (local daemon first, cloud fallback) under a hard time budget.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_store = ghost_complete::ConfigStore::new();
    config_store.hydrate_env();
    let config = config_store.load();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("ghost=debug")
            .init();
    }

    // Misconfiguration gets surfaced once, loudly, at startup; routine
    // per-request failures stay quiet.
    if !config.has_cloud_backend() {
        eprintln!("warning: no cloud API key configured; completions depend entirely on the local daemon");
    }

    match cli.command {
        Commands::Generate {
            ref prompt,
            max_tokens,
            temperature,
        } => {
            commands::generate::run(&config, prompt, cli.model.as_deref(), max_tokens, temperature)
                .await?;
        }
        Commands::Complete {
            ref file,
            line,
            col,
            timeout_ms,
        } => {
            commands::complete::run(&config, file, line, col, cli.model.as_deref(), timeout_ms)
                .await?;
        }
        Commands::Providers => {
            commands::providers::run(&config).await?;
        }
    }

    Ok(())
}
