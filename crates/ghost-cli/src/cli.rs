//! CLI argument and command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ghost",
    version,
    about = "Latency-budgeted inline code completion backend"
)]
pub struct Cli {
    /// Model to use (defaults to the configured fast model).
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate text for a prompt, streaming to stdout.
    Generate {
        /// The prompt to complete.
        prompt: String,

        /// Maximum tokens to generate.
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Sampling temperature, within [0, 2].
        #[arg(long)]
        temperature: Option<f32>,
    },

    /// Produce an inline completion for a file position.
    Complete {
        /// File containing the buffer text.
        file: PathBuf,

        /// Cursor line (1-based).
        #[arg(long)]
        line: usize,

        /// Cursor column (1-based, in characters).
        #[arg(long)]
        col: usize,

        /// Override the wall-clock budget in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Show configured providers and their availability.
    Providers,
}
