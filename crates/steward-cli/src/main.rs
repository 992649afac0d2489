//! steward: command-line front end for the personal agent
//!
//! One-shot questions, an interactive chat REPL and configuration helpers.

mod bootstrap;
mod commands;
mod repl;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use steward_core::config::CONFIG_FILE;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "steward")]
#[command(about = "Personal assistant agent with memory, tools and guardrails", version)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start interactive chat REPL
    Chat,

    /// One-shot question (non-interactive)
    Ask {
        /// The message to send
        prompt: Vec<String>,

        /// Read the message from stdin
        #[arg(long)]
        stdin: bool,

        /// Print the whole turn as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration and backend reachability
    Status,

    /// Write a default steward.toml
    Init {
        /// Output file path
        #[arg(short, long, default_value = CONFIG_FILE)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Some(Commands::Chat) => repl::run().await,
        Some(Commands::Ask { prompt, stdin, json }) => {
            let prompt_text = prompt.join(" ");
            commands::ask(&prompt_text, stdin, json).await
        }
        Some(Commands::Status) => commands::status().await,
        Some(Commands::Init { output }) => commands::init(&output),
        None => {
            // Default to chat REPL when no command specified
            repl::run().await
        }
    }
}
