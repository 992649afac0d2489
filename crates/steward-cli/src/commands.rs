//! Non-interactive subcommands

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;
use steward_agent::TurnState;
use steward_core::{Config, OllamaClient, Provider, Secrets, TraceBackendKind, VectorBackend};

use crate::bootstrap;

const GREEN: &str = "\x1b[92m";
const RED: &str = "\x1b[91m";
const YELLOW: &str = "\x1b[93m";
const BLUE: &str = "\x1b[94m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

fn print_status(ok: bool, msg: &str) {
    let icon = if ok {
        format!("{}✓{}", GREEN, RESET)
    } else {
        format!("{}✗{}", RED, RESET)
    };
    println!("  {} {}", icon, msg);
}

/// Answer a single message and exit
pub async fn ask(prompt: &str, stdin: bool, json_output: bool) -> Result<()> {
    let mut text = prompt.to_string();
    if stdin {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read stdin")?;
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(input.trim_end());
    }

    let session = bootstrap::session_from_env()?;
    let state = session.ask_with(TurnState::new(text)).await;

    if json_output {
        let output = json!({
            "session": session.id(),
            "answer": state.assistant,
            "outcome": state.outcome,
            "history": state.history,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", state.assistant);
    }

    Ok(())
}

/// Show configuration and backend reachability
pub async fn status() -> Result<()> {
    let secrets = Secrets::from_env();
    let (config, path) = bootstrap::load_config()?;
    let config = config.with_env_overrides(&secrets);

    println!("{}Configuration{}", BOLD, RESET);
    match &path {
        Some(path) => println!("  File: {}", path.display()),
        None => println!("  File: {}none, using defaults{}", DIM, RESET),
    }
    println!(
        "  Model: {} ({}, temperature {})",
        config.model.model, config.model.provider, config.model.temperature
    );
    println!("  Endpoint: {}", config.model.base_url());
    println!(
        "  Embeddings: {} ({})",
        config.embeddings.model, config.embeddings.provider
    );
    println!("  Vector index: {:?} (top_k {})", config.vector.backend, config.vector.top_k);
    println!("  Search: {}", config.search.base_url);
    println!("  Tracing: {:?}", config.trace.backend);

    println!("\n{}Backends{}", BOLD, RESET);
    model_status(&config, &secrets).await;

    match config.vector.backend {
        VectorBackend::Memory => print_status(true, "In-memory vector index"),
        VectorBackend::Pinecone => {
            print_status(config.vector.host.is_some(), "Pinecone host configured");
            print_status(secrets.pinecone_api_key.is_some(), "PINECONE_API_KEY set");
        }
    }

    if config.trace.backend == TraceBackendKind::Langfuse {
        print_status(
            secrets.langfuse_public_key.is_some() && secrets.langfuse_secret_key.is_some(),
            "Langfuse keys set",
        );
    }

    if path.is_none() {
        println!("\n  Create a config with: {}steward init{}", BLUE, RESET);
    }

    Ok(())
}

async fn model_status(config: &Config, secrets: &Secrets) {
    match config.model.provider {
        Provider::OpenAi => {
            print_status(secrets.openai_api_key.is_some(), "OPENAI_API_KEY set");
        }
        Provider::Ollama => {
            let client = match OllamaClient::new(config.model.base_url(), &config.model.model) {
                Ok(client) => client,
                Err(e) => {
                    print_status(false, &format!("Ollama client: {}", e));
                    return;
                }
            };

            match client.health_check().await {
                Ok(true) => print_status(true, "Ollama is running"),
                _ => {
                    print_status(false, "Ollama is not running");
                    println!("\n  Start with: {}ollama serve{}", BLUE, RESET);
                    return;
                }
            }

            match client.list_models().await {
                Ok(models) => {
                    let tagged = format!("{}:", config.model.model);
                    let found = models
                        .iter()
                        .any(|m| m.name == config.model.model || m.name.starts_with(&tagged));
                    print_status(found, &format!("Model {} available", config.model.model));
                    if !found {
                        println!("  Run: {}ollama pull {}{}", BLUE, config.model.model, RESET);
                    }
                }
                Err(e) => println!("  {}Could not list models: {}{}", YELLOW, e, RESET),
            }
        }
    }
}

/// Write a default steward.toml
pub fn init(path: &Path) -> Result<()> {
    Config::write_default(path)?;
    print_status(true, &format!("Wrote {}", path.display()));
    println!("  Put API keys in the environment or a {}.env{} file", BLUE, RESET);
    Ok(())
}
