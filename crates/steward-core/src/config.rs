//! Configuration management for steward.toml
//!
//! Non-secret settings live in `steward.toml`; API keys are read from the
//! environment (optionally seeded from a `.env` file).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file searched for in the working tree
pub const CONFIG_FILE: &str = "steward.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub trace: TraceConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Backend serving completions and embeddings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "ollama")]
    Ollama,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Ollama => "http://127.0.0.1:11434",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::Ollama => write!(f, "ollama"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: Provider,
    /// Overrides the provider's default endpoint
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Temperature used for the JSON repair call
    #[serde(default)]
    pub repair_temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_provider")]
    pub provider: Provider,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Process-local cosine similarity index
    Memory,
    Pinecone,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    #[serde(default = "default_vector_backend")]
    pub backend: VectorBackend,
    /// Pinecone index host, e.g. `https://my-index-abc123.svc.pinecone.io`
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceBackendKind {
    None,
    Log,
    Langfuse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    #[serde(default = "default_trace_backend")]
    pub backend: TraceBackendKind,
    #[serde(default)]
    pub host: Option<String>,
    /// Name given to each trace
    #[serde(default = "default_trace_name")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_model_timeout")]
    pub model_timeout_secs: u64,
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
    #[serde(default = "default_trace_timeout")]
    pub trace_timeout_secs: u64,
    /// Longer tool output is cut before it reaches the model
    #[serde(default = "default_max_tool_output")]
    pub max_tool_output_chars: usize,
}

fn default_provider() -> Provider {
    Provider::OpenAi
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_vector_backend() -> VectorBackend {
    VectorBackend::Memory
}

fn default_top_k() -> usize {
    5
}

fn default_search_url() -> String {
    "https://api.duckduckgo.com".to_string()
}

fn default_trace_backend() -> TraceBackendKind {
    TraceBackendKind::None
}

fn default_trace_name() -> String {
    "agent".to_string()
}

fn default_model_timeout() -> u64 {
    60
}

fn default_tool_timeout() -> u64 {
    30
}

fn default_trace_timeout() -> u64 {
    5
}

fn default_max_tool_output() -> usize {
    20_000
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: None,
            model: default_chat_model(),
            temperature: default_temperature(),
            repair_temperature: 0.0,
        }
    }
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: None,
            model: default_embedding_model(),
        }
    }
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            backend: default_vector_backend(),
            host: None,
            namespace: None,
            top_k: default_top_k(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_url(),
        }
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            backend: default_trace_backend(),
            host: None,
            name: default_trace_name(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model_timeout_secs: default_model_timeout(),
            tool_timeout_secs: default_tool_timeout(),
            trace_timeout_secs: default_trace_timeout(),
            max_tool_output_chars: default_max_tool_output(),
        }
    }
}

impl ModelConfig {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }
}

impl EmbeddingsConfig {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }
}

impl Config {
    /// Configuration used when steward.toml is missing
    pub fn default_minimal() -> Self {
        Self::default()
    }

    /// Load configuration from a specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.as_ref().display()))
    }

    /// Find steward.toml by searching current directory and parents
    pub fn find_config_path() -> Result<PathBuf> {
        let mut current = std::env::current_dir()?;

        for _ in 0..10 {
            let candidate = current.join(CONFIG_FILE);
            if candidate.exists() {
                return Ok(candidate);
            }
            if !current.pop() {
                break;
            }
        }

        anyhow::bail!("{} not found in current directory or parents", CONFIG_FILE)
    }

    /// Write a commented default configuration file
    pub fn write_default(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }
        std::fs::write(path, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Apply host overrides from the environment
    pub fn with_env_overrides(mut self, secrets: &Secrets) -> Self {
        if let Some(ref host) = secrets.pinecone_host {
            self.vector.host = Some(host.clone());
        }
        if let Some(ref host) = secrets.langfuse_host {
            self.trace.host = Some(host.clone());
        }
        self
    }
}

/// Credentials read from the environment, never from steward.toml
#[derive(Clone, Default)]
pub struct Secrets {
    pub openai_api_key: Option<String>,
    pub pinecone_api_key: Option<String>,
    pub pinecone_host: Option<String>,
    pub langfuse_public_key: Option<String>,
    pub langfuse_secret_key: Option<String>,
    pub langfuse_host: Option<String>,
}

impl Secrets {
    /// Read secrets from the process environment, loading `.env` first
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: get("OPENAI_API_KEY"),
            pinecone_api_key: get("PINECONE_API_KEY"),
            pinecone_host: get("PINECONE_HOST"),
            langfuse_public_key: get("LANGFUSE_PUBLIC_KEY"),
            langfuse_secret_key: get("LANGFUSE_SECRET_KEY"),
            langfuse_host: get("LANGFUSE_HOST"),
        }
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Secrets")
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("pinecone_api_key", &mask(&self.pinecone_api_key))
            .field("pinecone_host", &self.pinecone_host)
            .field("langfuse_public_key", &mask(&self.langfuse_public_key))
            .field("langfuse_secret_key", &mask(&self.langfuse_secret_key))
            .field("langfuse_host", &self.langfuse_host)
            .finish()
    }
}

const DEFAULT_CONFIG: &str = r#"# steward configuration
# API keys are read from the environment (or .env):
#   OPENAI_API_KEY, PINECONE_API_KEY, PINECONE_HOST,
#   LANGFUSE_PUBLIC_KEY, LANGFUSE_SECRET_KEY, LANGFUSE_HOST

[model]
# "openai" or "ollama"
provider = "openai"
model = "gpt-4o-mini"
temperature = 0.2
# Temperature for the JSON repair call
repair_temperature = 0.0
# base_url = "http://127.0.0.1:11434"

[embeddings]
provider = "openai"
model = "text-embedding-3-small"

[vector]
# "memory" (process-local) or "pinecone"
backend = "memory"
top_k = 5
# host = "https://my-index.svc.pinecone.io"

[search]
base_url = "https://api.duckduckgo.com"

[trace]
# "none", "log" or "langfuse"
backend = "none"
name = "agent"
# host = "https://cloud.langfuse.com"

[agent]
model_timeout_secs = 60
tool_timeout_secs = 30
trace_timeout_secs = 5
max_tool_output_chars = 20000
"#;
