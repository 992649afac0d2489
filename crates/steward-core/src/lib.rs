//! steward-core: Shared library for the steward agent
//!
//! Provides:
//! - Configuration loading (steward.toml + environment secrets)
//! - Language model and embedding clients (OpenAI-compatible, Ollama)
//! - Vector indexes (in-memory, Pinecone)

pub mod config;
pub mod model;
pub mod ollama;
pub mod openai;
pub mod providers;
pub mod vector;

pub use config::{Config, Provider, Secrets, TraceBackendKind, VectorBackend};
pub use model::{Embedder, Embedding, LanguageModel};
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use vector::{InMemoryIndex, Metadata, PineconeIndex, UpsertStatus, VectorIndex, VectorMatch};
