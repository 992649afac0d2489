//! Contracts for the external model capabilities

use anyhow::Result;
use async_trait::async_trait;

/// Embedding vector type
pub type Embedding = Vec<f32>;

/// Text completion: one prompt in, one response out
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model identifier for logs and traces
    fn model_name(&self) -> &str;
}

/// Text embedding capability backing the retrieval tools
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding>;
}
