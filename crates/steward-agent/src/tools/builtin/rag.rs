//! Retrieval tools over the vector index

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use steward_core::{Embedder, Metadata, VectorIndex};
use tracing::{debug, instrument};

use crate::tools::{Tool, ToolContext};

/// Shared handles for the retrieval tools
#[derive(Clone)]
pub struct Retrieval {
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
    pub top_k: usize,
}

impl std::fmt::Debug for Retrieval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retrieval").field("top_k", &self.top_k).finish()
    }
}

/// Searches the knowledge base and reports the best hit
pub struct RagQueryTool {
    retrieval: Retrieval,
}

impl RagQueryTool {
    pub fn new(retrieval: Retrieval) -> Self {
        Self { retrieval }
    }
}

#[async_trait]
impl Tool for RagQueryTool {
    fn name(&self) -> &str {
        "rag_query"
    }

    fn description(&self) -> &str {
        "Search the long-term knowledge base. Returns the most relevant stored text."
    }

    fn usage(&self) -> String {
        "rag_query(query)".to_string()
    }

    #[instrument(skip_all)]
    async fn execute(&self, query: &str, _ctx: &ToolContext) -> Result<String> {
        let embedding = self
            .retrieval
            .embedder
            .embed(query)
            .await
            .context("Failed to embed query")?;
        let matches = self
            .retrieval
            .index
            .query(&embedding, self.retrieval.top_k)
            .await
            .context("Vector query failed")?;

        debug!(matches = matches.len(), "Knowledge base searched");
        Ok(match matches.first() {
            Some(best) => format!("Top result (score={}): {}", best.score, best.text),
            None => "No relevant results found.".to_string(),
        })
    }
}

/// Stores a document in the knowledge base
pub struct RagAddTool {
    retrieval: Retrieval,
}

impl RagAddTool {
    pub fn new(retrieval: Retrieval) -> Self {
        Self { retrieval }
    }
}

/// Split a `doc_id::text` payload
pub fn parse_payload(payload: &str) -> Option<(&str, &str)> {
    let (id, text) = payload.split_once("::")?;
    let (id, text) = (id.trim(), text.trim());
    if id.is_empty() || text.is_empty() {
        return None;
    }
    Some((id, text))
}

#[async_trait]
impl Tool for RagAddTool {
    fn name(&self) -> &str {
        "rag_add"
    }

    fn description(&self) -> &str {
        "Insert or update a document in the knowledge base. Payload format must be \"id::text\"."
    }

    fn usage(&self) -> String {
        "rag_add(\"docid::content\")".to_string()
    }

    #[instrument(skip_all)]
    async fn execute(&self, payload: &str, _ctx: &ToolContext) -> Result<String> {
        let Some((id, text)) = parse_payload(payload) else {
            return Ok("Format error. Use: id::text".to_string());
        };

        let embedding = self
            .retrieval
            .embedder
            .embed(text)
            .await
            .context("Failed to embed document")?;
        let mut metadata = Metadata::new();
        metadata.insert("text".to_string(), Value::String(text.to_string()));

        let status = self
            .retrieval
            .index
            .upsert(id, embedding, metadata)
            .await
            .with_context(|| format!("Failed to upsert document {}", id))?;
        debug!(id = %status.id, upserted = status.upserted_count, "Document stored");

        Ok("Document added to knowledge base.".to_string())
    }
}
