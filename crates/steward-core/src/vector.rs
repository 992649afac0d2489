//! Vector search indexes backing the retrieval tools

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::model::Embedding;

/// Metadata stored next to each vector
pub type Metadata = Map<String, Value>;

/// A single nearest-neighbour hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    /// The `text` metadata field, empty when absent
    pub text: String,
}

/// Outcome of an upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertStatus {
    pub id: String,
    pub upserted_count: u32,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, id: &str, embedding: Embedding, metadata: Metadata) -> Result<UpsertStatus>;

    /// Return up to `top_k` matches ordered by descending score
    async fn query(&self, embedding: &Embedding, top_k: usize) -> Result<Vec<VectorMatch>>;
}

fn metadata_text(metadata: &Metadata) -> String {
    metadata
        .get("text")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &Embedding, b: &Embedding) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

/// Process-local index; contents are lost on exit
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    entries: RwLock<HashMap<String, (Embedding, Metadata)>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, id: &str, embedding: Embedding, metadata: Metadata) -> Result<UpsertStatus> {
        self.entries.write().insert(id.to_string(), (embedding, metadata));
        Ok(UpsertStatus {
            id: id.to_string(),
            upserted_count: 1,
        })
    }

    async fn query(&self, embedding: &Embedding, top_k: usize) -> Result<Vec<VectorMatch>> {
        let entries = self.entries.read();

        let mut results: Vec<VectorMatch> = entries
            .iter()
            .map(|(id, (vector, metadata))| VectorMatch {
                id: id.clone(),
                score: cosine_similarity(embedding, vector),
                text: metadata_text(metadata),
            })
            .collect();

        // Sort by similarity descending, id as tie-break for stable output
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(top_k);
        Ok(results)
    }
}

#[derive(Debug, Deserialize)]
struct PineconeUpsertResponse {
    #[serde(rename = "upsertedCount", default)]
    upserted_count: u32,
}

#[derive(Debug, Deserialize)]
struct PineconeQueryResponse {
    #[serde(default)]
    matches: Vec<PineconeMatch>,
}

#[derive(Debug, Deserialize)]
struct PineconeMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Metadata,
}

/// Pinecone data-plane client for a single index host
#[derive(Clone)]
pub struct PineconeIndex {
    host: String,
    api_key: String,
    namespace: Option<String>,
    http: reqwest::Client,
}

impl PineconeIndex {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let host = host.into();
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("https://{}", host)
        };

        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            namespace: None,
            http,
        })
    }

    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    async fn post(&self, path: &str, mut body: Value) -> Result<reqwest::Response> {
        if let Some(ref ns) = self.namespace {
            body["namespace"] = json!(ns);
        }

        let url = format!("{}/{}", self.host, path);
        debug!(url = %url, "Pinecone request");

        let resp = self
            .http
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Pinecone request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Pinecone error ({}): {}", status, body_text);
        }

        Ok(resp)
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, id: &str, embedding: Embedding, metadata: Metadata) -> Result<UpsertStatus> {
        let body = json!({
            "vectors": [{ "id": id, "values": embedding, "metadata": metadata }],
        });

        let resp: PineconeUpsertResponse = self
            .post("vectors/upsert", body)
            .await?
            .json()
            .await
            .context("Failed to parse Pinecone upsert response")?;

        Ok(UpsertStatus {
            id: id.to_string(),
            upserted_count: resp.upserted_count,
        })
    }

    async fn query(&self, embedding: &Embedding, top_k: usize) -> Result<Vec<VectorMatch>> {
        let body = json!({
            "vector": embedding,
            "topK": top_k,
            "includeMetadata": true,
        });

        let resp: PineconeQueryResponse = self
            .post("query", body)
            .await?
            .json()
            .await
            .context("Failed to parse Pinecone query response")?;

        Ok(resp
            .matches
            .into_iter()
            .map(|m| VectorMatch {
                text: metadata_text(&m.metadata),
                id: m.id,
                score: m.score,
            })
            .collect())
    }
}

impl std::fmt::Debug for PineconeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeIndex")
            .field("host", &self.host)
            .field("namespace", &self.namespace)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_metadata(text: &str) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("text".to_string(), json!(text));
        metadata
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);

        let c = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &c).abs() < 1e-6);

        let d = vec![1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &d), 0.0);
    }

    #[tokio::test]
    async fn test_in_memory_upsert_and_query() {
        let index = InMemoryIndex::new();
        index.upsert("rust", vec![1.0, 0.0], text_metadata("Rust is a language")).await.unwrap();
        index.upsert("tea", vec![0.0, 1.0], text_metadata("Tea is a drink")).await.unwrap();

        let matches = index.query(&vec![0.9, 0.1], 5).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "rust");
        assert_eq!(matches[0].text, "Rust is a language");
        assert!(matches[0].score > matches[1].score);

        let top = index.query(&vec![0.0, 1.0], 1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, "tea");
    }

    #[tokio::test]
    async fn test_in_memory_upsert_overwrites() {
        let index = InMemoryIndex::new();
        index.upsert("doc", vec![1.0], text_metadata("old")).await.unwrap();
        let status = index.upsert("doc", vec![1.0], text_metadata("new")).await.unwrap();

        assert_eq!(status.upserted_count, 1);
        assert_eq!(index.len(), 1);
        let matches = index.query(&vec![1.0], 1).await.unwrap();
        assert_eq!(matches[0].text, "new");
    }

    #[test]
    fn test_parse_pinecone_query() {
        let body = r#"{"matches":[{"id":"a","score":0.87,"values":[],"metadata":{"text":"hello"}},{"id":"b","score":0.5}],"namespace":""}"#;
        let parsed: PineconeQueryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.matches.len(), 2);
        assert_eq!(metadata_text(&parsed.matches[0].metadata), "hello");
        assert_eq!(metadata_text(&parsed.matches[1].metadata), "");
    }

    #[test]
    fn test_pinecone_host_scheme() {
        let index = PineconeIndex::new("idx-123.svc.pinecone.io/", "key").unwrap();
        assert_eq!(index.host, "https://idx-123.svc.pinecone.io");
    }
}
