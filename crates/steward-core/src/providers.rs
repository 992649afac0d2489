//! Construct collaborators from configuration

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::config::{EmbeddingsConfig, ModelConfig, Provider, Secrets, VectorBackend, VectorConfig};
use crate::model::{Embedder, LanguageModel};
use crate::ollama::OllamaClient;
use crate::openai::OpenAiClient;
use crate::vector::{InMemoryIndex, PineconeIndex, VectorIndex};

fn openai_key(secrets: &Secrets) -> Result<&str> {
    secrets
        .openai_api_key
        .as_deref()
        .context("OPENAI_API_KEY is not set")
}

/// Build the completion model at the given temperature
pub fn build_language_model(
    config: &ModelConfig,
    secrets: &Secrets,
    temperature: f32,
) -> Result<Arc<dyn LanguageModel>> {
    info!(provider = %config.provider, model = %config.model, temperature, "Building language model");

    let model: Arc<dyn LanguageModel> = match config.provider {
        Provider::OpenAi => Arc::new(
            OpenAiClient::new(config.base_url(), openai_key(secrets)?, &config.model)?
                .with_temperature(temperature),
        ),
        Provider::Ollama => Arc::new(
            OllamaClient::new(config.base_url(), &config.model)?.with_temperature(temperature),
        ),
    };

    Ok(model)
}

pub fn build_embedder(config: &EmbeddingsConfig, secrets: &Secrets) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.provider {
        Provider::OpenAi => Arc::new(OpenAiClient::new(
            config.base_url(),
            openai_key(secrets)?,
            &config.model,
        )?),
        Provider::Ollama => Arc::new(OllamaClient::new(config.base_url(), &config.model)?),
    };

    Ok(embedder)
}

pub fn build_vector_index(config: &VectorConfig, secrets: &Secrets) -> Result<Arc<dyn VectorIndex>> {
    let index: Arc<dyn VectorIndex> = match config.backend {
        VectorBackend::Memory => Arc::new(InMemoryIndex::new()),
        VectorBackend::Pinecone => {
            let host = config
                .host
                .as_deref()
                .context("vector.host (or PINECONE_HOST) is required for the pinecone backend")?;
            let key = secrets
                .pinecone_api_key
                .as_deref()
                .context("PINECONE_API_KEY is not set")?;
            Arc::new(PineconeIndex::new(host, key)?.with_namespace(config.namespace.clone()))
        }
    };

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_requires_key() {
        let err = build_language_model(&ModelConfig::default(), &Secrets::default(), 0.2)
            .err()
            .unwrap();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let config = ModelConfig {
            provider: Provider::Ollama,
            model: "llama3.2".to_string(),
            ..Default::default()
        };
        let model = build_language_model(&config, &Secrets::default(), 0.0).unwrap();
        assert_eq!(model.model_name(), "llama3.2");
    }

    #[test]
    fn test_pinecone_requires_host() {
        let config = VectorConfig {
            backend: VectorBackend::Pinecone,
            ..Default::default()
        };
        let secrets = Secrets {
            pinecone_api_key: Some("key".to_string()),
            ..Default::default()
        };
        assert!(build_vector_index(&config, &secrets).is_err());
        assert!(build_vector_index(&VectorConfig::default(), &Secrets::default()).is_ok());
    }
}
