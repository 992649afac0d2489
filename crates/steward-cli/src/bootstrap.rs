//! Wire configuration and secrets into a ready-to-use session

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use steward_agent::trace::DEFAULT_LANGFUSE_HOST;
use steward_agent::{
    create_default_registry, Agent, LangfuseBackend, LogBackend, MemoryStore, Retrieval, Session,
    ToolContext, ToolDeps, Tracer,
};
use steward_core::config::{AgentConfig, TraceConfig};
use steward_core::providers::{build_embedder, build_language_model, build_vector_index};
use steward_core::{Config, Secrets, TraceBackendKind};
use tracing::{debug, info, warn};

/// Load steward.toml if one is found, else the built-in defaults
pub fn load_config() -> Result<(Config, Option<PathBuf>)> {
    match Config::find_config_path() {
        Ok(path) => {
            let config = Config::load_from(&path)?;
            debug!(path = %path.display(), "Loaded configuration");
            Ok((config, Some(path)))
        }
        Err(e) => {
            debug!(error = %e, "No configuration file, using defaults");
            Ok((Config::default_minimal(), None))
        }
    }
}

/// Build a session from the environment and the nearest steward.toml
pub fn session_from_env() -> Result<Session> {
    let secrets = Secrets::from_env();
    let (config, _) = load_config()?;
    build_session(&config.with_env_overrides(&secrets), &secrets)
}

pub fn build_session(config: &Config, secrets: &Secrets) -> Result<Session> {
    let model = build_language_model(&config.model, secrets, config.model.temperature)
        .context("Failed to build the language model")?;
    let repair = build_language_model(&config.model, secrets, config.model.repair_temperature)
        .context("Failed to build the repair model")?;

    let memory = Arc::new(MemoryStore::new());
    let mut deps = ToolDeps::new(memory.clone()).with_search_url(config.search.base_url.clone());
    match build_retrieval(config, secrets) {
        Ok(retrieval) => deps = deps.with_retrieval(retrieval),
        Err(e) => warn!(error = %format!("{:#}", e), "Knowledge base unavailable, rag tools disabled"),
    }

    let agent = Agent::builder(model, memory)
        .repair_model(repair)
        .tools(create_default_registry(deps))
        .tool_context(tool_context(&config.agent))
        .model_timeout(Duration::from_secs(config.agent.model_timeout_secs))
        .tool_timeout(Duration::from_secs(config.agent.tool_timeout_secs))
        .build();

    let tracer = build_tracer(&config.trace, &config.agent, secrets)?;
    info!(tracing = tracer.is_enabled(), "Session ready");

    Ok(Session::new(agent, tracer).with_label(config.trace.name.clone()))
}

fn tool_context(agent: &AgentConfig) -> ToolContext {
    ToolContext::default()
        .with_http_timeout(agent.tool_timeout_secs)
        .with_max_output_len(agent.max_tool_output_chars)
}

fn build_retrieval(config: &Config, secrets: &Secrets) -> Result<Retrieval> {
    Ok(Retrieval {
        embedder: build_embedder(&config.embeddings, secrets)?,
        index: build_vector_index(&config.vector, secrets)?,
        top_k: config.vector.top_k,
    })
}

pub fn build_tracer(trace: &TraceConfig, agent: &AgentConfig, secrets: &Secrets) -> Result<Tracer> {
    let timeout = Duration::from_secs(agent.trace_timeout_secs);

    let tracer = match trace.backend {
        TraceBackendKind::None => Tracer::disabled(),
        TraceBackendKind::Log => Tracer::new(Arc::new(LogBackend), timeout),
        TraceBackendKind::Langfuse => {
            let public_key = secrets
                .langfuse_public_key
                .as_deref()
                .context("LANGFUSE_PUBLIC_KEY is not set")?;
            let secret_key = secrets
                .langfuse_secret_key
                .as_deref()
                .context("LANGFUSE_SECRET_KEY is not set")?;
            let host = trace
                .host
                .as_deref()
                .or(secrets.langfuse_host.as_deref())
                .unwrap_or(DEFAULT_LANGFUSE_HOST);
            Tracer::new(Arc::new(LangfuseBackend::new(host, public_key, secret_key)?), timeout)
        }
    };

    Ok(tracer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use steward_core::config::Provider;

    fn offline_config() -> Config {
        let mut config = Config::default_minimal();
        config.model.provider = Provider::Ollama;
        config.embeddings.provider = Provider::Ollama;
        config
    }

    #[test]
    fn test_no_trace_backend_is_disabled() {
        let mut trace = TraceConfig::default();
        trace.backend = TraceBackendKind::None;
        let tracer = build_tracer(&trace, &AgentConfig::default(), &Secrets::default()).unwrap();
        assert!(!tracer.is_enabled());
    }

    #[test]
    fn test_log_trace_backend() {
        let mut trace = TraceConfig::default();
        trace.backend = TraceBackendKind::Log;
        let tracer = build_tracer(&trace, &AgentConfig::default(), &Secrets::default()).unwrap();
        assert!(tracer.is_enabled());
    }

    #[test]
    fn test_langfuse_requires_keys() {
        let mut trace = TraceConfig::default();
        trace.backend = TraceBackendKind::Langfuse;
        let err = build_tracer(&trace, &AgentConfig::default(), &Secrets::default()).unwrap_err();
        assert!(err.to_string().contains("LANGFUSE_PUBLIC_KEY"));

        let secrets = Secrets::from_lookup(|key| match key {
            "LANGFUSE_PUBLIC_KEY" => Some("pk".to_string()),
            "LANGFUSE_SECRET_KEY" => Some("sk".to_string()),
            _ => None,
        });
        assert!(build_tracer(&trace, &AgentConfig::default(), &secrets)
            .unwrap()
            .is_enabled());
    }

    #[test]
    fn test_tool_context_follows_agent_config() {
        let mut agent = AgentConfig::default();
        agent.tool_timeout_secs = 7;
        agent.max_tool_output_chars = 500;

        let ctx = tool_context(&agent);
        assert_eq!(ctx.http_timeout_secs, 7);
        assert_eq!(ctx.max_output_len, 500);
    }

    #[test]
    fn test_openai_without_key_fails() {
        let mut config = Config::default_minimal();
        config.model.provider = Provider::OpenAi;
        let err = build_session(&config, &Secrets::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn test_offline_session_answers_memory_turns() {
        let session = build_session(&offline_config(), &Secrets::default()).unwrap();

        assert!(session.agent().registry().get("rag_query").is_some());
        assert_eq!(
            session.ask("remember my favourite colour is teal").await,
            "Got it. I'll remember your favourite colour is teal."
        );
        assert_eq!(
            session.ask("what is my favourite colour").await,
            "Your favourite colour is teal."
        );
    }

    #[test]
    fn test_pinecone_without_host_disables_rag() {
        let mut config = offline_config();
        config.vector.backend = steward_core::VectorBackend::Pinecone;
        let session = build_session(&config, &Secrets::default()).unwrap();
        assert!(session.agent().registry().get("rag_query").is_none());
        assert!(session.agent().registry().get("calculator").is_some());
    }
}
