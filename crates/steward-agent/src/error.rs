//! Errors that end a turn before an answer is produced

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// All three repair tiers failed to produce valid JSON
    #[error("model output is not valid JSON after repair: {parse_error}")]
    MalformedOutput {
        original: String,
        repaired: String,
        parse_error: String,
    },

    #[error("{stage} model call failed: {error:#}")]
    Model {
        stage: &'static str,
        error: anyhow::Error,
    },

    #[error("{stage} model call timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },
}

pub type AgentResult<T> = std::result::Result<T, AgentError>;
