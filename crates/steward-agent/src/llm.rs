//! Bounded calls into the language model

use std::time::Duration;

use steward_core::LanguageModel;
use tracing::{debug, warn};

use crate::error::{AgentError, AgentResult};

/// Run one completion, mapping transport failures and timeouts to [`AgentError`]
pub(crate) async fn complete(
    model: &dyn LanguageModel,
    prompt: &str,
    timeout: Duration,
    stage: &'static str,
) -> AgentResult<String> {
    debug!(stage, model = model.model_name(), prompt_len = prompt.len(), "Calling model");

    match tokio::time::timeout(timeout, model.complete(prompt)).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(error)) => {
            warn!(stage, error = %error, "Model call failed");
            Err(AgentError::Model { stage, error })
        }
        Err(_) => {
            warn!(stage, timeout_secs = timeout.as_secs(), "Model call timed out");
            Err(AgentError::Timeout {
                stage,
                secs: timeout.as_secs(),
            })
        }
    }
}
