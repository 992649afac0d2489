//! Recover JSON from model output
//!
//! Escalates through three tiers: direct parse, code-fence stripping, and a
//! model-assisted rewrite. Only the last tier's failure is an error.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use steward_core::LanguageModel;
use tracing::{debug, instrument, warn};

use crate::error::{AgentError, AgentResult};
use crate::llm;

const FENCE_MARKERS: [&str; 3] = ["```json", "```JSON", "```"];

/// Remove markdown code-fence markers and surrounding whitespace
pub fn strip_code_fences(text: &str) -> String {
    let mut cleaned = text.trim().to_string();
    for marker in FENCE_MARKERS {
        cleaned = cleaned.replace(marker, "");
    }
    cleaned.trim().to_string()
}

fn object_span() -> &'static Regex {
    static OBJECT_SPAN: OnceLock<Regex> = OnceLock::new();
    OBJECT_SPAN.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"))
}

/// Best-effort extraction of a JSON object from free text
///
/// Tries the fence-stripped text, then the span from the first `{` to the last
/// `}`, and finally hands back the raw text as a JSON string. Never calls a
/// model.
pub fn extract_json(text: &str) -> Value {
    let cleaned = strip_code_fences(text);
    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return value;
    }

    if let Some(span) = object_span().find(&cleaned) {
        if let Ok(value) = serde_json::from_str::<Value>(span.as_str()) {
            return value;
        }
    }

    Value::String(cleaned)
}

fn repair_prompt(text: &str) -> String {
    format!(
        "The following text should be valid JSON but is malformed.\n\n\
         Fix it. Return ONLY valid JSON, with no explanations and no markdown.\n\n\
         Text:\n{}\n",
        text
    )
}

/// Three-tier JSON parser backed by a repair model
#[derive(Clone)]
pub struct JsonRepair {
    model: Arc<dyn LanguageModel>,
    timeout: Duration,
}

impl JsonRepair {
    pub fn new(model: Arc<dyn LanguageModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    #[instrument(skip_all, fields(raw_len = raw.len()))]
    pub async fn repair(&self, raw: &str) -> AgentResult<Value> {
        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            return Ok(value);
        }

        let cleaned = strip_code_fences(raw);
        if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
            debug!("Parsed JSON after stripping code fences");
            return Ok(value);
        }

        warn!("Model output is not valid JSON, asking the repair model");
        let repaired = llm::complete(
            self.model.as_ref(),
            &repair_prompt(raw),
            self.timeout,
            "json_repair",
        )
        .await?;

        serde_json::from_str::<Value>(&repaired)
            .or_else(|_| serde_json::from_str::<Value>(&strip_code_fences(&repaired)))
            .map_err(|e| AgentError::MalformedOutput {
                original: raw.to_string(),
                repaired: repaired.clone(),
                parse_error: e.to_string(),
            })
    }
}

impl std::fmt::Debug for JsonRepair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRepair")
            .field("model", &self.model.model_name())
            .field("timeout", &self.timeout)
            .finish()
    }
}
