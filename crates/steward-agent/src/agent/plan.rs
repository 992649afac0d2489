//! Tool plans and the records produced by executing them

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::tools::ToolCall;

/// The model's decision for one turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolPlan {
    pub steps: Vec<ToolCall>,
    /// Only kept when `steps` is empty
    pub final_answer: Option<String>,
}

impl ToolPlan {
    /// Read a plan out of repaired model output
    ///
    /// Accepts an object with optional `steps` and `final_answer`, a bare
    /// array of steps, or a bare string answer. Steps without a tool name
    /// are skipped; non-string inputs are passed on as their JSON text.
    pub fn from_value(value: &Value) -> Self {
        let (steps, final_answer) = match value {
            Value::Object(map) => (
                map.get("steps"),
                map.get("final_answer").and_then(Value::as_str).map(str::to_string),
            ),
            Value::Array(_) => (Some(value), None),
            Value::String(text) => (None, Some(text.clone())),
            _ => (None, None),
        };

        let steps: Vec<ToolCall> = match steps {
            Some(Value::Array(items)) => items.iter().filter_map(parse_step).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                warn!(steps = %other, "Plan steps is not a list, ignoring");
                Vec::new()
            }
        };

        let final_answer = match final_answer {
            Some(_) if !steps.is_empty() => {
                debug!("Dropping final_answer from a plan with steps");
                None
            }
            Some(answer) if answer.trim().is_empty() => None,
            other => other,
        };

        Self { steps, final_answer }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn parse_step(step: &Value) -> Option<ToolCall> {
    let Some(tool) = step.get("tool").and_then(Value::as_str) else {
        warn!(step = %step, "Plan step has no tool name, skipping");
        return None;
    };
    let input = match step.get("input") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    Some(ToolCall::new(tool.trim(), input))
}

/// Result of one executed plan step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInvocation {
    pub tool: String,
    pub input: String,
    pub output: String,
}

impl ToolInvocation {
    pub fn new(tool: impl Into<String>, input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            input: input.into(),
            output: output.into(),
        }
    }
}

impl std::fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tool: {}\nInput: {}\nOutput: {}", self.tool, self.input, self.output)
    }
}
