//! Tool framework for plan execution
//!
//! Every tool takes one free-text input and produces one text output. Failures
//! are folded into text by the [`router::ToolRouter`] so a plan never aborts.

pub mod builtin;
pub mod registry;
pub mod router;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Context provided to tools during execution
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Maximum output length in characters (truncate if exceeded)
    pub max_output_len: usize,
    /// Default timeout for HTTP requests in seconds
    pub http_timeout_secs: u64,
}

impl Default for ToolContext {
    fn default() -> Self {
        Self {
            max_output_len: 20_000,
            http_timeout_secs: 30,
        }
    }
}

impl ToolContext {
    /// Set HTTP timeout
    pub fn with_http_timeout(mut self, secs: u64) -> Self {
        self.http_timeout_secs = secs;
        self
    }

    pub fn with_max_output_len(mut self, len: usize) -> Self {
        self.max_output_len = len;
        self
    }
}

/// One step of a tool plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub input: String,
}

impl ToolCall {
    pub fn new(tool: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            input: input.into(),
        }
    }
}

/// The Tool trait that all tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// One-line description shown to the planner
    fn description(&self) -> &str;

    /// Call signature shown to the planner, e.g. `calculator(expression)`
    fn usage(&self) -> String {
        format!("{}(input)", self.name())
    }

    /// Execute the tool with the given input
    async fn execute(&self, input: &str, ctx: &ToolContext) -> Result<String>;
}
