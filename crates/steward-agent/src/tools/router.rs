//! Tool routing and dispatch

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, error, info, instrument, warn};

use super::registry::ToolRegistry;
use super::{ToolCall, ToolContext};

/// Result of routing a tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteResult {
    /// Tool executed successfully
    Success(String),
    /// Tool not found
    NotFound(String),
    /// Error during execution
    Error(String),
    /// Tool did not finish in time
    TimedOut(u64),
}

/// Router for dispatching tool calls
pub struct ToolRouter {
    registry: ToolRegistry,
    ctx: ToolContext,
    timeout: Duration,
}

impl ToolRouter {
    /// Create a new router with the given registry
    pub fn new(registry: ToolRegistry, ctx: ToolContext, timeout: Duration) -> Self {
        Self {
            registry,
            ctx,
            timeout,
        }
    }

    /// Route a single tool call
    #[instrument(skip(self, tool_call), fields(tool = %tool_call.tool))]
    pub async fn route(&self, tool_call: &ToolCall) -> RouteResult {
        let Some(tool) = self.registry.get(&tool_call.tool) else {
            warn!(tool = %tool_call.tool, "Tool not found");
            return RouteResult::NotFound(tool_call.tool.clone());
        };

        info!(tool = %tool_call.tool, "Executing tool");
        let execution = AssertUnwindSafe(tool.execute(&tool_call.input, &self.ctx)).catch_unwind();
        match tokio::time::timeout(self.timeout, execution).await {
            Ok(Ok(Ok(output))) => {
                debug!(output_len = output.len(), "Tool executed successfully");
                RouteResult::Success(truncate(output, self.ctx.max_output_len))
            }
            Ok(Ok(Err(e))) => {
                warn!(tool = %tool_call.tool, error = %e, "Tool execution error");
                RouteResult::Error(format!("{:#}", e))
            }
            Ok(Err(payload)) => {
                let message = panic_message(payload.as_ref());
                error!(tool = %tool_call.tool, panic = %message, "Tool panicked");
                RouteResult::Error(format!("panicked: {}", message))
            }
            Err(_) => {
                warn!(tool = %tool_call.tool, timeout_secs = self.timeout.as_secs(), "Tool timed out");
                RouteResult::TimedOut(self.timeout.as_secs())
            }
        }
    }

    /// Invoke a tool by name, always producing text
    pub async fn invoke(&self, name: &str, input: &str) -> String {
        let call = ToolCall::new(name, input);
        match self.route(&call).await {
            RouteResult::Success(output) => output,
            RouteResult::NotFound(name) => format!("ERROR: Unknown tool {}", name),
            RouteResult::Error(e) => format!("ERROR running tool {}: {}", name, e),
            RouteResult::TimedOut(secs) => {
                format!("ERROR running tool {}: timed out after {}s", name, secs)
            }
        }
    }

    /// Get a reference to the registry
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn truncate(mut output: String, max_len: usize) -> String {
    if output.chars().count() <= max_len {
        return output;
    }
    let cut = output
        .char_indices()
        .nth(max_len)
        .map(|(i, _)| i)
        .unwrap_or(output.len());
    output.truncate(cut);
    output.push_str("\n... (truncated)");
    output
}

impl std::fmt::Debug for ToolRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRouter")
            .field("registry", &self.registry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use anyhow::{bail, Result};
    use async_trait::async_trait;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes input"
        }

        async fn execute(&self, input: &str, _ctx: &ToolContext) -> Result<String> {
            Ok(input.to_string())
        }
    }

    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        async fn execute(&self, _input: &str, _ctx: &ToolContext) -> Result<String> {
            bail!("disk on fire")
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "Never finishes in time"
        }

        async fn execute(&self, _input: &str, _ctx: &ToolContext) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("late".to_string())
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn name(&self) -> &str {
            "explode"
        }

        fn description(&self) -> &str {
            "Panics"
        }

        async fn execute(&self, input: &str, _ctx: &ToolContext) -> Result<String> {
            panic!("tool blew up on {}", input)
        }
    }

    fn router() -> ToolRouter {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        registry.register(BrokenTool);
        registry.register(SlowTool);
        registry.register(PanickingTool);
        ToolRouter::new(registry, ToolContext::default(), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_router_invoke() {
        assert_eq!(router().invoke("echo", "hello").await, "hello");
    }

    #[tokio::test]
    async fn test_router_not_found() {
        let router = router();
        let call = ToolCall::new("nonexistent", "");
        assert_eq!(
            router.route(&call).await,
            RouteResult::NotFound("nonexistent".to_string())
        );
        assert_eq!(
            router.invoke("nonexistent", "x").await,
            "ERROR: Unknown tool nonexistent"
        );
    }

    #[tokio::test]
    async fn test_router_folds_errors_into_text() {
        assert_eq!(
            router().invoke("broken", "x").await,
            "ERROR running tool broken: disk on fire"
        );
    }

    #[tokio::test]
    async fn test_router_catches_panics() {
        let router = router();
        assert_eq!(
            router.route(&ToolCall::new("explode", "x")).await,
            RouteResult::Error("panicked: tool blew up on x".to_string())
        );
        assert_eq!(
            router.invoke("explode", "y").await,
            "ERROR running tool explode: panicked: tool blew up on y"
        );
        assert_eq!(router.invoke("echo", "still here").await, "still here");
    }

    #[tokio::test(start_paused = true)]
    async fn test_router_times_out() {
        assert_eq!(
            router().invoke("slow", "").await,
            "ERROR running tool slow: timed out after 2s"
        );
    }

    #[tokio::test]
    async fn test_router_caps_output_length() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let ctx = ToolContext::default().with_max_output_len(5);
        let router = ToolRouter::new(registry, ctx, Duration::from_secs(2));

        assert_eq!(
            router.invoke("echo", "abcdefgh").await,
            "abcde\n... (truncated)"
        );
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        let out = truncate("héllo wörld".to_string(), 4);
        assert!(out.starts_with("héll"));
        assert!(out.ends_with("(truncated)"));
        assert_eq!(truncate("short".to_string(), 10), "short");
    }
}
