use anyhow::Result;
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::{Fields, TraceBackend, TraceIds};

/// Writes trace events to the `tracing` log at info level
#[derive(Debug, Default)]
pub struct LogBackend;

#[async_trait]
impl TraceBackend for LogBackend {
    async fn begin(&self, label: &str, input: &str) -> Result<TraceIds> {
        let ids = TraceIds {
            trace_id: Uuid::new_v4().to_string(),
            span_id: Uuid::new_v4().to_string(),
        };
        info!(trace_id = %ids.trace_id, span_id = %ids.span_id, label, input, "trace begin");
        Ok(ids)
    }

    async fn annotate(&self, ids: &TraceIds, fields: &Fields) -> Result<()> {
        let fields = serde_json::to_string(fields)?;
        info!(trace_id = %ids.trace_id, fields = %fields, "trace annotate");
        Ok(())
    }

    async fn tool_span(&self, ids: &TraceIds, tool: &str, input: &str, output: &str) -> Result<()> {
        info!(trace_id = %ids.trace_id, span = %format!("tool-{}", tool), input, output, "trace tool span");
        Ok(())
    }

    async fn end(&self, ids: &TraceIds, output: &str) -> Result<()> {
        info!(trace_id = %ids.trace_id, output, "trace end");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
