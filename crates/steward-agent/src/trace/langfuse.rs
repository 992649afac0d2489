//! Langfuse ingestion API backend
//!
//! Each operation is sent as a one-event batch to `POST /api/public/ingestion`.
//! Langfuse treats a repeated `trace-create` with the same id as an upsert,
//! which is how the final output is attached to the trace.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use super::{Fields, TraceBackend, TraceIds};

pub const DEFAULT_LANGFUSE_HOST: &str = "https://cloud.langfuse.com";

const ROOT_SPAN_NAME: &str = "agent_input";

pub struct LangfuseBackend {
    host: String,
    public_key: String,
    secret_key: String,
    client: Client,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn event(kind: &str, body: Value) -> Value {
    json!({
        "id": Uuid::new_v4().to_string(),
        "type": kind,
        "timestamp": now(),
        "body": body,
    })
}

impl LangfuseBackend {
    pub fn new(
        host: impl Into<String>,
        public_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            host: host.into().trim_end_matches('/').to_string(),
            public_key: public_key.into(),
            secret_key: secret_key.into(),
            client,
        })
    }

    async fn ingest(&self, events: Vec<Value>) -> Result<()> {
        let url = format!("{}/api/public/ingestion", self.host);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .json(&json!({ "batch": events }))
            .send()
            .await
            .with_context(|| format!("Failed to reach Langfuse at {}", self.host))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Langfuse ingestion returned {}: {}", status, body);
        }
        debug!(status = %status, "Langfuse batch accepted");
        Ok(())
    }
}

#[async_trait]
impl TraceBackend for LangfuseBackend {
    async fn begin(&self, label: &str, input: &str) -> Result<TraceIds> {
        let ids = TraceIds {
            trace_id: Uuid::new_v4().to_string(),
            span_id: Uuid::new_v4().to_string(),
        };
        let started = now();
        self.ingest(vec![
            event(
                "trace-create",
                json!({ "id": ids.trace_id, "name": label, "input": input, "timestamp": started }),
            ),
            event(
                "span-create",
                json!({
                    "id": ids.span_id,
                    "traceId": ids.trace_id,
                    "name": ROOT_SPAN_NAME,
                    "input": input,
                    "startTime": started,
                }),
            ),
        ])
        .await?;
        Ok(ids)
    }

    async fn annotate(&self, ids: &TraceIds, fields: &Fields) -> Result<()> {
        self.ingest(vec![event(
            "span-update",
            json!({ "id": ids.span_id, "traceId": ids.trace_id, "metadata": fields }),
        )])
        .await
    }

    async fn tool_span(&self, ids: &TraceIds, tool: &str, input: &str, output: &str) -> Result<()> {
        let at = now();
        self.ingest(vec![event(
            "span-create",
            json!({
                "id": Uuid::new_v4().to_string(),
                "traceId": ids.trace_id,
                "parentObservationId": ids.span_id,
                "name": format!("tool-{}", tool),
                "input": input,
                "output": output,
                "startTime": at,
                "endTime": at,
            }),
        )])
        .await
    }

    async fn end(&self, ids: &TraceIds, output: &str) -> Result<()> {
        self.ingest(vec![
            event(
                "span-update",
                json!({ "id": ids.span_id, "traceId": ids.trace_id, "output": output, "endTime": now() }),
            ),
            event("trace-create", json!({ "id": ids.trace_id, "output": output })),
        ])
        .await
    }

    fn name(&self) -> &str {
        "langfuse"
    }
}

impl std::fmt::Debug for LangfuseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LangfuseBackend")
            .field("host", &self.host)
            .field("public_key", &self.public_key)
            .field("secret_key", &"***")
            .finish()
    }
}
