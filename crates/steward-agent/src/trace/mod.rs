//! Observability traces for agent turns
//!
//! A [`Tracer`] wraps an optional [`TraceBackend`]. Every backend call is
//! bounded by a timeout, and failures are logged and swallowed: tracing can
//! never change an answer. When the backend is missing or `begin` fails the
//! handles are absent and every later call is a no-op.

mod langfuse;
mod log;

pub use self::langfuse::{LangfuseBackend, DEFAULT_LANGFUSE_HOST};
pub use self::log::LogBackend;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Key/value annotations attached to a span
pub type Fields = Map<String, Value>;

/// Backend identifiers of one trace and its root span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceIds {
    pub trace_id: String,
    pub span_id: String,
}

/// An observability sink
#[async_trait]
pub trait TraceBackend: Send + Sync {
    /// Open a trace and its root span
    async fn begin(&self, label: &str, input: &str) -> Result<TraceIds>;

    /// Merge key/value pairs into the root span
    async fn annotate(&self, ids: &TraceIds, fields: &Fields) -> Result<()>;

    /// Record a finished child span for one tool call
    async fn tool_span(&self, ids: &TraceIds, tool: &str, input: &str, output: &str) -> Result<()>;

    /// Close the span and the trace with the final answer
    async fn end(&self, ids: &TraceIds, output: &str) -> Result<()>;

    fn name(&self) -> &str;
}

/// Fault-tolerant front end over a trace backend
#[derive(Clone)]
pub struct Tracer {
    backend: Option<Arc<dyn TraceBackend>>,
    timeout: Duration,
}

impl Tracer {
    pub fn new(backend: Arc<dyn TraceBackend>, timeout: Duration) -> Self {
        Self {
            backend: Some(backend),
            timeout,
        }
    }

    /// Tracer that never produces handles
    pub fn disabled() -> Self {
        Self {
            backend: None,
            timeout: Duration::from_secs(1),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Open a trace; absent handles when the backend is missing or fails
    pub async fn begin(&self, label: &str, input: &str) -> (Option<TraceHandle>, Option<SpanHandle>) {
        let Some(backend) = &self.backend else {
            return (None, None);
        };

        match self.bounded("begin", backend.begin(label, input)).await {
            Some(ids) => {
                debug!(backend = backend.name(), trace_id = %ids.trace_id, "Trace opened");
                (
                    Some(TraceHandle {
                        trace_id: ids.trace_id.clone(),
                    }),
                    Some(SpanHandle {
                        ids,
                        tracer: self.clone(),
                    }),
                )
            }
            None => (None, None),
        }
    }

    /// Close the trace with the final answer
    pub async fn end(&self, trace: Option<TraceHandle>, span: Option<SpanHandle>, output: &str) {
        let (Some(backend), Some(_trace), Some(span)) = (&self.backend, trace, span) else {
            return;
        };
        self.bounded("end", backend.end(&span.ids, output)).await;
    }

    async fn bounded<T>(&self, op: &'static str, fut: impl std::future::Future<Output = Result<T>>) -> Option<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(op, error = %e, "Trace backend call failed");
                None
            }
            Err(_) => {
                warn!(op, timeout_secs = self.timeout.as_secs(), "Trace backend call timed out");
                None
            }
        }
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracer")
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Handle on an open trace
#[derive(Debug, Clone)]
pub struct TraceHandle {
    trace_id: String,
}

impl TraceHandle {
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }
}

/// Handle on the root span of a turn, carried in the turn state
#[derive(Debug, Clone)]
pub struct SpanHandle {
    ids: TraceIds,
    tracer: Tracer,
}

impl SpanHandle {
    /// Attach key/value pairs to the span
    pub async fn annotate<K, I>(&self, fields: I)
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let Some(backend) = &self.tracer.backend else {
            return;
        };
        let fields: Fields = fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.tracer
            .bounded("annotate", backend.annotate(&self.ids, &fields))
            .await;
    }

    /// Record a child span for one tool call
    pub async fn tool_span(&self, tool: &str, input: &str, output: &str) {
        let Some(backend) = &self.tracer.backend else {
            return;
        };
        self.tracer
            .bounded("tool_span", backend.tool_span(&self.ids, tool, input, output))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingBackend, TraceEvent};
    use serde_json::json;

    #[tokio::test]
    async fn test_disabled_tracer_has_no_handles() {
        let (trace, span) = Tracer::disabled().begin("agent", "hi").await;
        assert!(trace.is_none());
        assert!(span.is_none());
    }

    #[tokio::test]
    async fn test_full_lifecycle_is_recorded() {
        let backend = Arc::new(RecordingBackend::new());
        let tracer = Tracer::new(backend.clone(), Duration::from_secs(1));

        let (trace, span) = tracer.begin("agent", "hi").await;
        let span = span.unwrap();
        span.annotate([("empty_input", json!(false))]).await;
        span.tool_span("calculator", "1+1", "2").await;
        tracer.end(trace, Some(span), "done").await;

        let events = backend.events();
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[0],
            TraceEvent::Begin {
                label: "agent".to_string(),
                input: "hi".to_string()
            }
        );
        assert_eq!(events[3], TraceEvent::End { output: "done".to_string() });
    }

    #[tokio::test]
    async fn test_failing_begin_degrades_to_absent_handles() {
        let backend = Arc::new(RecordingBackend::failing());
        let tracer = Tracer::new(backend.clone(), Duration::from_secs(1));

        let (trace, span) = tracer.begin("agent", "hi").await;
        assert!(trace.is_none());
        assert!(span.is_none());

        tracer.end(trace, span, "answer").await;
        assert!(backend.events().is_empty());
    }

    #[tokio::test]
    async fn test_failing_annotate_is_swallowed() {
        let backend = Arc::new(RecordingBackend::failing_after_begin());
        let tracer = Tracer::new(backend.clone(), Duration::from_secs(1));

        let (trace, span) = tracer.begin("agent", "hi").await;
        let span = span.unwrap();
        span.annotate([("k", json!("v"))]).await;
        tracer.end(trace, Some(span), "answer").await;

        assert_eq!(backend.events().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out() {
        let backend = Arc::new(RecordingBackend::new().with_delay(Duration::from_secs(60)));
        let tracer = Tracer::new(backend, Duration::from_secs(1));

        let (trace, span) = tracer.begin("agent", "hi").await;
        assert!(trace.is_none());
        assert!(span.is_none());
    }
}
