//! Deterministic collaborators for unit tests

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use steward_core::{Embedder, Embedding, LanguageModel};
use uuid::Uuid;

use crate::tools::{Tool, ToolContext};
use crate::trace::{Fields, TraceBackend, TraceIds};

/// Language model that replays canned responses and records every prompt
pub(crate) struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    fail_with: Option<String>,
    delay: Option<Duration>,
}

impl ScriptedModel {
    pub(crate) fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
            fail_with: None,
            delay: None,
        }
    }

    /// Model whose every call fails with `message`
    pub(crate) fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new(Vec::<String>::new())
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.fail_with {
            bail!("{}", message);
        }
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted response left"))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Embeds text as its a-z letter histogram
pub(crate) struct LetterEmbedder;

#[async_trait]
impl Embedder for LetterEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut vector = vec![0.0f32; 26];
        for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
            vector[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        Ok(vector)
    }
}

/// Tool that always errors
pub(crate) struct FailingTool(pub &'static str);

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        self.0
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    async fn execute(&self, _input: &str, _ctx: &ToolContext) -> Result<String> {
        bail!("backend unavailable")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TraceEvent {
    Begin { label: String, input: String },
    Annotate(Fields),
    ToolSpan { tool: String, input: String, output: String },
    End { output: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailMode {
    Never,
    Always,
    AfterBegin,
}

/// Trace backend that keeps every event in memory
pub(crate) struct RecordingBackend {
    events: Mutex<Vec<TraceEvent>>,
    mode: FailMode,
    delay: Option<Duration>,
}

impl RecordingBackend {
    pub(crate) fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            mode: FailMode::Never,
            delay: None,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            mode: FailMode::Always,
            ..Self::new()
        }
    }

    pub(crate) fn failing_after_begin() -> Self {
        Self {
            mode: FailMode::AfterBegin,
            ..Self::new()
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    /// All annotations merged in arrival order
    pub(crate) fn annotations(&self) -> Fields {
        let mut merged = Fields::new();
        for event in self.events.lock().iter() {
            if let TraceEvent::Annotate(fields) = event {
                merged.extend(fields.clone());
            }
        }
        merged
    }

    pub(crate) fn tool_spans(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                TraceEvent::ToolSpan { tool, .. } => Some(format!("tool-{}", tool)),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, first: bool, event: TraceEvent) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.mode {
            FailMode::Always => bail!("trace backend down"),
            FailMode::AfterBegin if !first => bail!("trace backend down"),
            _ => {}
        }
        self.events.lock().push(event);
        Ok(())
    }
}

#[async_trait]
impl TraceBackend for RecordingBackend {
    async fn begin(&self, label: &str, input: &str) -> Result<TraceIds> {
        self.record(
            true,
            TraceEvent::Begin {
                label: label.to_string(),
                input: input.to_string(),
            },
        )
        .await?;
        Ok(TraceIds {
            trace_id: Uuid::new_v4().to_string(),
            span_id: Uuid::new_v4().to_string(),
        })
    }

    async fn annotate(&self, _ids: &TraceIds, fields: &Fields) -> Result<()> {
        self.record(false, TraceEvent::Annotate(fields.clone())).await
    }

    async fn tool_span(&self, _ids: &TraceIds, tool: &str, input: &str, output: &str) -> Result<()> {
        self.record(
            false,
            TraceEvent::ToolSpan {
                tool: tool.to_string(),
                input: input.to_string(),
                output: output.to_string(),
            },
        )
        .await
    }

    async fn end(&self, _ids: &TraceIds, output: &str) -> Result<()> {
        self.record(
            false,
            TraceEvent::End {
                output: output.to_string(),
            },
        )
        .await
    }

    fn name(&self) -> &str {
        "recording"
    }
}
