//! The per-turn decision pipeline
//!
//! Stages run in a fixed order and never loop back: empty-input guard,
//! memory write, memory read, safety refusal, injection sanitizing, tool
//! planning, tool execution, synthesis.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use steward_core::LanguageModel;
use tracing::{debug, info, instrument, warn};

use crate::error::AgentResult;
use crate::json_repair::{extract_json, JsonRepair};
use crate::llm;
use crate::memory::MemoryStore;
use crate::tools::registry::ToolRegistry;
use crate::tools::router::ToolRouter;
use crate::tools::ToolContext;
use crate::trace::SpanHandle;

use super::plan::{ToolInvocation, ToolPlan};
use super::prompts;
use super::rules::{GuardRules, MemoryWrite};
use super::state::{TurnOutcome, TurnState};

pub const EMPTY_INPUT_REPLY: &str = "I didn't receive any message.";
pub const MEMORY_GUIDANCE: &str =
    "I couldn't understand what to remember. Please say: 'Remember my favourite fruit is mango'";
pub const REFUSAL: &str =
    "I\u{2019}m here to help, but I can\u{2019}t assist with that request. Please stay safe.";

const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// The decision core
pub struct Agent {
    model: Arc<dyn LanguageModel>,
    repair: JsonRepair,
    router: ToolRouter,
    memory: Arc<MemoryStore>,
    rules: GuardRules,
    model_timeout: Duration,
}

/// Builder for [`Agent`]
pub struct AgentBuilder {
    model: Arc<dyn LanguageModel>,
    memory: Arc<MemoryStore>,
    repair_model: Option<Arc<dyn LanguageModel>>,
    tools: ToolRegistry,
    tool_ctx: ToolContext,
    tool_timeout: Duration,
    model_timeout: Duration,
    rules: GuardRules,
}

impl AgentBuilder {
    /// Model used for the JSON repair tier; defaults to the main model
    pub fn repair_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.repair_model = Some(model);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn tool_context(mut self, ctx: ToolContext) -> Self {
        self.tool_ctx = ctx;
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn rules(mut self, rules: GuardRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn build(self) -> Agent {
        let repair_model = self.repair_model.unwrap_or_else(|| self.model.clone());
        Agent {
            repair: JsonRepair::new(repair_model, self.model_timeout),
            router: ToolRouter::new(self.tools, self.tool_ctx, self.tool_timeout),
            model: self.model,
            memory: self.memory,
            rules: self.rules,
            model_timeout: self.model_timeout,
        }
    }
}

async fn annotate<K, I>(span: Option<&SpanHandle>, fields: I)
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    if let Some(span) = span {
        span.annotate(fields).await;
    }
}

impl Agent {
    pub fn builder(model: Arc<dyn LanguageModel>, memory: Arc<MemoryStore>) -> AgentBuilder {
        AgentBuilder {
            model,
            memory,
            repair_model: None,
            tools: ToolRegistry::new(),
            tool_ctx: ToolContext::default(),
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            rules: GuardRules::default(),
        }
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub fn rules(&self) -> &GuardRules {
        &self.rules
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.router.registry()
    }

    /// Run one turn, filling in `state.assistant`
    ///
    /// On error only the user entry has been added to the history.
    #[instrument(skip(self, state), fields(model = self.model.model_name(), input_len = state.input.len()))]
    pub async fn run_turn(&self, state: &mut TurnState) -> AgentResult<()> {
        state.record_user();
        match self.decide(state).await {
            Ok((outcome, answer)) => {
                info!(outcome = ?outcome, answer_len = answer.len(), "Turn complete");
                state.finish(outcome, answer);
                Ok(())
            }
            Err(e) => {
                state.outcome = TurnOutcome::Failed;
                Err(e)
            }
        }
    }

    async fn decide(&self, state: &TurnState) -> AgentResult<(TurnOutcome, String)> {
        let input = state.input.as_str();
        let span = state.trace.as_ref();

        if input.trim().is_empty() {
            annotate(span, [("empty_input", json!(true))]).await;
            return Ok((TurnOutcome::EmptyInput, EMPTY_INPUT_REPLY.to_string()));
        }

        match self.rules.parse_memory_write(input) {
            MemoryWrite::Parsed { key, value } => {
                self.memory.write(key.clone(), value.clone());
                let reply = format!("Got it. I'll remember your {} is {}.", key, value);
                annotate(
                    span,
                    [("memory_write_key", json!(key)), ("memory_write_value", json!(value))],
                )
                .await;
                return Ok((TurnOutcome::MemoryWrite, reply));
            }
            MemoryWrite::Malformed => {
                debug!("Could not parse memory write request");
                return Ok((TurnOutcome::MemoryGuidance, MEMORY_GUIDANCE.to_string()));
            }
            MemoryWrite::NotRequested => {}
        }

        if self.rules.is_memory_query(input) {
            if let Some((key, value)) = self.memory.find_mentioned(input) {
                let reply = format!("Your {} is {}.", key, value);
                annotate(
                    span,
                    [("memory_read_key", json!(key)), ("memory_read_value", json!(value))],
                )
                .await;
                return Ok((TurnOutcome::MemoryRecall, reply));
            }
            debug!("Memory query matched no stored key");
        }

        if let Some(hit) = self.rules.check_safety(input) {
            warn!(category = %hit.category, pattern = %hit.pattern, "Refusing unsafe request");
            annotate(
                span,
                [
                    ("blocked_request", json!(input)),
                    ("safety_trigger", json!(true)),
                    ("safety_category", json!(hit.category.as_str())),
                ],
            )
            .await;
            return Ok((TurnOutcome::Refused, REFUSAL.to_string()));
        }

        let user = match self.rules.injection_marker(input) {
            Some(marker) => {
                warn!(marker, "Prompt injection attempt, sanitizing input");
                let sanitized = format!(
                    "The user attempted a prompt injection. Original request: '{}'. Please respond safely.",
                    input
                );
                annotate(
                    span,
                    [("original_input", json!(input)), ("sanitized_input", json!(sanitized))],
                )
                .await;
                sanitized
            }
            None => input.to_string(),
        };

        let plan = self.plan(&user, span).await?;
        let records = self.execute(&plan, span).await;
        let json_mode = self.rules.wants_json(input);

        let text = match plan.final_answer {
            Some(answer) => {
                debug!("Plan answered directly");
                answer
            }
            None => self.synthesize(&user, &records, json_mode).await?,
        };

        if json_mode {
            let tool_steps: Vec<String> = records.iter().map(ToString::to_string).collect();
            let wrapped = json!({ "answer": extract_json(&text), "tool_steps": tool_steps });
            return Ok((TurnOutcome::Answered, wrapped.to_string()));
        }

        Ok((TurnOutcome::Answered, text))
    }

    #[instrument(skip_all)]
    async fn plan(&self, user: &str, span: Option<&SpanHandle>) -> AgentResult<ToolPlan> {
        let prompt = prompts::planning(&self.router.registry().describe(), user, &self.memory.all());
        let raw = llm::complete(self.model.as_ref(), &prompt, self.model_timeout, "planning").await?;
        let value = self.repair.repair(&raw).await?;
        annotate(span, [("tool_plan", value.clone())]).await;

        let plan = ToolPlan::from_value(&value);
        info!(
            steps = plan.steps.len(),
            direct = plan.final_answer.is_some(),
            "Tool plan ready"
        );
        Ok(plan)
    }

    async fn execute(&self, plan: &ToolPlan, span: Option<&SpanHandle>) -> Vec<ToolInvocation> {
        let mut records = Vec::with_capacity(plan.steps.len());

        for step in &plan.steps {
            let output = self.router.invoke(&step.tool, &step.input).await;
            if let Some(span) = span {
                span.annotate([
                    (format!("tool_{}_input", step.tool), json!(step.input)),
                    (format!("tool_{}_output", step.tool), json!(output)),
                ])
                .await;
                span.tool_span(&step.tool, &step.input, &output).await;
            }
            records.push(ToolInvocation::new(&step.tool, &step.input, output));
        }

        records
    }

    async fn synthesize(&self, user: &str, records: &[ToolInvocation], json_mode: bool) -> AgentResult<String> {
        let prompt = if json_mode {
            prompts::structured(user, records)
        } else {
            prompts::synthesis(user, records)
        };
        llm::complete(self.model.as_ref(), &prompt, self.model_timeout, "synthesis").await
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("model", &self.model.model_name())
            .field("router", &self.router)
            .field("memory_entries", &self.memory.len())
            .field("model_timeout", &self.model_timeout)
            .finish()
    }
}
