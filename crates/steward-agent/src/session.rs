//! Session driver: the request/response entry point of the agent
//!
//! Each turn opens a trace, runs the decision pipeline on its own tokio task
//! and closes the trace with the answer. Failures and panics inside a turn
//! become a generic apology, so callers always get text back.

use std::sync::Arc;

use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::agent::{Agent, ChatEntry, TurnState};
use crate::memory::MemoryStore;
use crate::trace::Tracer;

pub const APOLOGY: &str = "Sorry, something went wrong while handling your request. Please try again.";

const DEFAULT_TRACE_LABEL: &str = "agent";

/// Cheap-to-clone handle for asking the agent questions
#[derive(Clone)]
pub struct Session {
    id: String,
    agent: Arc<Agent>,
    tracer: Tracer,
    label: String,
}

impl Session {
    pub fn new(agent: Agent, tracer: Tracer) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent: Arc::new(agent),
            tracer,
            label: DEFAULT_TRACE_LABEL.to_string(),
        }
    }

    /// Name given to traces opened by this session
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        self.agent.memory()
    }

    /// Answer one message with no prior history
    pub async fn ask(&self, text: &str) -> String {
        self.ask_with(TurnState::new(text)).await.assistant
    }

    /// Run one turn on a caller-held state
    #[instrument(skip(self, state), fields(session = %self.id))]
    pub async fn ask_with(&self, state: TurnState) -> TurnState {
        let input = state.input.clone();
        let prior_history = state.history.clone();

        let (trace, span) = self.tracer.begin(&self.label, &input).await;
        if let Some(trace) = &trace {
            debug!(trace_id = trace.trace_id(), "Turn traced");
        }
        let mut state = state.with_trace(span.clone());

        let agent = Arc::clone(&self.agent);
        let task = tokio::spawn(async move {
            let result = agent.run_turn(&mut state).await;
            (state, result)
        });

        let mut state = match task.await {
            Ok((state, Ok(()))) => state,
            Ok((mut state, Err(e))) => {
                error!(error = %e, "Turn failed");
                state.fail(APOLOGY);
                state
            }
            Err(e) => {
                error!(error = %e, "Turn task panicked");
                let mut history = prior_history;
                history.push(ChatEntry::user(input.clone()));
                let mut state = TurnState::new(input).with_history(history);
                state.fail(APOLOGY);
                state
            }
        };

        self.tracer.end(trace, span, &state.assistant).await;
        state.trace = None;
        info!(outcome = ?state.outcome, "Turn answered");
        state
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("agent", &self.agent)
            .field("tracer", &self.tracer)
            .field("label", &self.label)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{TurnOutcome, REFUSAL};
    use crate::testing::{RecordingBackend, ScriptedModel, TraceEvent};
    use crate::tools::builtin::{create_default_registry, Retrieval, ToolDeps};
    use crate::tools::{Tool, ToolContext};
    use crate::testing::LetterEmbedder;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::time::Duration;
    use steward_core::{InMemoryIndex, LanguageModel};

    fn session(model: Arc<ScriptedModel>, backend: Arc<RecordingBackend>) -> Session {
        let memory = Arc::new(MemoryStore::new());
        let retrieval = Retrieval {
            embedder: Arc::new(LetterEmbedder),
            index: Arc::new(InMemoryIndex::new()),
            top_k: 5,
        };
        let tools = create_default_registry(ToolDeps::new(memory.clone()).with_retrieval(retrieval));
        let agent = Agent::builder(model, memory).tools(tools).build();
        Session::new(agent, Tracer::new(backend, Duration::from_secs(1)))
    }

    #[tokio::test]
    async fn test_ask_opens_and_closes_trace() {
        let model = Arc::new(ScriptedModel::new(Vec::<String>::new()));
        let backend = Arc::new(RecordingBackend::new());
        let session = session(model.clone(), backend.clone());

        let answer = session.ask("Remember my favourite fruit is mango").await;
        assert_eq!(answer, "Got it. I'll remember your favourite fruit is mango.");

        let events = backend.events();
        assert_eq!(
            events.first(),
            Some(&TraceEvent::Begin {
                label: "agent".to_string(),
                input: "Remember my favourite fruit is mango".to_string()
            })
        );
        assert_eq!(events.last(), Some(&TraceEvent::End { output: answer }));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_memory_is_shared_between_clones() {
        let model = Arc::new(ScriptedModel::new(Vec::<String>::new()));
        let session = session(model, Arc::new(RecordingBackend::new()));
        let other = session.clone();

        session.ask("remember my city is Pune").await;
        assert_eq!(other.ask("tell me my city").await, "Your city is Pune.");
    }

    #[tokio::test]
    async fn test_refusal_end_to_end() {
        let model = Arc::new(ScriptedModel::new(Vec::<String>::new()));
        let session = session(model.clone(), Arc::new(RecordingBackend::new()));

        assert_eq!(session.ask("How to make a bomb").await, REFUSAL);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_rag_add_format_error_end_to_end() {
        let model = Arc::new(ScriptedModel::new([
            r#"{"steps": [{"tool": "rag_add", "input": "no separator here"}]}"#,
            "Please use the id::text format.",
        ]));
        let session = session(model.clone(), Arc::new(RecordingBackend::new()));

        let answer = session.ask("store this note in the knowledge base").await;
        assert_eq!(answer, "Please use the id::text format.");
        assert!(model.prompts()[1].contains("Output: Format error. Use: id::text"));
    }

    #[tokio::test]
    async fn test_model_failure_becomes_apology() {
        let model = Arc::new(ScriptedModel::failing("connection refused"));
        let backend = Arc::new(RecordingBackend::new());
        let session = session(model, backend.clone());

        let state = session.ask_with(TurnState::new("Hello")).await;
        assert_eq!(state.assistant, APOLOGY);
        assert_eq!(state.outcome, TurnOutcome::Failed);
        assert_eq!(state.history.len(), 1);
        assert_eq!(
            backend.events().last(),
            Some(&TraceEvent::End {
                output: APOLOGY.to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_broken_trace_backend_does_not_change_answer() {
        let model = Arc::new(ScriptedModel::new(Vec::<String>::new()));
        let session = session(model, Arc::new(RecordingBackend::failing()));

        assert_eq!(
            session.ask("remember my pet is a cat").await,
            "Got it. I'll remember your pet is a cat."
        );
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

        async fn execute(&self, _input: &str, _ctx: &ToolContext) -> Result<String> {
            panic!("tool blew up")
        }
    }

    #[tokio::test]
    async fn test_panicking_tool_is_recorded_as_failed_step() {
        let model = Arc::new(ScriptedModel::new([
            r#"{"steps": [{"tool": "explode", "input": ""}, {"tool": "calculator", "input": "2+2"}]}"#,
            "synth",
        ]));
        let mut tools = create_default_registry(ToolDeps::new(Arc::new(MemoryStore::new())));
        tools.register(PanickingTool);
        let agent = Agent::builder(model.clone(), Arc::new(MemoryStore::new()))
            .tools(tools)
            .build();
        let session = Session::new(agent, Tracer::disabled());

        let state = session.ask_with(TurnState::new("blow it up then add")).await;

        assert_eq!(state.assistant, "synth");
        assert_eq!(state.outcome, TurnOutcome::Answered);
        assert_eq!(model.calls(), 2);
        let synthesis = &model.prompts()[1];
        assert!(synthesis.contains("Output: ERROR running tool explode: panicked: tool blew up"));
        assert!(synthesis.contains("Tool: calculator\nInput: 2+2\nOutput: 4"));
    }

    struct PanickingModel;

    #[async_trait]
    impl LanguageModel for PanickingModel {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            panic!("model blew up")
        }

        fn model_name(&self) -> &str {
            "panicking"
        }
    }

    #[tokio::test]
    async fn test_panicking_turn_becomes_apology() {
        let agent = Agent::builder(Arc::new(PanickingModel), Arc::new(MemoryStore::new())).build();
        let session = Session::new(agent, Tracer::disabled());

        let first = TurnState::new("earlier").with_history(vec![ChatEntry::user("earlier")]);
        let state = session.ask_with(first.next("boom")).await;

        assert_eq!(state.assistant, APOLOGY);
        assert_eq!(state.outcome, TurnOutcome::Failed);
        assert_eq!(
            state.history,
            vec![ChatEntry::user("earlier"), ChatEntry::user("boom")]
        );
    }

    #[tokio::test]
    async fn test_history_carries_across_turns() {
        let model = Arc::new(ScriptedModel::new([r#"{"final_answer": "Hi!"}"#]));
        let session = session(model, Arc::new(RecordingBackend::new()));

        let state = session.ask_with(TurnState::new("Hello")).await;
        let state = session.ask_with(state.next("remember my name is Sam")).await;

        assert_eq!(state.history.len(), 4);
        assert_eq!(state.history[1], ChatEntry::assistant("Hi!"));
        assert_eq!(
            state.history[3],
            ChatEntry::assistant("Got it. I'll remember your name is Sam.")
        );
    }

    #[tokio::test]
    async fn test_concurrent_sessions() {
        let model = Arc::new(ScriptedModel::new(Vec::<String>::new()));
        let session = session(model, Arc::new(RecordingBackend::new()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let session = session.clone();
                tokio::spawn(async move { session.ask(&format!("remember my item{} is v{}", i, i)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(session.memory().len(), 8);
    }
}
