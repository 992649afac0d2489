//! Conversational agent core: guardrails, fact memory, tool planning and
//! execution, JSON repair and observability traces.

pub mod agent;
pub mod error;
pub mod json_repair;
mod llm;
pub mod memory;
pub mod session;
pub mod tools;
pub mod trace;

#[cfg(test)]
mod testing;

pub use agent::{Agent, AgentBuilder, ChatEntry, GuardRules, Role, TurnOutcome, TurnState};
pub use error::{AgentError, AgentResult};
pub use json_repair::{extract_json, JsonRepair};
pub use memory::MemoryStore;
pub use session::{Session, APOLOGY};
pub use tools::builtin::{create_default_registry, Retrieval, ToolDeps};
pub use tools::registry::ToolRegistry;
pub use tools::router::ToolRouter;
pub use tools::{Tool, ToolCall, ToolContext};
pub use trace::{LangfuseBackend, LogBackend, SpanHandle, TraceBackend, TraceHandle, Tracer};
