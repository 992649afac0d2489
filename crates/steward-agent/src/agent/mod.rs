//! Agent decision core
//!
//! Guardrails, memory heuristics, tool planning and execution, and answer
//! synthesis for a single conversational turn.

mod pipeline;
pub mod plan;
pub mod prompts;
pub mod rules;
mod state;

pub use pipeline::{Agent, AgentBuilder, EMPTY_INPUT_REPLY, MEMORY_GUIDANCE, REFUSAL};
pub use plan::{ToolInvocation, ToolPlan};
pub use rules::{GuardRules, MemoryWrite, SafetyCategory, SafetyHit};
pub use state::{ChatEntry, Role, TurnOutcome, TurnState};
