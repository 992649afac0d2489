//! Per-turn state threaded through the decision pipeline

use serde::{Deserialize, Serialize};

use crate::trace::SpanHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One line of the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: Role,
    pub content: String,
}

impl ChatEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Which stage ended the turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    #[default]
    Pending,
    EmptyInput,
    MemoryWrite,
    MemoryGuidance,
    MemoryRecall,
    Refused,
    Answered,
    Failed,
}

/// Mutable record for one turn of conversation
///
/// `history` is append-only: a turn adds exactly one user entry and at most
/// one assistant entry.
#[derive(Debug, Clone, Default)]
pub struct TurnState {
    pub input: String,
    pub assistant: String,
    pub history: Vec<ChatEntry>,
    pub trace: Option<SpanHandle>,
    pub outcome: TurnOutcome,
}

impl TurnState {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    /// Continue an existing conversation
    pub fn with_history(mut self, history: Vec<ChatEntry>) -> Self {
        self.history = history;
        self
    }

    pub fn with_trace(mut self, trace: Option<SpanHandle>) -> Self {
        self.trace = trace;
        self
    }

    /// Start the next turn of the same conversation
    pub fn next(self, input: impl Into<String>) -> Self {
        Self::new(input).with_history(self.history)
    }

    pub(crate) fn record_user(&mut self) {
        self.history.push(ChatEntry::user(self.input.clone()));
    }

    /// Set the answer and log it
    pub(crate) fn finish(&mut self, outcome: TurnOutcome, answer: String) {
        self.history.push(ChatEntry::assistant(answer.clone()));
        self.assistant = answer;
        self.outcome = outcome;
    }

    /// Set a fallback answer without logging it
    pub(crate) fn fail(&mut self, answer: &str) {
        self.assistant = answer.to_string();
        self.outcome = TurnOutcome::Failed;
    }
}
