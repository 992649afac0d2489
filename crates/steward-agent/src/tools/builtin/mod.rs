//! Built-in tools for the agent

mod calculator;
mod calendar;
mod memory;
mod rag;
mod system_info;
mod web_search;

pub use calculator::{evaluate, CalcError, CalculatorTool};
pub use calendar::CalendarTool;
pub use memory::{ListMemoryTool, MemoryLookupTool};
pub use rag::{RagAddTool, RagQueryTool, Retrieval};
pub use system_info::SystemInfoTool;
pub use web_search::{WebSearchTool, DEFAULT_SEARCH_URL};

use std::sync::Arc;

use tracing::warn;

use super::registry::ToolRegistry;
use crate::memory::MemoryStore;

/// What the default tool set needs from its surroundings
#[derive(Debug, Clone)]
pub struct ToolDeps {
    pub memory: Arc<MemoryStore>,
    pub search_url: String,
    /// Knowledge-base handles; the `rag_*` tools are skipped without them
    pub retrieval: Option<Retrieval>,
}

impl ToolDeps {
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        Self {
            memory,
            search_url: DEFAULT_SEARCH_URL.to_string(),
            retrieval: None,
        }
    }

    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    pub fn with_retrieval(mut self, retrieval: Retrieval) -> Self {
        self.retrieval = Some(retrieval);
        self
    }
}

/// Create a registry with all default tools
pub fn create_default_registry(deps: ToolDeps) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(CalculatorTool);
    registry.register(WebSearchTool::new(deps.search_url));
    registry.register(SystemInfoTool::default());
    registry.register(ListMemoryTool::new(deps.memory.clone()));
    registry.register(MemoryLookupTool::new(deps.memory));
    registry.register(CalendarTool);

    match deps.retrieval {
        Some(retrieval) => {
            registry.register(RagQueryTool::new(retrieval.clone()));
            registry.register(RagAddTool::new(retrieval));
        }
        None => warn!("No knowledge base configured, rag tools disabled"),
    }

    registry
}
