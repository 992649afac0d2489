//! Tools that expose the fact memory to the planner

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::memory::MemoryStore;
use crate::tools::{Tool, ToolContext};

/// Dumps every stored fact
pub struct ListMemoryTool {
    memory: Arc<MemoryStore>,
}

impl ListMemoryTool {
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for ListMemoryTool {
    fn name(&self) -> &str {
        "list_memory"
    }

    fn description(&self) -> &str {
        "List everything the user asked you to remember."
    }

    fn usage(&self) -> String {
        "list_memory()".to_string()
    }

    async fn execute(&self, _input: &str, _ctx: &ToolContext) -> Result<String> {
        let facts = self.memory.all();
        if facts.is_empty() {
            return Ok("No stored memory.".to_string());
        }
        Ok(facts
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// Reads one stored fact by key
pub struct MemoryLookupTool {
    memory: Arc<MemoryStore>,
}

impl MemoryLookupTool {
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for MemoryLookupTool {
    fn name(&self) -> &str {
        "memory_lookup"
    }

    fn description(&self) -> &str {
        "Return the remembered value for one key."
    }

    fn usage(&self) -> String {
        "memory_lookup(key)".to_string()
    }

    async fn execute(&self, key: &str, _ctx: &ToolContext) -> Result<String> {
        Ok(match self.memory.lookup(key) {
            Some((_, value)) => value,
            None => format!("No memory found for key '{}'", key.trim().to_lowercase()),
        })
    }
}
