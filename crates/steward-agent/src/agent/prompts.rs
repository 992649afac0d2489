//! Prompt templates for the planning and synthesis model calls

use std::collections::BTreeMap;

use super::plan::ToolInvocation;

const PLANNING_PREAMBLE: &str = "You are Personal AI agent.\n\nTOOLS you can use:";

const PLANNING_INSTRUCTIONS: &str = r#"Decide which tools, if any, are needed to answer the user.
Reply with a JSON object of this shape:
{"steps": [{"tool": "<tool name>", "input": "<tool input>"}], "final_answer": "<answer>"}

- List steps in the order they must run. Use an empty list when no tool is needed.
- If the user asks about the date or time, you MUST include a step that calls calendar.
- Only include "final_answer" when "steps" is empty.

Return ONLY JSON."#;

const STRUCTURED_SCHEMA: &str = r#"You are Personal AI assistant.

The user explicitly asked for structured output.
- Reply ONLY in valid JSON.
- NO markdown.
- NO explanation.

JSON format:
{
  "answer": "main response",
  "key_points": ["..."],
  "sources": ["optional"]
}"#;

fn memory_block(memory: &BTreeMap<String, String>) -> String {
    if memory.is_empty() {
        return "(nothing stored)".to_string();
    }
    memory
        .iter()
        .map(|(k, v)| format!("- {}: {}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

fn results_block(records: &[ToolInvocation]) -> String {
    if records.is_empty() {
        return "(no tools were used)".to_string();
    }
    records
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Ask the model for a tool plan
pub fn planning(tools: &str, user: &str, memory: &BTreeMap<String, String>) -> String {
    format!(
        "{}\n{}\n\n{}\n\nUser: {}\nKnown memory:\n{}\n",
        PLANNING_PREAMBLE,
        tools,
        PLANNING_INSTRUCTIONS,
        user,
        memory_block(memory)
    )
}

/// Ask the model to turn tool results into a plain answer
pub fn synthesis(user: &str, records: &[ToolInvocation]) -> String {
    format!(
        "User: {}\n\nTool results:\n{}\n\nGive a clear answer.\n",
        user,
        results_block(records)
    )
}

/// Like [`synthesis`], but requesting the structured JSON answer
pub fn structured(user: &str, records: &[ToolInvocation]) -> String {
    format!(
        "{}\n\nUser: {}\n\nTool results:\n{}\n",
        STRUCTURED_SCHEMA,
        user,
        results_block(records)
    )
}
