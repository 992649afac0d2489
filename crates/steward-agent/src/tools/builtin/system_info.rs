use anyhow::Result;
use async_trait::async_trait;

use crate::tools::{Tool, ToolContext};

/// Reports who the agent is
pub struct SystemInfoTool {
    identity: String,
}

impl SystemInfoTool {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
        }
    }
}

impl Default for SystemInfoTool {
    fn default() -> Self {
        Self::new(concat!(
            "This is Personal AI Agent (steward v",
            env!("CARGO_PKG_VERSION"),
            ")."
        ))
    }
}

#[async_trait]
impl Tool for SystemInfoTool {
    fn name(&self) -> &str {
        "system_info"
    }

    fn description(&self) -> &str {
        "Describe this assistant."
    }

    fn usage(&self) -> String {
        "system_info()".to_string()
    }

    async fn execute(&self, _input: &str, _ctx: &ToolContext) -> Result<String> {
        Ok(self.identity.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identity_ignores_input() {
        let tool = SystemInfoTool::default();
        let out = tool.execute("anything", &ToolContext::default()).await.unwrap();
        assert!(out.starts_with("This is Personal AI Agent"));
    }
}
