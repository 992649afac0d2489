//! Web summary search using the DuckDuckGo Instant Answer API

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::tools::{Tool, ToolContext};

pub const DEFAULT_SEARCH_URL: &str = "https://api.duckduckgo.com";

const NO_SUMMARY: &str = "No summary found.";
const SEARCH_FAILED: &str = "Search failed.";

/// Shared HTTP client for connection pooling
static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

fn get_shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("steward/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client")
    })
}

#[derive(Debug, Default, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
}

/// Tool for searching the web
pub struct WebSearchTool {
    base_url: String,
}

impl WebSearchTool {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/?q={}&format=json&no_redirect=1&no_html=1",
            self.base_url,
            urlencoding::encode(query.trim())
        )
    }

    async fn fetch(&self, query: &str, ctx: &ToolContext) -> Result<InstantAnswer> {
        let response = get_shared_client()
            .get(self.search_url(query))
            .timeout(Duration::from_secs(ctx.http_timeout_secs))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<InstantAnswer>().await?)
    }
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_URL)
    }
}

fn summarize(answer: InstantAnswer) -> String {
    let text = answer.abstract_text.trim();
    if text.is_empty() {
        NO_SUMMARY.to_string()
    } else {
        text.to_string()
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Look up a short encyclopedic summary for a topic on the web."
    }

    fn usage(&self) -> String {
        "search(query)".to_string()
    }

    #[instrument(skip(self, query, ctx), fields(query = %query.chars().take(50).collect::<String>()))]
    async fn execute(&self, query: &str, ctx: &ToolContext) -> Result<String> {
        debug!(timeout_secs = ctx.http_timeout_secs, "Sending search request");
        match self.fetch(query, ctx).await {
            Ok(answer) => Ok(summarize(answer)),
            Err(e) => {
                warn!(error = %e, "Search request failed");
                Ok(SEARCH_FAILED.to_string())
            }
        }
    }
}
