//! External research collaborators: web search and URL extraction.
//!
//! Both are exposed as registry tools so the research agent drives them
//! through the same action protocol as everything else.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::ResearchConfig;
use crate::error::{Result, SunsteadError};
use crate::tools::{Tool, ToolOutcome};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

#[derive(Clone)]
pub struct WebSearchTool {
    client: Client,
    config: ResearchConfig,
}

impl WebSearchTool {
    pub fn new(config: ResearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SunsteadError::Internal(format!("Failed to create search client: {e}")))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        "web_search"
    }

    fn description(&self) -> &'static str {
        "Search the web for current information (args: {\"query\": text, \"max_results\": up to 10})"
    }

    async fn call(&self, args: &Value) -> ToolOutcome {
        let Some(query) = args.get("query").and_then(Value::as_str) else {
            return ToolOutcome::failed("web_search requires a 'query' argument");
        };
        let max_results = args
            .get("max_results")
            .and_then(Value::as_u64)
            .unwrap_or(5)
            .clamp(1, 10);

        let mut request = self
            .client
            .post(format!("{}/search", self.config.search_base_url))
            .json(&json!({ "query": query, "max_results": max_results }));
        if let Some(key) = &self.config.search_api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return ToolOutcome::failed(format!("Search request failed: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            return ToolOutcome::failed(format!("Search service returned {status}"));
        }

        match response.json::<SearchResponse>().await {
            Ok(body) => {
                let results: Vec<Value> = body
                    .results
                    .iter()
                    .map(|r| json!({ "title": r.title, "url": r.url, "snippet": r.content }))
                    .collect();
                ToolOutcome::ok(json!({ "query": query, "results": results }))
            }
            Err(e) => ToolOutcome::failed(format!("Invalid search response: {e}")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    content: String,
}

#[derive(Clone)]
pub struct UrlExtractTool {
    client: Client,
    config: ResearchConfig,
}

impl UrlExtractTool {
    pub fn new(config: ResearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SunsteadError::Internal(format!("Failed to create extract client: {e}")))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Tool for UrlExtractTool {
    fn name(&self) -> &'static str {
        "extract_url"
    }

    fn description(&self) -> &'static str {
        "Fetch a web page and return its readable text (args: {\"url\": address})"
    }

    async fn call(&self, args: &Value) -> ToolOutcome {
        let Some(url) = args.get("url").and_then(Value::as_str) else {
            return ToolOutcome::failed("extract_url requires a 'url' argument");
        };

        let Some(base_url) = &self.config.extract_base_url else {
            return ToolOutcome::failed("URL extraction is not configured");
        };

        let mut request = self
            .client
            .post(format!("{base_url}/extract"))
            .json(&json!({ "url": url }));
        if let Some(key) = &self.config.search_api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return ToolOutcome::failed(format!("Extract request failed: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            return ToolOutcome::failed(format!("Extract service returned {status}"));
        }

        match response.json::<ExtractResponse>().await {
            Ok(body) if body.content.trim().is_empty() => {
                ToolOutcome::failed(format!("No readable content at {url}"))
            }
            Ok(body) => ToolOutcome::ok(json!({ "url": url, "content": body.content })),
            Err(e) => ToolOutcome::failed(format!("Invalid extract response: {e}")),
        }
    }
}
