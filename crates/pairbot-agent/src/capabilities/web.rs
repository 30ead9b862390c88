//! Web search capability (Brave Search API).

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::base::{optional_i64, require_string, Capability};

/// User-Agent header.
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_2) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Brave Search endpoint.
const BRAVE_ENDPOINT: &str = "https://api.search.brave.com";

/// Default number of search results.
const DEFAULT_RESULT_COUNT: usize = 5;

// ─────────────────────────────────────────────
// WebSearchCapability
// ─────────────────────────────────────────────

/// Searches the web through the Brave Search API. Safe.
pub struct WebSearchCapability {
    api_key: Option<String>,
    endpoint: String,
    client: Client,
}

impl WebSearchCapability {
    /// `api_key` may be `None`; the `BRAVE_API_KEY` env var is the fallback.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            endpoint: BRAVE_ENDPOINT.to_string(),
            client: Client::builder()
                .user_agent(USER_AGENT)
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Point the capability at a different endpoint (mock servers in tests).
    #[cfg(test)]
    fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("BRAVE_API_KEY").ok())
    }
}

#[async_trait]
impl Capability for WebSearchCapability {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web. Args: {\"query\": \"...\", \"count\": 5}. Returns a \
         numbered list of results with titles, URLs, and descriptions."
    }

    async fn invoke(&self, args: &HashMap<String, Value>) -> anyhow::Result<String> {
        let query = require_string(args, "query")?;
        let count = optional_i64(args, "count").unwrap_or(DEFAULT_RESULT_COUNT as i64) as usize;
        let count = count.clamp(1, 10);

        let api_key = self.resolve_api_key().ok_or_else(|| {
            anyhow::anyhow!("No Brave API key configured (set BRAVE_API_KEY env var)")
        })?;

        debug!(query = %query, count = count, "searching web");

        let resp = self
            .client
            .get(format!("{}/res/v1/web/search", self.endpoint))
            .header("X-Subscription-Token", &api_key)
            .query(&[("q", &query), ("count", &count.to_string())])
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Brave API request failed: {e}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Brave API returned {status}: {body}");
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse Brave response: {e}"))?;

        let results = body["web"]["results"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        if results.is_empty() {
            return Ok("No results found.".into());
        }

        let mut output = Vec::new();
        for (i, r) in results.iter().enumerate() {
            let title = r["title"].as_str().unwrap_or("(no title)");
            let url = r["url"].as_str().unwrap_or("");
            let desc = r["description"].as_str().unwrap_or("");
            output.push(format!("{}. {}\n   {}\n   {}", i + 1, title, url, desc));
        }

        Ok(output.join("\n\n"))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query_args(q: &str) -> HashMap<String, Value> {
        let mut args = HashMap::new();
        args.insert("query".to_string(), json!(q));
        args
    }

    #[tokio::test]
    async fn test_search_formats_numbered_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/res/v1/web/search"))
            .and(query_param("q", "rust async"))
            .and(header("X-Subscription-Token", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "web": {
                    "results": [
                        {"title": "Tokio", "url": "https://tokio.rs", "description": "An async runtime"},
                        {"title": "Async Book", "url": "https://rust-lang.github.io/async-book", "description": "The async book"}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let cap = WebSearchCapability::new(Some("test-key".into())).with_endpoint(server.uri());
        let result = cap.invoke(&query_args("rust async")).await.unwrap();

        assert!(result.starts_with("1. Tokio"));
        assert!(result.contains("2. Async Book"));
        assert!(result.contains("https://tokio.rs"));
    }

    #[tokio::test]
    async fn test_search_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"web": {"results": []}})),
            )
            .mount(&server)
            .await;

        let cap = WebSearchCapability::new(Some("test-key".into())).with_endpoint(server.uri());
        let result = cap.invoke(&query_args("obscure")).await.unwrap();
        assert_eq!(result, "No results found.");
    }

    #[tokio::test]
    async fn test_search_api_error_becomes_capability_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let cap = WebSearchCapability::new(Some("test-key".into())).with_endpoint(server.uri());
        let result = cap.invoke(&query_args("rate limited")).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_search_missing_query_arg() {
        let cap = WebSearchCapability::new(Some("test-key".into()));
        let result = cap.invoke(&HashMap::new()).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("query"));
    }

    #[test]
    fn test_web_search_is_safe() {
        assert!(!WebSearchCapability::new(None).dangerous());
    }
}
