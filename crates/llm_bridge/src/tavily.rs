//! Tavily web search client

use anyhow::{Context, Result};
use async_trait::async_trait;
use news_core::provider::SearchProvider;
use news_core::SourceSnippet;
use serde::{Deserialize, Serialize};

/// Tavily API client for web search
pub struct TavilySearch {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

/// Tavily's slower, higher-recall mode; research favours coverage
const SEARCH_DEPTH: &str = "advanced";

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'static str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: f64,
}

impl TavilySearch {
    /// Create a new Tavily client
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: "https://api.tavily.com".to_string(),
            client,
        })
    }

    /// Point the client at a different host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceSnippet>> {
        let request = TavilyRequest {
            api_key: &self.api_key,
            query,
            search_depth: SEARCH_DEPTH,
            max_results,
        };

        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send Tavily search request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Tavily API error {}: {}", status, body);
        }

        let tavily_response: TavilyResponse = response
            .json()
            .await
            .context("Failed to parse Tavily response")?;

        let mut results = tavily_response.results;
        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        Ok(results
            .into_iter()
            .filter(|r| !r.content.trim().is_empty())
            .take(max_results)
            .map(|r| SourceSnippet {
                url: r.url,
                title: r.title,
                snippet: r.content,
            })
            .collect())
    }
}
