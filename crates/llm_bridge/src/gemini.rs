//! Google Gemini integration
//!
//! Plain `generateContent` calls write articles; the same endpoint with the
//! `google_search` tool enabled backs the research loop, turning grounding
//! metadata into cited source snippets.

use anyhow::{Context, Result};
use async_trait::async_trait;
use news_core::provider::{CompletionRequest, GenerationProvider, SearchProvider};
use news_core::SourceSnippet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Configuration for Gemini API client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key for Google Gemini
    pub api_key: String,
    /// Model to use (default: gemini-1.5-flash)
    pub model: String,
    /// API base, overridable for tests
    pub base_url: String,
    /// Timeout in seconds
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Gemini API client
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    /// Answer `query` with Google Search grounding
    pub async fn grounded_answer(&self, query: &str) -> Result<GroundedAnswer> {
        let prompt = format!(
            concat!(
                "Search the web and summarise the most relevant, up-to-date facts about the ",
                "following topic. Include figures, dates and named sources where available.\n\n",
                "Topic: {}"
            ),
            query
        );

        let request = GenerateContentRequest {
            contents: vec![Content::user(&prompt)],
            system_instruction: None,
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
            generation_config: Some(GenerationConfig {
                max_output_tokens: 2048,
                temperature: 0.0,
            }),
        };

        let candidate = self.generate_content(&request).await?;
        let text = candidate.text();
        let metadata = candidate.grounding_metadata.unwrap_or_default();

        Ok(GroundedAnswer {
            sources: metadata.sources(&text),
            queries: metadata.web_search_queries,
            text,
        })
    }

    async fn generate_content(&self, request: &GenerateContentRequest) -> Result<Candidate> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({}): {}", status, error_text);
        }

        let gemini_response: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No candidates in Gemini response"))
    }
}

#[async_trait]
impl GenerationProvider for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = GenerateContentRequest {
            contents: vec![Content::user(&request.prompt)],
            system_instruction: (!request.system.is_empty())
                .then(|| Content::system(&request.system)),
            tools: Vec::new(),
            generation_config: Some(GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            }),
        };

        let text = self.generate_content(&body).await?.text();
        if text.is_empty() {
            anyhow::bail!("No text in Gemini response");
        }
        Ok(text)
    }
}

/// Text answer plus the web sources Gemini grounded it on
#[derive(Debug, Clone, PartialEq)]
pub struct GroundedAnswer {
    pub text: String,
    pub sources: Vec<SourceSnippet>,
    pub queries: Vec<String>,
}

/// Search provider backed by Gemini's Google Search grounding
pub struct GeminiSearch {
    client: Arc<GeminiClient>,
}

impl GeminiSearch {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchProvider for GeminiSearch {
    fn name(&self) -> &str {
        "gemini-search"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceSnippet>> {
        let mut answer = self.client.grounded_answer(query).await?;
        tracing::debug!(
            "Gemini grounded '{}' with {} sources via {:?}",
            query,
            answer.sources.len(),
            answer.queries
        );
        answer.sources.truncate(max_results);
        Ok(answer.sources)
    }
}

/// Gemini API request structure
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(text: &str) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }

    fn system(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

/// Gemini API response structure
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

impl Candidate {
    fn text(&self) -> String {
        self.content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
            .trim()
            .to_string()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
    #[serde(default)]
    grounding_supports: Vec<GroundingSupport>,
    #[serde(default)]
    web_search_queries: Vec<String>,
}

impl GroundingMetadata {
    /// One snippet per web chunk; the text is every answer segment citing it
    fn sources(&self, answer: &str) -> Vec<SourceSnippet> {
        self.grounding_chunks
            .iter()
            .enumerate()
            .filter_map(|(index, chunk)| {
                let web = chunk.web.as_ref()?;
                let cited: Vec<&str> = self
                    .grounding_supports
                    .iter()
                    .filter(|s| s.grounding_chunk_indices.contains(&index))
                    .filter_map(|s| s.segment.as_ref().map(|seg| seg.text.trim()))
                    .filter(|t| !t.is_empty())
                    .collect();
                let snippet = if cited.is_empty() {
                    answer.chars().take(300).collect()
                } else {
                    cited.join(" ")
                };
                Some(SourceSnippet {
                    url: web.uri.clone(),
                    title: web.title.clone(),
                    snippet,
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    uri: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingSupport {
    #[serde(default)]
    segment: Option<Segment>,
    #[serde(default)]
    grounding_chunk_indices: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    #[serde(default)]
    text: String,
}
