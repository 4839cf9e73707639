//! Seams to the external services
//!
//! `llm_bridge` implements these against real HTTP APIs and as
//! deterministic mocks; the orchestration in this crate only sees the traits.

use crate::types::{BackendKind, SourceSnippet};
use anyhow::Result;
use async_trait::async_trait;

/// A local inference server the bias judge can run against
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Base URL of the server
    fn endpoint(&self) -> &str;

    /// Model used when a switch request names none
    fn default_model(&self) -> &str;

    /// Models the server can serve right now. An error means unreachable.
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Run one prompt and return the raw completion text
    async fn generate(&self, model: &str, system: &str, prompt: &str) -> Result<String>;
}

/// One text-generation call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            max_tokens: 3000,
            temperature: 0.7,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Hosted text-generation API used to write articles (OpenAI, Gemini)
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Short provider name, e.g. "openai"
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Web search used by the research loop
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceSnippet>>;
}
