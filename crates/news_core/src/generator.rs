//! Article generation over a hosted text-generation API

use crate::error::{describe, NewsError, Result};
use crate::prompts;
use crate::provider::{CompletionRequest, GenerationProvider};
use crate::types::{Article, ArticleType, SourceSnippet, Tone};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const MIN_LENGTH: usize = 300;
pub const MAX_LENGTH: usize = 3000;
pub const DEFAULT_LENGTH: usize = 800;

/// What to write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRequest {
    pub topic: String,
    pub article_type: ArticleType,
    pub tone: Tone,
    /// Upper bound on the returned text, in characters
    #[serde(default = "default_length")]
    pub length: usize,
    #[serde(default)]
    pub include_seo: bool,
}

fn default_length() -> usize {
    DEFAULT_LENGTH
}

impl ArticleRequest {
    pub fn new(topic: impl Into<String>, article_type: ArticleType, tone: Tone) -> Self {
        Self {
            topic: topic.into(),
            article_type,
            tone,
            length: DEFAULT_LENGTH,
            include_seo: false,
        }
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(NewsError::InvalidInput("topic is empty".to_string()));
        }
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&self.length) {
            return Err(NewsError::InvalidInput(format!(
                "length {} is outside {}..={}",
                self.length, MIN_LENGTH, MAX_LENGTH
            )));
        }
        Ok(())
    }
}

/// Provider output after length post-processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArticle {
    pub title: String,
    /// Markdown text, at most `length` characters
    pub text: String,
    /// True when the provider overshot and the text was cut
    pub trimmed: bool,
    /// Character count before trimming
    pub original_chars: usize,
    /// "provider/model"
    pub generated_by: String,
    #[serde(default)]
    pub sources: Vec<SourceSnippet>,
}

impl GeneratedArticle {
    pub fn into_article(self, request: &ArticleRequest) -> Article {
        let mut article = Article::new(
            self.title,
            self.text,
            request.article_type,
            request.tone,
            request.length,
        );
        article.generated_by = Some(self.generated_by);
        article.sources = self.sources;
        article
    }
}

pub struct ArticleGenerator {
    provider: Arc<dyn GenerationProvider>,
}

impl ArticleGenerator {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_label(&self) -> String {
        format!("{}/{}", self.provider.name(), self.provider.model())
    }

    /// Write one article. `source_context` switches to the research template.
    pub async fn generate(
        &self,
        request: &ArticleRequest,
        source_context: Option<&str>,
    ) -> Result<GeneratedArticle> {
        request.validate()?;

        let prompt = match source_context {
            Some(context) => prompts::research_article_prompt(
                &request.topic,
                context,
                request.article_type,
                request.tone,
                request.length,
                request.include_seo,
            ),
            None => prompts::article_prompt(
                &request.topic,
                request.article_type,
                request.tone,
                request.length,
                request.include_seo,
            ),
        };

        tracing::info!(
            "Generating {} on '{}' with {}",
            request.article_type,
            request.topic,
            self.provider_label()
        );
        let raw = self
            .call(&CompletionRequest::new(prompts::WRITER_SYSTEM, prompt))
            .await?;

        let original_chars = raw.chars().count();
        let title = extract_title(&raw).unwrap_or_else(|| request.topic.trim().to_string());
        let text = trim_to_length(&raw, request.length);
        let trimmed = text.chars().count() < original_chars;
        if trimmed {
            tracing::warn!(
                "Provider overshot length bound ({} > {} chars); trimmed",
                original_chars,
                request.length
            );
        }

        Ok(GeneratedArticle {
            title,
            text,
            trimmed,
            original_chars,
            generated_by: self.provider_label(),
            sources: Vec::new(),
        })
    }

    /// Five candidate titles with a short rationale each
    pub async fn generate_titles(&self, topic: &str, article_type: ArticleType) -> Result<String> {
        let request = CompletionRequest::new(
            prompts::TITLE_SYSTEM,
            prompts::title_prompt(topic, article_type),
        )
        .with_max_tokens(800)
        .with_temperature(0.8);
        self.call(&request).await
    }

    pub async fn generate_outline(
        &self,
        topic: &str,
        article_type: ArticleType,
        tone: Tone,
    ) -> Result<String> {
        let request = CompletionRequest::new(
            prompts::OUTLINE_SYSTEM,
            prompts::outline_prompt(topic, article_type, tone),
        )
        .with_max_tokens(1000)
        .with_temperature(0.6);
        self.call(&request).await
    }

    /// Cheap round trip used to check credentials
    pub async fn validate(&self) -> Result<()> {
        let request = CompletionRequest::new("", "Hello").with_max_tokens(10);
        self.provider
            .complete(&request)
            .await
            .map(|_| ())
            .map_err(|e| self.failed(describe(&e)))
    }

    async fn call(&self, request: &CompletionRequest) -> Result<String> {
        let text = self
            .provider
            .complete(request)
            .await
            .map_err(|e| self.failed(describe(&e)))?;

        let text = text.trim();
        if text.is_empty() {
            return Err(self.failed("provider returned an empty response".to_string()));
        }
        Ok(text.to_string())
    }

    fn failed(&self, reason: String) -> NewsError {
        NewsError::GenerationFailed {
            provider: self.provider_label(),
            reason,
        }
    }
}

/// First Markdown heading, without its hashes
pub fn extract_title(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| line.starts_with('#'))
        .map(|line| line.trim_start_matches('#').trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Cut `text` to at most `limit` characters.
///
/// Prefers the last paragraph break, then the last sentence end, inside the
/// bound as long as that keeps at least half of it; otherwise cuts hard on
/// a character boundary.
pub fn trim_to_length(text: &str, limit: usize) -> String {
    let text = text.trim();
    let Some((cut, _)) = text.char_indices().nth(limit) else {
        return text.to_string();
    };
    let head = &text[..cut];
    let floor = head.len() / 2;

    if let Some(pos) = head.rfind("\n\n").filter(|&p| p >= floor) {
        return head[..pos].trim_end().to_string();
    }

    let sentence_end = head
        .char_indices()
        .filter(|(i, c)| {
            matches!(c, '.' | '!' | '?' | '。' | '！' | '？')
                && head[i + c.len_utf8()..]
                    .chars()
                    .next()
                    .map_or(true, char::is_whitespace)
        })
        .map(|(i, c)| i + c.len_utf8())
        .last();
    if let Some(end) = sentence_end.filter(|&e| e >= floor) {
        return head[..end].to_string();
    }

    head.trim_end().to_string()
}
