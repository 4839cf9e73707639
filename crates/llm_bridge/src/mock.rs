//! Deterministic stand-ins for every external service
//!
//! Selected with `NEWSDESK_MOCK=1` so the server and CLI run without API keys
//! or a local inference server. Replies are derived from the prompt text, so
//! the same input always yields the same output.

use anyhow::Result;
use async_trait::async_trait;
use news_core::provider::{CompletionRequest, GenerationProvider, InferenceBackend, SearchProvider};
use news_core::{BackendKind, SourceSnippet};
use parking_lot::RwLock;
use std::sync::Arc;

/// Record of one call made to a mock
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub system: String,
    pub prompt: String,
}

#[derive(Clone, Default)]
struct CallLog {
    calls: Arc<RwLock<Vec<MockCall>>>,
}

impl CallLog {
    fn record(&self, system: &str, prompt: &str) {
        self.calls.write().push(MockCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
        });
    }

    fn snapshot(&self) -> Vec<MockCall> {
        self.calls.read().clone()
    }
}

/// Inference backend that scores articles by simple surface cues
#[derive(Clone)]
pub struct MockBackend {
    kind: BackendKind,
    endpoint: String,
    models: Vec<String>,
    log: CallLog,
}

impl MockBackend {
    pub fn new(kind: BackendKind, default_model: impl Into<String>) -> Self {
        Self {
            kind,
            endpoint: format!("mock://{}", kind),
            models: vec![default_model.into()],
            log: CallLog::default(),
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.log.snapshot()
    }
}

/// Viewpoint base score, keyed by a word only that persona uses
const PERSONA_SCORES: [(&str, f64); 3] = [
    ("progressive", 30.0),
    ("tradition", 40.0),
    ("fact checker", 20.0),
];

const LOADED_WORDS: [&str; 6] = [
    "shocking",
    "outrageous",
    "disaster",
    "radical",
    "betrayal",
    "scandal",
];

fn mock_score(prompt: &str) -> f64 {
    let (persona, article) = prompt.split_once("Article:").unwrap_or((prompt, prompt));
    let base = PERSONA_SCORES
        .iter()
        .find(|(needle, _)| persona.contains(needle))
        .map(|(_, score)| *score)
        .unwrap_or(25.0);

    let article = article.to_lowercase();
    let exclamations = article.matches('!').count() as f64;
    let loaded = LOADED_WORDS
        .iter()
        .filter(|w| article.contains(*w))
        .count() as f64;

    (base + exclamations * 5.0 + loaded * 10.0).min(100.0)
}

#[async_trait]
impl InferenceBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn default_model(&self) -> &str {
        &self.models[0]
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(self.models.clone())
    }

    async fn generate(&self, model: &str, system: &str, prompt: &str) -> Result<String> {
        if !self.models.iter().any(|m| m == model) {
            anyhow::bail!("model '{}' not found", model);
        }
        self.log.record(system, prompt);

        let score = mock_score(prompt);
        let tenor = if score < 40.0 {
            "The coverage is largely measured and sticks to verifiable claims."
        } else {
            "The coverage leans on loaded language and one-sided framing."
        };
        Ok(format!("{}\nSCORE: {}", tenor, score))
    }
}

/// Text generator that writes a short Markdown article about the topic
#[derive(Clone, Default)]
pub struct MockGenerator {
    log: CallLog,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.log.snapshot()
    }
}

/// Value of a `- Label: value` or `Label:\nvalue` line in a prompt
fn prompt_field(prompt: &str, label: &str) -> Option<String> {
    let mut lines = prompt.lines();
    while let Some(line) = lines.next() {
        let line = line.trim().trim_start_matches("- ");
        if let Some(value) = line.strip_prefix(label) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
            return lines.next().map(|next| next.trim().to_string());
        }
    }
    None
}

fn mock_article(topic: &str, researched: bool) -> String {
    let evidence = if researched {
        "Recent reporting gathered for this piece points to steady momentum, with several \
         independent sources describing the same trends."
    } else {
        "Observers describe steady momentum, although the details vary from place to place."
    };
    format!(
        "# {topic}: What You Need to Know\n\n\
         {topic} keeps coming up in conversation, and for good reason. This article walks \
         through the background, the current state of play and what to watch next.\n\n\
         ## Background\n\n\
         Interest in {topic} has grown over the past few years as costs fell and more \
         people gained hands-on experience with it.\n\n\
         ## Where Things Stand\n\n\
         {evidence}\n\n\
         ## Conclusion\n\n\
         {topic} is worth following closely. Start small, compare sources and form your own view.",
        topic = topic,
        evidence = evidence,
    )
}

#[async_trait]
impl GenerationProvider for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-writer"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.log.record(&request.system, &request.prompt);
        let prompt = &request.prompt;
        let topic = prompt_field(prompt, "Topic:")
            .or_else(|| prompt_field(prompt, "Original query:"))
            .unwrap_or_else(|| "Untitled".to_string());

        let reply = if prompt.contains("Suggest five compelling titles") {
            (1..=5)
                .map(|n| format!("{}. {} angle {}: a fresh look\n   Angle: reader benefit {}", n, topic, n, n))
                .collect::<Vec<_>>()
                .join("\n")
        } else if prompt.contains("detailed outline") {
            format!(
                "# {topic}\n\n## Introduction\n- Why {topic} matters now\n\n\
                 ## Background\n- How we got here\n\n## Current state\n- Key facts and figures\n\n\
                 ## Conclusion\n- What readers should do next",
                topic = topic
            )
        } else if prompt.contains("Write a high-quality article") {
            mock_article(&topic, prompt.contains("Research results:"))
        } else {
            "Hello! The mock writer is ready.".to_string()
        };
        Ok(reply)
    }
}

/// Search provider returning three synthetic results per query
#[derive(Clone, Default)]
pub struct MockSearch {
    queries: Arc<RwLock<Vec<String>>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.read().clone()
    }
}

fn slug(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[async_trait]
impl SearchProvider for MockSearch {
    fn name(&self) -> &str {
        "mock-search"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SourceSnippet>> {
        self.queries.write().push(query.to_string());
        let slug = slug(query);
        Ok((1..=3)
            .take(max_results)
            .map(|n| SourceSnippet {
                url: format!("https://news.example/{}/{}", slug, n),
                title: format!("{} report {}", query, n),
                snippet: format!(
                    "Finding {} on {}: figures published this year show continued growth.",
                    n, query
                ),
            })
            .collect())
    }
}
