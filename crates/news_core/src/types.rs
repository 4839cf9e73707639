//! Core types for the newsdesk services
//!
//! Articles, bias judgments and backend configuration shared by the
//! judge, the generator, the research loop and the article store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a saved article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub Uuid);

impl ArticleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ArticleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ArticleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| format!("invalid article id '{}': {}", s, e))
    }
}

/// Kind of article to write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleType {
    Blog,
    News,
    Explainer,
    Review,
    HowTo,
    Interview,
    Column,
    PressRelease,
}

impl ArticleType {
    pub const ALL: [ArticleType; 8] = [
        ArticleType::Blog,
        ArticleType::News,
        ArticleType::Explainer,
        ArticleType::Review,
        ArticleType::HowTo,
        ArticleType::Interview,
        ArticleType::Column,
        ArticleType::PressRelease,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleType::Blog => "blog",
            ArticleType::News => "news",
            ArticleType::Explainer => "explainer",
            ArticleType::Review => "review",
            ArticleType::HowTo => "how_to",
            ArticleType::Interview => "interview",
            ArticleType::Column => "column",
            ArticleType::PressRelease => "press_release",
        }
    }

    /// Human-readable label used inside prompts
    pub fn label(&self) -> &'static str {
        match self {
            ArticleType::Blog => "blog post",
            ArticleType::News => "news article",
            ArticleType::Explainer => "explainer",
            ArticleType::Review => "review",
            ArticleType::HowTo => "how-to guide",
            ArticleType::Interview => "interview piece",
            ArticleType::Column => "opinion column",
            ArticleType::PressRelease => "press release",
        }
    }
}

impl fmt::Display for ArticleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        ArticleType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown article type '{}'", s))
    }
}

/// Writing tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Formal,
    Casual,
    Technical,
    Friendly,
    Persuasive,
    Informative,
    Entertaining,
}

impl Tone {
    pub const ALL: [Tone; 7] = [
        Tone::Formal,
        Tone::Casual,
        Tone::Technical,
        Tone::Friendly,
        Tone::Persuasive,
        Tone::Informative,
        Tone::Entertaining,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Formal => "formal",
            Tone::Casual => "casual",
            Tone::Technical => "technical",
            Tone::Friendly => "friendly",
            Tone::Persuasive => "persuasive",
            Tone::Informative => "informative",
            Tone::Entertaining => "entertaining",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Tone::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown tone '{}'", s))
    }
}

/// A cited source gathered during research
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSnippet {
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub snippet: String,
}

/// A generated (and possibly user-edited) article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    /// Markdown body
    pub body: String,
    pub article_type: ArticleType,
    pub tone: Tone,
    /// Target length in characters
    pub target_length: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Provider that generated the text, e.g. "openai/gpt-4o-mini"
    #[serde(default)]
    pub generated_by: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceSnippet>,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        article_type: ArticleType,
        tone: Tone,
        target_length: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ArticleId::new(),
            title: title.into(),
            body: body.into(),
            article_type,
            tone,
            target_length,
            created_at: now,
            updated_at: now,
            generated_by: None,
            sources: Vec::new(),
        }
    }

    pub fn char_count(&self) -> usize {
        self.body.chars().count()
    }
}

/// Local inference backend used by the bias judge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Ollama,
    Transformers,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Ollama, BackendKind::Transformers];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Ollama => "ollama",
            BackendKind::Transformers => "transformers",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(BackendKind::Ollama),
            "transformers" => Ok(BackendKind::Transformers),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// The backend the judge is currently pointed at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub backend: BackendKind,
    pub model: String,
    pub endpoint: String,
}

/// Analytical framing applied to an article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Viewpoint {
    Liberal,
    Conservative,
    Neutral,
}

impl Viewpoint {
    pub const ALL: [Viewpoint; 3] = [
        Viewpoint::Liberal,
        Viewpoint::Conservative,
        Viewpoint::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Viewpoint::Liberal => "liberal",
            Viewpoint::Conservative => "conservative",
            Viewpoint::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Viewpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One viewpoint's reading of an article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewpointAssessment {
    pub viewpoint: Viewpoint,
    pub summary: String,
    /// 0 (neutral) to 100 (extremely partisan)
    pub score: f64,
}

/// Coarse bucket for an aggregate bias score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiasLabel {
    Minimal,
    Slight,
    Moderate,
    Strong,
    Extreme,
}

impl BiasLabel {
    pub fn from_score(score: f64) -> Self {
        if score < 20.0 {
            BiasLabel::Minimal
        } else if score < 40.0 {
            BiasLabel::Slight
        } else if score < 60.0 {
            BiasLabel::Moderate
        } else if score < 80.0 {
            BiasLabel::Strong
        } else {
            BiasLabel::Extreme
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BiasLabel::Minimal => "minimal",
            BiasLabel::Slight => "slight",
            BiasLabel::Moderate => "moderate",
            BiasLabel::Strong => "strong",
            BiasLabel::Extreme => "extreme",
        }
    }
}

/// Result of judging one article. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasJudgment {
    /// SHA-256 of the judged text
    pub article_sha256: String,
    pub article_chars: usize,
    pub assessments: Vec<ViewpointAssessment>,
    pub score: f64,
    pub label: BiasLabel,
    pub summary: String,
    pub backend: BackendConfig,
    pub judged_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}
