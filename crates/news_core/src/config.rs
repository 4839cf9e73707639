//! Settings loaded from the environment (and `.env` when present)

use crate::research::ResearchConfig;
use crate::types::BackendKind;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Which hosted API writes articles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    OpenAi,
    Gemini,
}

impl FromStr for GeneratorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(GeneratorKind::OpenAi),
            "gemini" => Ok(GeneratorKind::Gemini),
            other => Err(format!("unknown generator '{}'", other)),
        }
    }
}

/// Which service the research loop searches with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Tavily,
    /// Gemini with the Google Search grounding tool
    Gemini,
}

impl FromStr for SearchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tavily" => Ok(SearchKind::Tavily),
            "gemini" => Ok(SearchKind::Gemini),
            other => Err(format!("unknown search provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Substitute deterministic mocks for every external call
    pub mock_mode: bool,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub tavily_api_key: Option<String>,
    pub generator: Option<GeneratorKind>,
    pub search: Option<SearchKind>,
    pub ollama_url: String,
    pub ollama_model: String,
    pub transformers_url: String,
    pub transformers_model: String,
    pub bias_backend: BackendKind,
    pub articles_dir: PathBuf,
    pub bind_addr: String,
    pub research: ResearchConfig,
}

impl Settings {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let defaults = ResearchConfig::default();
        let research = ResearchConfig {
            max_iterations: parse_or(get("RESEARCH_MAX_ITERATIONS"), defaults.max_iterations)
                .context("RESEARCH_MAX_ITERATIONS must be a positive number")?,
            min_snippets: parse_or(get("RESEARCH_MIN_SNIPPETS"), defaults.min_snippets)
                .context("RESEARCH_MIN_SNIPPETS must be a number")?,
            results_per_query: parse_or(get("RESEARCH_RESULTS_PER_QUERY"), defaults.results_per_query)
                .context("RESEARCH_RESULTS_PER_QUERY must be a number")?,
        };

        Ok(Self {
            mock_mode: get("NEWSDESK_MOCK").is_some_and(|v| is_truthy(&v)),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: or("OPENAI_MODEL", "gpt-4o-mini"),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: or("GEMINI_MODEL", "gemini-1.5-flash"),
            tavily_api_key: get("TAVILY_API_KEY"),
            generator: get("GENERATOR")
                .map(|v| v.parse::<GeneratorKind>())
                .transpose()
                .map_err(anyhow::Error::msg)?,
            search: get("SEARCH_PROVIDER")
                .map(|v| v.parse::<SearchKind>())
                .transpose()
                .map_err(anyhow::Error::msg)?,
            ollama_url: or("OLLAMA_BASE_URL", "http://localhost:11434"),
            ollama_model: or("OLLAMA_MODEL", "llama3.2"),
            transformers_url: or("TRANSFORMERS_URL", "http://localhost:8080"),
            transformers_model: or(
                "TRANSFORMERS_MODEL",
                "rinna/japanese-gpt-neox-3.6b-instruction-sft",
            ),
            bias_backend: get("BIAS_BACKEND")
                .map(|v| v.parse::<BackendKind>())
                .transpose()
                .map_err(anyhow::Error::msg)?
                .unwrap_or(BackendKind::Ollama),
            articles_dir: PathBuf::from(or("ARTICLES_DIR", "data/saved_articles")),
            bind_addr: or("NEWSDESK_ADDR", "127.0.0.1:3000"),
            research,
        })
    }

    /// Explicit choice, else whichever API key is present (OpenAI first)
    pub fn generator_kind(&self) -> Option<GeneratorKind> {
        self.generator.or_else(|| {
            if self.openai_api_key.is_some() {
                Some(GeneratorKind::OpenAi)
            } else if self.gemini_api_key.is_some() {
                Some(GeneratorKind::Gemini)
            } else {
                None
            }
        })
    }

    /// Explicit choice, else Tavily, else Gemini grounding
    pub fn search_kind(&self) -> Option<SearchKind> {
        self.search.or_else(|| {
            if self.tavily_api_key.is_some() {
                Some(SearchKind::Tavily)
            } else if self.gemini_api_key.is_some() {
                Some(SearchKind::Gemini)
            } else {
                None
            }
        })
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => Ok(v.trim().parse()?),
        None => Ok(default),
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]).unwrap();
        assert!(!s.mock_mode);
        assert_eq!(s.openai_model, "gpt-4o-mini");
        assert_eq!(s.ollama_url, "http://localhost:11434");
        assert_eq!(s.bias_backend, BackendKind::Ollama);
        assert_eq!(s.articles_dir, PathBuf::from("data/saved_articles"));
        assert_eq!(s.research, ResearchConfig::default());
        assert_eq!(s.generator_kind(), None);
        assert_eq!(s.search_kind(), None);
    }

    #[test]
    fn test_overrides() {
        let s = settings(&[
            ("NEWSDESK_MOCK", "yes"),
            ("GEMINI_API_KEY", "g-key"),
            ("BIAS_BACKEND", "transformers"),
            ("RESEARCH_MAX_ITERATIONS", "5"),
        ])
        .unwrap();
        assert!(s.mock_mode);
        assert_eq!(s.bias_backend, BackendKind::Transformers);
        assert_eq!(s.research.max_iterations, 5);
        assert_eq!(s.generator_kind(), Some(GeneratorKind::Gemini));
        assert_eq!(s.search_kind(), Some(SearchKind::Gemini));
    }

    #[test]
    fn test_blank_values_fall_back() {
        let s = settings(&[("OPENAI_API_KEY", "  "), ("OLLAMA_MODEL", "")]).unwrap();
        assert!(s.openai_api_key.is_none());
        assert_eq!(s.ollama_model, "llama3.2");
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(settings(&[("BIAS_BACKEND", "gpu")]).is_err());
        assert!(settings(&[("RESEARCH_MIN_SNIPPETS", "many")]).is_err());
    }
}
