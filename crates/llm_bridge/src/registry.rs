//! Builds concrete clients from [`Settings`]

use crate::gemini::{GeminiClient, GeminiConfig, GeminiSearch};
use crate::mock::{MockBackend, MockGenerator, MockSearch};
use crate::ollama::{OllamaClient, OllamaConfig};
use crate::openai::{OpenAiClient, OpenAiConfig};
use crate::tavily::TavilySearch;
use crate::transformers::{TransformersClient, TransformersConfig};
use anyhow::{Context, Result};
use news_core::config::{GeneratorKind, SearchKind, Settings};
use news_core::provider::{GenerationProvider, InferenceBackend, SearchProvider};
use news_core::BackendKind;
use std::sync::Arc;

/// Every client the services need. Missing credentials leave a slot empty.
#[derive(Clone)]
pub struct Providers {
    pub backends: Vec<Arc<dyn InferenceBackend>>,
    /// Configured writers, the default one first
    pub generators: Vec<Arc<dyn GenerationProvider>>,
    pub search: Option<Arc<dyn SearchProvider>>,
}

impl Providers {
    /// The default writer
    pub fn generator(&self) -> Option<&Arc<dyn GenerationProvider>> {
        self.generators.first()
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if settings.mock_mode {
            tracing::warn!("Mock mode enabled; no external services will be called");
            return Ok(Self::mock(settings));
        }

        let backends: Vec<Arc<dyn InferenceBackend>> = vec![
            Arc::new(OllamaClient::new(OllamaConfig {
                base_url: settings.ollama_url.clone(),
                default_model: settings.ollama_model.clone(),
                ..OllamaConfig::default()
            })?),
            Arc::new(TransformersClient::new(TransformersConfig {
                base_url: settings.transformers_url.clone(),
                default_model: settings.transformers_model.clone(),
                ..TransformersConfig::default()
            })?),
        ];

        let gemini = match &settings.gemini_api_key {
            Some(key) => Some(Arc::new(GeminiClient::new(GeminiConfig::new(
                key.clone(),
                settings.gemini_model.clone(),
            ))?)),
            None => None,
        };

        let openai: Option<Arc<dyn GenerationProvider>> = match &settings.openai_api_key {
            Some(key) => Some(Arc::new(OpenAiClient::new(OpenAiConfig::new(
                key.clone(),
                settings.openai_model.clone(),
            ))?)),
            None => None,
        };
        let gemini_writer = gemini
            .clone()
            .map(|client| client as Arc<dyn GenerationProvider>);

        // Default writer first, the other configured one (if any) after it
        let generators: Vec<Arc<dyn GenerationProvider>> = match settings.generator_kind() {
            Some(GeneratorKind::OpenAi) => {
                let default = openai.context("GENERATOR=openai requires OPENAI_API_KEY")?;
                std::iter::once(default).chain(gemini_writer).collect()
            }
            Some(GeneratorKind::Gemini) => {
                let default = gemini_writer.context("GENERATOR=gemini requires GEMINI_API_KEY")?;
                std::iter::once(default).chain(openai).collect()
            }
            None => {
                tracing::warn!("No OPENAI_API_KEY or GEMINI_API_KEY; article generation disabled");
                Vec::new()
            }
        };

        let search: Option<Arc<dyn SearchProvider>> = match settings.search_kind() {
            Some(SearchKind::Tavily) => {
                let key = settings
                    .tavily_api_key
                    .clone()
                    .context("SEARCH_PROVIDER=tavily requires TAVILY_API_KEY")?;
                Some(Arc::new(TavilySearch::new(key)?))
            }
            Some(SearchKind::Gemini) => {
                let client = gemini.context("SEARCH_PROVIDER=gemini requires GEMINI_API_KEY")?;
                Some(Arc::new(GeminiSearch::new(client)))
            }
            None => {
                tracing::warn!("No TAVILY_API_KEY or GEMINI_API_KEY; deep research disabled");
                None
            }
        };

        Ok(Self {
            backends,
            generators,
            search,
        })
    }

    pub fn mock(settings: &Settings) -> Self {
        Self {
            backends: vec![
                Arc::new(MockBackend::new(BackendKind::Ollama, settings.ollama_model.clone())),
                Arc::new(MockBackend::new(
                    BackendKind::Transformers,
                    settings.transformers_model.clone(),
                )),
            ],
            generators: vec![Arc::new(MockGenerator::new())],
            search: Some(Arc::new(MockSearch::new())),
        }
    }
}
