//! Shared application state

use crate::error::ApiError;
use anyhow::{Context, Result};
use llm_bridge::Providers;
use news_core::config::Settings;
use news_core::generator::ArticleGenerator;
use news_core::judge::BiasJudge;
use news_core::pipeline::DeepResearchGenerator;
use news_core::research::ResearchLoop;
use news_core::selector::BackendSelector;
use news_core::store::ArticleStore;
use std::sync::Arc;

pub struct AppState {
    /// None when no inference backend answered at startup
    pub judge: Option<BiasJudge>,
    /// Writers by provider name, the default first
    pub writers: Vec<(String, Arc<ArticleGenerator>)>,
    pub research: Option<Arc<ResearchLoop>>,
    pub store: ArticleStore,
    pub mock_mode: bool,
}

impl AppState {
    pub async fn build(settings: &Settings, providers: Providers) -> Result<Self> {
        let judge = match BackendSelector::connect(
            providers.backends,
            Some((settings.bias_backend, None)),
        )
        .await
        {
            Ok(selector) => Some(BiasJudge::new(Arc::new(selector))),
            Err(e) => {
                tracing::warn!("Bias judging disabled: {}", e);
                None
            }
        };

        let writers = providers
            .generators
            .into_iter()
            .map(|provider| {
                let name = provider.name().to_string();
                (name, Arc::new(ArticleGenerator::new(provider)))
            })
            .collect();

        let research = providers
            .search
            .map(|search| Arc::new(ResearchLoop::new(search, settings.research.clone())));

        let store = ArticleStore::open(settings.articles_dir.clone()).with_context(|| {
            format!(
                "Failed to open article store at {}",
                settings.articles_dir.display()
            )
        })?;

        Ok(Self {
            judge,
            writers,
            research,
            store,
            mock_mode: settings.mock_mode,
        })
    }

    pub fn judge(&self) -> Result<&BiasJudge, ApiError> {
        self.judge
            .as_ref()
            .ok_or(ApiError::NotConfigured("bias judging"))
    }

    /// Writer by provider name, or the default one
    pub fn writer(&self, provider: Option<&str>) -> Result<Arc<ArticleGenerator>, ApiError> {
        let found = match provider.map(str::trim).filter(|p| !p.is_empty()) {
            Some(name) => self
                .writers
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name)),
            None => self.writers.first(),
        };
        found
            .map(|(_, writer)| writer.clone())
            .ok_or(ApiError::NotConfigured("article generation"))
    }

    pub fn research(&self) -> Result<Arc<ResearchLoop>, ApiError> {
        self.research
            .clone()
            .ok_or(ApiError::NotConfigured("deep research"))
    }

    pub fn deep_research(&self, provider: Option<&str>) -> Result<DeepResearchGenerator, ApiError> {
        Ok(DeepResearchGenerator::new(
            self.research()?,
            self.writer(provider)?,
        ))
    }
}
