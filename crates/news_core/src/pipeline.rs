//! Deep research generation: research loop, then the article generator

use crate::error::Result;
use crate::generator::{ArticleGenerator, ArticleRequest, GeneratedArticle};
use crate::research::{ResearchLoop, ResearchOutcome};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct ResearchedArticle {
    pub article: GeneratedArticle,
    pub research: ResearchOutcome,
}

pub struct DeepResearchGenerator {
    research: Arc<ResearchLoop>,
    generator: Arc<ArticleGenerator>,
}

impl DeepResearchGenerator {
    pub fn new(research: Arc<ResearchLoop>, generator: Arc<ArticleGenerator>) -> Self {
        Self {
            research,
            generator,
        }
    }

    /// Research `request.topic`, then write the article from the findings.
    ///
    /// Degraded research still produces an article from whatever was found.
    pub async fn generate(
        &self,
        request: &ArticleRequest,
        subtopics: Vec<String>,
    ) -> Result<ResearchedArticle> {
        request.validate()?;

        let research = self.research.run(&request.topic, subtopics).await?;
        if research.termination.is_degraded() {
            tracing::warn!(
                "Research for '{}' degraded ({:?}); generating from {} snippets",
                request.topic,
                research.termination,
                research.snippets.len()
            );
        }

        let context = research.source_context();
        let mut article = self.generator.generate(request, Some(&context)).await?;
        article.sources = research.snippets.clone();

        Ok(ResearchedArticle { article, research })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::tests::FixedProvider;
    use crate::research::tests::{snippet, ScriptedSearch};
    use crate::research::{ResearchConfig, Termination};
    use crate::types::{ArticleType, Tone};

    #[tokio::test]
    async fn test_sources_attached_to_article() {
        let search = ScriptedSearch::new(vec![Ok(vec![
            snippet("https://a", "Offshore wind capacity doubled"),
            snippet("https://b", "Auction prices fell"),
        ])]);
        let provider = Arc::new(FixedProvider::new("# Offshore wind\n\nCapacity doubled [1]."));
        let pipeline = DeepResearchGenerator::new(
            Arc::new(ResearchLoop::new(
                Arc::new(search),
                ResearchConfig {
                    max_iterations: 2,
                    min_snippets: 2,
                    results_per_query: 5,
                },
            )),
            Arc::new(ArticleGenerator::new(provider.clone())),
        );

        let request = ArticleRequest::new("offshore wind", ArticleType::News, Tone::Informative);
        let result = pipeline.generate(&request, Vec::new()).await.unwrap();

        assert_eq!(result.research.termination, Termination::Sufficient);
        assert_eq!(result.article.sources.len(), 2);
        assert_eq!(result.article.title, "Offshore wind");
        assert!(provider.prompts.lock()[0].contains("https://b"));
    }

    #[tokio::test]
    async fn test_degraded_research_still_generates() {
        let provider = Arc::new(FixedProvider::new("# Offshore wind\n\nBody."));
        let pipeline = DeepResearchGenerator::new(
            Arc::new(ResearchLoop::new(
                Arc::new(ScriptedSearch::new(Vec::new())),
                ResearchConfig::default(),
            )),
            Arc::new(ArticleGenerator::new(provider)),
        );

        let request = ArticleRequest::new("offshore wind", ArticleType::News, Tone::Informative);
        let result = pipeline.generate(&request, Vec::new()).await.unwrap();

        assert_eq!(result.research.termination, Termination::NoResults);
        assert!(result.article.sources.is_empty());
    }
}
