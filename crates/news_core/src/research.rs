//! Iterative web research feeding the article generator
//!
//! ```text
//! Init -> Searching -> Synthesizing -> (Searching | Done)
//! ```
//!
//! The loop stops when the sufficiency heuristic is satisfied, when the
//! iteration cap is reached, or in degraded mode: two consecutive empty
//! searches, or any search provider error.

use crate::error::{describe, NewsError, Result};
use crate::provider::SearchProvider;
use crate::types::SourceSnippet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Query suffixes used once the heuristic reports no specific gaps
const ANGLES: [&str; 4] = ["latest developments", "analysis", "background", "statistics"];

/// Consecutive empty searches that end the loop
const MAX_EMPTY_SEARCHES: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchConfig {
    pub max_iterations: u32,
    pub min_snippets: usize,
    pub results_per_query: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            min_snippets: 5,
            results_per_query: 5,
        }
    }
}

/// Mutable state of one research request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResearchState {
    pub iteration: u32,
    pub snippets: Vec<SourceSnippet>,
    pub queries: Vec<String>,
    pub consecutive_empty: u32,
    pub sufficient: bool,
}

impl ResearchState {
    /// Append results, skipping URLs already collected. Returns how many were new.
    fn absorb(&mut self, results: Vec<SourceSnippet>) -> usize {
        let before = self.snippets.len();
        for result in results {
            if !self.snippets.iter().any(|s| s.url == result.url) {
                self.snippets.push(result);
            }
        }
        self.snippets.len() - before
    }
}

/// Verdict of a [`SufficiencyHeuristic`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Assessment {
    pub sufficient: bool,
    /// Subtopics still missing; drive the next query
    pub gaps: Vec<String>,
}

pub trait SufficiencyHeuristic: Send + Sync {
    fn assess(&self, topic: &str, state: &ResearchState) -> Assessment;
}

/// Enough snippets, and every requested subtopic mentioned somewhere
#[derive(Debug, Clone, Default)]
pub struct CoverageHeuristic {
    pub min_snippets: usize,
    pub subtopics: Vec<String>,
}

impl CoverageHeuristic {
    pub fn new(min_snippets: usize, subtopics: Vec<String>) -> Self {
        Self {
            min_snippets,
            subtopics: subtopics
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

impl SufficiencyHeuristic for CoverageHeuristic {
    fn assess(&self, _topic: &str, state: &ResearchState) -> Assessment {
        let haystack: Vec<String> = state
            .snippets
            .iter()
            .map(|s| format!("{} {}", s.title, s.snippet).to_lowercase())
            .collect();

        let gaps: Vec<String> = self
            .subtopics
            .iter()
            .filter(|sub| {
                let needle = sub.to_lowercase();
                !haystack.iter().any(|h| h.contains(&needle))
            })
            .cloned()
            .collect();

        Assessment {
            sufficient: state.snippets.len() >= self.min_snippets && gaps.is_empty(),
            gaps,
        }
    }
}

/// Why the loop stopped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Termination {
    Sufficient,
    MaxIterations,
    NoResults,
    SearchFailed { iteration: u32, message: String },
}

impl Termination {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Termination::NoResults | Termination::SearchFailed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchOutcome {
    pub topic: String,
    pub snippets: Vec<SourceSnippet>,
    pub queries: Vec<String>,
    pub iterations: u32,
    pub termination: Termination,
}

impl ResearchOutcome {
    /// Research block handed to the generator as source context
    pub fn source_context(&self) -> String {
        let mut text = format!("# {}\n\n", self.topic);
        if self.snippets.is_empty() {
            text.push_str("No sources were found; rely on general knowledge and say so.\n");
            return text;
        }

        text.push_str("## Findings\n\n");
        for (i, s) in self.snippets.iter().enumerate() {
            let title = if s.title.is_empty() { &s.url } else { &s.title };
            text.push_str(&format!("### [{}] {}\n{}\n\n", i + 1, title, s.snippet.trim()));
        }

        text.push_str("## Sources\n\n");
        for (i, s) in self.snippets.iter().enumerate() {
            text.push_str(&format!("[{}] {}\n", i + 1, s.url));
        }
        text
    }

    /// Markdown summary for display
    pub fn summary_markdown(&self) -> String {
        let mut text = String::from("## Research summary\n\n");
        text.push_str(&format!("**Topic:** {}\n\n", self.topic));
        text.push_str(&format!("**Iterations:** {}\n\n", self.iterations));
        text.push_str(&format!("**Queries:** {}\n\n", self.queries.len()));
        match &self.termination {
            Termination::Sufficient => text.push_str("**Stopped:** coverage reached\n\n"),
            Termination::MaxIterations => text.push_str("**Stopped:** iteration limit\n\n"),
            Termination::NoResults => {
                text.push_str("**Stopped:** search returned no results (degraded)\n\n")
            }
            Termination::SearchFailed { iteration, message } => text.push_str(&format!(
                "**Stopped:** search failed on iteration {} (degraded): {}\n\n",
                iteration, message
            )),
        }
        if !self.snippets.is_empty() {
            text.push_str(&format!("### Sources ({})\n\n", self.snippets.len()));
            for (i, s) in self.snippets.iter().take(10).enumerate() {
                text.push_str(&format!("{}. [{}]({})\n", i + 1, s.url, s.url));
            }
        }
        text
    }
}

enum Phase {
    Init,
    Searching { query: String },
    Synthesizing,
    Done(Termination),
}

pub struct ResearchLoop {
    search: Arc<dyn SearchProvider>,
    config: ResearchConfig,
}

impl ResearchLoop {
    pub fn new(search: Arc<dyn SearchProvider>, config: ResearchConfig) -> Self {
        Self { search, config }
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Research with the default coverage heuristic
    pub async fn run(&self, topic: &str, subtopics: Vec<String>) -> Result<ResearchOutcome> {
        let heuristic = CoverageHeuristic::new(self.config.min_snippets, subtopics);
        self.run_with(topic, &heuristic).await
    }

    /// Research with a caller-supplied sufficiency heuristic
    pub async fn run_with(
        &self,
        topic: &str,
        heuristic: &dyn SufficiencyHeuristic,
    ) -> Result<ResearchOutcome> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(NewsError::InvalidInput("research topic is empty".to_string()));
        }

        let max_iterations = self.config.max_iterations.max(1);
        let mut state = ResearchState::default();
        let mut phase = Phase::Init;

        let termination = loop {
            phase = match phase {
                Phase::Init => {
                    tracing::info!("Research started: {}", topic);
                    Phase::Searching {
                        query: topic.to_string(),
                    }
                }
                Phase::Searching { query } => {
                    state.iteration += 1;
                    tracing::info!(
                        "Research iteration {}/{}: {}",
                        state.iteration,
                        max_iterations,
                        query
                    );
                    let result = self.search.search(&query, self.config.results_per_query).await;
                    state.queries.push(query);

                    match result {
                        Ok(results) if results.is_empty() => {
                            state.consecutive_empty += 1;
                            if state.consecutive_empty >= MAX_EMPTY_SEARCHES {
                                tracing::warn!(
                                    "Search returned nothing {} times in a row; stopping early",
                                    state.consecutive_empty
                                );
                                Phase::Done(Termination::NoResults)
                            } else {
                                Phase::Synthesizing
                            }
                        }
                        Ok(results) => {
                            state.consecutive_empty = 0;
                            let added = state.absorb(results);
                            tracing::debug!("{} new snippets ({} total)", added, state.snippets.len());
                            Phase::Synthesizing
                        }
                        Err(e) => {
                            let err = NewsError::SearchProviderError {
                                provider: self.search.name().to_string(),
                                iteration: state.iteration,
                                reason: describe(&e),
                            };
                            tracing::warn!("{}; continuing with {} snippets", err, state.snippets.len());
                            Phase::Done(Termination::SearchFailed {
                                iteration: state.iteration,
                                message: describe(&e),
                            })
                        }
                    }
                }
                Phase::Synthesizing => {
                    let assessment = heuristic.assess(topic, &state);
                    state.sufficient = assessment.sufficient;
                    if assessment.sufficient {
                        Phase::Done(Termination::Sufficient)
                    } else if state.iteration >= max_iterations {
                        Phase::Done(Termination::MaxIterations)
                    } else {
                        Phase::Searching {
                            query: next_query(topic, &assessment.gaps, &state.queries),
                        }
                    }
                }
                Phase::Done(termination) => break termination,
            };
        };

        tracing::info!(
            "Research finished after {} iterations with {} snippets ({:?})",
            state.iteration,
            state.snippets.len(),
            termination
        );

        Ok(ResearchOutcome {
            topic: topic.to_string(),
            snippets: state.snippets,
            queries: state.queries,
            iterations: state.iteration,
            termination,
        })
    }
}

/// Refine the next query from the reported gaps, never repeating one
fn next_query(topic: &str, gaps: &[String], issued: &[String]) -> String {
    let candidates = gaps
        .iter()
        .map(|gap| format!("{} {}", topic, gap))
        .chain(ANGLES.iter().map(|angle| format!("{} {}", topic, angle)));

    for candidate in candidates {
        if !issued.iter().any(|q| q.eq_ignore_ascii_case(&candidate)) {
            return candidate;
        }
    }
    format!("{} ({})", topic, issued.len() + 1)
}
