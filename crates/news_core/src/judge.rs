//! Three-viewpoint bias judgment
//!
//! Each viewpoint prompt goes to the same backend snapshot concurrently.
//! The first failing or unparseable viewpoint fails the whole judgment.

use crate::error::{describe, NewsError, Result};
use crate::prompts::{judge_prompt, JUDGE_SYSTEM, SCORE_MARKER};
use crate::selector::{ActiveBackend, BackendSelector};
use crate::types::{BackendKind, BiasJudgment, BiasLabel, Viewpoint, ViewpointAssessment};
use chrono::Utc;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Per-request backend override
#[derive(Debug, Clone, Default)]
pub struct BackendOverride {
    pub backend: Option<BackendKind>,
    pub model: Option<String>,
}

pub struct BiasJudge {
    selector: Arc<BackendSelector>,
}

impl BiasJudge {
    pub fn new(selector: Arc<BackendSelector>) -> Self {
        Self { selector }
    }

    pub fn selector(&self) -> &Arc<BackendSelector> {
        &self.selector
    }

    /// Judge an article against the active (or overridden) backend
    pub async fn judge(
        &self,
        article: &str,
        backend_override: Option<BackendOverride>,
    ) -> Result<BiasJudgment> {
        let article = article.trim();
        if article.is_empty() {
            return Err(NewsError::InvalidInput("article text is empty".to_string()));
        }

        let active = match backend_override {
            Some(o) => self.selector.resolve(o.backend, o.model).await?,
            None => self.selector.active(),
        };

        let started = Instant::now();
        tracing::info!(
            "Judging {} chars with {} ({})",
            article.chars().count(),
            active.config.backend,
            active.config.model
        );

        let (liberal, conservative, neutral) = tokio::try_join!(
            assess(&active, Viewpoint::Liberal, article),
            assess(&active, Viewpoint::Conservative, article),
            assess(&active, Viewpoint::Neutral, article),
        )?;

        let assessments = vec![liberal, conservative, neutral];
        let score = aggregate_score(&assessments);
        let label = BiasLabel::from_score(score);
        let summary = narrative(score, label, &assessments);

        Ok(BiasJudgment {
            article_sha256: format!("{:x}", Sha256::digest(article.as_bytes())),
            article_chars: article.chars().count(),
            assessments,
            score,
            label,
            summary,
            backend: active.config,
            judged_at: Utc::now(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}

async fn assess(
    active: &ActiveBackend,
    viewpoint: Viewpoint,
    article: &str,
) -> Result<ViewpointAssessment> {
    let failed = |reason: String| NewsError::JudgmentFailed {
        viewpoint,
        backend: active.config.backend,
        reason,
    };

    let prompt = judge_prompt(viewpoint, article);
    let response = active
        .client
        .generate(&active.config.model, JUDGE_SYSTEM, &prompt)
        .await
        .map_err(|e| failed(describe(&e)))?;

    let (summary, score) = parse_assessment(&response).map_err(failed)?;
    tracing::debug!("{} viewpoint scored {}", viewpoint, score);

    Ok(ViewpointAssessment {
        viewpoint,
        summary,
        score,
    })
}

fn score_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)score\s*[:：]\s*\**\s*(\d+(?:\.\d+)?)\b(\s*/\s*\d+)?")
            .expect("valid score regex")
    })
}

/// Split a viewpoint response into its analysis text and 0-100 score
///
/// The last `SCORE:` line wins so that a model quoting the instruction
/// earlier in its answer does not confuse the parser.
pub fn parse_assessment(response: &str) -> std::result::Result<(String, f64), String> {
    let response = response.trim();
    if response.is_empty() {
        return Err("empty response".to_string());
    }

    let captures = score_regex()
        .captures_iter(response)
        .last()
        .ok_or_else(|| format!("response has no '{} <0-100>' line", SCORE_MARKER))?;

    if let Some(scale) = captures.get(2) {
        return Err(format!(
            "score '{}{}' is not on the 0-100 scale",
            &captures[1],
            scale.as_str().trim()
        ));
    }

    let score: f64 = captures[1]
        .parse()
        .map_err(|_| format!("unreadable score '{}'", &captures[1]))?;
    if !(0.0..=100.0).contains(&score) {
        return Err(format!("score {} is outside 0-100", score));
    }

    let marker_start = captures.get(0).map(|m| m.start()).unwrap_or(response.len());
    let line_start = response[..marker_start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let summary = response[..line_start].trim().to_string();
    let summary = if summary.is_empty() {
        response[..marker_start].trim().to_string()
    } else {
        summary
    };

    Ok((summary, score))
}

/// Mean of the viewpoint scores, rounded to one decimal
pub fn aggregate_score(assessments: &[ViewpointAssessment]) -> f64 {
    if assessments.is_empty() {
        return 0.0;
    }
    let mean = assessments.iter().map(|a| a.score).sum::<f64>() / assessments.len() as f64;
    (mean * 10.0).round() / 10.0
}

fn narrative(score: f64, label: BiasLabel, assessments: &[ViewpointAssessment]) -> String {
    let mut text = format!("Overall bias {:.1}/100 ({}).", score, label.as_str());
    for a in assessments {
        text.push_str(&format!("\n\n{} ({:.0}/100): {}", a.viewpoint, a.score, a.summary));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InferenceBackend;
    use crate::selector::tests::FakeBackend;
    use tokio::sync::Notify;

    fn scripted() -> FakeBackend {
        FakeBackend::new(BackendKind::Ollama, &["llama3.2:latest"])
            .respond("progressive", "Leans on official sources.\nSCORE: 30")
            .respond("tradition", "Frames the policy favourably.\nSCORE: 55")
            .respond("fact checker", "Mostly factual, one loaded adjective.\nScore: 20")
    }

    async fn judge_with(backend: FakeBackend) -> BiasJudge {
        let backend: Arc<dyn InferenceBackend> = Arc::new(backend);
        let selector = BackendSelector::connect(vec![backend], None)
            .await
            .unwrap();
        BiasJudge::new(Arc::new(selector))
    }

    #[tokio::test]
    async fn test_judge_is_deterministic() {
        let judge = judge_with(scripted()).await;

        let first = judge.judge("The council approved the plan.", None).await.unwrap();
        let second = judge.judge("The council approved the plan.", None).await.unwrap();

        assert_eq!(first.score, 35.0);
        assert_eq!(first.score, second.score);
        assert_eq!(first.label, BiasLabel::Slight);
        assert_eq!(first.article_sha256, second.article_sha256);
        assert_eq!(first.assessments.len(), 3);
        assert_eq!(first.assessments[0].viewpoint, Viewpoint::Liberal);
        assert_eq!(first.assessments[2].summary, "Mostly factual, one loaded adjective.");
        assert_eq!(first.backend.model, "llama3.2:latest");
    }

    #[tokio::test]
    async fn test_judge_fails_on_unparseable_viewpoint() {
        let backend = FakeBackend::new(BackendKind::Ollama, &["llama3.2"])
            .respond("progressive", "Fine.\nSCORE: 10")
            .respond("tradition", "I cannot rate this.")
            .respond("fact checker", "Fine.\nSCORE: 10");
        let judge = judge_with(backend).await;

        let err = judge.judge("text", None).await.unwrap_err();
        assert!(matches!(
            err,
            NewsError::JudgmentFailed {
                viewpoint: Viewpoint::Conservative,
                backend: BackendKind::Ollama,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_judge_fails_on_provider_error() {
        let backend = FakeBackend::new(BackendKind::Ollama, &["llama3.2"])
            .respond("progressive", "Fine.\nSCORE: 10")
            .respond("tradition", "Fine.\nSCORE: 10");
        let judge = judge_with(backend).await;

        let err = judge.judge("text", None).await.unwrap_err();
        assert!(matches!(
            err,
            NewsError::JudgmentFailed {
                viewpoint: Viewpoint::Neutral,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_judge_rejects_empty_article() {
        let judge = judge_with(scripted()).await;
        let err = judge.judge("   ", None).await.unwrap_err();
        assert!(matches!(err, NewsError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_judge_override_uses_requested_model() {
        let backend = FakeBackend::new(BackendKind::Ollama, &["llama3.2:latest", "phi4:latest"])
            .respond("progressive", "a\nSCORE: 0")
            .respond("tradition", "b\nSCORE: 0")
            .respond("fact checker", "c\nSCORE: 0");
        let judge = judge_with(backend).await;

        let judgment = judge
            .judge(
                "text",
                Some(BackendOverride {
                    backend: None,
                    model: Some("phi4".to_string()),
                }),
            )
            .await
            .unwrap();

        assert_eq!(judgment.backend.model, "phi4:latest");
        assert_eq!(judge.selector().current().model, "llama3.2:latest");
    }

    #[tokio::test]
    async fn test_switch_mid_judgment_keeps_starting_backend() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(
            FakeBackend::new(BackendKind::Ollama, &["llama3.2:latest", "phi4:latest"])
                .respond("progressive", "a\nSCORE: 10")
                .respond("tradition", "b\nSCORE: 20")
                .respond("fact checker", "c\nSCORE: 30")
                .gated(gate.clone()),
        );
        let client: Arc<dyn InferenceBackend> = backend.clone();
        let selector = BackendSelector::connect(vec![client], None).await.unwrap();
        let judge = Arc::new(BiasJudge::new(Arc::new(selector)));

        let task = tokio::spawn({
            let judge = judge.clone();
            async move { judge.judge("The council approved the plan.", None).await }
        });
        while backend.calls.lock().len() < 3 {
            tokio::task::yield_now().await;
        }

        let switched = judge
            .selector()
            .switch_backend(BackendKind::Ollama, Some("phi4".to_string()))
            .await
            .unwrap();
        gate.notify_waiters();
        let judgment = task.await.unwrap().unwrap();

        assert_eq!(switched.model, "phi4:latest");
        assert_eq!(judgment.backend.model, "llama3.2:latest");
        assert_eq!(judgment.score, 20.0);
        assert!(backend.calls.lock().iter().all(|m| m == "llama3.2:latest"));
        assert_eq!(judge.selector().current().model, "phi4:latest");
    }

    #[test]
    fn test_parse_assessment_takes_last_marker() {
        let (summary, score) =
            parse_assessment("Asked to end with SCORE: 100.\nIt is balanced.\n**Score:** 15").unwrap();
        assert_eq!(score, 15.0);
        assert!(summary.ends_with("It is balanced."));
    }

    #[test]
    fn test_parse_assessment_rejects_out_of_range() {
        assert!(parse_assessment("Biased.\nSCORE: 250").is_err());
        assert!(parse_assessment("Biased.\nSCORE: 1000").is_err());
        assert!(parse_assessment("Biased.\nSCORE: 100.5").is_err());
        assert!(parse_assessment("").is_err());
    }

    #[test]
    fn test_parse_assessment_rejects_fraction_scores() {
        assert!(parse_assessment("Fairly even.\nScore: 7/10").is_err());
        assert!(parse_assessment("Fairly even.\nSCORE: 70 / 100").is_err());
        assert_eq!(parse_assessment("Fairly even.\nSCORE: 70").unwrap().1, 70.0);
    }

    #[test]
    fn test_aggregate_score_rounds() {
        let a = |score| ViewpointAssessment {
            viewpoint: Viewpoint::Neutral,
            summary: String::new(),
            score,
        };
        assert_eq!(aggregate_score(&[a(10.0), a(20.0), a(21.0)]), 17.0);
        assert_eq!(aggregate_score(&[a(33.0), a(33.0), a(34.0)]), 33.3);
    }
}
