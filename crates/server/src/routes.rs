//! REST API routes

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use news_core::generator::{ArticleRequest, GeneratedArticle};
use news_core::judge::BackendOverride;
use news_core::research::ResearchOutcome;
use news_core::selector::BackendStatus;
use news_core::store::{ArticleRecord, ArticleUpdate, StoreStatistics};
use news_core::{
    Article, ArticleId, ArticleType, BackendConfig, BackendKind, BiasLabel, NewsError, Tone,
    ViewpointAssessment,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

type ApiResult<T> = Result<Json<T>, ApiError>;

const DEFAULT_LIST_LIMIT: usize = 50;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/status", get(status))
        .route("/api/v1/switch-backend", post(switch_backend))
        .route("/api/v1/judge", post(judge))
        .route("/api/v1/research", post(research))
        .route("/api/v1/articles", get(list_articles))
        .route("/api/v1/articles/generate", post(generate_article))
        .route("/api/v1/articles/titles", post(generate_titles))
        .route("/api/v1/articles/outline", post(generate_outline))
        .route("/api/v1/articles/stats", get(article_stats))
        .route(
            "/api/v1/articles/:id",
            get(get_article).put(update_article).delete(delete_article),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[derive(Serialize)]
struct StatusResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    bias: Option<BackendStatus>,
    writers: Vec<String>,
    research_available: bool,
    mock_mode: bool,
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let bias = match &state.judge {
        Some(judge) => Some(judge.selector().status().await),
        None => None,
    };

    Json(StatusResponse {
        bias,
        writers: state.writers.iter().map(|(name, _)| name.clone()).collect(),
        research_available: state.research.is_some(),
        mock_mode: state.mock_mode,
    })
}

#[derive(Deserialize)]
struct SwitchRequest {
    backend: BackendKind,
    #[serde(default)]
    model_name: Option<String>,
}

#[derive(Serialize)]
struct SwitchResponse {
    success: bool,
    message: String,
    current: BackendConfig,
}

async fn switch_backend(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SwitchRequest>,
) -> ApiResult<SwitchResponse> {
    let current = state
        .judge()?
        .selector()
        .switch_backend(request.backend, request.model_name)
        .await?;

    Ok(Json(SwitchResponse {
        success: true,
        message: format!("Switched to {} ({})", current.backend, current.model),
        current,
    }))
}

#[derive(Deserialize)]
struct JudgeRequest {
    article: String,
    #[serde(default)]
    backend: Option<BackendKind>,
    #[serde(default)]
    model_name: Option<String>,
}

#[derive(Serialize)]
struct JudgeResponse {
    score: f64,
    label: BiasLabel,
    summary: String,
    /// Liberal, conservative, neutral
    summaries: Vec<String>,
    assessments: Vec<ViewpointAssessment>,
    backend_used: BackendKind,
    model_name: String,
    article_sha256: String,
    elapsed_ms: u64,
}

async fn judge(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JudgeRequest>,
) -> ApiResult<JudgeResponse> {
    let backend_override = (request.backend.is_some() || request.model_name.is_some()).then(|| {
        BackendOverride {
            backend: request.backend,
            model: request.model_name,
        }
    });

    let judgment = state.judge()?.judge(&request.article, backend_override).await?;

    Ok(Json(JudgeResponse {
        score: judgment.score,
        label: judgment.label,
        summary: judgment.summary,
        summaries: judgment
            .assessments
            .iter()
            .map(|a| a.summary.clone())
            .collect(),
        assessments: judgment.assessments,
        backend_used: judgment.backend.backend,
        model_name: judgment.backend.model,
        article_sha256: judgment.article_sha256,
        elapsed_ms: judgment.elapsed_ms,
    }))
}

#[derive(Deserialize)]
struct ResearchRequest {
    topic: String,
    #[serde(default)]
    subtopics: Vec<String>,
}

#[derive(Serialize)]
struct ResearchResponse {
    #[serde(flatten)]
    outcome: ResearchOutcome,
    summary: String,
}

async fn research(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResearchRequest>,
) -> ApiResult<ResearchResponse> {
    let outcome = state
        .research()?
        .run(&request.topic, request.subtopics)
        .await?;

    Ok(Json(ResearchResponse {
        summary: outcome.summary_markdown(),
        outcome,
    }))
}

#[derive(Deserialize)]
struct GenerateRequest {
    #[serde(flatten)]
    article: ArticleRequest,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    deep_research: bool,
    #[serde(default)]
    subtopics: Vec<String>,
    #[serde(default)]
    save: bool,
}

#[derive(Serialize)]
struct GenerateResponse {
    article: GeneratedArticle,
    #[serde(skip_serializing_if = "Option::is_none")]
    research: Option<ResearchOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_id: Option<ArticleId>,
}

async fn generate_article(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<GenerateResponse> {
    let provider = request.provider.as_deref();
    let (article, research) = if request.deep_research {
        let researched = state
            .deep_research(provider)?
            .generate(&request.article, request.subtopics)
            .await?;
        (researched.article, Some(researched.research))
    } else {
        let article = state
            .writer(provider)?
            .generate(&request.article, None)
            .await?;
        (article, None)
    };

    let saved_id = if request.save {
        let record = article.clone().into_article(&request.article);
        Some(state.store.save(&record)?)
    } else {
        None
    };

    Ok(Json(GenerateResponse {
        article,
        research,
        saved_id,
    }))
}

#[derive(Deserialize)]
struct TitlesRequest {
    topic: String,
    article_type: ArticleType,
    #[serde(default)]
    provider: Option<String>,
}

#[derive(Deserialize)]
struct OutlineRequest {
    topic: String,
    article_type: ArticleType,
    tone: Tone,
    #[serde(default)]
    provider: Option<String>,
}

#[derive(Serialize)]
struct TextResponse {
    text: String,
}

fn require_topic(topic: &str) -> Result<(), ApiError> {
    if topic.trim().is_empty() {
        return Err(NewsError::InvalidInput("topic is empty".to_string()).into());
    }
    Ok(())
}

async fn generate_titles(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TitlesRequest>,
) -> ApiResult<TextResponse> {
    require_topic(&request.topic)?;
    let text = state
        .writer(request.provider.as_deref())?
        .generate_titles(&request.topic, request.article_type)
        .await?;
    Ok(Json(TextResponse { text }))
}

async fn generate_outline(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OutlineRequest>,
) -> ApiResult<TextResponse> {
    require_topic(&request.topic)?;
    let text = state
        .writer(request.provider.as_deref())?
        .generate_outline(&request.topic, request.article_type, request.tone)
        .await?;
    Ok(Json(TextResponse { text }))
}

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<usize>,
    q: Option<String>,
}

async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<ArticleRecord>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let records = match query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => {
            let mut hits = state.store.search(q)?;
            hits.truncate(limit);
            hits
        }
        None => state.store.list(limit)?,
    };
    Ok(Json(records))
}

async fn article_stats(State(state): State<Arc<AppState>>) -> ApiResult<StoreStatistics> {
    Ok(Json(state.store.statistics()?))
}

async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ArticleId>,
) -> ApiResult<Article> {
    Ok(Json(state.store.load(id)?))
}

async fn update_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ArticleId>,
    Json(update): Json<ArticleUpdate>,
) -> ApiResult<Article> {
    Ok(Json(state.store.update(id, update)?))
}

async fn delete_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ArticleId>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use llm_bridge::Providers;
    use news_core::config::Settings;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn app(dir: &tempfile::TempDir) -> Router {
        let articles_dir = dir.path().to_string_lossy().to_string();
        let settings = Settings::from_lookup(|key| match key {
            "NEWSDESK_MOCK" => Some("1".to_string()),
            "ARTICLES_DIR" => Some(articles_dir.clone()),
            _ => None,
        })
        .unwrap();
        let providers = Providers::from_settings(&settings).unwrap();
        let state = AppState::build(&settings, providers).await.unwrap();
        router(Arc::new(state))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status_reports_both_backends() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, body) = send(&app, "GET", "/api/v1/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bias"]["current"]["backend"], "ollama");
        assert_eq!(body["bias"]["backends"].as_array().unwrap().len(), 2);
        assert_eq!(body["writers"], json!(["mock"]));
        assert_eq!(body["mock_mode"], true);
    }

    #[tokio::test]
    async fn test_judge_returns_three_summaries() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/judge",
            Some(json!({"article": "The council approved the budget on Tuesday."})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["score"], 30.0);
        assert_eq!(body["label"], "slight");
        assert_eq!(body["summaries"].as_array().unwrap().len(), 3);
        assert_eq!(body["backend_used"], "ollama");
    }

    #[tokio::test]
    async fn test_judge_empty_article_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, body) =
            send(&app, "POST", "/api/v1/judge", Some(json!({"article": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");
    }

    #[tokio::test]
    async fn test_failed_switch_keeps_current_backend() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/switch-backend",
            Some(json!({"backend": "ollama", "model_name": "not-installed"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "backend_unavailable");

        let (_, body) = send(&app, "GET", "/api/v1/status", None).await;
        assert_eq!(body["bias"]["current"]["model"], "llama3.2");

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/switch-backend",
            Some(json!({"backend": "transformers"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current"]["backend"], "transformers");
    }

    #[tokio::test]
    async fn test_generate_save_and_manage_article() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/articles/generate",
            Some(json!({
                "topic": "Community gardens",
                "article_type": "blog",
                "tone": "friendly",
                "length": 1500,
                "save": true
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["article"]["title"], "Community gardens: What You Need to Know");
        let id = body["saved_id"].as_str().unwrap().to_string();

        let (status, list) = send(&app, "GET", "/api/v1/articles?q=gardens", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, updated) = send(
            &app,
            "PUT",
            &format!("/api/v1/articles/{}", id),
            Some(json!({"title": "Gardens, revisited"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Gardens, revisited");

        let (status, stats) = send(&app, "GET", "/api/v1/articles/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total_articles"], 1);

        let (status, _) = send(&app, "DELETE", &format!("/api/v1/articles/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, "GET", &format!("/api/v1/articles/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_generate_rejects_out_of_range_length() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/articles/generate",
            Some(json!({
                "topic": "Tiny",
                "article_type": "news",
                "tone": "formal",
                "length": 100
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_deep_research_generation_attaches_sources() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/articles/generate",
            Some(json!({
                "topic": "Heat pumps",
                "article_type": "explainer",
                "tone": "informative",
                "deep_research": true
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["research"]["termination"]["reason"], "sufficient");
        assert_eq!(body["article"]["sources"].as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_unknown_writer_is_not_configured() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/articles/titles",
            Some(json!({"topic": "Rail travel", "article_type": "blog", "provider": "openai"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "not_configured");
    }
}
