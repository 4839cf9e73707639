//! Mapping from domain errors to HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use news_core::{NewsError, StoreError};
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    News(NewsError),
    /// A feature whose provider has no credentials or no reachable backend
    NotConfigured(&'static str),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotConfigured(_) => (StatusCode::SERVICE_UNAVAILABLE, "not_configured"),
            ApiError::News(err) => match err {
                NewsError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
                NewsError::BackendUnavailable { .. } => {
                    (StatusCode::BAD_REQUEST, "backend_unavailable")
                }
                NewsError::JudgmentFailed { .. } => (StatusCode::BAD_GATEWAY, "judgment_failed"),
                NewsError::GenerationFailed { .. } => {
                    (StatusCode::BAD_GATEWAY, "generation_failed")
                }
                NewsError::SearchProviderError { .. } => (StatusCode::BAD_GATEWAY, "search_failed"),
                NewsError::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
                NewsError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
            },
        }
    }
}

impl From<NewsError> for ApiError {
    fn from(err: NewsError) -> Self {
        ApiError::News(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::News(NewsError::Store(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let detail = match &self {
            ApiError::News(err) => err.to_string(),
            ApiError::NotConfigured(what) => format!("{} is not configured", what),
        };

        if status.is_server_error() {
            tracing::error!("{} ({})", detail, status);
        } else {
            tracing::warn!("{} ({})", detail, status);
        }

        (
            status,
            Json(ErrorBody {
                error: kind,
                detail,
            }),
        )
            .into_response()
    }
}
