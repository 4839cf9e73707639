//! Error taxonomy surfaced to the server and CLI

use crate::types::{ArticleId, BackendKind, Viewpoint};
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = NewsError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("backend {backend} ({model}) is unavailable: {reason}")]
    BackendUnavailable {
        backend: BackendKind,
        model: String,
        reason: String,
    },

    #[error("judgment failed on the {viewpoint} viewpoint using {backend}: {reason}")]
    JudgmentFailed {
        viewpoint: Viewpoint,
        backend: BackendKind,
        reason: String,
    },

    #[error("generation failed with {provider}: {reason}")]
    GenerationFailed { provider: String, reason: String },

    #[error("search provider {provider} failed on iteration {iteration}: {reason}")]
    SearchProviderError {
        provider: String,
        iteration: u32,
        reason: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("article {0} not found")]
    NotFound(ArticleId),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt metadata index {path}: {source}")]
    Index {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Flattens an anyhow chain into one line for error payloads
pub(crate) fn describe(err: &anyhow::Error) -> String {
    format!("{:#}", err)
}
