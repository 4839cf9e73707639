//! Active inference backend for the bias judge
//!
//! The selector owns one client per registered backend kind and the
//! currently active [`BackendConfig`]. Switching validates the target first
//! and only then swaps the config, so a failed switch leaves the previous
//! backend in place. Requests take a [`ActiveBackend`] snapshot when they
//! start and finish against it even if a switch lands mid-flight.

use crate::error::{describe, NewsError, Result};
use crate::provider::InferenceBackend;
use crate::types::{BackendConfig, BackendKind, Viewpoint};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Ollama models worth pulling when none are installed
pub const SUGGESTED_MODELS: [&str; 4] = ["llama3.2", "llama3", "qwen2.5", "phi4"];

/// A validated backend plus the client to reach it
#[derive(Clone)]
pub struct ActiveBackend {
    pub config: BackendConfig,
    pub client: Arc<dyn InferenceBackend>,
}

/// Availability of one registered backend
#[derive(Debug, Clone, Serialize)]
pub struct BackendAvailability {
    pub backend: BackendKind,
    pub endpoint: String,
    pub reachable: bool,
    pub models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Snapshot returned by [`BackendSelector::status`]
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub current: BackendConfig,
    pub backends: Vec<BackendAvailability>,
    pub suggested_models: Vec<String>,
    pub viewpoints: Vec<Viewpoint>,
}

pub struct BackendSelector {
    backends: BTreeMap<BackendKind, Arc<dyn InferenceBackend>>,
    active: RwLock<ActiveBackend>,
}

impl BackendSelector {
    /// Build a selector with a validated backend.
    ///
    /// Tries `preferred` first, then every registered backend with its
    /// default model. Fails only when nothing is usable.
    pub async fn connect(
        backends: Vec<Arc<dyn InferenceBackend>>,
        preferred: Option<(BackendKind, Option<String>)>,
    ) -> Result<Self> {
        let backends: BTreeMap<_, _> = backends.into_iter().map(|b| (b.kind(), b)).collect();

        let mut candidates: Vec<(BackendKind, Option<String>)> = Vec::new();
        if let Some(p) = preferred {
            candidates.push(p);
        }
        for kind in backends.keys() {
            candidates.push((*kind, None));
        }

        let mut last_error = None;
        for (kind, model) in candidates {
            match validate(&backends, kind, model).await {
                Ok(active) => {
                    tracing::info!(
                        "Bias judge using {} ({}) at {}",
                        active.config.backend,
                        active.config.model,
                        active.config.endpoint
                    );
                    return Ok(Self {
                        backends,
                        active: RwLock::new(active),
                    });
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| NewsError::BackendUnavailable {
            backend: BackendKind::Ollama,
            model: String::new(),
            reason: "no inference backends are configured".to_string(),
        }))
    }

    /// Current backend config
    pub fn current(&self) -> BackendConfig {
        self.active.read().config.clone()
    }

    /// Snapshot of the active backend for one request
    pub fn active(&self) -> ActiveBackend {
        self.active.read().clone()
    }

    /// Current backend plus reachability of every registered backend
    pub async fn status(&self) -> BackendStatus {
        let mut availability = Vec::with_capacity(self.backends.len());
        for (kind, client) in &self.backends {
            let entry = match client.list_models().await {
                Ok(models) => BackendAvailability {
                    backend: *kind,
                    endpoint: client.endpoint().to_string(),
                    reachable: true,
                    models,
                    error: None,
                },
                Err(e) => BackendAvailability {
                    backend: *kind,
                    endpoint: client.endpoint().to_string(),
                    reachable: false,
                    models: Vec::new(),
                    error: Some(describe(&e)),
                },
            };
            availability.push(entry);
        }

        BackendStatus {
            current: self.current(),
            backends: availability,
            suggested_models: SUGGESTED_MODELS.iter().map(|m| m.to_string()).collect(),
            viewpoints: Viewpoint::ALL.to_vec(),
        }
    }

    /// Point the judge at another backend/model.
    ///
    /// On failure the previous config stays active.
    pub async fn switch_backend(
        &self,
        backend: BackendKind,
        model: Option<String>,
    ) -> Result<BackendConfig> {
        let next = validate(&self.backends, backend, model).await?;
        let config = next.config.clone();

        let previous = std::mem::replace(&mut *self.active.write(), next);
        tracing::info!(
            "Switched bias backend from {} ({}) to {} ({})",
            previous.config.backend,
            previous.config.model,
            config.backend,
            config.model
        );
        Ok(config)
    }

    /// Backend a single request should use.
    ///
    /// An override is validated like a switch but does not touch the
    /// process-wide config.
    pub async fn resolve(
        &self,
        backend: Option<BackendKind>,
        model: Option<String>,
    ) -> Result<ActiveBackend> {
        match (backend, model) {
            (None, None) => Ok(self.active()),
            (None, Some(model)) => {
                let kind = self.current().backend;
                validate(&self.backends, kind, Some(model)).await
            }
            (Some(kind), model) => validate(&self.backends, kind, model).await,
        }
    }
}

async fn validate(
    backends: &BTreeMap<BackendKind, Arc<dyn InferenceBackend>>,
    kind: BackendKind,
    model: Option<String>,
) -> Result<ActiveBackend> {
    let client = backends
        .get(&kind)
        .ok_or_else(|| NewsError::BackendUnavailable {
            backend: kind,
            model: model.clone().unwrap_or_default(),
            reason: "backend is not configured".to_string(),
        })?;

    let model = model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| client.default_model().to_string());

    let installed = client
        .list_models()
        .await
        .map_err(|e| NewsError::BackendUnavailable {
            backend: kind,
            model: model.clone(),
            reason: format!("{} is unreachable: {}", client.endpoint(), describe(&e)),
        })?;

    let Some(resolved) = installed.iter().find(|m| model_matches(m, &model)) else {
        let reason = if installed.is_empty() {
            format!(
                "no models are available; try pulling one of: {}",
                SUGGESTED_MODELS.join(", ")
            )
        } else {
            format!(
                "model '{}' is not available; available models: {}",
                model,
                installed.join(", ")
            )
        };
        return Err(NewsError::BackendUnavailable {
            backend: kind,
            model,
            reason,
        });
    };

    Ok(ActiveBackend {
        config: BackendConfig {
            backend: kind,
            model: resolved.clone(),
            endpoint: client.endpoint().to_string(),
        },
        client: client.clone(),
    })
}

/// `llama3.2` matches an installed `llama3.2:latest`
fn model_matches(installed: &str, requested: &str) -> bool {
    installed == requested
        || installed.strip_suffix(":latest") == Some(requested)
        || requested.strip_suffix(":latest") == Some(installed)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::sync::Notify;

    /// Scripted backend: a fixed model list (or unreachable) and
    /// per-viewpoint canned responses keyed by a word in the prompt.
    pub(crate) struct FakeBackend {
        pub kind: BackendKind,
        pub models: Option<Vec<String>>,
        pub responses: Vec<(&'static str, String)>,
        pub calls: Mutex<Vec<String>>,
        /// When set, `generate` parks until the gate is notified
        pub gate: Option<Arc<Notify>>,
    }

    impl FakeBackend {
        pub fn new(kind: BackendKind, models: &[&str]) -> Self {
            Self {
                kind,
                models: Some(models.iter().map(|m| m.to_string()).collect()),
                responses: Vec::new(),
                calls: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        pub fn unreachable(kind: BackendKind) -> Self {
            Self {
                kind,
                models: None,
                responses: Vec::new(),
                calls: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        pub fn respond(mut self, needle: &'static str, text: &str) -> Self {
            self.responses.push((needle, text.to_string()));
            self
        }

        pub fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }
    }

    #[async_trait]
    impl InferenceBackend for FakeBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn endpoint(&self) -> &str {
            "http://fake"
        }

        fn default_model(&self) -> &str {
            "llama3.2"
        }

        async fn list_models(&self) -> anyhow::Result<Vec<String>> {
            self.models
                .clone()
                .ok_or_else(|| anyhow::anyhow!("connection refused"))
        }

        async fn generate(&self, model: &str, _system: &str, prompt: &str) -> anyhow::Result<String> {
            self.calls.lock().push(model.to_string());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.responses
                .iter()
                .find(|(needle, _)| prompt.contains(needle))
                .map(|(_, text)| text.clone())
                .ok_or_else(|| anyhow::anyhow!("no scripted response"))
        }
    }

    fn arc(b: FakeBackend) -> Arc<dyn InferenceBackend> {
        Arc::new(b)
    }

    #[tokio::test]
    async fn test_connect_prefers_requested_backend() {
        let selector = BackendSelector::connect(
            vec![
                arc(FakeBackend::new(BackendKind::Ollama, &["llama3.2:latest"])),
                arc(FakeBackend::new(BackendKind::Transformers, &["rinna/gpt"])),
            ],
            Some((BackendKind::Transformers, Some("rinna/gpt".to_string()))),
        )
        .await
        .unwrap();

        assert_eq!(selector.current().backend, BackendKind::Transformers);
        assert_eq!(selector.current().model, "rinna/gpt");
    }

    #[tokio::test]
    async fn test_connect_falls_back_when_preferred_is_down() {
        let selector = BackendSelector::connect(
            vec![
                arc(FakeBackend::unreachable(BackendKind::Ollama)),
                arc(FakeBackend::new(BackendKind::Transformers, &["llama3.2"])),
            ],
            Some((BackendKind::Ollama, None)),
        )
        .await
        .unwrap();

        assert_eq!(selector.current().backend, BackendKind::Transformers);
    }

    #[tokio::test]
    async fn test_connect_fails_without_usable_backend() {
        let result =
            BackendSelector::connect(vec![arc(FakeBackend::unreachable(BackendKind::Ollama))], None)
                .await;
        assert!(matches!(result, Err(NewsError::BackendUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_switch_to_unavailable_backend_keeps_config() {
        let selector = BackendSelector::connect(
            vec![
                arc(FakeBackend::new(BackendKind::Ollama, &["llama3.2:latest"])),
                arc(FakeBackend::unreachable(BackendKind::Transformers)),
            ],
            None,
        )
        .await
        .unwrap();
        let before = selector.current();

        let result = selector
            .switch_backend(BackendKind::Transformers, None)
            .await;

        assert!(matches!(
            result,
            Err(NewsError::BackendUnavailable {
                backend: BackendKind::Transformers,
                ..
            })
        ));
        assert_eq!(selector.current(), before);
    }

    #[tokio::test]
    async fn test_switch_to_missing_model_keeps_config() {
        let selector = BackendSelector::connect(
            vec![arc(FakeBackend::new(
                BackendKind::Ollama,
                &["llama3.2:latest", "phi4:latest"],
            ))],
            None,
        )
        .await
        .unwrap();
        let before = selector.current();

        let err = selector
            .switch_backend(BackendKind::Ollama, Some("mistral".to_string()))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("phi4:latest"));
        assert_eq!(selector.current(), before);
    }

    #[tokio::test]
    async fn test_switch_replaces_config() {
        let selector = BackendSelector::connect(
            vec![arc(FakeBackend::new(
                BackendKind::Ollama,
                &["llama3.2:latest", "phi4:latest"],
            ))],
            None,
        )
        .await
        .unwrap();

        let config = selector
            .switch_backend(BackendKind::Ollama, Some("phi4".to_string()))
            .await
            .unwrap();

        assert_eq!(config.model, "phi4:latest");
        assert_eq!(selector.current(), config);
    }

    #[tokio::test]
    async fn test_resolve_override_does_not_switch() {
        let selector = BackendSelector::connect(
            vec![arc(FakeBackend::new(
                BackendKind::Ollama,
                &["llama3.2:latest", "phi4:latest"],
            ))],
            None,
        )
        .await
        .unwrap();

        let active = selector
            .resolve(None, Some("phi4".to_string()))
            .await
            .unwrap();

        assert_eq!(active.config.model, "phi4:latest");
        assert_eq!(selector.current().model, "llama3.2:latest");
    }

    #[tokio::test]
    async fn test_status_reports_unreachable_backend() {
        let selector = BackendSelector::connect(
            vec![
                arc(FakeBackend::new(BackendKind::Ollama, &["llama3.2"])),
                arc(FakeBackend::unreachable(BackendKind::Transformers)),
            ],
            None,
        )
        .await
        .unwrap();

        let status = selector.status().await;
        assert_eq!(status.backends.len(), 2);
        let transformers = status
            .backends
            .iter()
            .find(|b| b.backend == BackendKind::Transformers)
            .unwrap();
        assert!(!transformers.reachable);
        assert!(transformers.error.is_some());
        assert_eq!(status.viewpoints.len(), 3);
    }

    #[test]
    fn test_model_matches_latest_tag() {
        assert!(model_matches("llama3.2:latest", "llama3.2"));
        assert!(model_matches("llama3.2", "llama3.2:latest"));
        assert!(!model_matches("llama3.2:1b", "llama3.2"));
    }
}
