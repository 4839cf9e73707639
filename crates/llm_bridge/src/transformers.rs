//! Transformers text-generation server client
//!
//! Talks to a local server exposing the Hugging Face text-generation
//! interface (`GET /info`, `POST /generate`). Such a server hosts exactly one
//! model, so the model list is the loaded model id.

use anyhow::{Context, Result};
use async_trait::async_trait;
use news_core::provider::InferenceBackend;
use news_core::BackendKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct TransformersConfig {
    /// Base URL of the text-generation server (default: http://localhost:8080)
    pub base_url: String,
    /// Model id the server is expected to have loaded
    pub default_model: String,
    /// Maximum tokens to sample per call (default: 512)
    pub max_new_tokens: u32,
    /// Timeout in seconds (default: 300, local CPU inference is slow)
    pub timeout_secs: u64,
}

impl Default for TransformersConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            default_model: "rinna/japanese-gpt-neox-3.6b-instruction-sft".to_string(),
            max_new_tokens: 512,
            timeout_secs: 300,
        }
    }
}

pub struct TransformersClient {
    config: TransformersConfig,
    client: reqwest::Client,
}

impl TransformersClient {
    pub fn new(config: TransformersConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    /// Server metadata, including the loaded model id
    pub async fn info(&self) -> Result<ServerInfo> {
        let url = format!("{}/info", self.base_url());
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach text-generation server at {}", self.base_url()))?;

        if !response.status().is_success() {
            anyhow::bail!("Text-generation server error: {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse text-generation server info")
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }
}

#[async_trait]
impl InferenceBackend for TransformersClient {
    fn kind(&self) -> BackendKind {
        BackendKind::Transformers
    }

    fn endpoint(&self) -> &str {
        &self.config.base_url
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec![self.info().await?.model_id])
    }

    async fn generate(&self, _model: &str, system: &str, prompt: &str) -> Result<String> {
        // Instruction-tuned causal models take one flat prompt.
        let inputs = format!("{}\n\n{}\n\nAnalysis:", system, prompt);
        let request = GenerateRequest {
            inputs: &inputs,
            parameters: GenerateParameters {
                max_new_tokens: self.config.max_new_tokens,
                temperature: 0.7,
                do_sample: true,
                return_full_text: false,
            },
        };

        let url = format!("{}/generate", self.base_url());
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to text-generation server")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Text-generation server error ({}): {}", status, body);
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse text-generation response")?;

        // Some servers ignore return_full_text; strip the echoed prompt.
        let text = generated
            .generated_text
            .strip_prefix(inputs.as_str())
            .unwrap_or(&generated.generated_text)
            .trim()
            .to_string();
        Ok(text)
    }
}

/// `GET /info` response (subset)
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub model_id: String,
    #[serde(default)]
    pub model_device_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: GenerateParameters,
}

#[derive(Debug, Serialize)]
struct GenerateParameters {
    max_new_tokens: u32,
    temperature: f32,
    do_sample: bool,
    return_full_text: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    generated_text: String,
}
