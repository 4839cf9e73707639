//! LLM Bridge for newsdesk
//!
//! HTTP clients behind the `news_core` provider traits: Ollama and a
//! Transformers text-generation server for bias judging, OpenAI and Gemini
//! for article writing, Tavily and Gemini grounding for web research, plus
//! deterministic mocks of each.
//!
//! Copyright (c) 2025 Michael A Wright

pub mod gemini;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod registry;
pub mod tavily;
pub mod transformers;

pub use gemini::{GeminiClient, GeminiConfig, GeminiSearch};
pub use mock::{MockBackend, MockGenerator, MockSearch};
pub use ollama::{OllamaClient, OllamaConfig};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use registry::Providers;
pub use tavily::TavilySearch;
pub use transformers::{TransformersClient, TransformersConfig};
