//! Core of the newsdesk services
//!
//! Domain types, the bias judge and its backend selector, the article
//! generator, the research loop and the file-backed article store. External
//! services are reached only through the traits in [`provider`]; concrete
//! clients live in `llm_bridge`.

pub mod config;
pub mod error;
pub mod generator;
pub mod judge;
pub mod pipeline;
pub mod prompts;
pub mod provider;
pub mod research;
pub mod selector;
pub mod store;
pub mod types;

pub use error::{NewsError, Result, StoreError};
pub use types::*;
