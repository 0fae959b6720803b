//! # tidymark-inference
//!
//! Chat-completion backend and bookmark classifier for tidymark.
//!
//! This crate provides:
//! - An OpenAI-compatible [`ChatBackend`] over `reqwest`
//! - Prompt templates for classification, ranking, summaries and recommendations
//! - Typed parsing of model replies, isolated from the network call
//! - [`ChatClassifier`], the [`Classifier`] used by search and classification runs
//!
//! # Feature Flags
//!
//! - `mock`: expose `mock::ScriptedChatBackend` to other crates' tests
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tidymark_inference::{ChatClassifier, OpenAIBackend, OpenAIConfig};
//!
//! let backend = OpenAIBackend::new(OpenAIConfig::from_env()).unwrap();
//! let classifier = ChatClassifier::new(Arc::new(backend));
//! ```

pub mod classifier;
pub mod openai;
pub mod parse;
pub mod prompts;

// Scripted backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use tidymark_core::*;

pub use classifier::{classify_or_fallback, ChatClassifier};
pub use openai::{OpenAIBackend, OpenAIConfig};
pub use parse::{parse_classification, parse_index_array};
