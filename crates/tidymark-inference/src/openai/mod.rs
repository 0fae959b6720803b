//! OpenAI-compatible chat backend.
//!
//! Works with any endpoint that speaks the `/chat/completions` protocol:
//! OpenAI itself, Azure OpenAI, Ollama in compatibility mode, vLLM, LM Studio.
//!
//! # Example
//!
//! ```rust,no_run
//! use tidymark_inference::openai::{OpenAIBackend, OpenAIConfig};
//!
//! let config = OpenAIConfig::default()
//!     .with_base_url("http://localhost:11434/v1")
//!     .with_api_key("ollama")
//!     .with_model("llama3");
//! let backend = OpenAIBackend::new(config).unwrap();
//! ```

mod backend;
mod error;
mod types;

pub use backend::{OpenAIBackend, OpenAIConfig};
pub use error::{to_tidymark_error, OpenAIErrorCode};
pub use types::*;
