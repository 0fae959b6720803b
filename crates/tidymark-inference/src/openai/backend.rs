//! OpenAI-compatible chat backend implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use tidymark_core::defaults::{GEN_MODEL, INFERENCE_TIMEOUT_SECS, MAX_TOKENS, OPENAI_URL, TEMPERATURE};
use tidymark_core::logging::SUBSYSTEM_INFERENCE;
use tidymark_core::{ChatBackend, ChatMessage, CompletionOptions, Error, Result, Settings};

use super::error::{to_tidymark_error, OpenAIErrorCode};
use super::types::*;

/// Configuration for OpenAI-compatible backend.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAIConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication. Requests are refused without one.
    pub api_key: Option<String>,
    /// Model to use for generation.
    pub gen_model: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Skip TLS verification (for self-signed certs in local environments).
    pub skip_tls_verify: bool,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: OPENAI_URL.to_string(),
            api_key: None,
            gen_model: GEN_MODEL.to_string(),
            timeout_seconds: INFERENCE_TIMEOUT_SECS,
            skip_tls_verify: false,
        }
    }
}

impl OpenAIConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `OPENAI_BASE_URL` | `https://api.openai.com/v1` |
    /// | `OPENAI_API_KEY` | unset |
    /// | `OPENAI_GEN_MODEL` | `gpt-4o-mini` |
    /// | `OPENAI_TIMEOUT` | 120 |
    /// | `OPENAI_SKIP_TLS_VERIFY` | false |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            base_url: lookup("OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_URL.to_string()),
            api_key: lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()),
            gen_model: lookup("OPENAI_GEN_MODEL").unwrap_or_else(|| GEN_MODEL.to_string()),
            timeout_seconds: lookup("OPENAI_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(INFERENCE_TIMEOUT_SECS),
            skip_tls_verify: lookup("OPENAI_SKIP_TLS_VERIFY")
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(false),
        }
    }

    /// Build configuration from persisted user settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
            gen_model: settings.model.clone(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.gen_model = model.into();
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

/// OpenAI-compatible chat backend.
pub struct OpenAIBackend {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIBackend {
    /// Create a new OpenAI backend with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let mut client_builder =
            Client::builder().timeout(Duration::from_secs(config.timeout_seconds));

        if config.skip_tls_verify {
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = SUBSYSTEM_INFERENCE,
            component = "openai",
            op = "init",
            base_url = %config.base_url,
            model = %config.gen_model,
            has_api_key = config.api_key.is_some(),
            "Initializing OpenAI backend"
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env())
    }

    /// Get the current configuration.
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Build a request with authentication.
    fn build_request(&self, endpoint: &str, api_key: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        self.client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
    }
}

#[async_trait]
impl ChatBackend for OpenAIBackend {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::ClassifierUnconfigured("OpenAI API key is not set".to_string()))?;

        let model = options
            .model
            .clone()
            .unwrap_or_else(|| self.config.gen_model.clone());
        let request = ChatCompletionRequest {
            model,
            messages: messages.to_vec(),
            temperature: Some(options.temperature.unwrap_or(TEMPERATURE)),
            max_tokens: Some(options.max_tokens.unwrap_or(MAX_TOKENS)),
        };

        let start = Instant::now();
        let response = self
            .build_request("/chat/completions", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::ClassifierRequestFailed(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body: OpenAIErrorResponse = response.json().await.unwrap_or(OpenAIErrorResponse {
                error: OpenAIError {
                    message: format!("API request failed: {}", status.as_u16()),
                    error_type: "unknown".to_string(),
                    code: None,
                },
            });
            let code = OpenAIErrorCode::from_response(status.as_u16(), &body.error.error_type);
            warn!(
                subsystem = SUBSYSTEM_INFERENCE,
                component = "openai",
                op = "complete",
                status = status.as_u16(),
                code = ?code,
                retryable = code.is_retryable(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Chat completion rejected"
            );
            return Err(to_tidymark_error(status.as_u16(), code, &body.error.message));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::ClassifierRequestFailed(format!("Failed to parse response: {}", e)))?;

        let content = result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::ClassifierRequestFailed("Response has no choices".to_string()))?;

        debug!(
            subsystem = SUBSYSTEM_INFERENCE,
            component = "openai",
            op = "complete",
            model = %request.model,
            response_len = content.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Chat completion finished"
        );
        Ok(content)
    }

    fn is_configured(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|k| !k.is_empty())
    }

    fn model_name(&self) -> &str {
        &self.config.gen_model
    }
}
