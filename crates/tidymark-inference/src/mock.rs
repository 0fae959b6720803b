//! Scripted chat backend for deterministic testing.
//!
//! Replies are consumed in order; once the script runs out the default reply
//! (if any) is returned. Every call is logged for assertions.
//!
//! ```rust,ignore
//! use tidymark_inference::mock::ScriptedChatBackend;
//!
//! let backend = ScriptedChatBackend::new()
//!     .respond(r#"{"category": "News"}"#)
//!     .with_default_response(r#"{"category": "Other"}"#);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use tidymark_core::{ChatBackend, ChatMessage, CompletionOptions, Error, Result};

/// One recorded `complete` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<ChatMessage>,
    pub options: CompletionOptions,
}

#[derive(Default)]
struct ScriptState {
    replies: VecDeque<Result<String>>,
    calls: Vec<RecordedCall>,
}

/// [`ChatBackend`] returning pre-scripted replies.
#[derive(Clone)]
pub struct ScriptedChatBackend {
    state: Arc<Mutex<ScriptState>>,
    default_response: Option<String>,
    configured: bool,
    latency: Option<Duration>,
}

impl Default for ScriptedChatBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedChatBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState::default())),
            default_response: None,
            configured: true,
            latency: None,
        }
    }

    /// A backend that reports no credential.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    /// Queue a successful reply.
    pub fn respond(self, text: impl Into<String>) -> Self {
        self.lock().replies.push_back(Ok(text.into()));
        self
    }

    /// Queue a failure.
    pub fn fail(self, error: Error) -> Self {
        self.lock().replies.push_back(Err(error));
        self
    }

    /// Reply used once the script is exhausted.
    pub fn with_default_response(mut self, text: impl Into<String>) -> Self {
        self.default_response = Some(text.into());
        self
    }

    /// Sleep this long before every reply.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ChatBackend for ScriptedChatBackend {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String> {
        let reply = {
            let mut state = self.lock();
            state.calls.push(RecordedCall {
                messages: messages.to_vec(),
                options: options.clone(),
            });
            state.replies.pop_front()
        };

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match reply {
            Some(reply) => reply,
            None => self.default_response.clone().ok_or_else(|| {
                Error::ClassifierRequestFailed("scripted backend has no reply left".to_string())
            }),
        }
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_in_order_then_default() {
        let backend = ScriptedChatBackend::new()
            .respond("one")
            .fail(Error::ClassifierRequestFailed("two".to_string()))
            .with_default_response("rest");
        let options = CompletionOptions::default();

        assert_eq!(backend.complete(&[], &options).await.unwrap(), "one");
        assert!(backend.complete(&[], &options).await.is_err());
        assert_eq!(backend.complete(&[], &options).await.unwrap(), "rest");
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_without_default_fails() {
        let backend = ScriptedChatBackend::new();
        let err = backend
            .complete(&[ChatMessage::user("hi")], &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_per_item());
    }
}
