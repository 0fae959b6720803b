//! OpenAI-specific error handling.

use tidymark_core::Error;

/// OpenAI-specific error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenAIErrorCode {
    /// Invalid authentication credentials.
    AuthenticationError,
    /// Rate limit exceeded.
    RateLimitExceeded,
    /// Model not found or not available.
    ModelNotFound,
    /// Request too large.
    ContextLengthExceeded,
    /// Server error.
    ServerError,
    /// Unknown error.
    Unknown,
}

impl OpenAIErrorCode {
    /// Determine error code from HTTP status and error type.
    pub fn from_response(status: u16, error_type: &str) -> Self {
        match (status, error_type) {
            (401, _) => Self::AuthenticationError,
            (429, _) => Self::RateLimitExceeded,
            (404, _) | (_, "model_not_found") => Self::ModelNotFound,
            (400, _) if error_type.contains("context_length") => Self::ContextLengthExceeded,
            (500..=599, _) => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimitExceeded | Self::ServerError)
    }

    fn label(&self) -> &'static str {
        match self {
            Self::AuthenticationError => "authentication failed",
            Self::RateLimitExceeded => "rate limit exceeded",
            Self::ModelNotFound => "model not found",
            Self::ContextLengthExceeded => "context too long",
            Self::ServerError => "server error",
            Self::Unknown => "request rejected",
        }
    }
}

/// Build the request error for a non-2xx response.
///
/// Every HTTP-level rejection is a per-item failure, so one bad response
/// never aborts a classification run. Retryable codes are marked in the
/// message.
pub fn to_tidymark_error(status: u16, code: OpenAIErrorCode, message: &str) -> Error {
    let retry = if code.is_retryable() { ", retryable" } else { "" };
    Error::ClassifierRequestFailed(format!("HTTP {status} ({}{retry}): {message}", code.label()))
}
