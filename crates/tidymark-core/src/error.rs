//! Error types for tidymark.

use thiserror::Error;

/// Result type alias using tidymark's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for tidymark operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Bookmark tree provider call failed
    #[error("Bookmark source unavailable: {0}")]
    SourceUnavailable(String),

    /// Key-value persistence call failed
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// No credential configured for the classifier service
    #[error("Classifier not configured: {0}")]
    ClassifierUnconfigured(String),

    /// Model response did not contain a usable JSON payload
    #[error("Classification parse error: {0}")]
    ClassificationParse(String),

    /// Network or HTTP-level failure talking to the classifier service
    #[error("Classifier request failed: {0}")]
    ClassifierRequestFailed(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Errors that only affect a single item of a classification batch.
    ///
    /// The orchestrator counts these as failed items and keeps going; anything
    /// else is a configuration-level failure.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            Error::ClassificationParse(_) | Error::ClassifierRequestFailed(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::ClassifierRequestFailed(e.to_string())
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::StoreUnavailable(e.to_string())
    }
}
