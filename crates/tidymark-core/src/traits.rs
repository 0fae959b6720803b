//! Core traits for tidymark's external collaborators.
//!
//! These traits define the seams to the bookmark source, the key-value
//! persistence layer, and the chat-completion service, so each can be
//! swapped for an in-memory fake in tests.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Async key-value persistence holding JSON values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `None` when the key was never written.
    async fn get(&self, key: &str) -> Result<Option<JsonValue>>;

    /// Write a value, replacing any existing one.
    async fn set(&self, key: &str, value: JsonValue) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

// =============================================================================
// BOOKMARK SOURCE
// =============================================================================

/// Read/write access to the external bookmark tree.
#[async_trait]
pub trait BookmarkTreeProvider: Send + Sync {
    /// The full tree, starting at the root node(s).
    async fn get_tree(&self) -> Result<Vec<BookmarkNode>>;

    /// A single node (children omitted).
    async fn get(&self, id: &str) -> Result<BookmarkNode>;

    /// Create a link or folder.
    async fn create(&self, req: CreateBookmarkRequest) -> Result<BookmarkNode>;

    /// Change a node's title and/or url.
    async fn update(&self, id: &str, req: UpdateBookmarkRequest) -> Result<BookmarkNode>;

    /// Remove a link or an empty folder.
    async fn remove(&self, id: &str) -> Result<()>;

    /// Move a node under a new parent, optionally at a position.
    async fn move_node(&self, id: &str, parent_id: &str, index: Option<u32>)
        -> Result<BookmarkNode>;

    /// Links whose url equals `url` exactly.
    async fn search_url(&self, url: &str) -> Result<Vec<BookmarkNode>>;
}

// =============================================================================
// INFERENCE
// =============================================================================

/// A chat-completion service: role-tagged messages in, completion text out.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], options: &CompletionOptions)
        -> Result<String>;

    /// Whether a credential is available.
    fn is_configured(&self) -> bool;

    /// Model used when the options do not name one.
    fn model_name(&self) -> &str;
}

/// Produces classifications and relevance rankings for bookmarks.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one bookmark.
    async fn classify(&self, record: &BookmarkRecord) -> Result<Classification>;

    /// Re-rank `records` by relevance to `query`, returning at most `limit`.
    ///
    /// An unparseable model response yields an empty list, not an error.
    async fn semantic_search(
        &self,
        query: &str,
        records: &[MergedRecord],
        limit: usize,
    ) -> Result<Vec<MergedRecord>>;

    /// Whether the underlying service has a credential.
    fn is_configured(&self) -> bool;
}
