//! Core data models for tidymark.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::Error;

/// Opaque identifier assigned by the bookmark source.
pub type BookmarkId = String;

/// Current wall-clock time as epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// =============================================================================
// SOURCE TREE
// =============================================================================

/// A raw node of the external bookmark tree.
///
/// Links carry a `url`; folders carry `children`. The serialized form is the
/// plain JSON tree mirror used for bulk export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkNode {
    pub id: BookmarkId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<BookmarkId>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_group_modified: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<BookmarkNode>>,
}

impl BookmarkNode {
    /// Create a link node.
    pub fn link(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            title: title.into(),
            url: Some(url.into()),
            date_added: None,
            date_group_modified: None,
            index: None,
            children: None,
        }
    }

    /// Create an empty folder node.
    pub fn folder(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            title: title.into(),
            url: None,
            date_added: None,
            date_group_modified: None,
            index: None,
            children: Some(Vec::new()),
        }
    }

    pub fn with_date_added(mut self, date_added: i64) -> Self {
        self.date_added = Some(date_added);
        self
    }

    pub fn with_children(mut self, children: Vec<BookmarkNode>) -> Self {
        self.children = Some(children);
        self
    }

    /// True when this node is a link rather than a folder.
    pub fn is_link(&self) -> bool {
        self.url.is_some()
    }

    pub fn is_folder(&self) -> bool {
        self.url.is_none()
    }
}

/// Request for creating a link or folder in the source tree.
///
/// A request without `url` creates a folder.
#[derive(Debug, Clone, Default)]
pub struct CreateBookmarkRequest {
    pub title: String,
    pub url: Option<String>,
    pub parent_id: Option<BookmarkId>,
    pub index: Option<u32>,
}

/// Request for changing a node's title and/or url.
#[derive(Debug, Clone, Default)]
pub struct UpdateBookmarkRequest {
    pub title: Option<String>,
    pub url: Option<String>,
}

// =============================================================================
// RECORDS
// =============================================================================

/// A link flattened out of the source tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRecord {
    pub id: BookmarkId,
    pub title: String,
    pub url: String,
    pub date_added: Option<i64>,
    pub parent_id: Option<BookmarkId>,
    /// Title of the immediate parent folder, or [`defaults::UNCATEGORIZED`].
    pub folder_name: String,
    /// Titled ancestors joined by [`defaults::FOLDER_PATH_SEPARATOR`].
    pub folder_path: String,
}

impl BookmarkRecord {
    /// Minimal record outside any folder; mostly useful in tests.
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            date_added: None,
            parent_id: None,
            folder_name: defaults::UNCATEGORIZED.to_string(),
            folder_path: String::new(),
        }
    }

    pub fn with_folder(mut self, folder_name: impl Into<String>) -> Self {
        let name = folder_name.into();
        self.folder_path = name.clone();
        self.folder_name = name;
        self
    }

    pub fn with_date_added(mut self, date_added: i64) -> Self {
        self.date_added = Some(date_added);
        self
    }

    /// Whether `folder_name` is a real folder title.
    ///
    /// A folder actually titled like the sentinel also ends `folder_path`,
    /// which is how it is told apart from a record with no folder.
    pub fn has_folder(&self) -> bool {
        if self.folder_name.is_empty() {
            return false;
        }
        self.folder_name != defaults::UNCATEGORIZED
            || self
                .folder_path
                .rsplit(defaults::FOLDER_PATH_SEPARATOR)
                .next()
                .is_some_and(|last| last == self.folder_name)
    }
}

/// Engine-owned overlay annotations for one bookmark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataRecord {
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub ai_processed: bool,
    pub ai_processed_at: Option<i64>,
    pub updated_at: i64,
}

impl MetadataRecord {
    /// Shallow-merge `patch` into this record and stamp `updated_at`.
    pub fn apply(&mut self, patch: MetadataPatch, now: i64) {
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
        if let Some(tags) = patch.tags {
            self.tags = dedup_tags(tags);
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(ai_processed) = patch.ai_processed {
            self.ai_processed = ai_processed;
        }
        if let Some(at) = patch.ai_processed_at {
            self.ai_processed_at = Some(at);
        }
        self.updated_at = now;
    }
}

/// Drop blank and repeated tags, keeping first occurrences.
fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Partial update for a [`MetadataRecord`]. Present fields overwrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_processed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_processed_at: Option<i64>,
}

impl MetadataPatch {
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the record as classified at `at`.
    pub fn processed_at(mut self, at: i64) -> Self {
        self.ai_processed = Some(true);
        self.ai_processed_at = Some(at);
        self
    }

    /// Patch carrying a classification result.
    pub fn from_classification(classification: &Classification) -> Self {
        Self::default()
            .with_category(classification.category.clone())
            .with_tags(classification.tags.clone())
            .with_description(classification.description.clone())
    }
}

/// A bookmark joined with its overlay metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedRecord {
    #[serde(flatten)]
    pub bookmark: BookmarkRecord,
    pub effective_category: String,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub ai_processed: bool,
}

impl MergedRecord {
    pub fn id(&self) -> &str {
        &self.bookmark.id
    }

    pub fn title(&self) -> &str {
        &self.bookmark.title
    }

    pub fn url(&self) -> &str {
        &self.bookmark.url
    }
}

/// Aggregate form of the whole overlay, used for backup and restore.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataSnapshot {
    pub bookmark_data: HashMap<BookmarkId, MetadataRecord>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

// =============================================================================
// DERIVED VIEWS
// =============================================================================

/// Bookmarks sharing one exact url.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub url: String,
    /// Members in source order; the first is the one to keep.
    pub members: Vec<MergedRecord>,
}

impl DuplicateGroup {
    /// Every member except the first occurrence.
    pub fn extras(&self) -> &[MergedRecord] {
        self.members.get(1..).unwrap_or(&[])
    }
}

/// Which heuristic flagged a link as suspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    Loopback,
    PrivateNetwork,
    FileScheme,
    BrowserInternal,
    AboutPage,
    SuspiciousToken,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::Loopback => "loopback",
            InvalidReason::PrivateNetwork => "private_network",
            InvalidReason::FileScheme => "file_scheme",
            InvalidReason::BrowserInternal => "browser_internal",
            InvalidReason::AboutPage => "about_page",
            InvalidReason::SuspiciousToken => "suspicious_token",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record flagged by the invalid-link heuristic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidLink {
    pub record: MergedRecord,
    pub reason: InvalidReason,
}

/// Sort order for record lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Title,
    Date,
    Url,
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(Self::Title),
            "date" => Ok(Self::Date),
            "url" => Ok(Self::Url),
            _ => Err(Error::InvalidInput(format!("unknown sort key: {s}"))),
        }
    }
}

/// Filter criteria; absent or empty fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub search_query: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
}

impl FilterCriteria {
    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search_query = Some(query.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn search_query(&self) -> Option<&str> {
        non_empty(&self.search_query)
    }

    pub fn category(&self) -> Option<&str> {
        non_empty(&self.category)
    }

    pub fn tag(&self) -> Option<&str> {
        non_empty(&self.tag)
    }

    /// True when no criterion would narrow the input.
    pub fn is_empty(&self) -> bool {
        self.search_query().is_none() && self.category().is_none() && self.tag().is_none()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Counts over the source tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatistics {
    pub total_bookmarks: usize,
    pub total_folders: usize,
    pub oldest_bookmark: Option<i64>,
    pub newest_bookmark: Option<i64>,
}

/// Outcome of deleting several bookmarks independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchDeleteResult {
    pub succeeded: Vec<BookmarkId>,
    pub failed: Vec<DeleteFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteFailure {
    pub id: BookmarkId,
    pub reason: String,
}

// =============================================================================
// SETTINGS
// =============================================================================

/// User settings persisted next to the overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Classify bookmarks as soon as they are created.
    pub auto_classify: bool,
    pub last_sync: Option<i64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: defaults::GEN_MODEL.to_string(),
            base_url: defaults::OPENAI_URL.to_string(),
            auto_classify: true,
            last_sync: None,
        }
    }
}

impl Settings {
    /// True when an API key is present and not blank.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// AI-assigned classification for one bookmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub tags: Vec<String>,
    pub description: String,
}

impl Classification {
    /// Record substituted when a response cannot be parsed.
    pub fn fallback(record: &BookmarkRecord) -> Self {
        Self {
            category: defaults::UNCATEGORIZED.to_string(),
            tags: Vec::new(),
            description: record.title.clone(),
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Per-call overrides for a chat completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub model: Option<String>,
}

impl CompletionOptions {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}
