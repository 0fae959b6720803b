//! Centralized default constants for tidymark.
//!
//! All crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// BOOKMARK SOURCE
// =============================================================================

/// Category shown for links outside any titled folder and without AI metadata.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Separator used when joining ancestor folder titles into a folder path.
pub const FOLDER_PATH_SEPARATOR: &str = " > ";

// =============================================================================
// STORAGE KEYS
// =============================================================================

/// Aggregate blob holding every metadata record, keyed by bookmark id.
pub const KEY_BOOKMARK_DATA: &str = "bookmarkData";

/// Sorted, deduplicated list of categories.
pub const KEY_CATEGORIES: &str = "categories";

/// Sorted, deduplicated list of tags.
pub const KEY_TAGS: &str = "tags";

/// Classifier API key.
pub const KEY_API_KEY: &str = "openaiKey";

/// Classifier model name.
pub const KEY_MODEL: &str = "openaiModel";

/// Classifier base URL.
pub const KEY_BASE_URL: &str = "openaiBaseURL";

/// Whether newly saved bookmarks get classified automatically.
pub const KEY_AUTO_CLASSIFY: &str = "autoClassify";

/// Epoch ms of the last successful sync.
pub const KEY_LAST_SYNC: &str = "lastSync";

// =============================================================================
// INFERENCE
// =============================================================================

/// Default chat model.
pub const GEN_MODEL: &str = "gpt-4o-mini";

/// Default OpenAI-compatible endpoint.
pub const OPENAI_URL: &str = "https://api.openai.com/v1";

/// Default HTTP timeout for classifier requests, in seconds.
pub const INFERENCE_TIMEOUT_SECS: u64 = 120;

/// Temperature used when the caller passes none.
pub const TEMPERATURE: f32 = 0.7;

/// Token ceiling used when the caller passes none.
pub const MAX_TOKENS: u32 = 2000;

/// Temperature for classification and ranking prompts.
pub const CLASSIFY_TEMPERATURE: f32 = 0.3;

/// Temperature for summary generation.
pub const SUMMARY_TEMPERATURE: f32 = 0.5;

/// Token ceiling for summary generation.
pub const SUMMARY_MAX_TOKENS: u32 = 200;

/// Maximum number of tags kept from a classification.
pub const MAX_TAGS: usize = 5;

/// Default number of results returned by semantic search.
pub const SEMANTIC_SEARCH_LIMIT: usize = 10;

/// Default number of related bookmarks recommended.
pub const RELATED_LIMIT: usize = 5;

/// Candidates sent to the model when recommending related bookmarks.
pub const RELATED_CANDIDATES: usize = 50;

// =============================================================================
// CLASSIFICATION RUNS
// =============================================================================

/// Pause between classifier calls inside one run, in milliseconds.
pub const CLASSIFY_ITEM_DELAY_MS: u64 = 500;

/// Per-item classifier timeout, in seconds.
pub const CLASSIFY_ITEM_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// EVENTS
// =============================================================================

/// Broadcast capacity for event channels.
pub const EVENT_BUS_CAPACITY: usize = 256;
