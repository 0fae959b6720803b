//! Structured logging schema for tidymark.
//!
//! All crates log through `tracing` with these field names so log output can
//! be filtered consistently across subsystems. Field names are written
//! literally in the macros; the values below are the shared subsystem names.
//!
//! ## Field names
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `subsystem` | One of the `SUBSYSTEM_*` values |
//! | `component` | Component within a subsystem ("orchestrator", "metadata_store") |
//! | `op` | Logical operation ("classify", "semantic_search", "delete_many") |
//! | `bookmark_id` | Bookmark id being operated on |
//! | `run_id` | Classification run UUID |
//! | `duration_ms` | Wall-clock duration in milliseconds |
//! | `result_count` | Number of records returned |
//! | `model` | Chat model used |
//! | `error` | Error message when an operation fails |
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Persistence failures, requires attention |
//! | WARN  | Recoverable per-item failure, fallback applied |
//! | INFO  | Run lifecycle, bulk operation completions |
//! | DEBUG | Decision points, config choices |
//! | TRACE | Per-item iteration |

/// Key-value persistence and bookmark source adapters.
pub const SUBSYSTEM_DB: &str = "db";

/// Filtering, sorting, detection, merge.
pub const SUBSYSTEM_SEARCH: &str = "search";

/// Chat completion and classification.
pub const SUBSYSTEM_INFERENCE: &str = "inference";

/// Classification runs.
pub const SUBSYSTEM_JOBS: &str = "jobs";
