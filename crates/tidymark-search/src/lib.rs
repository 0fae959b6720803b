//! # tidymark-search
//!
//! Organization engine for tidymark.
//!
//! This crate provides:
//! - Merging source bookmarks with the metadata overlay
//! - Criteria filtering and stable sorting
//! - Exact-url duplicate detection
//! - Pattern-based invalid link detection
//! - Category and tag aggregates
//! - [`OrganizationEngine`], which ties these to the live source
//!
//! ## Example
//!
//! ```ignore
//! use tidymark_search::{OrganizationEngine, Query, SortKey};
//!
//! let engine = OrganizationEngine::new(source, metadata).with_classifier(classifier);
//! engine.refresh().await?;
//!
//! let pets = engine
//!     .query(&Query::new().with_category("Pets").sorted_by(SortKey::Date))
//!     .await;
//! let hits = engine.search("rust async", true).await;
//! ```

pub mod aggregates;
pub mod duplicates;
pub mod engine;
pub mod filter;
pub mod invalid;
pub mod merge;
pub mod sort;

// Re-export core types
pub use tidymark_core::*;

pub use aggregates::{all_categories, all_tags, classified_count, group_by_category};
pub use duplicates::find_duplicates;
pub use engine::{EngineStatistics, OrganizationEngine, Query};
pub use filter::{filter, matches_query};
pub use invalid::{find_invalid, invalid_reason};
pub use merge::merge;
pub use sort::sort;
