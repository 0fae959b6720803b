//! # tidymark-db
//!
//! Persistence and bookmark source layer for tidymark.
//!
//! This crate provides:
//! - Key-value stores (in-memory and SQLite)
//! - The metadata overlay store
//! - The settings store
//! - The bookmark source adapter and an in-memory bookmark tree
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tidymark_db::{MetadataStore, MetadataPatch, SqliteKvStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let kv = SqliteKvStore::connect("sqlite://tidymark.db").await?;
//!     let store = MetadataStore::new(Arc::new(kv));
//!
//!     store.update("42", MetadataPatch::default().with_category("Reading")).await?;
//!     Ok(())
//! }
//! ```

pub mod kv;
pub mod memory_tree;
pub mod metadata;
pub mod settings;
pub mod source;
pub mod sqlite;

pub use kv::MemoryKvStore;
pub use memory_tree::{MemoryBookmarkTree, BOOKMARKS_BAR_ID, OTHER_BOOKMARKS_ID, ROOT_ID};
pub use metadata::MetadataStore;
pub use settings::SettingsStore;
pub use source::BookmarkSourceAdapter;
pub use sqlite::{PoolConfig, SqliteKvStore};

// Re-export core types
pub use tidymark_core::*;
