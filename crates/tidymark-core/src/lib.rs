//! # tidymark-core
//!
//! Core types, traits, and abstractions for the tidymark bookmark organizer.
//!
//! This crate provides the data model shared by every other crate (bookmark
//! records, the metadata overlay, merged records), the error taxonomy, the
//! traits for external collaborators, and the bulk export formats.

pub mod category;
pub mod defaults;
pub mod error;
pub mod events;
pub mod export;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use category::effective_category;
pub use error::{Error, Result};
pub use events::{EventBus, SourceEvent};
pub use models::*;
pub use traits::*;
