//! # tidymark-jobs
//!
//! Batch classification runs for tidymark.
//!
//! This crate provides:
//! - Sequential classification of bookmark records with per-item isolation
//! - Cooperative cancellation through a `CancellationToken`
//! - Progress notifications via broadcast channels
//! - Idempotent re-runs that skip already classified bookmarks
//!
//! ## Example
//!
//! ```ignore
//! use tidymark_jobs::{ClassificationOrchestrator, OrchestratorConfig, RunOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! let orchestrator = ClassificationOrchestrator::new(classifier, metadata)
//!     .with_config(OrchestratorConfig::from_env());
//!
//! let mut events = orchestrator.events();
//! let cancel = CancellationToken::new();
//! let run = orchestrator
//!     .run(&records, RunOptions::skip_processed(), cancel.clone())
//!     .await?;
//! println!("{} classified, {} skipped", run.success_count, run.skipped_count);
//! ```

pub mod orchestrator;

// Re-export core types
pub use tidymark_core::*;

pub use orchestrator::{
    ClassificationEvent, ClassificationOrchestrator, ClassificationRun, OrchestratorConfig,
    RunOptions, RunState,
};
