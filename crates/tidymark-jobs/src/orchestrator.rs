//! Classification orchestrator: sequential batch runs with cooperative
//! cancellation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use tidymark_core::defaults::{CLASSIFY_ITEM_DELAY_MS, CLASSIFY_ITEM_TIMEOUT_SECS, EVENT_BUS_CAPACITY};
use tidymark_core::logging::SUBSYSTEM_JOBS;
use tidymark_core::{
    now_millis, BookmarkId, BookmarkRecord, Classification, Classifier, Error, MetadataPatch,
    MetadataRecord, Result,
};
use tidymark_db::MetadataStore;

/// Configuration for classification runs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Pause between classifier calls in milliseconds.
    pub item_delay_ms: u64,
    /// Upper bound on a single classifier call in seconds.
    pub item_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            item_delay_ms: CLASSIFY_ITEM_DELAY_MS,
            item_timeout_secs: CLASSIFY_ITEM_TIMEOUT_SECS,
        }
    }
}

impl OrchestratorConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `CLASSIFY_ITEM_DELAY_MS` | `500` | Pause between classifier calls |
    /// | `CLASSIFY_ITEM_TIMEOUT_SECS` | `120` | Per-item classifier timeout |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let item_delay_ms = lookup("CLASSIFY_ITEM_DELAY_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(CLASSIFY_ITEM_DELAY_MS);

        let item_timeout_secs = lookup("CLASSIFY_ITEM_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(CLASSIFY_ITEM_TIMEOUT_SECS)
            .max(1);

        Self {
            item_delay_ms,
            item_timeout_secs,
        }
    }

    pub fn with_item_delay(mut self, ms: u64) -> Self {
        self.item_delay_ms = ms;
        self
    }

    pub fn with_item_timeout(mut self, secs: u64) -> Self {
        self.item_timeout_secs = secs;
        self
    }
}

/// Lifecycle of the most recent run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// Per-run options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Leave records whose overlay is already `ai_processed` untouched.
    pub skip_if_processed: bool,
}

impl RunOptions {
    pub fn skip_processed() -> Self {
        Self {
            skip_if_processed: true,
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRun {
    pub run_id: Uuid,
    pub total: usize,
    pub processed_count: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    pub cancelled: bool,
}

/// Event emitted while a run is in progress.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassificationEvent {
    /// Emitted once before the first item.
    Started { run_id: Uuid, total: usize },
    /// Emitted after every item, skipped ones included. `index` is 1-based.
    Progress {
        run_id: Uuid,
        index: usize,
        total: usize,
        percent: u32,
    },
    /// Final counters of a completed or cancelled run.
    Finished { run: ClassificationRun },
}

enum ItemOutcome {
    Success,
    Skipped,
    Failed,
}

/// Drives the classifier over a batch of records and persists results.
pub struct ClassificationOrchestrator {
    classifier: Arc<dyn Classifier>,
    metadata: MetadataStore,
    config: OrchestratorConfig,
    state: Arc<RwLock<RunState>>,
    event_tx: broadcast::Sender<ClassificationEvent>,
}

impl ClassificationOrchestrator {
    pub fn new(classifier: Arc<dyn Classifier>, metadata: MetadataStore) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            classifier,
            metadata,
            config: OrchestratorConfig::default(),
            state: Arc::new(RwLock::new(RunState::Idle)),
            event_tx,
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// State of the current or most recent run.
    pub async fn state(&self) -> RunState {
        *self.state.read().await
    }

    /// Get a receiver for run events.
    pub fn events(&self) -> broadcast::Receiver<ClassificationEvent> {
        self.event_tx.subscribe()
    }

    /// Classify `records` one at a time.
    ///
    /// Fails before any item when the classifier is unconfigured or the
    /// overlay cannot be read. Per-item failures are counted and the run
    /// goes on. `cancel` is checked before each item; a call already in
    /// flight is allowed to finish.
    #[instrument(skip_all, fields(
        subsystem = SUBSYSTEM_JOBS,
        component = "orchestrator",
        op = "run",
        total = records.len(),
    ))]
    pub async fn run(
        &self,
        records: &[BookmarkRecord],
        options: RunOptions,
        cancel: CancellationToken,
    ) -> Result<ClassificationRun> {
        {
            let mut state = self.state.write().await;
            if *state == RunState::Running {
                return Err(Error::InvalidInput(
                    "a classification run is already active".to_string(),
                ));
            }
            *state = RunState::Running;
        }

        let existing = match self.preflight().await {
            Ok(existing) => existing,
            Err(e) => {
                error!(error = %e, "Classification run aborted before start");
                self.set_state(RunState::Failed).await;
                return Err(e);
            }
        };

        let start = Instant::now();
        let mut run = ClassificationRun {
            run_id: Uuid::now_v7(),
            total: records.len(),
            ..Default::default()
        };
        info!(run_id = %run.run_id, skip_if_processed = options.skip_if_processed, "Classification run started");
        let _ = self.event_tx.send(ClassificationEvent::Started {
            run_id: run.run_id,
            total: run.total,
        });

        let delay = Duration::from_millis(self.config.item_delay_ms);

        for (i, record) in records.iter().enumerate() {
            if cancel.is_cancelled() {
                run.cancelled = true;
                break;
            }

            let already_done = options.skip_if_processed
                && existing.get(&record.id).is_some_and(|m| m.ai_processed);

            let outcome = if already_done {
                debug!(run_id = %run.run_id, bookmark_id = %record.id, "Already classified, skipping");
                ItemOutcome::Skipped
            } else {
                self.process_item(run.run_id, record).await
            };

            run.processed_count += 1;
            match outcome {
                ItemOutcome::Success => run.success_count += 1,
                ItemOutcome::Skipped => run.skipped_count += 1,
                ItemOutcome::Failed => run.failed_count += 1,
            }

            let index = i + 1;
            let _ = self.event_tx.send(ClassificationEvent::Progress {
                run_id: run.run_id,
                index,
                total: run.total,
                percent: (index * 100 / run.total) as u32,
            });

            let called = !matches!(outcome, ItemOutcome::Skipped);
            if called && index < run.total && !delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = sleep(delay) => {}
                }
            }
        }

        if let Err(e) = self.metadata.refresh_aggregates().await {
            error!(run_id = %run.run_id, error = %e, "Failed to refresh category and tag lists");
        }

        let final_state = if run.cancelled {
            RunState::Cancelled
        } else {
            RunState::Completed
        };
        self.set_state(final_state).await;

        info!(
            run_id = %run.run_id,
            state = ?final_state,
            processed = run.processed_count,
            succeeded = run.success_count,
            failed = run.failed_count,
            skipped = run.skipped_count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Classification run finished"
        );
        let _ = self
            .event_tx
            .send(ClassificationEvent::Finished { run: run.clone() });

        Ok(run)
    }

    /// Classify a single record outside of a run.
    ///
    /// An unparseable response stores the fallback classification without
    /// marking the record as processed. Request failures are returned.
    pub async fn classify_one(&self, record: &BookmarkRecord) -> Result<MetadataRecord> {
        self.ensure_configured()?;

        let patch = match self.classify_with_timeout(record).await {
            Ok(classification) => {
                MetadataPatch::from_classification(&classification).processed_at(now_millis())
            }
            Err(Error::ClassificationParse(reason)) => {
                warn!(
                    subsystem = SUBSYSTEM_JOBS,
                    component = "orchestrator",
                    op = "classify_one",
                    bookmark_id = %record.id,
                    error = %reason,
                    "Unparseable classification, storing fallback"
                );
                MetadataPatch::from_classification(&Classification::fallback(record))
            }
            Err(e) => return Err(e),
        };

        let stored = self.metadata.update(&record.id, patch).await?;
        if let Err(e) = self.metadata.refresh_aggregates().await {
            error!(
                subsystem = SUBSYSTEM_JOBS,
                component = "orchestrator",
                op = "classify_one",
                error = %e,
                "Failed to refresh category and tag lists"
            );
        }
        Ok(stored)
    }

    async fn preflight(&self) -> Result<HashMap<BookmarkId, MetadataRecord>> {
        self.ensure_configured()?;
        self.metadata.get_all().await
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.classifier.is_configured() {
            Ok(())
        } else {
            Err(Error::ClassifierUnconfigured(
                "no API key configured for the classifier".to_string(),
            ))
        }
    }

    async fn classify_with_timeout(&self, record: &BookmarkRecord) -> Result<Classification> {
        let limit = Duration::from_secs(self.config.item_timeout_secs);
        match tokio::time::timeout(limit, self.classifier.classify(record)).await {
            Ok(result) => result,
            Err(_) => Err(Error::ClassifierRequestFailed(format!(
                "classification exceeded timeout of {}s",
                self.config.item_timeout_secs
            ))),
        }
    }

    async fn process_item(&self, run_id: Uuid, record: &BookmarkRecord) -> ItemOutcome {
        let start = Instant::now();

        let classification = match self.classify_with_timeout(record).await {
            Ok(c) => c,
            Err(Error::ClassificationParse(reason)) => {
                warn!(run_id = %run_id, bookmark_id = %record.id, error = %reason, "Unparseable classification, storing fallback");
                self.store_fallback(run_id, record).await;
                return ItemOutcome::Failed;
            }
            Err(e) => {
                warn!(run_id = %run_id, bookmark_id = %record.id, error = %e, "Classification failed");
                return ItemOutcome::Failed;
            }
        };

        let patch = MetadataPatch::from_classification(&classification).processed_at(now_millis());
        match self.metadata.update(&record.id, patch).await {
            Ok(_) => {
                debug!(
                    run_id = %run_id,
                    bookmark_id = %record.id,
                    category = %classification.category,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Bookmark classified"
                );
                ItemOutcome::Success
            }
            Err(e) => {
                error!(run_id = %run_id, bookmark_id = %record.id, error = %e, "Failed to store classification");
                ItemOutcome::Failed
            }
        }
    }

    /// Persist the fallback classification, leaving `ai_processed` unset so
    /// the next run retries the record.
    async fn store_fallback(&self, run_id: Uuid, record: &BookmarkRecord) {
        let patch = MetadataPatch::from_classification(&Classification::fallback(record));
        if let Err(e) = self.metadata.update(&record.id, patch).await {
            error!(run_id = %run_id, bookmark_id = %record.id, error = %e, "Failed to store fallback classification");
        }
    }

    async fn set_state(&self, state: RunState) {
        *self.state.write().await = state;
    }
}
