//! Classification runs against in-memory stores and scripted classifiers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

use tidymark_db::{MemoryKvStore, MetadataStore};
use tidymark_inference::mock::ScriptedChatBackend;
use tidymark_inference::ChatClassifier;
use tidymark_jobs::defaults::UNCATEGORIZED;
use tidymark_jobs::{
    BookmarkRecord, Classification, ClassificationEvent, ClassificationOrchestrator, Classifier,
    Error, KeyValueStore, MergedRecord, MetadataPatch, OrchestratorConfig, Result, RunOptions,
    RunState,
};

const TECH: &str = r#"{"category": "Tech", "tags": ["rust"], "description": "About Rust"}"#;

fn records(n: usize) -> Vec<BookmarkRecord> {
    (1..=n)
        .map(|i| BookmarkRecord::new(i.to_string(), format!("Page {i}"), format!("https://{i}.dev")))
        .collect()
}

fn fast() -> OrchestratorConfig {
    OrchestratorConfig::default().with_item_delay(0)
}

fn metadata_store() -> MetadataStore {
    MetadataStore::new(Arc::new(MemoryKvStore::new()))
}

fn orchestrator(backend: &ScriptedChatBackend, metadata: &MetadataStore) -> ClassificationOrchestrator {
    let classifier = Arc::new(ChatClassifier::new(Arc::new(backend.clone())));
    ClassificationOrchestrator::new(classifier, metadata.clone()).with_config(fast())
}

/// Classifier that cancels `token` while handling its `cancel_on`-th call.
struct CancellingClassifier {
    token: CancellationToken,
    cancel_on: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl Classifier for CancellingClassifier {
    async fn classify(&self, record: &BookmarkRecord) -> Result<Classification> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.cancel_on {
            self.token.cancel();
        }
        Ok(Classification {
            category: "Tech".to_string(),
            tags: vec!["rust".to_string()],
            description: record.title.clone(),
        })
    }

    async fn semantic_search(
        &self,
        _query: &str,
        _records: &[MergedRecord],
        _limit: usize,
    ) -> Result<Vec<MergedRecord>> {
        Ok(Vec::new())
    }

    fn is_configured(&self) -> bool {
        true
    }
}

/// Store whose reads and writes all fail.
struct UnavailableKv;

#[async_trait]
impl KeyValueStore for UnavailableKv {
    async fn get(&self, _key: &str) -> Result<Option<JsonValue>> {
        Err(Error::StoreUnavailable("disk gone".to_string()))
    }

    async fn set(&self, _key: &str, _value: JsonValue) -> Result<()> {
        Err(Error::StoreUnavailable("disk gone".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        Err(Error::StoreUnavailable("disk gone".to_string()))
    }
}

/// Store that reads fine but rejects every write.
struct ReadOnlyKv(MemoryKvStore);

#[async_trait]
impl KeyValueStore for ReadOnlyKv {
    async fn get(&self, key: &str) -> Result<Option<JsonValue>> {
        self.0.get(key).await
    }

    async fn set(&self, _key: &str, _value: JsonValue) -> Result<()> {
        Err(Error::StoreUnavailable("quota exceeded".to_string()))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.0.remove(key).await
    }
}

#[tokio::test]
async fn test_run_classifies_and_persists() {
    let backend = ScriptedChatBackend::new().with_default_response(TECH);
    let metadata = metadata_store();
    let orchestrator = orchestrator(&backend, &metadata);
    assert_eq!(orchestrator.state().await, RunState::Idle);

    let run = orchestrator
        .run(&records(3), RunOptions::default(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.total, 3);
    assert_eq!(run.processed_count, 3);
    assert_eq!(run.success_count, 3);
    assert_eq!(run.failed_count, 0);
    assert!(!run.cancelled);
    assert_eq!(orchestrator.state().await, RunState::Completed);

    let stored = metadata.get("2").await.unwrap().unwrap();
    assert_eq!(stored.category.as_deref(), Some("Tech"));
    assert_eq!(stored.tags, vec!["rust"]);
    assert!(stored.ai_processed);
    assert!(stored.ai_processed_at.is_some());

    assert_eq!(metadata.categories().await.unwrap(), vec!["Tech"]);
    assert_eq!(metadata.tags().await.unwrap(), vec!["rust"]);
}

#[tokio::test]
async fn test_second_run_with_skip_is_a_no_op() {
    let backend = ScriptedChatBackend::new().with_default_response(TECH);
    let metadata = metadata_store();
    let orchestrator = orchestrator(&backend, &metadata);
    let batch = records(4);

    orchestrator
        .run(&batch, RunOptions::skip_processed(), CancellationToken::new())
        .await
        .unwrap();
    let second = orchestrator
        .run(&batch, RunOptions::skip_processed(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(second.success_count, 0);
    assert_eq!(second.skipped_count, second.total);
    assert_eq!(backend.call_count(), 4);
}

#[tokio::test]
async fn test_without_skip_everything_is_reclassified() {
    let backend = ScriptedChatBackend::new().with_default_response(TECH);
    let metadata = metadata_store();
    let orchestrator = orchestrator(&backend, &metadata);
    let batch = records(2);

    orchestrator
        .run(&batch, RunOptions::default(), CancellationToken::new())
        .await
        .unwrap();
    let second = orchestrator
        .run(&batch, RunOptions::default(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(second.success_count, 2);
    assert_eq!(second.skipped_count, 0);
    assert_eq!(backend.call_count(), 4);
}

#[tokio::test]
async fn test_failures_are_isolated() {
    let backend = ScriptedChatBackend::new()
        .respond(TECH)
        .fail(Error::ClassifierRequestFailed("HTTP 502".to_string()))
        .respond("I would file this under misc.")
        .respond(TECH);
    let metadata = metadata_store();
    let orchestrator = orchestrator(&backend, &metadata);

    let run = orchestrator
        .run(&records(4), RunOptions::default(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.processed_count, 4);
    assert_eq!(run.success_count, 2);
    assert_eq!(run.failed_count, 2);
    assert_eq!(orchestrator.state().await, RunState::Completed);
    assert!(metadata.get("1").await.unwrap().is_some());
    assert!(metadata.get("2").await.unwrap().is_none());
    assert!(metadata.get("4").await.unwrap().is_some());

    // an unparseable reply still leaves the fallback behind
    let fallback = metadata.get("3").await.unwrap().unwrap();
    assert_eq!(fallback.category.as_deref(), Some(UNCATEGORIZED));
    assert!(fallback.tags.is_empty());
    assert_eq!(fallback.description.as_deref(), Some("Page 3"));
    assert!(!fallback.ai_processed);
    assert!(fallback.ai_processed_at.is_none());
}

#[tokio::test]
async fn test_fallback_is_retried_by_skip_run() {
    let backend = ScriptedChatBackend::new()
        .respond("Sorry, I can't classify that.")
        .respond(TECH);
    let metadata = metadata_store();
    let orchestrator = orchestrator(&backend, &metadata);
    let batch = records(1);

    let first = orchestrator
        .run(&batch, RunOptions::skip_processed(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.failed_count, 1);
    assert_eq!(
        metadata.get("1").await.unwrap().unwrap().category.as_deref(),
        Some(UNCATEGORIZED)
    );

    let second = orchestrator
        .run(&batch, RunOptions::skip_processed(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(second.success_count, 1);
    assert_eq!(second.skipped_count, 0);
    assert_eq!(backend.call_count(), 2);

    let stored = metadata.get("1").await.unwrap().unwrap();
    assert_eq!(stored.category.as_deref(), Some("Tech"));
    assert!(stored.ai_processed);
}

#[tokio::test]
async fn test_cancellation_stops_at_loop_boundary() {
    let token = CancellationToken::new();
    let classifier = Arc::new(CancellingClassifier {
        token: token.clone(),
        cancel_on: 2,
        calls: AtomicUsize::new(0),
    });
    let metadata = metadata_store();
    let orchestrator =
        ClassificationOrchestrator::new(classifier.clone(), metadata.clone()).with_config(fast());

    let run = orchestrator
        .run(&records(5), RunOptions::default(), token)
        .await
        .unwrap();

    assert!(run.cancelled);
    assert_eq!(run.processed_count, 2);
    assert_eq!(run.success_count, 2);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);
    assert_eq!(orchestrator.state().await, RunState::Cancelled);

    for id in ["1", "2"] {
        assert!(metadata.get(id).await.unwrap().unwrap().ai_processed);
    }
    assert!(metadata.get("3").await.unwrap().is_none());
    assert_eq!(metadata.categories().await.unwrap(), vec!["Tech"]);
}

#[tokio::test]
async fn test_cancellation_interrupts_item_delay() {
    let token = CancellationToken::new();
    let classifier = Arc::new(CancellingClassifier {
        token: token.clone(),
        cancel_on: 1,
        calls: AtomicUsize::new(0),
    });
    let orchestrator = ClassificationOrchestrator::new(classifier, metadata_store())
        .with_config(OrchestratorConfig::default().with_item_delay(60_000));

    let run = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.run(&records(3), RunOptions::default(), token),
    )
    .await
    .expect("run should not wait out the item delay")
    .unwrap();

    assert_eq!(run.processed_count, 1);
    assert!(run.cancelled);
}

#[tokio::test]
async fn test_pre_cancelled_token_processes_nothing() {
    let backend = ScriptedChatBackend::new().with_default_response(TECH);
    let orchestrator = orchestrator(&backend, &metadata_store());
    let token = CancellationToken::new();
    token.cancel();

    let run = orchestrator
        .run(&records(3), RunOptions::default(), token)
        .await
        .unwrap();

    assert_eq!(run.processed_count, 0);
    assert!(run.cancelled);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_unconfigured_classifier_fails_fast() {
    let backend = ScriptedChatBackend::unconfigured().with_default_response(TECH);
    let orchestrator = orchestrator(&backend, &metadata_store());
    let mut events = orchestrator.events();

    let err = orchestrator
        .run(&records(3), RunOptions::default(), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ClassifierUnconfigured(_)));
    assert_eq!(orchestrator.state().await, RunState::Failed);
    assert_eq!(backend.call_count(), 0);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_unreadable_store_fails_fast() {
    let backend = ScriptedChatBackend::new().with_default_response(TECH);
    let metadata = MetadataStore::new(Arc::new(UnavailableKv));
    let orchestrator = orchestrator(&backend, &metadata);

    let err = orchestrator
        .run(&records(2), RunOptions::default(), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::StoreUnavailable(_)));
    assert_eq!(orchestrator.state().await, RunState::Failed);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_write_failures_count_as_failed() {
    let backend = ScriptedChatBackend::new().with_default_response(TECH);
    let metadata = MetadataStore::new(Arc::new(ReadOnlyKv(MemoryKvStore::new())));
    let orchestrator = orchestrator(&backend, &metadata);

    let run = orchestrator
        .run(&records(3), RunOptions::default(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.failed_count, 3);
    assert_eq!(run.success_count, 0);
    assert_eq!(orchestrator.state().await, RunState::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_slow_classifier_times_out() {
    let backend = ScriptedChatBackend::new()
        .with_default_response(TECH)
        .with_latency(Duration::from_secs(30));
    let metadata = metadata_store();
    let classifier = Arc::new(ChatClassifier::new(Arc::new(backend.clone())));
    let orchestrator = ClassificationOrchestrator::new(classifier, metadata.clone())
        .with_config(fast().with_item_timeout(1));

    let run = orchestrator
        .run(&records(2), RunOptions::default(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.failed_count, 2);
    assert!(metadata.get("1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_events_trace_the_run() {
    let backend = ScriptedChatBackend::new().with_default_response(TECH);
    let orchestrator = orchestrator(&backend, &metadata_store());
    let mut events = orchestrator.events();

    let run = orchestrator
        .run(&records(2), RunOptions::default(), CancellationToken::new())
        .await
        .unwrap();

    match events.recv().await.unwrap() {
        ClassificationEvent::Started { run_id, total } => {
            assert_eq!(run_id, run.run_id);
            assert_eq!(total, 2);
        }
        other => panic!("expected Started, got {other:?}"),
    }
    let percents: Vec<u32> = (0..2)
        .map(|_| match events.try_recv().unwrap() {
            ClassificationEvent::Progress { percent, .. } => percent,
            other => panic!("expected Progress, got {other:?}"),
        })
        .collect();
    assert_eq!(percents, vec![50, 100]);
    match events.recv().await.unwrap() {
        ClassificationEvent::Finished { run: finished } => assert_eq!(finished, run),
        other => panic!("expected Finished, got {other:?}"),
    }
}

#[tokio::test]
async fn test_classify_one_marks_processed() {
    let backend = ScriptedChatBackend::new().respond(TECH);
    let metadata = metadata_store();
    let orchestrator = orchestrator(&backend, &metadata);

    let stored = orchestrator.classify_one(&records(1)[0]).await.unwrap();

    assert_eq!(stored.category.as_deref(), Some("Tech"));
    assert!(stored.ai_processed);
    assert_eq!(metadata.tags().await.unwrap(), vec!["rust"]);
}

#[tokio::test]
async fn test_classify_one_stores_fallback_on_parse_error() {
    let backend = ScriptedChatBackend::new().respond("no idea, sorry");
    let metadata = metadata_store();
    let orchestrator = orchestrator(&backend, &metadata);
    let record = &records(1)[0];

    let stored = orchestrator.classify_one(record).await.unwrap();

    assert_eq!(stored.category.as_deref(), Some(UNCATEGORIZED));
    assert!(stored.tags.is_empty());
    assert_eq!(stored.description.as_deref(), Some(record.title.as_str()));
    assert!(!stored.ai_processed);
}

#[tokio::test]
async fn test_classify_one_propagates_request_errors() {
    let backend = ScriptedChatBackend::new().fail(Error::ClassifierRequestFailed("HTTP 429".to_string()));
    let metadata = metadata_store();
    let orchestrator = orchestrator(&backend, &metadata);

    let err = orchestrator.classify_one(&records(1)[0]).await.unwrap_err();

    assert!(matches!(err, Error::ClassifierRequestFailed(_)));
    assert!(metadata.get("1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_skip_respects_existing_overlay() {
    let backend = ScriptedChatBackend::new().with_default_response(TECH);
    let metadata = metadata_store();
    metadata
        .update("1", MetadataPatch::default().with_category("Manual").processed_at(1))
        .await
        .unwrap();
    let orchestrator = orchestrator(&backend, &metadata);

    let run = orchestrator
        .run(&records(2), RunOptions::skip_processed(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.skipped_count, 1);
    assert_eq!(run.success_count, 1);
    let kept = metadata.get("1").await.unwrap().unwrap();
    assert_eq!(kept.category.as_deref(), Some("Manual"));
}
