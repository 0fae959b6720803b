//! Metadata overlay store.
//!
//! All records live in one JSON blob under [`KEY_BOOKMARK_DATA`]. Updates are a
//! read-modify-write of that blob, serialized behind an async mutex so that
//! concurrent updates to different bookmarks never drop each other's writes.
//!
//! With an [`EventBus`] attached, every successful write publishes
//! [`SourceEvent::MetadataChanged`] so merged views can re-merge.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use tidymark_core::defaults::{KEY_BOOKMARK_DATA, KEY_CATEGORIES, KEY_TAGS};
use tidymark_core::logging::SUBSYSTEM_DB;
use tidymark_core::{
    now_millis, BookmarkId, Error, EventBus, KeyValueStore, MetadataPatch, MetadataRecord,
    MetadataSnapshot, Result, SourceEvent,
};

/// Persisted overlay of per-bookmark annotations.
#[derive(Clone)]
pub struct MetadataStore {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
    events: Option<EventBus>,
}

impl MetadataStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Arc::new(Mutex::new(())),
            events: None,
        }
    }

    /// Publish a [`SourceEvent::MetadataChanged`] on `bus` after every write.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    fn emit_changed(&self, id: &str) {
        if let Some(bus) = &self.events {
            bus.emit(SourceEvent::MetadataChanged { id: id.to_string() });
        }
    }

    /// Every metadata record, keyed by bookmark id.
    pub async fn get_all(&self) -> Result<HashMap<BookmarkId, MetadataRecord>> {
        self.read_key(KEY_BOOKMARK_DATA).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<MetadataRecord>> {
        let mut all = self.get_all().await?;
        Ok(all.remove(id))
    }

    /// Merge `patch` into the record for `id`, creating it if missing.
    pub async fn update(&self, id: &str, patch: MetadataPatch) -> Result<MetadataRecord> {
        let _guard = self.write_lock.lock().await;

        let mut all = self.get_all().await?;
        let record = all.entry(id.to_string()).or_default();
        record.apply(patch, now_millis());
        let updated = record.clone();

        self.write_key(KEY_BOOKMARK_DATA, &all).await?;
        debug!(
            subsystem = SUBSYSTEM_DB,
            component = "metadata_store",
            op = "update",
            bookmark_id = id,
            "Metadata updated"
        );
        self.emit_changed(id);
        Ok(updated)
    }

    /// Persisted category list.
    pub async fn categories(&self) -> Result<Vec<String>> {
        self.read_key(KEY_CATEGORIES).await
    }

    /// Persisted tag list.
    pub async fn tags(&self) -> Result<Vec<String>> {
        self.read_key(KEY_TAGS).await
    }

    /// Recompute the category and tag lists from the overlay and persist them.
    pub async fn refresh_aggregates(&self) -> Result<(Vec<String>, Vec<String>)> {
        let _guard = self.write_lock.lock().await;

        let all = self.get_all().await?;
        let mut categories = BTreeSet::new();
        let mut tags = BTreeSet::new();
        for record in all.values() {
            if let Some(category) = record.category.as_deref().filter(|c| !c.is_empty()) {
                categories.insert(category.to_string());
            }
            tags.extend(record.tags.iter().cloned());
        }

        let categories: Vec<String> = categories.into_iter().collect();
        let tags: Vec<String> = tags.into_iter().collect();
        self.write_key(KEY_CATEGORIES, &categories).await?;
        self.write_key(KEY_TAGS, &tags).await?;

        debug!(
            subsystem = SUBSYSTEM_DB,
            component = "metadata_store",
            op = "refresh_aggregates",
            category_count = categories.len(),
            tag_count = tags.len(),
            "Aggregates refreshed"
        );
        Ok((categories, tags))
    }

    /// The whole overlay as one value.
    pub async fn export_snapshot(&self) -> Result<MetadataSnapshot> {
        Ok(MetadataSnapshot {
            bookmark_data: self.get_all().await?,
            categories: self.categories().await?,
            tags: self.tags().await?,
        })
    }

    /// Replace the whole overlay with `snapshot`.
    pub async fn import_snapshot(&self, snapshot: MetadataSnapshot) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let count = snapshot.bookmark_data.len();
        self.write_key(KEY_BOOKMARK_DATA, &snapshot.bookmark_data).await?;
        self.write_key(KEY_CATEGORIES, &snapshot.categories).await?;
        self.write_key(KEY_TAGS, &snapshot.tags).await?;

        info!(
            subsystem = SUBSYSTEM_DB,
            component = "metadata_store",
            op = "import_snapshot",
            result_count = count,
            "Metadata snapshot imported"
        );
        for id in snapshot.bookmark_data.keys() {
            self.emit_changed(id);
        }
        Ok(())
    }

    async fn read_key<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        let value = self.kv.get(key).await.map_err(|e| store_error(key, "read", e))?;
        match value {
            None | Some(JsonValue::Null) => Ok(T::default()),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                error!(
                    subsystem = SUBSYSTEM_DB,
                    component = "metadata_store",
                    op = "read",
                    key,
                    error = %e,
                    "Stored value has unexpected shape"
                );
                Error::StoreUnavailable(format!("malformed value for {key}: {e}"))
            }),
        }
    }

    async fn write_key<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.kv
            .set(key, value)
            .await
            .map_err(|e| store_error(key, "write", e))
    }
}

fn store_error(key: &str, op: &'static str, e: Error) -> Error {
    error!(
        subsystem = SUBSYSTEM_DB,
        component = "metadata_store",
        op,
        key,
        error = %e,
        "Key-value store call failed"
    );
    match e {
        Error::StoreUnavailable(msg) => Error::StoreUnavailable(msg),
        other => Error::StoreUnavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;
    use serde_json::json;

    fn store() -> (MetadataStore, MemoryKvStore) {
        let kv = MemoryKvStore::new();
        (MetadataStore::new(Arc::new(kv.clone())), kv)
    }

    #[tokio::test]
    async fn test_update_creates_missing_record() {
        let (store, _) = store();
        let record = store
            .update("1", MetadataPatch::default().with_category("Tech"))
            .await
            .unwrap();

        assert_eq!(record.category.as_deref(), Some("Tech"));
        assert!(!record.ai_processed);
        assert!(record.updated_at > 0);
        assert_eq!(store.get("1").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_update_is_shallow_merge() {
        let (store, _) = store();
        store
            .update("1", MetadataPatch::default().with_category("Tech").with_tags(["rust"]))
            .await
            .unwrap();
        let record = store
            .update("1", MetadataPatch::default().with_description("A language"))
            .await
            .unwrap();

        assert_eq!(record.category.as_deref(), Some("Tech"));
        assert_eq!(record.tags, vec!["rust".to_string()]);
        assert_eq!(record.description.as_deref(), Some("A language"));
    }

    #[tokio::test]
    async fn test_reads_existing_camel_case_blob() {
        let (store, kv) = store();
        kv.set(
            KEY_BOOKMARK_DATA,
            json!({"9": {"category": "News", "tags": ["daily"], "aiProcessed": true}}),
        )
        .await
        .unwrap();

        let record = store.get("9").await.unwrap().unwrap();
        assert!(record.ai_processed);
        assert_eq!(record.tags, vec!["daily".to_string()]);
        assert!(store.get("10").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_blob_is_store_unavailable() {
        let (store, kv) = store();
        kv.set(KEY_BOOKMARK_DATA, json!("not a map")).await.unwrap();

        let err = store.get_all().await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_refresh_aggregates_sorted_and_unique() {
        let (store, _) = store();
        store
            .update("1", MetadataPatch::default().with_category("Tech").with_tags(["b", "a"]))
            .await
            .unwrap();
        store
            .update("2", MetadataPatch::default().with_category("Art").with_tags(["a"]))
            .await
            .unwrap();
        store.update("3", MetadataPatch::default().with_category("Tech")).await.unwrap();

        let (categories, tags) = store.refresh_aggregates().await.unwrap();
        assert_eq!(categories, vec!["Art".to_string(), "Tech".to_string()]);
        assert_eq!(tags, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.categories().await.unwrap(), categories);
        assert_eq!(store.tags().await.unwrap(), tags);
    }

    #[tokio::test]
    async fn test_snapshot_export_import() {
        let (source, _) = store();
        source
            .update("1", MetadataPatch::default().with_category("Tech"))
            .await
            .unwrap();
        source.refresh_aggregates().await.unwrap();
        let snapshot = source.export_snapshot().await.unwrap();

        let (target, _) = store();
        target.import_snapshot(snapshot.clone()).await.unwrap();
        assert_eq!(target.export_snapshot().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn test_writes_publish_metadata_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let store = MetadataStore::new(Arc::new(MemoryKvStore::new())).with_event_bus(bus);

        store
            .update("5", MetadataPatch::default().with_tags(["rust"]))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "metadata.changed");
        assert_eq!(event.bookmark_id(), "5");
    }

    #[tokio::test]
    async fn test_failed_write_publishes_nothing() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let kv = MemoryKvStore::new();
        kv.set(KEY_BOOKMARK_DATA, json!("not a map")).await.unwrap();
        let store = MetadataStore::new(Arc::new(kv)).with_event_bus(bus);

        assert!(store.update("5", MetadataPatch::default()).await.is_err());
        assert!(rx.try_recv().is_err());
    }
}
