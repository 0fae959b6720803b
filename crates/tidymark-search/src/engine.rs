//! Organization engine.
//!
//! Owns the bookmark source adapter, the metadata store, and an optional
//! classifier, and keeps a merged snapshot of both sides that every query
//! runs against. The snapshot is rebuilt by [`OrganizationEngine::refresh`],
//! after bulk deletes, and on every source event when [`OrganizationEngine::watch`]
//! is running. A metadata store sharing the watched bus publishes its writes
//! there too, so classification results show up without an explicit refresh.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use tidymark_core::defaults::SEMANTIC_SEARCH_LIMIT;
use tidymark_core::export::{to_json_tree, to_netscape_html};
use tidymark_core::logging::SUBSYSTEM_SEARCH;
use tidymark_core::{
    BatchDeleteResult, BookmarkId, BookmarkRecord, Classifier, DuplicateGroup, EventBus,
    FilterCriteria, InvalidLink, MergedRecord, MetadataPatch, MetadataRecord, Result, SortKey,
};
use tidymark_db::{BookmarkSourceAdapter, MetadataStore};

use crate::aggregates::{all_categories, all_tags, classified_count, group_by_category};
use crate::duplicates::find_duplicates;
use crate::filter::filter;
use crate::invalid::find_invalid;
use crate::merge::merge;
use crate::sort::sort;

/// Filter criteria plus sort order for [`OrganizationEngine::query`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub criteria: FilterCriteria,
    pub sort: SortKey,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.criteria = self.criteria.with_search(query);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.criteria = self.criteria.with_category(category);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.criteria = self.criteria.with_tag(tag);
        self
    }

    pub fn sorted_by(mut self, key: SortKey) -> Self {
        self.sort = key;
        self
    }
}

/// Counts over the current snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatistics {
    pub total_bookmarks: usize,
    pub classified_count: usize,
    pub category_count: usize,
    pub tag_count: usize,
    pub duplicate_groups: usize,
    pub invalid_count: usize,
}

#[derive(Default)]
struct Snapshot {
    bookmarks: Vec<BookmarkRecord>,
    metadata: HashMap<BookmarkId, MetadataRecord>,
    merged: Vec<MergedRecord>,
}

impl Snapshot {
    fn remerge(&mut self) {
        self.merged = merge(&self.bookmarks, &self.metadata);
    }
}

/// Merged view over the bookmark source and the metadata overlay.
#[derive(Clone)]
pub struct OrganizationEngine {
    source: BookmarkSourceAdapter,
    metadata: MetadataStore,
    classifier: Option<Arc<dyn Classifier>>,
    snapshot: Arc<RwLock<Snapshot>>,
}

impl OrganizationEngine {
    /// Engine without a classifier; AI search always falls back.
    pub fn new(source: BookmarkSourceAdapter, metadata: MetadataStore) -> Self {
        Self {
            source,
            metadata,
            classifier: None,
            snapshot: Arc::new(RwLock::new(Snapshot::default())),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn source(&self) -> &BookmarkSourceAdapter {
        &self.source
    }

    pub fn metadata_store(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Reload both sides and rebuild the merged snapshot.
    ///
    /// Returns the number of merged records. On failure the previous
    /// snapshot is kept. The snapshot lock is held across both reads so a
    /// concurrent [`update_metadata`](Self::update_metadata) lands after them.
    pub async fn refresh(&self) -> Result<usize> {
        let start = Instant::now();
        let mut snapshot = self.snapshot.write().await;
        let bookmarks = self.source.list_flat().await?;
        let metadata = self.metadata.get_all().await?;

        snapshot.bookmarks = bookmarks;
        snapshot.metadata = metadata;
        snapshot.remerge();
        let count = snapshot.merged.len();

        debug!(
            subsystem = SUBSYSTEM_SEARCH,
            component = "engine",
            op = "refresh",
            result_count = count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Snapshot rebuilt"
        );
        Ok(count)
    }

    /// Every merged record in source order.
    pub async fn records(&self) -> Vec<MergedRecord> {
        self.snapshot.read().await.merged.clone()
    }

    /// Filter, then sort.
    pub async fn query(&self, query: &Query) -> Vec<MergedRecord> {
        let filtered = {
            let snapshot = self.snapshot.read().await;
            filter(&snapshot.merged, &query.criteria)
        };
        sort(filtered, query.sort)
    }

    /// Text search, optionally re-ranked by the classifier.
    ///
    /// With `use_ai` the configured classifier picks up to ten records. When
    /// there is no configured classifier, or it fails or picks nothing, the
    /// plain substring filter is used instead.
    #[instrument(skip(self), fields(subsystem = SUBSYSTEM_SEARCH, component = "engine", op = "search"))]
    pub async fn search(&self, query: &str, use_ai: bool) -> Vec<MergedRecord> {
        let start = Instant::now();
        let records = self.records().await;

        if use_ai && !query.trim().is_empty() {
            match self.classifier.as_ref().filter(|c| c.is_configured()) {
                Some(classifier) => {
                    match classifier
                        .semantic_search(query, &records, SEMANTIC_SEARCH_LIMIT)
                        .await
                    {
                        Ok(hits) if !hits.is_empty() => {
                            info!(
                                result_count = hits.len(),
                                duration_ms = start.elapsed().as_millis() as u64,
                                "Semantic search completed"
                            );
                            return hits;
                        }
                        Ok(_) => debug!("Semantic search found nothing, using text filter"),
                        Err(e) => warn!(error = %e, "Semantic search failed, using text filter"),
                    }
                }
                None => debug!("No configured classifier, using text filter"),
            }
        }

        let hits = filter(&records, &FilterCriteria::default().with_search(query));
        debug!(
            result_count = hits.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Text search completed"
        );
        hits
    }

    pub async fn find_duplicates(&self) -> Vec<DuplicateGroup> {
        find_duplicates(&self.snapshot.read().await.merged)
    }

    pub async fn find_invalid(&self) -> Vec<InvalidLink> {
        find_invalid(&self.snapshot.read().await.merged)
    }

    /// Delete each id independently, then refresh the snapshot.
    ///
    /// Per-id failures are reported in the result. Only a failing refresh
    /// is an error.
    pub async fn delete_bookmarks(&self, ids: &[BookmarkId]) -> Result<BatchDeleteResult> {
        let result = self.source.delete_many(ids).await;
        self.refresh().await?;
        Ok(result)
    }

    /// Delete every duplicate except its first occurrence.
    pub async fn delete_duplicate_extras(&self) -> Result<BatchDeleteResult> {
        let extras: Vec<BookmarkId> = self
            .find_duplicates()
            .await
            .iter()
            .flat_map(|g| g.extras().iter().map(|r| r.id().to_string()))
            .collect();

        info!(
            subsystem = SUBSYSTEM_SEARCH,
            component = "engine",
            op = "delete_duplicate_extras",
            extras = extras.len(),
            "Removing duplicate bookmarks"
        );
        self.delete_bookmarks(&extras).await
    }

    /// Persist a metadata patch and re-merge the snapshot.
    pub async fn update_metadata(&self, id: &str, patch: MetadataPatch) -> Result<MetadataRecord> {
        let record = self.metadata.update(id, patch).await?;

        let mut snapshot = self.snapshot.write().await;
        snapshot.metadata.insert(id.to_string(), record.clone());
        snapshot.remerge();
        Ok(record)
    }

    pub async fn categories(&self) -> Vec<String> {
        let snapshot = self.snapshot.read().await;
        all_categories(&snapshot.bookmarks, &snapshot.metadata)
    }

    pub async fn tags(&self) -> Vec<String> {
        all_tags(&self.snapshot.read().await.merged)
    }

    pub async fn group_by_category(&self) -> BTreeMap<String, Vec<MergedRecord>> {
        group_by_category(&self.snapshot.read().await.merged)
    }

    pub async fn statistics(&self) -> EngineStatistics {
        let snapshot = self.snapshot.read().await;
        EngineStatistics {
            total_bookmarks: snapshot.bookmarks.len(),
            classified_count: classified_count(&snapshot.bookmarks, &snapshot.metadata),
            category_count: all_categories(&snapshot.bookmarks, &snapshot.metadata).len(),
            tag_count: all_tags(&snapshot.merged).len(),
            duplicate_groups: find_duplicates(&snapshot.merged).len(),
            invalid_count: find_invalid(&snapshot.merged).len(),
        }
    }

    /// Netscape bookmark file of the live tree.
    pub async fn export_html(&self) -> Result<String> {
        Ok(to_netscape_html(&self.source.tree().await?))
    }

    /// Pretty JSON of the live tree.
    pub async fn export_json(&self) -> Result<String> {
        to_json_tree(&self.source.tree().await?)
    }

    /// Refresh the snapshot on every event published on `bus`.
    ///
    /// Attach the same bus to the metadata store to pick up classification
    /// writes as well as source changes. A lagged receiver refreshes once for
    /// everything it missed. The task ends when the bus is dropped; abort the
    /// handle to stop earlier.
    pub fn watch(&self, bus: &EventBus) -> JoinHandle<()> {
        let engine = self.clone();
        let mut rx = bus.subscribe();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        debug!(
                            subsystem = SUBSYSTEM_SEARCH,
                            component = "engine",
                            op = "watch",
                            event_type = event.event_type(),
                            bookmark_id = event.bookmark_id(),
                            "Source changed"
                        );
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(
                            subsystem = SUBSYSTEM_SEARCH,
                            component = "engine",
                            op = "watch",
                            skipped,
                            "Event receiver lagged"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }

                if let Err(e) = engine.refresh().await {
                    warn!(
                        subsystem = SUBSYSTEM_SEARCH,
                        component = "engine",
                        op = "watch",
                        error = %e,
                        "Refresh after source event failed"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builders() {
        let query = Query::new()
            .with_search("rust")
            .with_category("Tech")
            .with_tag("lang")
            .sorted_by(SortKey::Date);

        assert_eq!(query.criteria.search_query(), Some("rust"));
        assert_eq!(query.criteria.category(), Some("Tech"));
        assert_eq!(query.criteria.tag(), Some("lang"));
        assert_eq!(query.sort, SortKey::Date);
        assert_eq!(Query::new().sort, SortKey::Title);
    }
}
