//! Bookmark classifier on top of a chat backend.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, warn};

use tidymark_core::defaults::{
    CLASSIFY_TEMPERATURE, RELATED_CANDIDATES, SUMMARY_MAX_TOKENS, SUMMARY_TEMPERATURE,
};
use tidymark_core::logging::SUBSYSTEM_INFERENCE;
use tidymark_core::{
    BookmarkRecord, ChatBackend, Classification, Classifier, CompletionOptions, Error,
    MergedRecord, Result,
};

use crate::parse::{parse_classification, parse_index_array};
use crate::prompts;

/// [`Classifier`] that prompts a [`ChatBackend`] and parses its replies.
#[derive(Clone)]
pub struct ChatClassifier {
    backend: Arc<dyn ChatBackend>,
}

impl ChatClassifier {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn ChatBackend> {
        &self.backend
    }

    /// Short plain-text summary. Falls back to the title on any failure.
    pub async fn generate_summary(&self, record: &BookmarkRecord) -> String {
        let options = CompletionOptions::default()
            .with_temperature(SUMMARY_TEMPERATURE)
            .with_max_tokens(SUMMARY_MAX_TOKENS);

        match self
            .backend
            .complete(&prompts::summary_messages(record), &options)
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => record.title.clone(),
            Err(e) => {
                warn!(
                    subsystem = SUBSYSTEM_INFERENCE,
                    component = "classifier",
                    op = "generate_summary",
                    bookmark_id = %record.id,
                    error = %e,
                    "Summary failed, using title"
                );
                record.title.clone()
            }
        }
    }

    /// Up to `limit` bookmarks related to `current`, most related first.
    ///
    /// Only the first candidates other than `current` are offered to the model.
    pub async fn recommend_related(
        &self,
        current: &BookmarkRecord,
        all: &[BookmarkRecord],
        limit: usize,
    ) -> Result<Vec<BookmarkRecord>> {
        let candidates: Vec<&BookmarkRecord> = all
            .iter()
            .filter(|r| r.id != current.id)
            .take(RELATED_CANDIDATES)
            .collect();
        if candidates.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let options = CompletionOptions::default().with_temperature(CLASSIFY_TEMPERATURE);
        let text = self
            .backend
            .complete(&prompts::related_messages(current, &candidates, limit), &options)
            .await?;

        let indices = match parse_index_array(&text) {
            Ok(indices) => indices,
            Err(e) => {
                warn!(
                    subsystem = SUBSYSTEM_INFERENCE,
                    component = "classifier",
                    op = "recommend_related",
                    bookmark_id = %current.id,
                    error = %e,
                    "Unparseable recommendation response"
                );
                return Ok(Vec::new());
            }
        };

        Ok(pick_by_index(&candidates, &indices, limit)
            .into_iter()
            .map(|r| (*r).clone())
            .collect())
    }
}

/// Map 1-based indices onto `items`, dropping out-of-range and repeated ones.
fn pick_by_index<'a, T>(items: &'a [T], indices: &[i64], limit: usize) -> Vec<&'a T> {
    let mut seen = HashSet::new();
    indices
        .iter()
        .filter(|&&i| i >= 1 && (i as usize) <= items.len())
        .filter(|&&i| seen.insert(i))
        .take(limit)
        .map(|&i| &items[i as usize - 1])
        .collect()
}

#[async_trait]
impl Classifier for ChatClassifier {
    async fn classify(&self, record: &BookmarkRecord) -> Result<Classification> {
        let start = Instant::now();
        let options = CompletionOptions::default().with_temperature(CLASSIFY_TEMPERATURE);

        let text = self
            .backend
            .complete(&prompts::classify_messages(record), &options)
            .await?;
        let mut classification = parse_classification(&text)?;
        if classification.description.is_empty() {
            classification.description = record.title.clone();
        }

        debug!(
            subsystem = SUBSYSTEM_INFERENCE,
            component = "classifier",
            op = "classify",
            bookmark_id = %record.id,
            model = self.backend.model_name(),
            category = %classification.category,
            duration_ms = start.elapsed().as_millis() as u64,
            "Bookmark classified"
        );
        Ok(classification)
    }

    async fn semantic_search(
        &self,
        query: &str,
        records: &[MergedRecord],
        limit: usize,
    ) -> Result<Vec<MergedRecord>> {
        if records.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let options = CompletionOptions::default().with_temperature(CLASSIFY_TEMPERATURE);
        let text = self
            .backend
            .complete(&prompts::semantic_search_messages(query, records, limit), &options)
            .await?;

        let indices = match parse_index_array(&text) {
            Ok(indices) => indices,
            Err(e) => {
                warn!(
                    subsystem = SUBSYSTEM_INFERENCE,
                    component = "classifier",
                    op = "semantic_search",
                    error = %e,
                    "Unparseable ranking response"
                );
                return Ok(Vec::new());
            }
        };

        let results: Vec<MergedRecord> = pick_by_index(records, &indices, limit)
            .into_iter()
            .cloned()
            .collect();
        debug!(
            subsystem = SUBSYSTEM_INFERENCE,
            component = "classifier",
            op = "semantic_search",
            candidate_count = records.len(),
            result_count = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Semantic search complete"
        );
        Ok(results)
    }

    fn is_configured(&self) -> bool {
        self.backend.is_configured()
    }
}

/// Classify `record`, substituting [`Classification::fallback`] for an
/// unparseable response. Request failures still propagate.
pub async fn classify_or_fallback(
    classifier: &dyn Classifier,
    record: &BookmarkRecord,
) -> Result<Classification> {
    match classifier.classify(record).await {
        Err(Error::ClassificationParse(reason)) => {
            warn!(
                subsystem = SUBSYSTEM_INFERENCE,
                component = "classifier",
                op = "classify",
                bookmark_id = %record.id,
                error = %reason,
                "Unparseable classification, using fallback"
            );
            Ok(Classification::fallback(record))
        }
        other => other,
    }
}
