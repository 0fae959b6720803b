//! Bookmark source adapter.
//!
//! Wraps a [`BookmarkTreeProvider`] and turns its tree into flat
//! [`BookmarkRecord`]s. All provider failures other than `NotFound` surface
//! as [`Error::SourceUnavailable`].

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use tidymark_core::defaults::{FOLDER_PATH_SEPARATOR, UNCATEGORIZED};
use tidymark_core::logging::SUBSYSTEM_DB;
use tidymark_core::{
    BatchDeleteResult, BookmarkId, BookmarkNode, BookmarkRecord, BookmarkTreeProvider,
    CreateBookmarkRequest, DeleteFailure, Error, Result, SourceStatistics,
    UpdateBookmarkRequest,
};

/// Access to the bookmark source in terms of flat records.
#[derive(Clone)]
pub struct BookmarkSourceAdapter {
    provider: Arc<dyn BookmarkTreeProvider>,
}

impl BookmarkSourceAdapter {
    pub fn new(provider: Arc<dyn BookmarkTreeProvider>) -> Self {
        Self { provider }
    }

    /// The raw tree, as used for bulk export.
    pub async fn tree(&self) -> Result<Vec<BookmarkNode>> {
        self.provider.get_tree().await.map_err(provider_error)
    }

    /// Every link in tree order. Folders are not included.
    pub async fn list_flat(&self) -> Result<Vec<BookmarkRecord>> {
        let start = Instant::now();
        let tree = self.tree().await?;
        let records = flatten(&tree);
        debug!(
            subsystem = SUBSYSTEM_DB,
            component = "source",
            op = "list_flat",
            result_count = records.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Flattened bookmark tree"
        );
        Ok(records)
    }

    /// The flat record for one link; `Error::NotFound` for folders and
    /// unknown ids.
    pub async fn record(&self, id: &str) -> Result<BookmarkRecord> {
        flatten(&self.tree().await?)
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(format!("bookmark {id}")))
    }

    /// Create a link and return it with its folder resolved.
    pub async fn create(
        &self,
        title: &str,
        url: &str,
        parent_id: Option<&str>,
    ) -> Result<BookmarkRecord> {
        let req = CreateBookmarkRequest {
            title: title.to_string(),
            url: Some(url.to_string()),
            parent_id: parent_id.map(str::to_string),
            index: None,
        };
        let node = self.provider.create(req).await.map_err(provider_error)?;
        self.record(&node.id).await
    }

    pub async fn create_folder(&self, title: &str, parent_id: Option<&str>) -> Result<BookmarkNode> {
        let req = CreateBookmarkRequest {
            title: title.to_string(),
            url: None,
            parent_id: parent_id.map(str::to_string),
            index: None,
        };
        self.provider.create(req).await.map_err(provider_error)
    }

    /// Change a link's title and/or url and return the updated record.
    pub async fn update(&self, id: &str, req: UpdateBookmarkRequest) -> Result<BookmarkRecord> {
        let node = self.provider.update(id, req).await.map_err(provider_error)?;
        self.record(&node.id).await
    }

    /// Delete one bookmark; `Error::NotFound` when the id does not exist.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.provider.remove(id).await.map_err(provider_error)
    }

    /// Delete each id independently. One failure never stops the others.
    pub async fn delete_many(&self, ids: &[BookmarkId]) -> BatchDeleteResult {
        let mut result = BatchDeleteResult::default();

        for id in ids {
            match self.delete(id).await {
                Ok(()) => result.succeeded.push(id.clone()),
                Err(e) => {
                    warn!(
                        subsystem = SUBSYSTEM_DB,
                        component = "source",
                        op = "delete_many",
                        bookmark_id = %id,
                        error = %e,
                        "Bookmark deletion failed"
                    );
                    result.failed.push(DeleteFailure {
                        id: id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            subsystem = SUBSYSTEM_DB,
            component = "source",
            op = "delete_many",
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "Batch delete finished"
        );
        result
    }

    pub async fn move_bookmark(
        &self,
        id: &str,
        parent_id: &str,
        index: Option<u32>,
    ) -> Result<BookmarkNode> {
        self.provider
            .move_node(id, parent_id, index)
            .await
            .map_err(provider_error)
    }

    /// Whether any link has exactly this url.
    pub async fn url_exists(&self, url: &str) -> Result<bool> {
        let hits = self.provider.search_url(url).await.map_err(provider_error)?;
        Ok(hits.iter().any(|n| n.url.as_deref() == Some(url)))
    }

    /// Link and folder counts plus the oldest and newest `date_added`.
    pub async fn statistics(&self) -> Result<SourceStatistics> {
        let tree = self.tree().await?;
        let records = flatten(&tree);

        let dates = records.iter().filter_map(|r| r.date_added);
        Ok(SourceStatistics {
            total_bookmarks: records.len(),
            total_folders: count_folders(&tree),
            oldest_bookmark: dates.clone().min(),
            newest_bookmark: dates.max(),
        })
    }
}

fn provider_error(e: Error) -> Error {
    match e {
        Error::NotFound(_) | Error::SourceUnavailable(_) | Error::InvalidInput(_) => e,
        other => Error::SourceUnavailable(other.to_string()),
    }
}

/// Flatten a tree into link records, keeping tree order.
pub fn flatten(tree: &[BookmarkNode]) -> Vec<BookmarkRecord> {
    let mut records = Vec::new();
    let mut path = Vec::new();
    walk(tree, None, &mut path, &mut records);
    records
}

fn walk<'a>(
    nodes: &'a [BookmarkNode],
    parent: Option<&'a BookmarkNode>,
    path: &mut Vec<&'a str>,
    out: &mut Vec<BookmarkRecord>,
) {
    for node in nodes {
        if let Some(url) = &node.url {
            let folder_name = parent
                .filter(|p| p.parent_id.is_some() && !p.title.is_empty())
                .map(|p| p.title.clone())
                .unwrap_or_else(|| UNCATEGORIZED.to_string());
            out.push(BookmarkRecord {
                id: node.id.clone(),
                title: node.title.clone(),
                url: url.clone(),
                date_added: node.date_added,
                parent_id: node.parent_id.clone(),
                folder_name,
                folder_path: path.join(FOLDER_PATH_SEPARATOR),
            });
        } else if let Some(children) = &node.children {
            let titled = !node.title.is_empty();
            if titled {
                path.push(&node.title);
            }
            walk(children, Some(node), path, out);
            if titled {
                path.pop();
            }
        }
    }
}

fn count_folders(nodes: &[BookmarkNode]) -> usize {
    nodes
        .iter()
        .filter_map(|n| n.children.as_ref().filter(|_| n.is_folder()))
        .map(|children| 1 + count_folders(children))
        .sum()
}
