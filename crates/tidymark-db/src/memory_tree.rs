//! In-memory bookmark tree with browser-style roots.
//!
//! The tree starts with an untitled root `"0"` holding `"1"` (Bookmarks bar)
//! and `"2"` (Other bookmarks). New nodes default to `"2"`, the way browsers
//! file bookmarks created without a target folder.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use tidymark_core::{
    now_millis, BookmarkId, BookmarkNode, BookmarkTreeProvider, CreateBookmarkRequest, Error,
    EventBus, Result, SourceEvent, UpdateBookmarkRequest,
};

pub const ROOT_ID: &str = "0";
pub const BOOKMARKS_BAR_ID: &str = "1";
pub const OTHER_BOOKMARKS_ID: &str = "2";

const FIRST_USER_ID: u64 = 100;

#[derive(Debug, Clone)]
struct Entry {
    node: BookmarkNode,
    children: Vec<BookmarkId>,
}

#[derive(Debug)]
struct TreeState {
    entries: HashMap<BookmarkId, Entry>,
    next_id: u64,
}

impl TreeState {
    fn new() -> Self {
        let now = now_millis();
        let mut entries = HashMap::new();

        let root = BookmarkNode::folder(ROOT_ID, "").with_date_added(now);
        entries.insert(
            ROOT_ID.to_string(),
            Entry {
                node: root,
                children: vec![BOOKMARKS_BAR_ID.to_string(), OTHER_BOOKMARKS_ID.to_string()],
            },
        );
        for (id, title) in [(BOOKMARKS_BAR_ID, "Bookmarks bar"), (OTHER_BOOKMARKS_ID, "Other bookmarks")] {
            let mut node = BookmarkNode::folder(id, title).with_date_added(now);
            node.parent_id = Some(ROOT_ID.to_string());
            entries.insert(
                id.to_string(),
                Entry {
                    node,
                    children: Vec::new(),
                },
            );
        }

        Self {
            entries,
            next_id: FIRST_USER_ID,
        }
    }

    fn entry(&self, id: &str) -> Result<&Entry> {
        self.entries
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("bookmark {id}")))
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut Entry> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("bookmark {id}")))
    }

    fn folder_mut(&mut self, id: &str) -> Result<&mut Entry> {
        let entry = self.entry_mut(id)?;
        if entry.node.is_link() {
            return Err(Error::InvalidInput(format!("{id} is not a folder")));
        }
        Ok(entry)
    }

    /// Detached copy of a node with its position filled in.
    fn snapshot(&self, id: &str) -> Result<BookmarkNode> {
        let entry = self.entry(id)?;
        let mut node = entry.node.clone();
        node.children = None;
        node.index = entry
            .node
            .parent_id
            .as_deref()
            .and_then(|p| self.entries.get(p))
            .and_then(|p| p.children.iter().position(|c| c == id))
            .map(|i| i as u32);
        Ok(node)
    }

    fn build(&self, id: &str, index: Option<u32>) -> Option<BookmarkNode> {
        let entry = self.entries.get(id)?;
        let mut node = entry.node.clone();
        node.index = index;
        if node.is_folder() {
            node.children = Some(
                entry
                    .children
                    .iter()
                    .enumerate()
                    .filter_map(|(i, c)| self.build(c, Some(i as u32)))
                    .collect(),
            );
        }
        Some(node)
    }

    fn is_within(&self, id: &str, ancestor: &str) -> bool {
        let mut current = Some(id.to_string());
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            current = self.entries.get(&cur).and_then(|e| e.node.parent_id.clone());
        }
        false
    }

    fn detach(&mut self, id: &str) -> Result<()> {
        let parent_id = self.entry(id)?.node.parent_id.clone();
        if let Some(parent_id) = parent_id {
            let parent = self.entry_mut(&parent_id)?;
            parent.children.retain(|c| c != id);
        }
        Ok(())
    }

    fn attach(&mut self, id: &str, parent_id: &str, index: Option<u32>) -> Result<()> {
        let parent = self.folder_mut(parent_id)?;
        let at = index
            .map(|i| (i as usize).min(parent.children.len()))
            .unwrap_or(parent.children.len());
        parent.children.insert(at, id.to_string());
        parent.node.date_group_modified = Some(now_millis());
        self.entry_mut(id)?.node.parent_id = Some(parent_id.to_string());
        Ok(())
    }
}

fn is_root(id: &str) -> bool {
    matches!(id, ROOT_ID | BOOKMARKS_BAR_ID | OTHER_BOOKMARKS_ID)
}

/// `BookmarkTreeProvider` kept entirely in memory.
#[derive(Clone)]
pub struct MemoryBookmarkTree {
    state: Arc<RwLock<TreeState>>,
    events: Option<EventBus>,
}

impl Default for MemoryBookmarkTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBookmarkTree {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(TreeState::new())),
            events: None,
        }
    }

    /// Publish a [`SourceEvent`] on `bus` for every change.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// Add a link under `parent_id`, returning its id.
    pub async fn add_link(&self, parent_id: &str, title: &str, url: &str) -> Result<BookmarkId> {
        let node = self
            .create(CreateBookmarkRequest {
                title: title.to_string(),
                url: Some(url.to_string()),
                parent_id: Some(parent_id.to_string()),
                index: None,
            })
            .await?;
        Ok(node.id)
    }

    /// Add a folder under `parent_id`, returning its id.
    pub async fn add_folder(&self, parent_id: &str, title: &str) -> Result<BookmarkId> {
        let node = self
            .create(CreateBookmarkRequest {
                title: title.to_string(),
                url: None,
                parent_id: Some(parent_id.to_string()),
                index: None,
            })
            .await?;
        Ok(node.id)
    }

    fn emit(&self, event: SourceEvent) {
        if let Some(bus) = &self.events {
            bus.emit(event);
        }
    }
}

#[async_trait]
impl BookmarkTreeProvider for MemoryBookmarkTree {
    async fn get_tree(&self) -> Result<Vec<BookmarkNode>> {
        let state = self.state.read().await;
        Ok(state.build(ROOT_ID, None).into_iter().collect())
    }

    async fn get(&self, id: &str) -> Result<BookmarkNode> {
        self.state.read().await.snapshot(id)
    }

    async fn create(&self, req: CreateBookmarkRequest) -> Result<BookmarkNode> {
        let parent_id = req
            .parent_id
            .unwrap_or_else(|| OTHER_BOOKMARKS_ID.to_string());
        if parent_id == ROOT_ID {
            return Err(Error::InvalidInput("cannot create under the root".to_string()));
        }

        let node = {
            let mut state = self.state.write().await;
            state.folder_mut(&parent_id)?;

            let id = state.next_id.to_string();
            state.next_id += 1;

            let mut node = match req.url {
                Some(url) => BookmarkNode::link(&id, req.title, url),
                None => BookmarkNode::folder(&id, req.title),
            }
            .with_date_added(now_millis());
            node.parent_id = Some(parent_id.clone());

            state.entries.insert(
                id.clone(),
                Entry {
                    node,
                    children: Vec::new(),
                },
            );
            state.attach(&id, &parent_id, req.index)?;
            state.snapshot(&id)?
        };

        self.emit(SourceEvent::Created { node: node.clone() });
        Ok(node)
    }

    async fn update(&self, id: &str, req: UpdateBookmarkRequest) -> Result<BookmarkNode> {
        let node = {
            let mut state = self.state.write().await;
            let entry = state.entry_mut(id)?;
            if req.url.is_some() && entry.node.is_folder() {
                return Err(Error::InvalidInput(format!("folder {id} cannot have a url")));
            }
            if let Some(title) = req.title {
                entry.node.title = title;
            }
            if let Some(url) = req.url {
                entry.node.url = Some(url);
            }
            state.snapshot(id)?
        };

        self.emit(SourceEvent::Changed { id: id.to_string() });
        Ok(node)
    }

    async fn remove(&self, id: &str) -> Result<()> {
        {
            let mut state = self.state.write().await;
            let entry = state.entry(id)?;
            if is_root(id) {
                return Err(Error::InvalidInput(format!("cannot remove root folder {id}")));
            }
            if !entry.children.is_empty() {
                return Err(Error::InvalidInput(format!("folder {id} is not empty")));
            }
            state.detach(id)?;
            state.entries.remove(id);
        }

        self.emit(SourceEvent::Removed { id: id.to_string() });
        Ok(())
    }

    async fn move_node(
        &self,
        id: &str,
        parent_id: &str,
        index: Option<u32>,
    ) -> Result<BookmarkNode> {
        let node = {
            let mut state = self.state.write().await;
            state.entry(id)?;
            state.folder_mut(parent_id)?;
            if is_root(id) {
                return Err(Error::InvalidInput(format!("cannot move root folder {id}")));
            }
            if parent_id == ROOT_ID || state.is_within(parent_id, id) {
                return Err(Error::InvalidInput(format!(
                    "cannot move {id} under {parent_id}"
                )));
            }
            state.detach(id)?;
            state.attach(id, parent_id, index)?;
            state.snapshot(id)?
        };

        self.emit(SourceEvent::Moved {
            id: id.to_string(),
            parent_id: parent_id.to_string(),
        });
        Ok(node)
    }

    async fn search_url(&self, url: &str) -> Result<Vec<BookmarkNode>> {
        let state = self.state.read().await;
        let mut hits: Vec<BookmarkNode> = state
            .entries
            .values()
            .filter(|e| e.node.url.as_deref() == Some(url))
            .map(|e| {
                let mut node = e.node.clone();
                node.children = None;
                node
            })
            .collect();
        hits.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(hits)
    }
}
