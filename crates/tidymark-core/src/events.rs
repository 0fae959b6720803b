//! Bookmark source change notifications and the event bus carrying them.
//!
//! Providers publish a [`SourceEvent`] whenever the underlying tree changes,
//! and the metadata store publishes one for every overlay write;
//! consumers (the organization engine's re-merge loop, UI layers) subscribe
//! independently. Slow receivers lag and skip events rather than blocking
//! publishers.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::{BookmarkId, BookmarkNode};

/// A change observed in the bookmark source or the metadata overlay.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceEvent {
    Created { node: BookmarkNode },
    Changed { id: BookmarkId },
    Moved { id: BookmarkId, parent_id: BookmarkId },
    Removed { id: BookmarkId },
    MetadataChanged { id: BookmarkId },
}

impl SourceEvent {
    /// Dot-namespaced event name.
    pub fn event_type(&self) -> &'static str {
        match self {
            SourceEvent::Created { .. } => "bookmark.created",
            SourceEvent::Changed { .. } => "bookmark.changed",
            SourceEvent::Moved { .. } => "bookmark.moved",
            SourceEvent::Removed { .. } => "bookmark.removed",
            SourceEvent::MetadataChanged { .. } => "metadata.changed",
        }
    }

    /// Id of the bookmark the event is about.
    pub fn bookmark_id(&self) -> &str {
        match self {
            SourceEvent::Created { node } => &node.id,
            SourceEvent::Changed { id }
            | SourceEvent::Moved { id, .. }
            | SourceEvent::Removed { id }
            | SourceEvent::MetadataChanged { id } => id,
        }
    }
}

/// Broadcast bus for [`SourceEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SourceEvent>,
}

impl EventBus {
    /// Create a bus that buffers up to `capacity` events per receiver.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Having no subscribers is fine.
    pub fn emit(&self, event: SourceEvent) {
        tracing::trace!(event_type = event.event_type(), bookmark_id = event.bookmark_id(), "Source event");
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SourceEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}
