//! State change events.
//!
//! The synchronizer reports every structural and interaction change it
//! applies through an [`Emitter`]. Handlers subscribe to one event kind or to
//! all of them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::edge_group::GroupKey;

/// Something that changed in the derived state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum Event {
    #[serde(rename = "node:state-created")]
    NodeStateCreated { id: String },
    #[serde(rename = "node:state-removed")]
    NodeStateRemoved { id: String },
    #[serde(rename = "node:selection-changed")]
    NodeSelectionChanged { id: String, selected: bool },
    #[serde(rename = "node:hover-changed")]
    NodeHoverChanged { id: String, hovered: bool },
    #[serde(rename = "edge:state-created")]
    EdgeStateCreated { id: String },
    #[serde(rename = "edge:state-removed")]
    EdgeStateRemoved { id: String },
    #[serde(rename = "edge:selection-changed")]
    EdgeSelectionChanged { id: String, selected: bool },
    #[serde(rename = "edge:hover-changed")]
    EdgeHoverChanged { id: String, hovered: bool },
    #[serde(rename = "edge:group-changed")]
    EdgeGroupChanged { key: GroupKey },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NodeStateCreated,
    NodeStateRemoved,
    NodeSelectionChanged,
    NodeHoverChanged,
    EdgeStateCreated,
    EdgeStateRemoved,
    EdgeSelectionChanged,
    EdgeHoverChanged,
    EdgeGroupChanged,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::NodeStateCreated => "node:state-created",
            Self::NodeStateRemoved => "node:state-removed",
            Self::NodeSelectionChanged => "node:selection-changed",
            Self::NodeHoverChanged => "node:hover-changed",
            Self::EdgeStateCreated => "edge:state-created",
            Self::EdgeStateRemoved => "edge:state-removed",
            Self::EdgeSelectionChanged => "edge:selection-changed",
            Self::EdgeHoverChanged => "edge:hover-changed",
            Self::EdgeGroupChanged => "edge:group-changed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::NodeStateCreated { .. } => EventKind::NodeStateCreated,
            Self::NodeStateRemoved { .. } => EventKind::NodeStateRemoved,
            Self::NodeSelectionChanged { .. } => EventKind::NodeSelectionChanged,
            Self::NodeHoverChanged { .. } => EventKind::NodeHoverChanged,
            Self::EdgeStateCreated { .. } => EventKind::EdgeStateCreated,
            Self::EdgeStateRemoved { .. } => EventKind::EdgeStateRemoved,
            Self::EdgeSelectionChanged { .. } => EventKind::EdgeSelectionChanged,
            Self::EdgeHoverChanged { .. } => EventKind::EdgeHoverChanged,
            Self::EdgeGroupChanged { .. } => EventKind::EdgeGroupChanged,
        }
    }
}

/// Handle returned by [`Emitter::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

impl Subscription {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

struct Listener {
    id: Subscription,
    kind: Option<EventKind>,
    handler: Handler,
}

/// Publish/subscribe channel for [`Event`]s.
///
/// Clones share their listeners.
#[derive(Clone, Default)]
pub struct Emitter {
    listeners: Arc<RwLock<Vec<Listener>>>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for every event of `kind`.
    pub fn on(
        &self,
        kind: EventKind,
        handler: impl Fn(&Event) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe(Some(kind), Arc::new(handler))
    }

    /// Call `handler` for every event.
    pub fn on_any(&self, handler: impl Fn(&Event) + Send + Sync + 'static) -> Subscription {
        self.subscribe(None, Arc::new(handler))
    }

    /// Returns whether the subscription was still registered.
    pub fn off(&self, subscription: Subscription) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| l.id != subscription);
        listeners.len() != before
    }

    /// Deliver `event` to every matching handler, in subscription order.
    ///
    /// Handlers may subscribe or unsubscribe while being called; the change
    /// applies from the next event on.
    pub fn emit(&self, event: Event) {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .listeners
            .read()
            .iter()
            .filter(|l| l.kind.map_or(true, |k| k == kind))
            .map(|l| Arc::clone(&l.handler))
            .collect();

        for handler in handlers {
            handler(&event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn subscribe(&self, kind: Option<EventKind>, handler: Handler) -> Subscription {
        let id = Subscription::next();
        self.listeners.write().push(Listener { id, kind, handler });
        id
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("handlers", &self.handler_count())
            .finish()
    }
}
