//! Node State Store
//!
//! One [`NodeState`] per node id. Each record resolves its node's shape,
//! label style, and label text through the node style configuration, and
//! keeps them current as the node's data or interaction flags change.
//!
//! Derived fields are memos: nothing is resolved until a renderer reads it,
//! and a change to one node's data leaves every other node's styles cached.

use std::sync::Arc;

use serde::Serialize;
use tracing::trace;

use crate::model::{Node, Nodes};
use crate::reactive::{Memo, Signal};
use crate::store::Records;
use crate::style::{Configs, NodeLabelStyle, ShapeStyle};

/// Derived state of one node.
///
/// Cloning gives another handle to the same record.
#[derive(Clone)]
pub struct NodeState {
    id: String,
    selected: Signal<bool>,
    hovered: Signal<bool>,
    data: Memo<Option<Node>>,
    shape: Memo<ShapeStyle>,
    label: Memo<NodeLabelStyle>,
    label_text: Memo<String>,
}

impl NodeState {
    fn new(
        id: &str,
        nodes: &Signal<Nodes>,
        configs: &Arc<Configs>,
        selected: bool,
        hovered: bool,
    ) -> Self {
        let selected = Signal::new(selected);
        let hovered = Signal::new(hovered);

        let data = {
            let (nodes, id) = (nodes.clone(), id.to_owned());
            Memo::new(move || nodes.with(|nodes| nodes.get(&id).cloned()))
        };

        let shape = {
            let (data, configs) = (data.clone(), Arc::clone(configs));
            let (selected, hovered) = (selected.clone(), hovered.clone());
            Memo::new(move || {
                let (selected, hovered) = (selected.get(), hovered.get());
                with_node(&data, |node| {
                    configs.node.resolve_shape(node, selected, hovered)
                })
            })
        };

        let label = {
            let (data, configs) = (data.clone(), Arc::clone(configs));
            Memo::new(move || with_node(&data, |node| configs.node.resolve_label(node)))
        };

        let label_text = {
            let (data, configs) = (data.clone(), Arc::clone(configs));
            Memo::new(move || with_node(&data, |node| configs.node.resolve_label_text(node)))
        };

        Self {
            id: id.to_owned(),
            selected,
            hovered,
            data,
            shape,
            label,
            label_text,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn shape(&self) -> ShapeStyle {
        self.shape.get()
    }

    pub fn label(&self) -> NodeLabelStyle {
        self.label.get()
    }

    pub fn label_text(&self) -> String {
        self.label_text.get()
    }

    pub fn selected(&self) -> bool {
        self.selected.get()
    }

    pub fn hovered(&self) -> bool {
        self.hovered.get()
    }

    /// The node's current data; `None` once it left the collection.
    pub fn data(&self) -> Option<Node> {
        self.data.get()
    }

    pub fn snapshot(&self) -> NodeStateSnapshot {
        NodeStateSnapshot {
            id: self.id.clone(),
            shape: self.shape(),
            label: self.label(),
            label_text: self.label_text(),
            selected: self.selected(),
            hovered: self.hovered(),
        }
    }

    pub(crate) fn set_selected(&self, selected: bool) -> bool {
        self.selected.set_if_changed(selected)
    }

    pub(crate) fn set_hovered(&self, hovered: bool) -> bool {
        self.hovered.set_if_changed(hovered)
    }
}

impl std::fmt::Debug for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeState")
            .field("id", &self.id)
            .field("selected", &self.selected.get_untracked())
            .field("hovered", &self.hovered.get_untracked())
            .finish_non_exhaustive()
    }
}

/// Resolve against the node, or an empty node once it is gone.
fn with_node<R>(data: &Memo<Option<Node>>, f: impl FnOnce(&Node) -> R) -> R {
    data.with(|node| match node {
        Some(node) => f(node),
        None => f(&Node::default()),
    })
}

/// Plain copy of a node state's current values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStateSnapshot {
    pub id: String,
    pub shape: ShapeStyle,
    pub label: NodeLabelStyle,
    pub label_text: String,
    pub selected: bool,
    pub hovered: bool,
}

/// All node states, keyed by node id.
#[derive(Clone)]
pub struct NodeStateStore {
    nodes: Signal<Nodes>,
    configs: Arc<Configs>,
    states: Records<NodeState>,
}

impl NodeStateStore {
    pub fn new(nodes: Signal<Nodes>, configs: Arc<Configs>) -> Self {
        Self {
            nodes,
            configs,
            states: Records::new(),
        }
    }

    /// Install the state for `id`. Returns `false` if it already exists.
    pub fn create(&self, id: &str, selected: bool, hovered: bool) -> bool {
        self.states.insert_with(id, || {
            NodeState::new(id, &self.nodes, &self.configs, selected, hovered)
        })
    }

    /// Drop the state for `id`. Removing an unknown id does nothing.
    pub fn remove(&self, id: &str) -> bool {
        self.states.remove(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<NodeState> {
        self.states.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.states.contains(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.states.ids()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self, id: &str) -> Option<NodeStateSnapshot> {
        self.get(id).map(|state| state.snapshot())
    }

    pub fn snapshots(&self) -> Vec<NodeStateSnapshot> {
        self.states.values().iter().map(NodeState::snapshot).collect()
    }

    /// Returns whether the flag flipped. Unknown ids are ignored.
    pub(crate) fn set_selected(&self, id: &str, selected: bool) -> bool {
        match self.get(id) {
            Some(state) => state.set_selected(selected),
            None => {
                trace!(node = id, "selection change for unknown node ignored");
                false
            }
        }
    }

    /// Returns whether the flag flipped. Unknown ids are ignored.
    pub(crate) fn set_hovered(&self, id: &str, hovered: bool) -> bool {
        match self.get(id) {
            Some(state) => state.set_hovered(hovered),
            None => {
                trace!(node = id, "hover change for unknown node ignored");
                false
            }
        }
    }
}

impl std::fmt::Debug for NodeStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeStateStore")
            .field("ids", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{ShapeConfig, Variants};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store_with(nodes: &[(&str, &str)], configs: Configs) -> (Signal<Nodes>, NodeStateStore) {
        let nodes: Nodes = nodes
            .iter()
            .map(|(id, name)| (id.to_string(), Node::new().with("name", *name)))
            .collect();
        let signal = Signal::new(nodes);
        let store = NodeStateStore::new(signal.clone(), Arc::new(configs));
        (signal, store)
    }

    #[test]
    fn create_resolves_styles() {
        let (_, store) = store_with(&[("n1", "Node 1")], Configs::default());
        assert!(store.create("n1", false, false));
        assert!(!store.create("n1", true, true));

        let state = store.get("n1").unwrap();
        assert_eq!(state.label_text(), "Node 1");
        assert_eq!(state.shape().color, "#4466cc");
        assert!(!state.selected());
    }

    #[test]
    fn flags_switch_variants() {
        let (_, store) = store_with(&[("n1", "Node 1")], Configs::default());
        store.create("n1", false, false);

        assert!(store.set_selected("n1", true));
        assert!(!store.set_selected("n1", true));
        let state = store.get("n1").unwrap();
        assert_eq!(state.shape().stroke_color.as_deref(), Some("#ff8800"));

        store.set_hovered("n1", true);
        assert_eq!(state.shape().color, "#3355bb");
    }

    #[test]
    fn data_changes_flow_into_label() {
        let (nodes, store) = store_with(&[("n1", "before")], Configs::default());
        store.create("n1", false, false);
        let state = store.get("n1").unwrap();
        assert_eq!(state.label_text(), "before");

        nodes.update(|nodes| nodes["n1"].set("name", "after"));
        assert_eq!(state.label_text(), "after");
    }

    #[test]
    fn other_nodes_do_not_recompute() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let configs = Configs {
            node: crate::style::NodeConfig {
                shape: Variants::new(ShapeConfig {
                    color: crate::style::ConfigValue::computed(move |_: &Node| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        "#000000".to_owned()
                    }),
                    ..ShapeConfig::default()
                }),
                ..Default::default()
            },
            ..Configs::default()
        };
        let (nodes, store) = store_with(&[("n1", "a"), ("n2", "b")], configs);
        store.create("n1", false, false);
        store.create("n2", false, false);

        let n1 = store.get("n1").unwrap();
        n1.shape();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        nodes.update(|nodes| nodes["n2"].set("name", "c"));
        n1.shape();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let (_, store) = store_with(&[("n1", "a")], Configs::default());
        store.create("n1", false, false);

        assert!(store.remove("n1"));
        assert!(!store.remove("n1"));
        assert!(store.is_empty());
        assert!(!store.set_selected("n1", true));
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let (_, store) = store_with(&[("n1", "Node 1")], Configs::default());
        store.create("n1", false, true);

        let value = serde_json::to_value(store.snapshot("n1").unwrap()).unwrap();
        assert_eq!(value["labelText"], "Node 1");
        assert_eq!(value["hovered"], true);
        assert_eq!(value["shape"]["type"], "circle");
    }
}
