//! Structural Synchronizer
//!
//! Keeps the state stores in step with the data they derive from. Six
//! watchers, each diffing its source against the snapshot it saw last:
//!
//! - node ids: create states for new nodes; for removed nodes drop the
//!   layout position, scrub both node interaction sets, remove the state
//! - edge endpoints: the same for edges, plus edge group registration; an
//!   edge whose endpoints, base width, or endpoint node extents change is
//!   re-registered
//! - selected / hovered nodes: flip the flag on the node's state
//! - selected / hovered edges: flip the flag on the edge's state
//!
//! New states take their flags from the current interaction sets, so the
//! result of a batch does not depend on the order the watchers run in.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

use crate::edge_group::{EdgeGroupStates, GroupKey};
use crate::edge_state::EdgeStateStore;
use crate::events::{Emitter, Event};
use crate::model::{Edges, IdSet, NodePositions, Nodes};
use crate::node_state::NodeStateStore;
use crate::reactive::{watch, Effect, Memo, Signal};
use crate::style::Configs;

/// What an edge's group registration depends on.
///
/// The endpoint extents feed the summarize policy, so a node arriving late
/// or resizing re-lays every group it is part of.
#[derive(Debug, Clone, PartialEq)]
struct EdgeShape {
    source: String,
    target: String,
    width: f64,
    source_extent: Option<f64>,
    target_extent: Option<f64>,
}

/// Everything the watchers read and write.
pub(crate) struct SyncTargets {
    pub(crate) nodes: Signal<Nodes>,
    pub(crate) edges: Signal<Edges>,
    pub(crate) selected_nodes: Signal<IdSet>,
    pub(crate) hovered_nodes: Signal<IdSet>,
    pub(crate) selected_edges: Signal<IdSet>,
    pub(crate) hovered_edges: Signal<IdSet>,
    pub(crate) layouts: Signal<NodePositions>,
    pub(crate) groups: Signal<EdgeGroupStates>,
    pub(crate) node_states: NodeStateStore,
    pub(crate) edge_states: EdgeStateStore,
    pub(crate) configs: Arc<Configs>,
    pub(crate) emitter: Emitter,
}

/// Owns the watchers; dropping it stops synchronization.
pub struct StructuralSynchronizer {
    watchers: Vec<Effect>,
}

impl StructuralSynchronizer {
    pub(crate) fn install(targets: SyncTargets) -> Self {
        let targets = Arc::new(targets);

        let watchers = vec![
            watch_nodes(&targets),
            watch_edges(&targets),
            mirror_flags(&targets.selected_nodes, &targets, |t, id, on| {
                t.node_states.set_selected(id, on).then(|| Event::NodeSelectionChanged {
                    id: id.to_owned(),
                    selected: on,
                })
            }),
            mirror_flags(&targets.hovered_nodes, &targets, |t, id, on| {
                t.node_states.set_hovered(id, on).then(|| Event::NodeHoverChanged {
                    id: id.to_owned(),
                    hovered: on,
                })
            }),
            mirror_flags(&targets.selected_edges, &targets, |t, id, on| {
                t.edge_states.set_selected(id, on).then(|| Event::EdgeSelectionChanged {
                    id: id.to_owned(),
                    selected: on,
                })
            }),
            mirror_flags(&targets.hovered_edges, &targets, |t, id, on| {
                t.edge_states.set_hovered(id, on).then(|| Event::EdgeHoverChanged {
                    id: id.to_owned(),
                    hovered: on,
                })
            }),
        ];

        Self { watchers }
    }

    /// How often each watcher has run, in installation order.
    pub fn watcher_runs(&self) -> Vec<usize> {
        self.watchers.iter().map(Effect::run_count).collect()
    }
}

impl std::fmt::Debug for StructuralSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuralSynchronizer")
            .field("watchers", &self.watchers.len())
            .finish()
    }
}

impl Drop for StructuralSynchronizer {
    fn drop(&mut self) {
        for watcher in &self.watchers {
            watcher.dispose();
        }
    }
}

fn watch_nodes(targets: &Arc<SyncTargets>) -> Effect {
    let node_ids = {
        let nodes = targets.nodes.clone();
        Memo::new(move || nodes.with(|nodes| nodes.keys().cloned().collect::<IdSet>()))
    };

    let t = Arc::clone(targets);
    watch(move || node_ids.get(), move |current, previous| {
        for id in previous.difference(current) {
            remove_entry(&t.layouts, id);
            remove_member(&t.selected_nodes, id);
            remove_member(&t.hovered_nodes, id);
            if t.node_states.remove(id) {
                debug!(node = %id, "node state removed");
                t.emitter.emit(Event::NodeStateRemoved { id: id.clone() });
            }
        }

        for id in current.difference(previous) {
            let selected = t.selected_nodes.with_untracked(|set| set.contains(id));
            let hovered = t.hovered_nodes.with_untracked(|set| set.contains(id));
            if t.node_states.create(id, selected, hovered) {
                debug!(node = %id, "node state created");
                t.emitter.emit(Event::NodeStateCreated { id: id.clone() });
            }
        }
    })
}

fn watch_edges(targets: &Arc<SyncTargets>) -> Effect {
    let shapes = {
        let (nodes, edges) = (targets.nodes.clone(), targets.edges.clone());
        let configs = Arc::clone(&targets.configs);
        Memo::new(move || {
            nodes.with(|nodes| {
                let extent = |id: &str| nodes.get(id).map(|node| configs.node.extent(node));
                edges.with(|edges| {
                    edges
                        .iter()
                        .map(|(id, edge)| {
                            let shape = EdgeShape {
                                source: edge.source.clone(),
                                target: edge.target.clone(),
                                width: configs.edge.base_width(edge),
                                source_extent: extent(&edge.source),
                                target_extent: extent(&edge.target),
                            };
                            (id.clone(), shape)
                        })
                        .collect::<IndexMap<_, _>>()
                })
            })
        })
    };

    let t = Arc::clone(targets);
    watch(move || shapes.get(), move |current, previous| {
        let removed: Vec<&String> = previous
            .keys()
            .filter(|id| !current.contains_key(*id))
            .collect();
        let registered: Vec<&String> = current
            .iter()
            .filter(|(id, shape)| previous.get(*id) != Some(*shape))
            .map(|(id, _)| id)
            .collect();

        let mut touched = IndexSet::<GroupKey>::new();
        if !removed.is_empty() || !registered.is_empty() {
            let fresh: Vec<_> = t.edges.with_untracked(|edges| {
                registered
                    .iter()
                    .filter_map(|id| edges.get(*id).map(|edge| ((*id).clone(), edge.clone())))
                    .collect()
            });

            t.nodes.with_untracked(|nodes| {
                t.groups.update(|groups| {
                    for id in &removed {
                        touched.extend(groups.remove_edge(id));
                    }
                    for (id, edge) in &fresh {
                        touched.extend(groups.insert_edge(id, edge, nodes, &t.configs));
                    }
                })
            });
        }

        for id in removed {
            remove_member(&t.selected_edges, id);
            remove_member(&t.hovered_edges, id);
            if t.edge_states.remove(id) {
                debug!(edge = %id, "edge state removed");
                t.emitter.emit(Event::EdgeStateRemoved { id: id.clone() });
            }
        }

        for id in current.keys().filter(|id| !previous.contains_key(*id)) {
            let selected = t.selected_edges.with_untracked(|set| set.contains(id));
            let hovered = t.hovered_edges.with_untracked(|set| set.contains(id));
            if t.edge_states.create(id, selected, hovered) {
                debug!(edge = %id, "edge state created");
                t.emitter.emit(Event::EdgeStateCreated { id: id.clone() });
            }
        }

        for key in touched {
            trace!(group = %key, "edge group changed");
            t.emitter.emit(Event::EdgeGroupChanged { key });
        }
    })
}

/// Mirror additions and removals of an interaction set onto state flags.
///
/// `apply` flips the flag and returns the event to emit when it changed.
fn mirror_flags<F>(set: &Signal<IdSet>, targets: &Arc<SyncTargets>, apply: F) -> Effect
where
    F: Fn(&SyncTargets, &str, bool) -> Option<Event> + Send + Sync + 'static,
{
    let (set, t) = (set.clone(), Arc::clone(targets));
    watch(move || set.get(), move |current, previous| {
        let added = current.difference(previous).map(|id| (id, true));
        let removed = previous.difference(current).map(|id| (id, false));

        for (id, on) in removed.chain(added) {
            if let Some(event) = apply(&t, id.as_str(), on) {
                trace!(id = %id, on, "interaction flag changed");
                t.emitter.emit(event);
            }
        }
    })
}

fn remove_member(set: &Signal<IdSet>, id: &str) {
    if set.with_untracked(|set| set.contains(id)) {
        set.update(|set| set.shift_remove(id));
    }
}

fn remove_entry(positions: &Signal<NodePositions>, id: &str) {
    if positions.with_untracked(|positions| positions.contains_key(id)) {
        positions.update(|positions| positions.shift_remove(id));
    }
}
