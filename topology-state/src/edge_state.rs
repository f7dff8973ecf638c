//! Edge State Store
//!
//! One [`EdgeState`] per edge id, holding the resolved stroke and the line
//! the edge is drawn along. The line depends on both endpoint positions, the
//! edge's place in its group, and the view scale; endpoints without a
//! position are drawn from the origin.

use std::sync::Arc;

use serde::Serialize;
use tracing::trace;

use crate::edge_group::{calculate_edge_position, EdgeGroupStates, EdgeLayoutPoint};
use crate::model::{Edge, Edges, LinePosition, NodePositions, Point};
use crate::reactive::{Memo, Signal};
use crate::store::Records;
use crate::style::{Configs, StrokeStyle};

/// Derived state of one edge.
#[derive(Clone)]
pub struct EdgeState {
    id: String,
    selected: Signal<bool>,
    hovered: Signal<bool>,
    data: Memo<Option<Edge>>,
    layout: Memo<Option<EdgeLayoutPoint>>,
    stroke: Memo<StrokeStyle>,
    position: Memo<LinePosition>,
}

/// The reactive inputs an edge state reads.
#[derive(Clone)]
pub(crate) struct EdgeSources {
    pub(crate) edges: Signal<Edges>,
    pub(crate) layouts: Signal<NodePositions>,
    pub(crate) groups: Signal<EdgeGroupStates>,
    pub(crate) scale: Signal<f64>,
}

impl EdgeState {
    fn new(
        id: &str,
        sources: &EdgeSources,
        configs: &Arc<Configs>,
        selected: bool,
        hovered: bool,
    ) -> Self {
        let selected = Signal::new(selected);
        let hovered = Signal::new(hovered);

        let data = {
            let (edges, id) = (sources.edges.clone(), id.to_owned());
            Memo::new(move || edges.with(|edges| edges.get(&id).cloned()))
        };

        let layout = {
            let (groups, id) = (sources.groups.clone(), id.to_owned());
            Memo::new(move || groups.with(|groups| groups.layout_of(&id).cloned()))
        };

        let stroke = {
            let (data, configs) = (data.clone(), Arc::clone(configs));
            let (selected, hovered) = (selected.clone(), hovered.clone());
            Memo::new(move || {
                let (selected, hovered) = (selected.get(), hovered.get());
                data.with(|edge| match edge {
                    Some(edge) => configs.edge.resolve_stroke(edge, selected, hovered),
                    None => {
                        let detached = Edge::new("", "");
                        configs.edge.resolve_stroke(&detached, selected, hovered)
                    }
                })
            })
        };

        let position = {
            let (data, layout) = (data.clone(), layout.clone());
            let (layouts, scale) = (sources.layouts.clone(), sources.scale.clone());
            Memo::new(move || {
                let Some((source, target)) =
                    data.with(|edge| edge.as_ref().map(|e| (e.source.clone(), e.target.clone())))
                else {
                    return LinePosition::default();
                };

                let (from, to) = layouts.with(|positions| {
                    let at = |id: &str| positions.get(id).copied().unwrap_or(Point::ORIGIN);
                    (at(&source), at(&target))
                });
                let scale = scale.get();

                layout.with(|point| calculate_edge_position(point.as_ref(), from, to, scale))
            })
        };

        Self {
            id: id.to_owned(),
            selected,
            hovered,
            data,
            layout,
            stroke,
            position,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stroke(&self) -> StrokeStyle {
        self.stroke.get()
    }

    pub fn position(&self) -> LinePosition {
        self.position.get()
    }

    pub fn selected(&self) -> bool {
        self.selected.get()
    }

    pub fn hovered(&self) -> bool {
        self.hovered.get()
    }

    pub fn data(&self) -> Option<Edge> {
        self.data.get()
    }

    /// The edge's place in its group, if it is registered in one.
    pub fn layout(&self) -> Option<EdgeLayoutPoint> {
        self.layout.get()
    }

    pub fn snapshot(&self) -> EdgeStateSnapshot {
        EdgeStateSnapshot {
            id: self.id.clone(),
            stroke: self.stroke(),
            position: self.position(),
            selected: self.selected(),
            hovered: self.hovered(),
            visible: self.layout().map_or(true, |layout| layout.is_visible()),
        }
    }

    pub(crate) fn set_selected(&self, selected: bool) -> bool {
        self.selected.set_if_changed(selected)
    }

    pub(crate) fn set_hovered(&self, hovered: bool) -> bool {
        self.hovered.set_if_changed(hovered)
    }
}

impl std::fmt::Debug for EdgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeState")
            .field("id", &self.id)
            .field("selected", &self.selected.get_untracked())
            .field("hovered", &self.hovered.get_untracked())
            .finish_non_exhaustive()
    }
}

/// Plain copy of an edge state's current values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeStateSnapshot {
    pub id: String,
    pub stroke: StrokeStyle,
    pub position: LinePosition,
    pub selected: bool,
    pub hovered: bool,
    /// `false` for members of a summarized group other than its representative.
    pub visible: bool,
}

/// All edge states, keyed by edge id.
#[derive(Clone)]
pub struct EdgeStateStore {
    sources: EdgeSources,
    configs: Arc<Configs>,
    states: Records<EdgeState>,
}

impl EdgeStateStore {
    pub(crate) fn new(sources: EdgeSources, configs: Arc<Configs>) -> Self {
        Self {
            sources,
            configs,
            states: Records::new(),
        }
    }

    /// Install the state for `id`. Returns `false` if it already exists.
    pub fn create(&self, id: &str, selected: bool, hovered: bool) -> bool {
        self.states.insert_with(id, || {
            EdgeState::new(id, &self.sources, &self.configs, selected, hovered)
        })
    }

    /// Drop the state for `id`. Removing an unknown id does nothing.
    pub fn remove(&self, id: &str) -> bool {
        self.states.remove(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<EdgeState> {
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

    pub fn snapshot(&self, id: &str) -> Option<EdgeStateSnapshot> {
        self.get(id).map(|state| state.snapshot())
    }

    pub fn snapshots(&self) -> Vec<EdgeStateSnapshot> {
        self.states.values().iter().map(EdgeState::snapshot).collect()
    }

    pub(crate) fn set_selected(&self, id: &str, selected: bool) -> bool {
        match self.get(id) {
            Some(state) => state.set_selected(selected),
            None => {
                trace!(edge = id, "selection change for unknown edge ignored");
                false
            }
        }
    }

    pub(crate) fn set_hovered(&self, id: &str, hovered: bool) -> bool {
        match self.get(id) {
            Some(state) => state.set_hovered(hovered),
            None => {
                trace!(edge = id, "hover change for unknown edge ignored");
                false
            }
        }
    }
}

impl std::fmt::Debug for EdgeStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeStateStore")
            .field("ids", &self.ids())
            .finish()
    }
}
