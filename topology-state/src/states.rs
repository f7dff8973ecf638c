//! The States context.
//!
//! [`States`] bundles everything the derived diagram state consists of: the
//! application-owned inputs, the node and edge state stores, the edge
//! groups, the event emitter, and the synchronizer keeping them consistent.
//! It is the single object a renderer or a layout is handed.

use std::sync::Arc;

use tracing::debug;

use crate::edge_group::{compute_groups, EdgeGroupStates};
use crate::edge_state::{EdgeSources, EdgeState, EdgeStateStore};
use crate::error::{validate_scale, Result};
use crate::events::Emitter;
use crate::layout::{LayoutActivateParameters, LayoutHandler, ViewportController};
use crate::model::{Edges, IdSet, NodePositions, Nodes};
use crate::node_state::{NodeState, NodeStateStore};
use crate::reactive::{Runtime, Signal};
use crate::style::Configs;
use crate::sync::{StructuralSynchronizer, SyncTargets};

/// The application-owned inputs.
///
/// The application mutates these signals; the derived state follows.
#[derive(Debug, Clone)]
pub struct GraphInputs {
    pub nodes: Signal<Nodes>,
    pub edges: Signal<Edges>,
    pub selected_nodes: Signal<IdSet>,
    pub hovered_nodes: Signal<IdSet>,
    pub selected_edges: Signal<IdSet>,
    pub hovered_edges: Signal<IdSet>,
    /// Written by the active layout.
    pub layouts: Signal<NodePositions>,
    pub scale: Signal<f64>,
}

impl GraphInputs {
    /// Inputs with empty interaction sets, no positions, and scale 1.
    pub fn new(nodes: Nodes, edges: Edges) -> Self {
        Self {
            nodes: Signal::new(nodes),
            edges: Signal::new(edges),
            selected_nodes: Signal::default(),
            hovered_nodes: Signal::default(),
            selected_edges: Signal::default(),
            hovered_edges: Signal::default(),
            layouts: Signal::default(),
            scale: Signal::new(1.0),
        }
    }

    pub fn with_layouts(self, layouts: NodePositions) -> Self {
        self.layouts.set(layouts);
        self
    }
}

/// The derived state of one diagram.
pub struct States {
    inputs: GraphInputs,
    configs: Arc<Configs>,
    emitter: Emitter,
    groups: Signal<EdgeGroupStates>,
    node_states: NodeStateStore,
    edge_states: EdgeStateStore,
    sync: StructuralSynchronizer,
}

impl States {
    /// Build the derived state for `inputs` and start keeping it in sync.
    ///
    /// States for the initial nodes and edges are created directly, without
    /// events. Fails on a degenerate scale or edge configuration.
    pub fn provide(inputs: GraphInputs, configs: Configs, emitter: Emitter) -> Result<Self> {
        validate_scale(inputs.scale.get_untracked())?;
        configs.validate()?;
        let configs = Arc::new(configs);

        let groups = inputs.nodes.with_untracked(|nodes| {
            inputs
                .edges
                .with_untracked(|edges| compute_groups(nodes, edges, &configs))
        });
        let groups = Signal::new(groups);

        let node_states = NodeStateStore::new(inputs.nodes.clone(), Arc::clone(&configs));
        let edge_states = EdgeStateStore::new(
            EdgeSources {
                edges: inputs.edges.clone(),
                layouts: inputs.layouts.clone(),
                groups: groups.clone(),
                scale: inputs.scale.clone(),
            },
            Arc::clone(&configs),
        );

        let node_ids: Vec<String> = inputs.nodes.with_untracked(|n| n.keys().cloned().collect());
        for id in &node_ids {
            let selected = inputs.selected_nodes.with_untracked(|s| s.contains(id));
            let hovered = inputs.hovered_nodes.with_untracked(|s| s.contains(id));
            node_states.create(id, selected, hovered);
        }

        let edge_ids: Vec<String> = inputs.edges.with_untracked(|e| e.keys().cloned().collect());
        for id in &edge_ids {
            let selected = inputs.selected_edges.with_untracked(|s| s.contains(id));
            let hovered = inputs.hovered_edges.with_untracked(|s| s.contains(id));
            edge_states.create(id, selected, hovered);
        }

        let sync = StructuralSynchronizer::install(SyncTargets {
            nodes: inputs.nodes.clone(),
            edges: inputs.edges.clone(),
            selected_nodes: inputs.selected_nodes.clone(),
            hovered_nodes: inputs.hovered_nodes.clone(),
            selected_edges: inputs.selected_edges.clone(),
            hovered_edges: inputs.hovered_edges.clone(),
            layouts: inputs.layouts.clone(),
            groups: groups.clone(),
            node_states: node_states.clone(),
            edge_states: edge_states.clone(),
            configs: Arc::clone(&configs),
            emitter: emitter.clone(),
        });

        debug!(
            nodes = node_ids.len(),
            edges = edge_ids.len(),
            groups = groups.with_untracked(EdgeGroupStates::group_count),
            "states provided"
        );

        Ok(Self {
            inputs,
            configs,
            emitter,
            groups,
            node_states,
            edge_states,
            sync,
        })
    }

    pub fn inputs(&self) -> &GraphInputs {
        &self.inputs
    }

    pub fn nodes(&self) -> &Signal<Nodes> {
        &self.inputs.nodes
    }

    pub fn edges(&self) -> &Signal<Edges> {
        &self.inputs.edges
    }

    pub fn selected_nodes(&self) -> &Signal<IdSet> {
        &self.inputs.selected_nodes
    }

    pub fn hovered_nodes(&self) -> &Signal<IdSet> {
        &self.inputs.hovered_nodes
    }

    pub fn selected_edges(&self) -> &Signal<IdSet> {
        &self.inputs.selected_edges
    }

    pub fn hovered_edges(&self) -> &Signal<IdSet> {
        &self.inputs.hovered_edges
    }

    pub fn layouts(&self) -> &Signal<NodePositions> {
        &self.inputs.layouts
    }

    pub fn scale(&self) -> f64 {
        self.inputs.scale.get()
    }

    /// Change the view scale. Rejects non-finite and non-positive values.
    pub fn set_scale(&self, scale: f64) -> Result<()> {
        self.inputs.scale.set_if_changed(validate_scale(scale)?);
        Ok(())
    }

    pub fn configs(&self) -> &Arc<Configs> {
        &self.configs
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    pub fn node_states(&self) -> &NodeStateStore {
        &self.node_states
    }

    pub fn edge_states(&self) -> &EdgeStateStore {
        &self.edge_states
    }

    pub fn node_state(&self, id: &str) -> Option<NodeState> {
        self.node_states.get(id)
    }

    pub fn edge_state(&self, id: &str) -> Option<EdgeState> {
        self.edge_states.get(id)
    }

    /// Read the current edge groups.
    pub fn with_edge_groups<R>(&self, f: impl FnOnce(&EdgeGroupStates) -> R) -> R {
        self.groups.with(f)
    }

    pub fn synchronizer(&self) -> &StructuralSynchronizer {
        &self.sync
    }

    /// Apply several input changes as one; the state settles once at the end.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        Runtime::batch(f)
    }

    pub fn layout_parameters(
        &self,
        viewport: Arc<dyn ViewportController>,
    ) -> LayoutActivateParameters {
        LayoutActivateParameters {
            layouts: self.inputs.layouts.clone(),
            nodes: self.inputs.nodes.clone(),
            links: self.inputs.edges.clone(),
            styles: Arc::clone(&self.configs),
            emitter: self.emitter.clone(),
            scale: self.inputs.scale.clone(),
            viewport,
        }
    }

    /// Hand the layout everything it needs and let it start positioning.
    pub fn activate_layout(
        &self,
        layout: &mut dyn LayoutHandler,
        viewport: Arc<dyn ViewportController>,
    ) {
        layout.activate(self.layout_parameters(viewport));
    }
}

impl std::fmt::Debug for States {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("States")
            .field("node_states", &self.node_states)
            .field("edge_states", &self.edge_states)
            .field("sync", &self.sync)
            .finish_non_exhaustive()
    }
}
