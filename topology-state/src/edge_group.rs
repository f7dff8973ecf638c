//! Edge Grouping
//!
//! Edges that join the same pair of nodes, in either direction, form a
//! group. Members of a group are fanned out side by side so each stays
//! visible:
//!
//! ```text
//!   total  = Σ width + gap · (n − 1)
//!   slot i = −total/2 + Σ_{j<i} (width_j + gap) + width_i/2
//! ```
//!
//! Offsets are screen units. Dividing by the view scale turns them into
//! model units, so parallel edges keep the same on-screen spacing at every
//! zoom level. Offsets are measured against the normal of the group's
//! canonical direction (lower id to higher id), which makes `a → b` and
//! `b → a` land on opposite sides of the center line consistently.
//!
//! Self-loops stack instead of fanning: the first loop sits at the loop
//! radius and each further loop nests outside the previous one.
//!
//! A group the summarize policy collapses keeps all its members, but every
//! member is laid out at offset zero and the first one is marked as the
//! representative drawn in place of the group.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::trace;

use crate::error::validate_scale;
use crate::model::{Edge, Edges, LinePosition, Nodes, Point};
use crate::style::{Configs, EdgeConfig, EdgeKind, SummarizePolicy};

/// Unordered endpoint pair identifying a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey {
    low: String,
    high: String,
}

impl GroupKey {
    pub fn new(a: &str, b: &str) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self {
            low: low.to_owned(),
            high: high.to_owned(),
        }
    }

    pub fn of(edge: &Edge) -> Self {
        Self::new(&edge.source, &edge.target)
    }

    pub fn low(&self) -> &str {
        &self.low
    }

    pub fn high(&self) -> &str {
        &self.high
    }

    pub fn is_self_loop(&self) -> bool {
        self.low == self.high
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<=>{}", self.low, self.high)
    }
}

/// Where one edge sits inside its group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeLayoutPoint {
    pub group: GroupKey,
    /// Screen-space offset from the group's center line.
    pub offset: f64,
    /// The edge runs from the higher id to the lower one.
    pub reversed: bool,
    pub self_loop: bool,
    pub summarized: bool,
    /// Drawn in place of its summarized group.
    pub representative: bool,
    pub kind: EdgeKind,
    pub loop_radius: f64,
}

impl EdgeLayoutPoint {
    /// Whether the renderer draws this edge at all.
    pub fn is_visible(&self) -> bool {
        !self.summarized || self.representative
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Member {
    width: f64,
    reversed: bool,
}

/// The edges sharing one endpoint pair, in registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeGroup {
    key: GroupKey,
    members: IndexMap<String, Member>,
    width: f64,
    summarized: bool,
    node_extent: Option<f64>,
}

impl EdgeGroup {
    fn new(key: GroupKey) -> Self {
        Self {
            key,
            members: IndexMap::new(),
            width: 0.0,
            summarized: false,
            node_extent: None,
        }
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Total screen width of the fanned-out group.
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn is_summarized(&self) -> bool {
        self.summarized
    }

    /// The edge drawn for a summarized group.
    pub fn representative(&self) -> Option<&str> {
        if self.summarized {
            self.members.keys().next().map(String::as_str)
        } else {
            None
        }
    }
}

/// Group membership and per-edge layout for every registered edge.
#[derive(Debug, Clone)]
pub struct EdgeGroupStates {
    kind: EdgeKind,
    gap: f64,
    loop_radius: f64,
    summarize: SummarizePolicy,
    groups: IndexMap<GroupKey, EdgeGroup>,
    edge_groups: IndexMap<String, GroupKey>,
    layouts: IndexMap<String, EdgeLayoutPoint>,
}

impl EdgeGroupStates {
    pub fn new(config: &EdgeConfig) -> Self {
        Self {
            kind: config.kind,
            gap: config.gap,
            loop_radius: config.self_loop_radius,
            summarize: config.summarize.clone(),
            groups: IndexMap::new(),
            edge_groups: IndexMap::new(),
            layouts: IndexMap::new(),
        }
    }

    /// Register `edge` under `id` and re-lay its group.
    ///
    /// An id that is already registered is moved to the group of its new
    /// endpoints; within the same group it keeps its slot and only its width
    /// and the group's node extent are refreshed. Returns every group whose
    /// layout changed.
    pub fn insert_edge(
        &mut self,
        id: &str,
        edge: &Edge,
        nodes: &Nodes,
        configs: &Configs,
    ) -> Vec<GroupKey> {
        let key = GroupKey::of(edge);
        let mut touched = Vec::with_capacity(2);
        if self.edge_groups.get(id).is_some_and(|previous| *previous != key) {
            touched.extend(self.remove_edge(id));
        }

        let member = Member {
            width: configs.edge.base_width(edge),
            reversed: edge.source > edge.target,
        };
        let node_extent = [key.low(), key.high()]
            .into_iter()
            .filter_map(|node_id| nodes.get(node_id))
            .map(|node| configs.node.extent(node))
            .reduce(f64::min);

        let group = self
            .groups
            .entry(key.clone())
            .or_insert_with(|| EdgeGroup::new(key.clone()));
        group.members.insert(id.to_owned(), member);
        group.node_extent = node_extent;
        self.edge_groups.insert(id.to_owned(), key.clone());

        self.relayout(&key);
        trace!(edge = id, group = %key, "edge registered");

        if !touched.contains(&key) {
            touched.push(key);
        }
        touched
    }

    /// Unregister an edge. Returns the group it left, if it was registered.
    pub fn remove_edge(&mut self, id: &str) -> Option<GroupKey> {
        let key = self.edge_groups.shift_remove(id)?;
        self.layouts.shift_remove(id);

        let emptied = match self.groups.get_mut(&key) {
            Some(group) => {
                group.members.shift_remove(id);
                group.members.is_empty()
            }
            None => false,
        };
        if emptied {
            self.groups.shift_remove(&key);
        } else {
            self.relayout(&key);
        }

        trace!(edge = id, group = %key, "edge unregistered");
        Some(key)
    }

    pub fn group(&self, key: &GroupKey) -> Option<&EdgeGroup> {
        self.groups.get(key)
    }

    pub fn group_of(&self, edge_id: &str) -> Option<&EdgeGroup> {
        self.edge_groups
            .get(edge_id)
            .and_then(|key| self.groups.get(key))
    }

    pub fn layout_of(&self, edge_id: &str) -> Option<&EdgeLayoutPoint> {
        self.layouts.get(edge_id)
    }

    pub fn contains_edge(&self, edge_id: &str) -> bool {
        self.edge_groups.contains_key(edge_id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &EdgeGroup> {
        self.groups.values()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_groups.len()
    }

    /// Line ends for `edge_id` between the given node centers.
    pub fn position(
        &self,
        edge_id: &str,
        source: Point,
        target: Point,
        scale: f64,
    ) -> LinePosition {
        calculate_edge_position(self.layout_of(edge_id), source, target, scale)
    }

    fn relayout(&mut self, key: &GroupKey) {
        let Some(group) = self.groups.get_mut(key) else {
            return;
        };

        let count = group.members.len();
        let widths: f64 = group.members.values().map(|m| m.width).sum();
        group.width = widths + self.gap * count.saturating_sub(1) as f64;
        group.summarized = self
            .summarize
            .should_summarize(count, group.width, group.node_extent);

        let self_loop = key.is_self_loop();
        let mut cursor = if self_loop { 0.0 } else { -group.width / 2.0 };

        for (index, (id, member)) in group.members.iter().enumerate() {
            let offset = match (group.summarized, self_loop) {
                (true, _) => 0.0,
                (false, true) => cursor,
                (false, false) => cursor + member.width / 2.0,
            };
            cursor += member.width + self.gap;

            self.layouts.insert(
                id.clone(),
                EdgeLayoutPoint {
                    group: key.clone(),
                    offset,
                    reversed: member.reversed,
                    self_loop,
                    summarized: group.summarized,
                    representative: group.summarized && index == 0,
                    kind: self.kind,
                    loop_radius: self.loop_radius,
                },
            );
        }
    }
}

/// Group every edge in collection order.
pub fn compute_groups(nodes: &Nodes, edges: &Edges, configs: &Configs) -> EdgeGroupStates {
    let mut states = EdgeGroupStates::new(&configs.edge);
    for (id, edge) in edges {
        states.insert_edge(id, edge, nodes, configs);
    }
    states
}

/// Line ends for an edge between two node centers.
///
/// Without a layout the edge is drawn straight between the centers. A
/// scale that is not finite and positive is treated as 1.
pub fn calculate_edge_position(
    layout: Option<&EdgeLayoutPoint>,
    source: Point,
    target: Point,
    scale: f64,
) -> LinePosition {
    let Some(layout) = layout else {
        return LinePosition::straight(source, target);
    };
    let scale = validate_scale(scale).unwrap_or_else(|err| {
        trace!(%err, "degenerate scale, laying out at 1");
        1.0
    });

    if layout.self_loop {
        let lift = (layout.loop_radius + layout.offset.abs()) / scale;
        return LinePosition {
            source,
            target: source,
            control: Some(source + Point::new(0.0, -lift)),
        };
    }

    let (low, high) = if layout.reversed {
        (target, source)
    } else {
        (source, target)
    };
    let shift = match (high - low).unit_normal() {
        Some(normal) => normal * (layout.offset / scale),
        None => Point::ORIGIN,
    };

    match layout.kind {
        EdgeKind::Straight => LinePosition::straight(source + shift, target + shift),
        EdgeKind::Curve => LinePosition {
            source,
            target,
            control: Some(source.midpoint(target) + shift * 2.0),
        },
    }
}
