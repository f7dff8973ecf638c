//! Graph Vertices
//!
//! Every reactive value owns exactly one vertex. The vertex carries what the
//! scheduler needs to know about the value: its kind, whether its cached value
//! can be trusted, and a version counter that moves whenever the value
//! observably changes.

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;

/// Unique identifier for a vertex in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(u64);

impl VertexId {
    /// Generate a new unique vertex ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for VertexId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for VertexId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// What a vertex stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKind {
    /// A signal. Roots of the graph: no dependencies, only dependents.
    Source,

    /// A memo. Has dependencies, may have dependents, caches its value.
    Derived,

    /// An effect. Leaves of the graph: reads values, produces no value.
    Effect,
}

/// Whether the cached value behind a vertex can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyState {
    /// Up to date.
    Clean,

    /// Something upstream changed, but a direct input may still hold the same
    /// value. Inputs must be refreshed and their versions compared.
    MaybeDirty,

    /// A direct input changed. Must recompute.
    Dirty,
}

/// A vertex in the dependency graph.
#[derive(Debug)]
pub struct Vertex {
    id: VertexId,
    kind: VertexKind,
    dirty: DirtyState,

    /// Bumped every time the value behind this vertex changes.
    version: u64,

    /// Vertices this one reads from.
    dependencies: IndexSet<VertexId>,

    /// Vertices that read from this one.
    dependents: IndexSet<VertexId>,
}

impl Vertex {
    /// Create a new vertex of the given kind with a fresh ID.
    pub fn new(kind: VertexKind) -> Self {
        Self::with_id(VertexId::new(), kind)
    }

    /// Create a vertex with a caller-chosen ID.
    pub fn with_id(id: VertexId, kind: VertexKind) -> Self {
        Self {
            id,
            kind,
            dirty: match kind {
                VertexKind::Source => DirtyState::Clean,
                // Derived values and effects have never run yet.
                VertexKind::Derived | VertexKind::Effect => DirtyState::Dirty,
            },
            version: 0,
            dependencies: IndexSet::new(),
            dependents: IndexSet::new(),
        }
    }

    pub fn source() -> Self {
        Self::new(VertexKind::Source)
    }

    pub fn derived() -> Self {
        Self::new(VertexKind::Derived)
    }

    pub fn effect() -> Self {
        Self::new(VertexKind::Effect)
    }

    pub fn id(&self) -> VertexId {
        self.id
    }

    pub fn kind(&self) -> VertexKind {
        self.kind
    }

    pub fn dirty_state(&self) -> DirtyState {
        self.dirty
    }

    pub fn is_clean(&self) -> bool {
        self.dirty == DirtyState::Clean
    }

    pub fn mark_clean(&mut self) {
        self.dirty = DirtyState::Clean;
    }

    /// Never downgrades a `Dirty` vertex.
    pub fn mark_maybe_dirty(&mut self) {
        if self.dirty == DirtyState::Clean {
            self.dirty = DirtyState::MaybeDirty;
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = DirtyState::Dirty;
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    pub fn add_dependency(&mut self, vertex: VertexId) {
        self.dependencies.insert(vertex);
    }

    pub fn remove_dependency(&mut self, vertex: VertexId) {
        self.dependencies.shift_remove(&vertex);
    }

    pub fn dependencies(&self) -> &IndexSet<VertexId> {
        &self.dependencies
    }

    pub fn add_dependent(&mut self, vertex: VertexId) {
        self.dependents.insert(vertex);
    }

    pub fn remove_dependent(&mut self, vertex: VertexId) {
        self.dependents.shift_remove(&vertex);
    }

    pub fn dependents(&self) -> &IndexSet<VertexId> {
        &self.dependents
    }

    /// Drop every outgoing dependency, returning the ones that were removed.
    pub fn take_dependencies(&mut self) -> IndexSet<VertexId> {
        std::mem::take(&mut self.dependencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_ids_are_unique() {
        let id1 = VertexId::new();
        let id2 = VertexId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn source_vertex_starts_clean() {
        let vertex = Vertex::source();
        assert_eq!(vertex.kind(), VertexKind::Source);
        assert!(vertex.is_clean());
        assert_eq!(vertex.version(), 0);
    }

    #[test]
    fn derived_and_effect_vertices_start_dirty() {
        assert_eq!(Vertex::derived().dirty_state(), DirtyState::Dirty);
        assert_eq!(Vertex::effect().dirty_state(), DirtyState::Dirty);
    }

    #[test]
    fn dependency_management() {
        let mut vertex = Vertex::derived();
        let dep1 = VertexId::new();
        let dep2 = VertexId::new();

        vertex.add_dependency(dep1);
        vertex.add_dependency(dep2);
        vertex.add_dependency(dep1);
        assert_eq!(vertex.dependencies().len(), 2);

        vertex.remove_dependency(dep1);
        assert!(!vertex.dependencies().contains(&dep1));

        let taken = vertex.take_dependencies();
        assert_eq!(taken.len(), 1);
        assert!(vertex.dependencies().is_empty());
    }

    #[test]
    fn maybe_dirty_does_not_downgrade_dirty() {
        let mut vertex = Vertex::derived();
        vertex.mark_maybe_dirty();
        assert_eq!(vertex.dirty_state(), DirtyState::Dirty);

        vertex.mark_clean();
        vertex.mark_maybe_dirty();
        assert_eq!(vertex.dirty_state(), DirtyState::MaybeDirty);
    }

    #[test]
    fn version_bumps() {
        let mut vertex = Vertex::source();
        vertex.bump_version();
        vertex.bump_version();
        assert_eq!(vertex.version(), 2);
    }
}
