//! Update Scheduler
//!
//! The scheduler owns every vertex and decides which of them a change reaches.
//!
//! # Algorithm
//!
//! 1. When a source changes, bump its version and mark its direct dependents
//!    `Dirty`: they read the changed value itself.
//! 2. Walk further downstream and mark everything else `MaybeDirty`: those
//!    vertices only read derived values, which may turn out unchanged.
//! 3. Return the affected vertices in topological order (dependencies before
//!    dependents) so callers can queue effects deterministically.
//!
//! Memos resolve `MaybeDirty` lazily by refreshing their inputs and comparing
//! versions; nothing is recomputed here.

use std::collections::{HashMap, HashSet, VecDeque};

use super::vertex::{DirtyState, Vertex, VertexId, VertexKind};

/// Owns the dependency graph and propagates change through it.
#[derive(Debug)]
pub struct UpdateScheduler {
    vertices: HashMap<VertexId, Vertex>,
}

impl UpdateScheduler {
    pub fn new() -> Self {
        Self {
            vertices: HashMap::new(),
        }
    }

    pub fn add_vertex(&mut self, vertex: Vertex) -> VertexId {
        let id = vertex.id();
        self.vertices.insert(id, vertex);
        id
    }

    /// Remove a vertex and every edge touching it.
    pub fn remove_vertex(&mut self, vertex_id: VertexId) -> Option<Vertex> {
        let vertex = self.vertices.remove(&vertex_id)?;

        for dep_id in vertex.dependencies() {
            if let Some(dep) = self.vertices.get_mut(dep_id) {
                dep.remove_dependent(vertex_id);
            }
        }

        for dependent_id in vertex.dependents() {
            if let Some(dependent) = self.vertices.get_mut(dependent_id) {
                dependent.remove_dependency(vertex_id);
            }
        }

        Some(vertex)
    }

    pub fn vertex(&self, vertex_id: VertexId) -> Option<&Vertex> {
        self.vertices.get(&vertex_id)
    }

    pub fn vertex_mut(&mut self, vertex_id: VertexId) -> Option<&mut Vertex> {
        self.vertices.get_mut(&vertex_id)
    }

    /// Add a dependency edge: `dependent` reads `dependency`.
    pub fn add_edge(&mut self, dependency: VertexId, dependent: VertexId) {
        if dependency == dependent {
            return;
        }
        if let Some(dep_vertex) = self.vertices.get_mut(&dependency) {
            dep_vertex.add_dependent(dependent);
        }
        if let Some(dependent_vertex) = self.vertices.get_mut(&dependent) {
            dependent_vertex.add_dependency(dependency);
        }
    }

    pub fn remove_edge(&mut self, dependency: VertexId, dependent: VertexId) {
        if let Some(dep_vertex) = self.vertices.get_mut(&dependency) {
            dep_vertex.remove_dependent(dependent);
        }
        if let Some(dependent_vertex) = self.vertices.get_mut(&dependent) {
            dependent_vertex.remove_dependency(dependency);
        }
    }

    /// Replace every dependency of `dependent` with `dependencies`.
    ///
    /// Called after a memo or effect ran, with exactly what it read.
    pub fn replace_dependencies(&mut self, dependent: VertexId, dependencies: &[VertexId]) {
        let stale = match self.vertices.get_mut(&dependent) {
            Some(vertex) => vertex.take_dependencies(),
            None => return,
        };

        for dep_id in stale {
            if let Some(dep) = self.vertices.get_mut(&dep_id) {
                dep.remove_dependent(dependent);
            }
        }

        for &dep_id in dependencies {
            // A dependency disposed mid-run has nothing left to notify us.
            if self.vertices.contains_key(&dep_id) {
                self.add_edge(dep_id, dependent);
            }
        }
    }

    /// Record that a source changed and propagate dirty flags.
    ///
    /// Returns every affected vertex in topological order.
    pub fn mark_changed(&mut self, source_id: VertexId) -> Vec<VertexId> {
        let mut to_process = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        match self.vertices.get_mut(&source_id) {
            Some(source) => {
                source.bump_version();
                for dependent_id in source.dependents() {
                    queue.push_back((*dependent_id, true));
                }
            }
            None => return to_process,
        }

        // Direct dependents are queued first, so they are visited (and marked
        // Dirty) before any longer path can reach them.
        while let Some((vertex_id, direct)) = queue.pop_front() {
            if !visited.insert(vertex_id) {
                continue;
            }

            if let Some(vertex) = self.vertices.get_mut(&vertex_id) {
                if direct {
                    vertex.mark_dirty();
                } else {
                    vertex.mark_maybe_dirty();
                }
                to_process.push(vertex_id);

                for dependent_id in vertex.dependents() {
                    queue.push_back((*dependent_id, false));
                }
            }
        }

        self.topological_sort(to_process)
    }

    /// Order `vertices` so that dependencies come before dependents.
    fn topological_sort(&self, vertices: Vec<VertexId>) -> Vec<VertexId> {
        let vertex_set: HashSet<_> = vertices.iter().copied().collect();
        let mut in_degree: HashMap<VertexId, usize> = HashMap::new();
        let mut result = Vec::with_capacity(vertices.len());
        let mut queue = VecDeque::new();

        for &vertex_id in &vertices {
            if let Some(vertex) = self.vertices.get(&vertex_id) {
                let degree = vertex
                    .dependencies()
                    .iter()
                    .filter(|d| vertex_set.contains(d))
                    .count();
                in_degree.insert(vertex_id, degree);
                if degree == 0 {
                    queue.push_back(vertex_id);
                }
            }
        }

        // Kahn's algorithm
        while let Some(vertex_id) = queue.pop_front() {
            result.push(vertex_id);

            if let Some(vertex) = self.vertices.get(&vertex_id) {
                for dependent_id in vertex.dependents() {
                    if let Some(degree) = in_degree.get_mut(dependent_id) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            queue.push_back(*dependent_id);
                        }
                    }
                }
            }
        }

        result
    }

    pub fn dirty_state(&self, vertex_id: VertexId) -> Option<DirtyState> {
        self.vertices.get(&vertex_id).map(Vertex::dirty_state)
    }

    pub fn kind(&self, vertex_id: VertexId) -> Option<VertexKind> {
        self.vertices.get(&vertex_id).map(Vertex::kind)
    }

    pub fn version(&self, vertex_id: VertexId) -> Option<u64> {
        self.vertices.get(&vertex_id).map(Vertex::version)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

impl Default for UpdateScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove_vertices() {
        let mut scheduler = UpdateScheduler::new();

        let id1 = scheduler.add_vertex(Vertex::source());
        let id2 = scheduler.add_vertex(Vertex::derived());
        scheduler.add_edge(id1, id2);

        assert_eq!(scheduler.vertex_count(), 2);

        scheduler.remove_vertex(id1);
        assert_eq!(scheduler.vertex_count(), 1);
        assert!(scheduler.vertex(id1).is_none());
        assert!(scheduler.vertex(id2).unwrap().dependencies().is_empty());
    }

    #[test]
    fn add_and_remove_edges() {
        let mut scheduler = UpdateScheduler::new();

        let source_id = scheduler.add_vertex(Vertex::source());
        let derived_id = scheduler.add_vertex(Vertex::derived());

        scheduler.add_edge(source_id, derived_id);
        assert!(scheduler
            .vertex(source_id)
            .unwrap()
            .dependents()
            .contains(&derived_id));
        assert!(scheduler
            .vertex(derived_id)
            .unwrap()
            .dependencies()
            .contains(&source_id));

        scheduler.remove_edge(source_id, derived_id);
        assert!(scheduler.vertex(source_id).unwrap().dependents().is_empty());
        assert!(scheduler.vertex(derived_id).unwrap().dependencies().is_empty());
    }

    #[test]
    fn replace_dependencies_drops_stale_edges() {
        let mut scheduler = UpdateScheduler::new();
        let a = scheduler.add_vertex(Vertex::source());
        let b = scheduler.add_vertex(Vertex::source());
        let memo = scheduler.add_vertex(Vertex::derived());

        scheduler.replace_dependencies(memo, &[a]);
        scheduler.replace_dependencies(memo, &[b]);

        assert!(scheduler.vertex(a).unwrap().dependents().is_empty());
        assert!(scheduler.vertex(b).unwrap().dependents().contains(&memo));
    }

    #[test]
    fn mark_changed_marks_direct_dirty_and_transitive_maybe_dirty() {
        let mut scheduler = UpdateScheduler::new();

        // source -> derived1 -> derived2
        let source_id = scheduler.add_vertex(Vertex::source());
        let derived1_id = scheduler.add_vertex(Vertex::derived());
        let derived2_id = scheduler.add_vertex(Vertex::derived());

        scheduler.add_edge(source_id, derived1_id);
        scheduler.add_edge(derived1_id, derived2_id);

        scheduler.vertex_mut(derived1_id).unwrap().mark_clean();
        scheduler.vertex_mut(derived2_id).unwrap().mark_clean();

        let to_process = scheduler.mark_changed(source_id);

        assert_eq!(to_process, vec![derived1_id, derived2_id]);
        assert_eq!(scheduler.dirty_state(derived1_id), Some(DirtyState::Dirty));
        assert_eq!(
            scheduler.dirty_state(derived2_id),
            Some(DirtyState::MaybeDirty)
        );
        assert_eq!(scheduler.version(source_id), Some(1));
    }

    #[test]
    fn diamond_is_sorted_topologically() {
        let mut scheduler = UpdateScheduler::new();

        //        source
        //        /    \
        //     left    right
        //        \    /
        //        effect
        let source = scheduler.add_vertex(Vertex::source());
        let left = scheduler.add_vertex(Vertex::derived());
        let right = scheduler.add_vertex(Vertex::derived());
        let effect = scheduler.add_vertex(Vertex::effect());

        scheduler.add_edge(source, left);
        scheduler.add_edge(source, right);
        scheduler.add_edge(left, effect);
        scheduler.add_edge(right, effect);

        let order = scheduler.mark_changed(source);
        assert_eq!(order.len(), 3);
        assert_eq!(order.last(), Some(&effect));
    }

    #[test]
    fn mark_changed_on_unknown_vertex_is_empty() {
        let mut scheduler = UpdateScheduler::new();
        assert!(scheduler.mark_changed(VertexId::new()).is_empty());
    }
}
