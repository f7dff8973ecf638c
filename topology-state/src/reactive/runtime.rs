//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects. It owns the dependency graph and schedules work when signals
//! change.
//!
//! # How It Works
//!
//! 1. Every signal, memo, and effect owns a vertex in the graph. Memos and
//!    effects are additionally registered so the runtime can call back into
//!    them.
//!
//! 2. When a memo or effect runs, it reports exactly which vertices it read
//!    and the runtime rewires its incoming edges.
//!
//! 3. When a signal changes, the runtime:
//!    a. Marks direct dependents dirty and everything further downstream
//!       maybe-dirty
//!    b. Queues every affected effect
//!    c. Leaves memos alone: they recompute on next read
//!
//! 4. Queued effects run when the outermost batch ends (the settle point), or
//!    right away when no batch is open. Effects that change signals while the
//!    queue drains add to the same queue, so a settle only returns once the
//!    whole cascade has run.
//!
//! # Threading
//!
//! The runtime lives in thread-local storage. Reactive values belong to the
//! thread that created them; reading one from another thread reads its value
//! but does not take part in dependency tracking.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Weak;

use indexmap::IndexSet;
use tracing::{trace, warn};

use super::context::ReactiveContext;
use crate::graph::{DirtyState, UpdateScheduler, Vertex, VertexId, VertexKind};

/// Upper bound on effect runs in a single settle before the queue is dropped.
///
/// Reached only when effects keep re-triggering each other.
const MAX_SETTLE_RUNS: usize = 100_000;

/// Something the runtime can call back into: a memo or an effect.
pub trait Reactive: Send + Sync {
    /// The vertex this value owns.
    fn vertex_id(&self) -> VertexId;

    /// Bring the value up to date.
    ///
    /// Memos recompute if an input changed; effects re-run if an input changed.
    fn update(&self);
}

#[derive(Default)]
struct RuntimeState {
    scheduler: UpdateScheduler,
    registry: HashMap<VertexId, Weak<dyn Reactive>>,
    pending: IndexSet<VertexId>,
    batch_depth: usize,
    flushing: bool,
}

impl RuntimeState {
    fn should_flush(&self) -> bool {
        self.batch_depth == 0 && !self.flushing && !self.pending.is_empty()
    }
}

thread_local! {
    static RUNTIME: RefCell<RuntimeState> = RefCell::new(RuntimeState::default());
}

fn with_state<R>(f: impl FnOnce(&mut RuntimeState) -> R) -> R {
    RUNTIME.with(|state| f(&mut state.borrow_mut()))
}

/// Decrements the batch depth even if the batched closure panics.
struct BatchGuard;

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let _ = RUNTIME.try_with(|state| {
            if let Ok(mut state) = state.try_borrow_mut() {
                state.batch_depth = state.batch_depth.saturating_sub(1);
            }
        });
    }
}

/// The per-thread reactive runtime.
pub struct Runtime;

impl Runtime {
    /// Add a fresh vertex of the given kind to the graph.
    pub fn create_vertex(kind: VertexKind) -> VertexId {
        with_state(|state| state.scheduler.add_vertex(Vertex::new(kind)))
    }

    /// Register a memo or effect so the runtime can call back into it.
    ///
    /// Only a weak reference is kept; the value disposes itself on drop.
    pub fn register(reactive: Weak<dyn Reactive>, vertex: VertexId) {
        with_state(|state| {
            state.registry.insert(vertex, reactive);
        });
    }

    /// Remove a vertex, its edges, and any pending run.
    ///
    /// Safe to call more than once, and from destructors.
    pub fn dispose(vertex: VertexId) {
        let _ = RUNTIME.try_with(|state| match state.try_borrow_mut() {
            Ok(mut state) => {
                state.scheduler.remove_vertex(vertex);
                state.registry.remove(&vertex);
                state.pending.shift_remove(&vertex);
            }
            Err(_) => trace!(vertex = vertex.raw(), "runtime busy, vertex left behind"),
        });
    }

    /// Record a read of `vertex` by the running computation, if any.
    pub fn track(vertex: VertexId) {
        if ReactiveContext::is_active() {
            ReactiveContext::track_dependency(vertex);
        }
    }

    /// Replace the dependencies of `subscriber` with what it just read.
    pub fn set_dependencies(subscriber: VertexId, dependencies: &[VertexId]) {
        with_state(|state| {
            state
                .scheduler
                .replace_dependencies(subscriber, dependencies)
        });
    }

    pub fn version(vertex: VertexId) -> Option<u64> {
        with_state(|state| state.scheduler.version(vertex))
    }

    /// Note that a memo produced a different value, without propagating.
    ///
    /// Propagation already happened when its inputs changed.
    pub fn bump_version(vertex: VertexId) {
        with_state(|state| {
            if let Some(v) = state.scheduler.vertex_mut(vertex) {
                v.bump_version();
            }
        });
    }

    /// A vertex that no longer exists reads as `Dirty`.
    pub fn dirty_state(vertex: VertexId) -> DirtyState {
        with_state(|state| state.scheduler.dirty_state(vertex))
            .unwrap_or(DirtyState::Dirty)
    }

    pub fn mark_clean(vertex: VertexId) {
        with_state(|state| {
            if let Some(v) = state.scheduler.vertex_mut(vertex) {
                v.mark_clean();
            }
        });
    }

    pub fn mark_dirty(vertex: VertexId) {
        with_state(|state| {
            if let Some(v) = state.scheduler.vertex_mut(vertex) {
                v.mark_dirty();
            }
        });
    }

    pub fn dependency_count(vertex: VertexId) -> usize {
        with_state(|state| {
            state
                .scheduler
                .vertex(vertex)
                .map(|v| v.dependencies().len())
                .unwrap_or(0)
        })
    }

    pub fn dependent_count(vertex: VertexId) -> usize {
        with_state(|state| {
            state
                .scheduler
                .vertex(vertex)
                .map(|v| v.dependents().len())
                .unwrap_or(0)
        })
    }

    /// Whether any of the observed `(vertex, version)` pairs is out of date.
    ///
    /// Derived inputs are refreshed first so their versions are current.
    pub fn dependencies_changed(observed: &[(VertexId, u64)]) -> bool {
        observed.iter().any(|&(vertex, seen)| {
            Self::refresh(vertex);
            Self::version(vertex) != Some(seen)
        })
    }

    /// Bring a derived vertex up to date. No-op for sources and clean memos.
    pub fn refresh(vertex: VertexId) {
        let reactive = with_state(|state| match state.scheduler.vertex(vertex) {
            Some(v) if v.kind() == VertexKind::Derived && !v.is_clean() => {
                state.registry.get(&vertex).and_then(Weak::upgrade)
            }
            _ => None,
        });

        if let Some(reactive) = reactive {
            reactive.update();
        }
    }

    /// Propagate a change of `vertex` and queue affected effects.
    ///
    /// Settles immediately unless a batch is open or a settle is running.
    pub fn notify_changed(vertex: VertexId) {
        let flush = with_state(|state| {
            let affected = state.scheduler.mark_changed(vertex);
            for id in affected {
                if state.scheduler.kind(id) == Some(VertexKind::Effect) {
                    state.pending.insert(id);
                }
            }
            state.should_flush()
        });

        if flush {
            Self::flush();
        }
    }

    /// Queue an effect to run, regardless of its dirty state.
    pub fn schedule(vertex: VertexId) {
        let flush = with_state(|state| {
            if let Some(v) = state.scheduler.vertex_mut(vertex) {
                v.mark_dirty();
                state.pending.insert(vertex);
            }
            state.should_flush()
        });

        if flush {
            Self::flush();
        }
    }

    /// Run `f` with effect execution deferred until it returns.
    ///
    /// Batches nest; only the outermost one settles.
    pub fn batch<R>(f: impl FnOnce() -> R) -> R {
        with_state(|state| state.batch_depth += 1);
        let guard = BatchGuard;

        let result = f();

        drop(guard);
        if with_state(|state| state.should_flush()) {
            Self::flush();
        }
        result
    }

    pub fn is_batching() -> bool {
        with_state(|state| state.batch_depth > 0)
    }

    /// Number of effects waiting for the next settle.
    pub fn pending_effects() -> usize {
        with_state(|state| state.pending.len())
    }

    /// Number of live vertices on this thread.
    pub fn vertex_count() -> usize {
        with_state(|state| state.scheduler.vertex_count())
    }

    /// Drain the effect queue.
    fn flush() {
        with_state(|state| state.flushing = true);

        let mut runs = 0usize;
        loop {
            let next = with_state(|state| {
                state
                    .pending
                    .shift_remove_index(0)
                    .map(|id| state.registry.get(&id).and_then(Weak::upgrade))
            });

            match next {
                None => break,
                // Disposed while queued.
                Some(None) => continue,
                Some(Some(effect)) => {
                    runs += 1;
                    if runs > MAX_SETTLE_RUNS {
                        warn!(runs, "effects keep re-triggering each other, dropping queue");
                        with_state(|state| state.pending.clear());
                        break;
                    }
                    effect.update();
                }
            }
        }

        with_state(|state| state.flushing = false);
        trace!(runs, "settled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct MockEffect {
        vertex: VertexId,
        runs: AtomicUsize,
    }

    impl MockEffect {
        fn register() -> Arc<Self> {
            let vertex = Runtime::create_vertex(VertexKind::Effect);
            let effect = Arc::new(Self {
                vertex,
                runs: AtomicUsize::new(0),
            });
            let weak: Weak<dyn Reactive> = Arc::downgrade(&effect) as Weak<dyn Reactive>;
            Runtime::register(weak, vertex);
            effect
        }
    }

    impl Reactive for MockEffect {
        fn vertex_id(&self) -> VertexId {
            self.vertex
        }

        fn update(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Runtime::mark_clean(self.vertex);
        }
    }

    #[test]
    fn notify_runs_dependent_effects() {
        let source = Runtime::create_vertex(VertexKind::Source);
        let effect = MockEffect::register();
        Runtime::set_dependencies(effect.vertex, &[source]);

        Runtime::notify_changed(source);
        assert_eq!(effect.runs.load(Ordering::SeqCst), 1);
        assert_eq!(Runtime::version(source), Some(1));
    }

    #[test]
    fn batch_defers_and_coalesces() {
        let source = Runtime::create_vertex(VertexKind::Source);
        let effect = MockEffect::register();
        Runtime::set_dependencies(effect.vertex, &[source]);

        Runtime::batch(|| {
            Runtime::notify_changed(source);
            Runtime::notify_changed(source);
            Runtime::batch(|| Runtime::notify_changed(source));
            assert!(Runtime::is_batching());
            assert_eq!(Runtime::pending_effects(), 1);
            assert_eq!(effect.runs.load(Ordering::SeqCst), 0);
        });

        assert!(!Runtime::is_batching());
        assert_eq!(effect.runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disposed_vertices_are_skipped() {
        let source = Runtime::create_vertex(VertexKind::Source);
        let effect = MockEffect::register();
        Runtime::set_dependencies(effect.vertex, &[source]);

        Runtime::batch(|| {
            Runtime::notify_changed(source);
            Runtime::dispose(effect.vertex);
        });

        assert_eq!(effect.runs.load(Ordering::SeqCst), 0);
        assert_eq!(Runtime::dirty_state(effect.vertex), DirtyState::Dirty);
    }

    #[test]
    fn dependency_counts() {
        let source = Runtime::create_vertex(VertexKind::Source);
        let effect = MockEffect::register();
        Runtime::set_dependencies(effect.vertex, &[source]);

        assert_eq!(Runtime::dependency_count(effect.vertex), 1);
        assert_eq!(Runtime::dependent_count(source), 1);

        Runtime::set_dependencies(effect.vertex, &[]);
        assert_eq!(Runtime::dependent_count(source), 0);
    }
}
