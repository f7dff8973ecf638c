//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When a dependency changes, the runtime queues the effect; it runs when
//!    the current batch settles.
//!
//! 3. An effect queued only because an upstream memo *may* have changed
//!    refreshes that memo first and skips the run if nothing it read moved.
//!
//! 4. Every run re-collects dependencies, so branches not taken stop
//!    triggering the effect.
//!
//! # Differences from Memo
//!
//! - Memos return a value; effects do not.
//! - Memos are lazy (compute on access); effects are eager (run when deps change).
//!
//! # Watchers
//!
//! [`watch`] builds on effects: it tracks a source value, keeps the previous
//! snapshot, and hands both to a callback on every change. This is the
//! primitive the structural synchronizer diffs with.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::context::{untrack, ReactiveContext};
use super::memo::Observed;
use super::runtime::{Reactive, Runtime};
use crate::graph::{DirtyState, VertexId, VertexKind};

struct EffectInner {
    vertex: VertexId,
    run: Box<dyn Fn() + Send + Sync>,
    observed: Mutex<Observed>,
    disposed: AtomicBool,
    run_count: AtomicUsize,
}

impl EffectInner {
    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        let dependencies = {
            let _ctx = ReactiveContext::enter(self.vertex);
            (self.run)();
            ReactiveContext::get_dependencies()
        };

        Runtime::set_dependencies(self.vertex, &dependencies);
        *self.observed.lock() = dependencies
            .iter()
            .map(|&dep| (dep, Runtime::version(dep).unwrap_or_default()))
            .collect();
        Runtime::mark_clean(self.vertex);

        self.run_count.fetch_add(1, Ordering::SeqCst);
    }
}

impl Reactive for EffectInner {
    fn vertex_id(&self) -> VertexId {
        self.vertex
    }

    fn update(&self) {
        match Runtime::dirty_state(self.vertex) {
            DirtyState::Clean => {}
            DirtyState::MaybeDirty => {
                let observed = self.observed.lock().clone();
                if Runtime::dependencies_changed(&observed) {
                    self.execute();
                } else {
                    Runtime::mark_clean(self.vertex);
                }
            }
            DirtyState::Dirty => self.execute(),
        }
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        Runtime::dispose(self.vertex);
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// Dropping the last handle disposes the effect.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use topology_state::reactive::{Effect, Signal};
///
/// let count = Signal::new(0);
/// let seen = Arc::new(AtomicI32::new(-1));
///
/// let (source, sink) = (count.clone(), seen.clone());
/// let _effect = Effect::new(move || sink.store(source.get(), Ordering::SeqCst));
///
/// count.set(5);
/// assert_eq!(seen.load(Ordering::SeqCst), 5);
/// ```
pub struct Effect {
    inner: Arc<EffectInner>,
}

impl Effect {
    /// Create a new effect. The function runs immediately.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::new_lazy(run);
        effect.execute();
        effect
    }

    /// Create a new effect without running it.
    ///
    /// It has no dependencies until it first runs.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let vertex = Runtime::create_vertex(VertexKind::Effect);
        let inner = Arc::new(EffectInner {
            vertex,
            run: Box::new(run),
            observed: Mutex::new(SmallVec::new()),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });

        let weak: Weak<dyn Reactive> = Arc::downgrade(&inner) as Weak<dyn Reactive>;
        Runtime::register(weak, vertex);

        Self { inner }
    }

    /// The vertex backing this effect.
    pub fn id(&self) -> VertexId {
        self.inner.vertex
    }

    /// Run the effect now, re-collecting its dependencies.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Queue the effect for the next settle.
    ///
    /// Runs immediately when no batch is open.
    pub fn schedule(&self) {
        if !self.is_disposed() {
            Runtime::schedule(self.inner.vertex);
        }
    }

    /// Stop the effect for good and detach it from the graph.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        Runtime::dispose(self.inner.vertex);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    pub fn dependency_count(&self) -> usize {
        Runtime::dependency_count(self.inner.vertex)
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.vertex.raw())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Observe `source` and call `handler(current, previous)` on every change.
///
/// The first run only records the snapshot. Each later transition is handed
/// to the handler exactly once, diffed against the immediately preceding
/// snapshot. The handler runs untracked, so whatever it reads or writes does
/// not become a dependency of the watcher.
pub fn watch<T, S, H>(source: S, handler: H) -> Effect
where
    T: Clone + PartialEq + Send + Sync + 'static,
    S: Fn() -> T + Send + Sync + 'static,
    H: Fn(&T, &T) + Send + Sync + 'static,
{
    let previous: Mutex<Option<T>> = Mutex::new(None);

    Effect::new(move || {
        let current = source();
        let prev = previous.lock().replace(current.clone());

        if let Some(prev) = prev {
            if prev != current {
                untrack(|| handler(&current, &prev));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Memo, Signal};
    use std::sync::atomic::AtomicI32;

    #[test]
    fn effect_runs_on_creation() {
        let effect = Effect::new(|| {});
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_lazy_does_not_run_on_creation() {
        let effect = Effect::new_lazy(|| {});
        assert_eq!(effect.run_count(), 0);

        effect.execute();
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_reruns_when_signal_changes() {
        let signal = Signal::new(0);
        let seen = Arc::new(AtomicI32::new(-1));

        let (source, sink) = (signal.clone(), seen.clone());
        let effect = Effect::new(move || sink.store(source.get(), Ordering::SeqCst));

        signal.set(7);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
        assert_eq!(effect.run_count(), 2);
        assert_eq!(effect.dependency_count(), 1);
    }

    #[test]
    fn effect_skips_run_when_memo_input_is_unchanged() {
        let signal = Signal::new(1);
        let source = signal.clone();
        let is_positive = Memo::new(move || source.get() > 0);

        let memo = is_positive.clone();
        let effect = Effect::new(move || {
            memo.get();
        });

        signal.set(2);
        assert_eq!(effect.run_count(), 1);

        signal.set(-2);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let signal = Signal::new(0);
        let source = signal.clone();
        let effect = Effect::new(move || {
            source.get();
        });

        effect.dispose();
        assert!(effect.is_disposed());

        signal.set(1);
        effect.schedule();
        effect.execute();
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn schedule_forces_a_run() {
        let effect = Effect::new(|| {});
        effect.schedule();
        effect.schedule();
        assert_eq!(effect.run_count(), 3);
    }

    #[test]
    fn dropping_effect_stops_it() {
        let signal = Signal::new(0);
        let runs = Arc::new(AtomicI32::new(0));

        let (source, counter) = (signal.clone(), runs.clone());
        let effect = Effect::new(move || {
            source.get();
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(effect);

        signal.set(1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn watch_sees_each_transition_once() {
        let signal = Signal::new(0);
        let transitions = Arc::new(Mutex::new(Vec::new()));

        let (source, log) = (signal.clone(), transitions.clone());
        let _watcher = watch(move || source.get(), move |now, prev| {
            log.lock().push((*prev, *now));
        });

        signal.set(1);
        signal.set(1);
        Runtime::batch(|| {
            signal.set(5);
            signal.set(3);
        });

        assert_eq!(*transitions.lock(), vec![(0, 1), (1, 3)]);
    }

    #[test]
    fn watch_handler_is_untracked() {
        let watched = Signal::new(0);
        let other = Signal::new(0);
        let calls = Arc::new(AtomicI32::new(0));

        let (source, read, counter) = (watched.clone(), other.clone(), calls.clone());
        let _watcher = watch(move || source.get(), move |_, _| {
            read.get();
            counter.fetch_add(1, Ordering::SeqCst);
        });

        watched.set(1);
        other.set(1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
