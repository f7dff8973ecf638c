//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Memos Work
//!
//! 1. On first access, the memo runs its computation and caches the result.
//!
//! 2. When an input signal changes, the runtime marks the memo `Dirty`. When
//!    only an upstream memo may have changed, it is marked `MaybeDirty`.
//!
//! 3. On the next access a `Dirty` memo recomputes. A `MaybeDirty` memo first
//!    refreshes its memo inputs and recomputes only if one of them produced a
//!    new version; otherwise it is marked clean and the cache is returned.
//!
//! 4. A recompute that yields a value equal to the cached one does not bump
//!    the memo's version, so memos reading it stay clean.
//!
//! Nothing is computed eagerly: a memo that is never read stays dirty.

use std::fmt::Debug;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::runtime::{Reactive, Runtime};
use crate::graph::{DirtyState, VertexId, VertexKind};

pub(crate) type Observed = SmallVec<[(VertexId, u64); 4]>;

struct MemoInner<T> {
    vertex: VertexId,
    compute: Box<dyn Fn() -> T + Send + Sync>,
    value: RwLock<Option<T>>,

    /// Input versions seen at the last computation.
    observed: Mutex<Observed>,
}

impl<T> MemoInner<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    fn update_if_necessary(&self) {
        let has_value = self.value.read().is_some();

        match Runtime::dirty_state(self.vertex) {
            DirtyState::Clean if has_value => {}
            DirtyState::MaybeDirty if has_value => {
                let observed = self.observed.lock().clone();
                if Runtime::dependencies_changed(&observed) {
                    self.recompute();
                } else {
                    Runtime::mark_clean(self.vertex);
                }
            }
            _ => self.recompute(),
        }
    }

    fn recompute(&self) {
        let (new_value, dependencies) = {
            let _ctx = ReactiveContext::enter(self.vertex);
            let value = (self.compute)();
            (value, ReactiveContext::get_dependencies())
        };

        Runtime::set_dependencies(self.vertex, &dependencies);
        *self.observed.lock() = dependencies
            .iter()
            .map(|&dep| (dep, Runtime::version(dep).unwrap_or_default()))
            .collect();

        let changed = {
            let mut slot = self.value.write();
            let changed = slot.as_ref() != Some(&new_value);
            if changed {
                *slot = Some(new_value);
            }
            changed
        };

        Runtime::mark_clean(self.vertex);
        if changed {
            Runtime::bump_version(self.vertex);
        }
    }
}

impl<T> Reactive for MemoInner<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    fn vertex_id(&self) -> VertexId {
        self.vertex
    }

    fn update(&self) {
        self.update_if_necessary();
    }
}

impl<T> Drop for MemoInner<T> {
    fn drop(&mut self) {
        Runtime::dispose(self.vertex);
    }
}

/// A cached derived value that recomputes only when dependencies change.
///
/// The `PartialEq` bound lets the memo tell whether a recompute actually
/// produced something new.
pub struct Memo<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    inner: Arc<MemoInner<T>>,
}

impl<T> Memo<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    /// Create a new memo. The computation runs on first access.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let vertex = Runtime::create_vertex(VertexKind::Derived);
        let inner = Arc::new(MemoInner {
            vertex,
            compute: Box::new(compute),
            value: RwLock::new(None),
            observed: Mutex::new(SmallVec::new()),
        });

        let weak: Weak<dyn Reactive> = Arc::downgrade(&inner) as Weak<dyn Reactive>;
        Runtime::register(weak, vertex);

        Self { inner }
    }

    /// The vertex backing this memo.
    pub fn id(&self) -> VertexId {
        self.inner.vertex
    }

    /// Borrow the up-to-date value, registering a dependency when tracked.
    ///
    /// The cache is read-locked while `f` runs; `f` must not read this memo
    /// after invalidating it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        Runtime::track(self.inner.vertex);
        self.with_untracked(f)
    }

    /// Borrow the up-to-date value without establishing a dependency.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.update_if_necessary();
        let guard = self.inner.value.read();
        f(guard
            .as_ref()
            .expect("memo holds a value after update_if_necessary"))
    }

    /// Force a recompute on next access.
    ///
    /// Only needed when the computation reads something outside the reactive
    /// graph.
    pub fn mark_dirty(&self) {
        Runtime::mark_dirty(self.inner.vertex);
    }

    /// The current dirty state.
    pub fn state(&self) -> DirtyState {
        Runtime::dirty_state(self.inner.vertex)
    }

    /// Number of computations currently reading this memo.
    pub fn dependent_count(&self) -> usize {
        Runtime::dependent_count(self.inner.vertex)
    }

    /// Whether the memo has computed at least once.
    pub fn has_value(&self) -> bool {
        self.inner.value.read().is_some()
    }
}

impl<T> Memo<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    pub fn get_untracked(&self) -> T {
        self.with_untracked(T::clone)
    }
}

impl<T> Clone for Memo<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.vertex.raw())
            .field("state", &self.state())
            .field("value", &*self.inner.value.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn counted<T, F>(f: F) -> (Memo<T>, Arc<AtomicI32>)
    where
        T: PartialEq + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();
        let memo = Memo::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            f()
        });
        (memo, calls)
    }

    #[test]
    fn memo_computes_on_first_access() {
        let (memo, calls) = counted(|| 42);

        assert!(!memo.has_value());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(memo.get(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(memo.has_value());
    }

    #[test]
    fn memo_caches_value_when_clean() {
        let (memo, calls) = counted(|| 42);

        assert_eq!(memo.get(), 42);
        assert_eq!(memo.get(), 42);
        assert_eq!(memo.get(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn memo_recomputes_when_input_signal_changes() {
        let signal = Signal::new(2);
        let source = signal.clone();
        let (memo, calls) = counted(move || source.get() * 10);

        assert_eq!(memo.get(), 20);
        signal.set(3);
        assert_eq!(memo.state(), DirtyState::Dirty);
        assert_eq!(memo.get(), 30);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn memo_recomputes_when_marked_dirty() {
        let counter = Arc::new(AtomicI32::new(0));
        let counter_clone = counter.clone();
        let (memo, calls) = counted(move || counter_clone.load(Ordering::SeqCst));

        assert_eq!(memo.get(), 0);
        counter.store(5, Ordering::SeqCst);
        memo.mark_dirty();

        assert_eq!(memo.get(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unchanged_intermediate_value_keeps_downstream_clean() {
        let signal = Signal::new(4);
        let source = signal.clone();
        let parity = Memo::new(move || source.get() % 2);

        let upstream = parity.clone();
        let (label, calls) = counted(move || format!("parity {}", upstream.get()));

        assert_eq!(label.get(), "parity 0");
        signal.set(6);
        assert_eq!(label.state(), DirtyState::MaybeDirty);

        assert_eq!(label.get(), "parity 0");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(label.state(), DirtyState::Clean);

        signal.set(7);
        assert_eq!(label.get(), "parity 1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn memo_drops_dependencies_it_no_longer_reads() {
        let use_left = Signal::new(true);
        let left = Signal::new(1);
        let right = Signal::new(2);

        let (flag, l, r) = (use_left.clone(), left.clone(), right.clone());
        let (memo, calls) = counted(move || if flag.get() { l.get() } else { r.get() });

        assert_eq!(memo.get(), 1);
        assert_eq!(right.subscriber_count(), 0);

        use_left.set(false);
        assert_eq!(memo.get(), 2);
        assert_eq!(left.subscriber_count(), 0);

        left.set(100);
        assert_eq!(memo.state(), DirtyState::Clean);
        assert_eq!(memo.get(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn memo_clone_shares_state() {
        let memo1 = Memo::new(|| 42);
        assert_eq!(memo1.get(), 42);

        let memo2 = memo1.clone();
        assert_eq!(memo1.id(), memo2.id());
        assert!(memo2.has_value());

        memo1.mark_dirty();
        assert_eq!(memo2.state(), DirtyState::Dirty);
    }

    #[test]
    fn memo_state_transitions() {
        let memo = Memo::new(|| 42);

        assert_eq!(memo.state(), DirtyState::Dirty);
        memo.get();
        assert_eq!(memo.state(), DirtyState::Clean);
        memo.mark_dirty();
        assert_eq!(memo.state(), DirtyState::Dirty);
        memo.get();
        assert_eq!(memo.state(), DirtyState::Clean);
    }
}
