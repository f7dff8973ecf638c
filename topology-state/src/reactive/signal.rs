//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (memo/effect), the read
//!    is recorded and the computation becomes a dependent of the signal.
//!
//! 2. When the value is replaced or mutated, the runtime marks dependents
//!    dirty and queues dependent effects.
//!
//! Every handle obtained through `clone` shares the same value and vertex.
//! The vertex is released when the last handle is dropped.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::runtime::Runtime;
use crate::graph::{VertexId, VertexKind};

struct SignalInner<T> {
    vertex: VertexId,
    value: RwLock<T>,
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        Runtime::dispose(self.vertex);
    }
}

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust
/// use topology_state::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// count.update(|n| *n += 1);
/// assert_eq!(count.get(), 6);
/// ```
pub struct Signal<T>
where
    T: Send + Sync + 'static,
{
    inner: Arc<SignalInner<T>>,
}

impl<T> Signal<T>
where
    T: Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                vertex: Runtime::create_vertex(VertexKind::Source),
                value: RwLock::new(value),
            }),
        }
    }

    /// The vertex backing this signal.
    pub fn id(&self) -> VertexId {
        self.inner.vertex
    }

    /// Borrow the value, registering a dependency when tracked.
    ///
    /// The value is read-locked while `f` runs; `f` must not write to this
    /// signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        Runtime::track(self.inner.vertex);
        f(&self.inner.value.read())
    }

    /// Borrow the value without establishing a dependency.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Replace the value and notify dependents.
    pub fn set(&self, value: T) {
        *self.inner.value.write() = value;
        Runtime::notify_changed(self.inner.vertex);
    }

    /// Mutate the value in place and notify dependents.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.inner.value.write());
        Runtime::notify_changed(self.inner.vertex);
        result
    }

    /// Number of computations currently reading this signal.
    pub fn subscriber_count(&self) -> usize {
        Runtime::dependent_count(self.inner.vertex)
    }
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Get a clone of the current value, registering a dependency when tracked.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get a clone of the current value without establishing a dependency.
    pub fn get_untracked(&self) -> T {
        self.with_untracked(T::clone)
    }
}

impl<T> Signal<T>
where
    T: PartialEq + Send + Sync + 'static,
{
    /// Replace the value only if it differs. Returns whether it changed.
    pub fn set_if_changed(&self, value: T) -> bool {
        {
            let mut guard = self.inner.value.write();
            if *guard == value {
                return false;
            }
            *guard = value;
        }
        Runtime::notify_changed(self.inner.vertex);
        true
    }
}

impl<T> Clone for Signal<T>
where
    T: Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Signal<T>
where
    T: Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Debug for Signal<T>
where
    T: Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.vertex.raw())
            .field("value", &*self.inner.value.read())
            .finish()
    }
}
