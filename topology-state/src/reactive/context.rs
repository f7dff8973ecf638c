//! Reactive Context
//!
//! The reactive context tracks which computation is currently running, so
//! that a signal or memo being read can register that computation as a
//! dependent.
//!
//! # Implementation
//!
//! A thread-local stack holds one entry per running computation. Entering a
//! memo or effect pushes an entry; the returned guard pops it on drop. Nested
//! memos therefore collect their own dependencies without leaking into the
//! outer computation.
//!
//! An untracked scope pushes an entry with no subscriber. Reads inside it are
//! not recorded anywhere, even if an outer computation is running.

use std::cell::RefCell;

use smallvec::SmallVec;

use crate::graph::VertexId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Clone)]
struct ContextEntry {
    /// `None` marks an untracked scope.
    subscriber: Option<VertexId>,
    /// Vertices read so far, in first-read order, without duplicates.
    dependencies: SmallVec<[VertexId; 8]>,
}

/// Guard that pops the context when dropped.
///
/// Keeps the stack balanced even if the computation panics.
pub struct ReactiveContext {
    subscriber: Option<VertexId>,
}

impl ReactiveContext {
    /// Enter a tracking context for the given subscriber.
    pub fn enter(subscriber: VertexId) -> Self {
        Self::push(Some(subscriber))
    }

    /// Enter a scope in which reads are not tracked.
    pub fn untracked() -> Self {
        Self::push(None)
    }

    fn push(subscriber: Option<VertexId>) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber,
                dependencies: SmallVec::new(),
            });
        });

        Self { subscriber }
    }

    /// Whether reads right now would be recorded.
    pub fn is_active() -> bool {
        Self::current_subscriber().is_some()
    }

    /// The subscriber whose dependencies are being collected, if any.
    pub fn current_subscriber() -> Option<VertexId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(|entry| entry.subscriber))
    }

    /// Record a read of `vertex` in the innermost tracking context.
    pub fn track_dependency(vertex: VertexId) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                if entry.subscriber.is_some()
                    && entry.subscriber != Some(vertex)
                    && !entry.dependencies.contains(&vertex)
                {
                    entry.dependencies.push(vertex);
                }
            }
        });
    }

    /// The dependencies collected so far in the innermost context.
    pub fn get_dependencies() -> Vec<VertexId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.dependencies.to_vec())
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        // The stack is gone during thread teardown; nothing left to balance.
        let _ = CONTEXT_STACK.try_with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.subscriber, self.subscriber,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.subscriber, entry.subscriber
                );
            }
        });
    }
}

/// Run `f` without recording any reads as dependencies.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _scope = ReactiveContext::untracked();
    f()
}
