//! Reactive Primitives
//!
//! This module implements the reactive system the state stores are built on:
//! signals, memos, effects, and watchers.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. Reading it inside a memo or
//! effect registers a dependency; changing it marks every dependent dirty.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result and recomputes lazily,
//! only when something it read has changed since its last evaluation.
//!
//! ## Effects
//!
//! An Effect runs whenever its dependencies change. Effects are how derived
//! state is pushed into the world outside the graph: store lifecycles, event
//! emission, rendering.
//!
//! ## Batches
//!
//! [`Runtime::batch`] defers effects until the closure returns, so a burst of
//! mutations settles once instead of once per mutation.
//!
//! # Implementation Notes
//!
//! Dependencies are discovered automatically: a thread-local context stack
//! records every read made while a memo or effect runs, and the runtime
//! rewires the dependency graph from that record after each run.

mod context;
mod effect;
mod memo;
mod runtime;
mod signal;

pub use context::{untrack, ReactiveContext};
pub use effect::{watch, Effect};
pub use memo::Memo;
pub use runtime::{Reactive, Runtime};
pub use signal::Signal;

/// Run `f` as one batch; effects settle once when it returns.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    Runtime::batch(f)
}
