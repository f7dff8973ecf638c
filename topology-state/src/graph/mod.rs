//! Dependency Graph
//!
//! This module implements the dependency graph that connects reactive values
//! (signals), the derivations that read them (memos), and the observers that
//! react to them (effects).
//!
//! # Overview
//!
//! The graph is a directed acyclic graph where:
//!
//! - Vertices represent signals, memos, or effects
//! - Edges represent dependencies: if A reads B, there is an edge from B to A
//!
//! When a signal changes we walk the graph to find every affected vertex and
//! mark it dirty. Memos recompute lazily on their next read; effects are queued
//! and run when the current batch settles.
//!
//! The word "vertex" is used throughout so that these bookkeeping records are
//! never confused with the diagram nodes the rest of the crate manages.
//!
//! Both forward (dependencies) and reverse (dependents) edges are kept so the
//! graph can be walked efficiently in either direction.

mod scheduler;
mod vertex;

pub use scheduler::UpdateScheduler;
pub use vertex::{DirtyState, Vertex, VertexId, VertexKind};
