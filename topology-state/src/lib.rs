//! Topology State
//!
//! This crate provides the reactive state layer of an interactive node-link
//! diagram. Given graph data, the application's selection and hover sets,
//! and a declarative style configuration, it derives the per-entity visual
//! state a renderer draws from and keeps it consistent as everything
//! changes. It implements:
//!
//! - Reactive primitives (signals, memos, effects, watchers)
//! - Style resolution with hover / selected variants
//! - Edge grouping and line geometry for parallel edges and self-loops
//! - Per-node and per-edge state stores kept in sync with the data
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Core reactive primitives and dependency tracking
//! - `graph`: Computational dependency graph implementation
//! - `style`: Style configuration and variant resolution
//! - `edge_group`: Grouping of edges by endpoint pair, line positions
//! - `node_state` / `edge_state`: Derived state records
//! - `sync`: Watchers that create, remove, and flag records
//! - `states`: The context object tying it all together
//! - `layout`: Interface for pluggable layout strategies
//! - `events`: Change notifications
//!
//! # Example
//!
//! ```rust
//! use topology_state::model::{Edge, Node, Point};
//! use topology_state::{Configs, Emitter, GraphInputs, States};
//!
//! let nodes = [("a", "A"), ("b", "B")]
//!     .into_iter()
//!     .map(|(id, name)| (id.to_string(), Node::new().with("name", name)))
//!     .collect();
//! let edges = [("e1".to_string(), Edge::new("a", "b"))].into_iter().collect();
//!
//! let states = States::provide(
//!     GraphInputs::new(nodes, edges),
//!     Configs::default(),
//!     Emitter::new(),
//! )
//! .unwrap();
//!
//! states.layouts().update(|layouts| {
//!     layouts.insert("a".into(), Point::new(0.0, 0.0));
//!     layouts.insert("b".into(), Point::new(100.0, 0.0));
//! });
//! states.selected_edges().update(|set| set.insert("e1".into()));
//!
//! let edge = states.edge_state("e1").unwrap();
//! assert!(edge.selected());
//! assert_eq!(edge.position().target, Point::new(100.0, 0.0));
//! assert_eq!(states.node_state("a").unwrap().label_text(), "A");
//! ```

pub mod edge_group;
pub mod edge_state;
pub mod error;
pub mod events;
pub mod graph;
pub mod layout;
pub mod model;
pub mod node_state;
pub mod reactive;
pub mod states;
pub mod style;
pub mod sync;

mod store;

pub use edge_group::{EdgeGroupStates, EdgeLayoutPoint, GroupKey};
pub use edge_state::{EdgeState, EdgeStateSnapshot, EdgeStateStore};
pub use error::{Error, Result};
pub use events::{Emitter, Event, EventKind, Subscription};
pub use layout::{LayoutActivateParameters, LayoutHandler, ViewportController};
pub use node_state::{NodeState, NodeStateSnapshot, NodeStateStore};
pub use states::{GraphInputs, States};
pub use style::Configs;
