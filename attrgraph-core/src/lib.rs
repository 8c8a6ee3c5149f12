//! Attrgraph Core
//!
//! This crate provides a small demand-driven incremental computation graph.
//! It implements:
//!
//! - Input cells, written from outside
//! - Rule cells, computed lazily and memoized
//! - Automatic dependency discovery by observing reads during evaluation
//! - Dirty-flag propagation from written inputs to every transitive reader
//! - Graphviz and JSON diagnostics
//!
//! # Architecture
//!
//! - `graph`: the node arena, edges, evaluation context and diagnostics
//! - `config`: graph tunables
//! - `error`: the crate's error type
//!
//! # Example
//!
//! ```rust
//! use attrgraph_core::Graph;
//!
//! let graph = Graph::new();
//! let width = graph.input("width", 3);
//! let height = graph.input("height", 4);
//! let area = graph.rule("area", {
//!     let (width, height) = (width.clone(), height.clone());
//!     move || width.read() * height.read()
//! });
//!
//! assert_eq!(area.read(), 12);
//!
//! // Writes only mark readers dirty; the next read recomputes.
//! width.write(5);
//! assert!(area.is_dirty());
//! assert_eq!(area.read(), 20);
//! ```

pub mod config;
pub mod error;
pub mod graph;

pub use config::GraphConfig;
pub use error::{GraphError, Result};
pub use graph::{
    Edge, EdgeId, EdgeSnapshot, Graph, GraphSnapshot, Node, NodeId, NodeKind, NodeSnapshot,
};
