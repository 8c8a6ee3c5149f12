//! Attribute Graph
//!
//! This module implements the dependency graph that connects input cells to
//! the rules computed from them.
//!
//! # Overview
//!
//! - Nodes are either inputs (written from outside) or rules (computed on
//!   demand by a stored function).
//! - Edges are discovered, not declared: every read performed while a rule
//!   is evaluating records an edge from the node read to that rule.
//! - Writing an input marks every transitive reader dirty. Dirty rules drop
//!   their cached value and recompute on their next read.
//!
//! # Ownership
//!
//! The [`Graph`] owns an arena of node records in registration order and a
//! slab of edges. Nodes and edges refer to each other by index, and the
//! [`Node`] handles given to callers hold only a weak reference to the
//! graph, so rule closures that capture handles never form a cycle.
//!
//! The graph is single-threaded: it uses `Rc` and `RefCell` internally and
//! is neither `Send` nor `Sync`.

mod context;
mod dump;
mod edge;
mod node;

pub use dump::{EdgeSnapshot, GraphSnapshot, NodeSnapshot};
pub use edge::{Edge, EdgeId};
pub use node::{Node, NodeId, NodeKind};

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::Rc;

use slab::Slab;
use tracing::{debug, trace};

use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use node::NodeRecord;

/// A demand-driven incremental computation graph.
///
/// # Example
///
/// ```rust
/// use attrgraph_core::Graph;
///
/// let graph = Graph::new();
/// let a = graph.input("A", 10);
/// let b = graph.input("B", 20);
/// let c = graph.rule("C", {
///     let (a, b) = (a.clone(), b.clone());
///     move || a.read() + b.read()
/// });
/// let d = graph.rule("D", {
///     let c = c.clone();
///     move || c.read() * 2
/// });
///
/// assert_eq!(d.read(), 60);
/// a.write(40);
/// assert_eq!(d.read(), 120);
/// ```
pub struct Graph {
    state: Rc<GraphState>,
}

/// State shared between a graph and the weak back-references in its handles.
pub(crate) struct GraphState {
    pub(crate) config: GraphConfig,
    pub(crate) arena: RefCell<Arena>,

    /// The rule currently evaluating, if any.
    pub(crate) current: Cell<Option<NodeId>>,
}

/// Node and edge storage.
#[derive(Debug, Default)]
pub(crate) struct Arena {
    pub(crate) nodes: Vec<NodeRecord>,
    pub(crate) edges: Slab<Edge>,
}

impl Graph {
    /// Create an empty graph with the default configuration.
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    /// Create an empty graph with the given configuration.
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            state: Rc::new(GraphState {
                config,
                arena: RefCell::new(Arena::default()),
                current: Cell::new(None),
            }),
        }
    }

    /// Get the configuration this graph was created with.
    pub fn config(&self) -> GraphConfig {
        self.state.config
    }

    /// Register an input node holding `value`.
    pub fn input<T>(&self, name: impl Into<String>, value: T) -> Node<T>
    where
        T: Clone + 'static,
    {
        self.register(NodeRecord::input(name.into(), value))
    }

    /// Register a rule node computed by `compute`.
    ///
    /// The rule does not run until the node is first read.
    pub fn rule<T, F>(&self, name: impl Into<String>, compute: F) -> Node<T>
    where
        T: Clone + 'static,
        F: Fn() -> T + 'static,
    {
        self.register(NodeRecord::rule::<T>(name.into(), Rc::new(compute)))
    }

    fn register<T>(&self, record: NodeRecord) -> Node<T> {
        let mut arena = self.state.arena.borrow_mut();
        let id = NodeId(arena.nodes.len());
        debug!(node = %record.name, kind = ?record.kind, id = id.index(), "node registered");
        arena.nodes.push(record);
        Node::new(Rc::downgrade(&self.state), id)
    }

    /// Get the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.state.arena.borrow().nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the number of recorded edges.
    pub fn edge_count(&self) -> usize {
        self.state.arena.borrow().edges.len()
    }

    /// Get the rule currently evaluating, if any.
    pub fn evaluating(&self) -> Option<NodeId> {
        self.state.current.get()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arena = self.state.arena.borrow();
        f.debug_struct("Graph")
            .field("config", &self.state.config)
            .field("nodes", &arena.nodes.len())
            .field("edges", &arena.edges.len())
            .field("evaluating", &self.state.current.get())
            .finish()
    }
}

impl Arena {
    pub(crate) fn record(&self, id: NodeId) -> &NodeRecord {
        &self.nodes[id.0]
    }

    /// Record that `consumer` read `producer`.
    pub(crate) fn link(&mut self, producer: NodeId, consumer: NodeId) -> EdgeId {
        let id = EdgeId(self.edges.insert(Edge::new(producer, consumer)));
        self.nodes[producer.0].outgoing.push(id);
        self.nodes[consumer.0].incoming.push(id);
        trace!(
            producer = %self.nodes[producer.0].name,
            consumer = %self.nodes[consumer.0].name,
            "edge recorded"
        );
        id
    }

    pub(crate) fn begin_evaluation(&mut self, id: NodeId, prune: bool) {
        if prune {
            self.prune_incoming(id);
        }
        self.nodes[id.0].evaluating = true;
    }

    pub(crate) fn finish_evaluation<T: 'static>(&mut self, id: NodeId, value: T) {
        let record = &mut self.nodes[id.0];
        record.dirty = false;
        record.slot_mut::<T>().value = Some(value);
    }

    /// Remove every edge into `consumer`, from both endpoints.
    fn prune_incoming(&mut self, consumer: NodeId) {
        let incoming = mem::take(&mut self.nodes[consumer.0].incoming);
        if incoming.is_empty() {
            return;
        }
        trace!(node = %self.nodes[consumer.0].name, edges = incoming.len(), "pruning stale edges");
        for id in incoming {
            let edge = self.edges.remove(id.0);
            self.nodes[edge.producer().0]
                .outgoing
                .retain(|outgoing| *outgoing != id);
        }
    }

    /// Mark `start` and everything reachable from it dirty.
    ///
    /// Nodes that are already dirty are neither counted nor traversed.
    /// Returns the number of nodes that became dirty.
    pub(crate) fn mark_dirty(&mut self, start: NodeId, invalidate: bool) -> usize {
        let mut stack = vec![start];
        let mut marked = 0;

        while let Some(id) = stack.pop() {
            let record = &mut self.nodes[id.0];
            if record.dirty {
                continue;
            }
            record.dirty = true;
            if invalidate {
                record.invalidate();
            }
            marked += 1;
            trace!(node = %record.name, "marked dirty");

            stack.extend(
                record
                    .outgoing
                    .iter()
                    .map(|edge| self.edges[edge.0].consumer()),
            );
        }

        marked
    }

    pub(crate) fn write<T: 'static>(&mut self, id: NodeId, value: T, invalidate: bool) -> Result<()> {
        let record = &mut self.nodes[id.0];
        if record.kind == NodeKind::Rule {
            return Err(GraphError::WriteToRule {
                name: record.name.clone(),
            });
        }
        record.slot_mut::<T>().value = Some(value);
        debug!(node = %record.name, readers = record.outgoing.len(), "input written");

        let outgoing = record.outgoing.clone();
        let mut marked = 0;
        for edge_id in outgoing {
            let edge = &mut self.edges[edge_id.0];
            edge.mark_pending();
            let consumer = edge.consumer();
            marked += self.mark_dirty(consumer, invalidate);
        }
        trace!(marked, "dirty propagation finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_register_in_order() {
        let graph = Graph::new();
        assert!(graph.is_empty());

        let a = graph.input("A", 1);
        let b = graph.input("B", "two".to_string());
        let c = graph.rule("C", || 3.0_f64);

        assert_eq!(graph.len(), 3);
        assert_eq!(a.id().index(), 0);
        assert_eq!(b.id().index(), 1);
        assert_eq!(c.id().index(), 2);
        assert_eq!(b.name(), "B");
    }

    #[test]
    fn names_need_not_be_unique() {
        let graph = Graph::new();
        let first = graph.input("x", 1);
        let second = graph.input("x", 2);
        assert_ne!(first.id(), second.id());
        assert_eq!(first.read() + second.read(), 3);
    }

    #[test]
    fn link_registers_both_endpoints() {
        let graph = Graph::new();
        let a = graph.input("A", 1);
        let b = graph.rule("B", || 0);

        let edge = graph.state.arena.borrow_mut().link(a.id(), b.id());

        let arena = graph.state.arena.borrow();
        assert_eq!(arena.record(a.id()).outgoing.as_slice(), &[edge]);
        assert_eq!(arena.record(b.id()).incoming.as_slice(), &[edge]);
        assert_eq!(arena.edges[edge.raw()].producer(), a.id());
        assert_eq!(arena.edges[edge.raw()].consumer(), b.id());
    }

    #[test]
    fn prune_removes_edges_from_both_endpoints() {
        let graph = Graph::new();
        let a = graph.input("A", 1);
        let b = graph.input("B", 2);
        let c = graph.rule("C", || 0);

        {
            let mut arena = graph.state.arena.borrow_mut();
            arena.link(a.id(), c.id());
            arena.link(b.id(), c.id());
            arena.prune_incoming(c.id());
        }

        assert_eq!(graph.edge_count(), 0);
        assert!(a.dependents().is_empty());
        assert!(b.dependents().is_empty());
        assert!(c.dependencies().is_empty());
    }

    #[test]
    fn mark_dirty_only_drops_rule_values() {
        let graph = Graph::new();
        let a = graph.input("A", 1);
        let c = graph.rule("C", {
            let a = a.clone();
            move || a.read()
        });
        c.read();

        let marked = graph.state.arena.borrow_mut().mark_dirty(a.id(), true);
        assert_eq!(marked, 2);
        assert!(a.has_value());
        assert!(!c.has_value());
    }

    #[test]
    fn reevaluation_replaces_edges() {
        let graph = Graph::new();
        let flag = graph.input("flag", true);
        let yes = graph.input("yes", 1);
        let no = graph.input("no", 2);
        let pick = graph.rule("pick", {
            let (flag, yes, no) = (flag.clone(), yes.clone(), no.clone());
            move || if flag.read() { yes.read() } else { no.read() }
        });

        assert_eq!(pick.read(), 1);
        assert_eq!(pick.dependencies(), vec![flag.id(), yes.id()]);

        flag.write(false);
        assert_eq!(pick.read(), 2);
        assert_eq!(pick.dependencies(), vec![flag.id(), no.id()]);
        assert!(yes.dependents().is_empty());
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn without_pruning_edges_accumulate() {
        let graph = Graph::with_config(GraphConfig {
            prune_stale_edges: false,
            ..GraphConfig::default()
        });
        let a = graph.input("A", 1);
        let b = graph.rule("B", {
            let a = a.clone();
            move || a.read() + 1
        });

        assert_eq!(b.read(), 2);
        a.write(5);
        assert_eq!(b.read(), 6);

        assert_eq!(b.dependencies(), vec![a.id(), a.id()]);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn values_of_different_types_coexist() {
        let graph = Graph::new();
        let count = graph.input("count", 3_usize);
        let word = graph.input("word", "ab".to_string());
        let repeated = graph.rule("repeated", {
            let (count, word) = (count.clone(), word.clone());
            move || word.read().repeat(count.read())
        });

        assert_eq!(repeated.read(), "ababab");
        word.write("x".to_string());
        assert_eq!(repeated.read(), "xxx");
    }
}
