//! Graph Nodes
//!
//! This module defines the typed node handle ([`Node<T>`]) and the
//! type-erased record the graph stores for every node.
//!
//! # Reads
//!
//! [`Node::read`] is the only accessor. While some rule is evaluating, every
//! read of another node records a fresh edge from the node being read to
//! that rule. If the node is a rule without a cached value, it is evaluated
//! first, inside an [`EvaluationScope`] so that its own reads are attributed
//! to it.
//!
//! # Writes
//!
//! [`Node::write`] replaces an input's value, flags every outgoing edge as
//! pending and marks every transitive reader dirty. Nothing is recomputed
//! until the next read.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::context::EvaluationScope;
use super::edge::EdgeId;
use super::GraphState;
use crate::error::{GraphError, Result};

/// Identifier of a node: its position in the graph's registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Get the registration index of this node.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The kind of node in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A cell whose value is supplied from outside through writes.
    Input,

    /// A cell computed on demand by a stored function over other cells.
    Rule,
}

pub(crate) type EdgeList = SmallVec<[EdgeId; 4]>;

pub(crate) type Rule<T> = Rc<dyn Fn() -> T>;

/// Type-erased view of a node's value storage.
///
/// Lets the registry hold nodes of different value types side by side and
/// still invalidate them during dirty propagation.
pub(crate) trait ValueSlot {
    fn has_value(&self) -> bool;

    /// Drop the cached value if it can be recomputed.
    fn invalidate(&mut self);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub(crate) struct Slot<T> {
    pub(crate) value: Option<T>,
    pub(crate) rule: Option<Rule<T>>,
}

impl<T: 'static> ValueSlot for Slot<T> {
    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn invalidate(&mut self) {
        // Inputs have nothing to recompute from.
        if self.rule.is_some() {
            self.value = None;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Everything the graph knows about one node.
pub(crate) struct NodeRecord {
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) dirty: bool,

    /// Set while the node's rule is on the call stack.
    pub(crate) evaluating: bool,

    /// Edges to the nodes this node has read.
    pub(crate) incoming: EdgeList,

    /// Edges to the rules that have read this node.
    pub(crate) outgoing: EdgeList,

    slot: Box<dyn ValueSlot>,
}

impl NodeRecord {
    pub(crate) fn input<T: 'static>(name: String, value: T) -> Self {
        Self::with_slot(
            name,
            NodeKind::Input,
            Slot {
                value: Some(value),
                rule: None,
            },
        )
    }

    pub(crate) fn rule<T: 'static>(name: String, rule: Rule<T>) -> Self {
        Self::with_slot(
            name,
            NodeKind::Rule,
            Slot {
                value: None,
                rule: Some(rule),
            },
        )
    }

    pub(crate) fn with_slot<T: 'static>(name: String, kind: NodeKind, slot: Slot<T>) -> Self {
        Self {
            name,
            kind,
            dirty: false,
            evaluating: false,
            incoming: EdgeList::new(),
            outgoing: EdgeList::new(),
            slot: Box::new(slot),
        }
    }

    pub(crate) fn has_value(&self) -> bool {
        self.slot.has_value()
    }

    pub(crate) fn invalidate(&mut self) {
        self.slot.invalidate();
    }

    pub(crate) fn slot<T: 'static>(&self) -> &Slot<T> {
        self.slot
            .as_any()
            .downcast_ref()
            .unwrap_or_else(|| {
                panic!(
                    "{}",
                    GraphError::TypeMismatch {
                        name: self.name.clone()
                    }
                )
            })
    }

    pub(crate) fn slot_mut<T: 'static>(&mut self) -> &mut Slot<T> {
        self.slot
            .as_any_mut()
            .downcast_mut()
            .unwrap_or_else(|| {
                panic!(
                    "{}",
                    GraphError::TypeMismatch {
                        name: self.name.clone()
                    }
                )
            })
    }
}

impl fmt::Debug for NodeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRecord")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("dirty", &self.dirty)
            .field("has_value", &self.has_value())
            .field("incoming", &self.incoming.len())
            .field("outgoing", &self.outgoing.len())
            .finish()
    }
}

/// A typed handle to a node in a [`Graph`](super::Graph).
///
/// Handles are cheap to clone and hold only a weak reference to the graph,
/// so rules may capture the handles they read without keeping the graph
/// alive. Using a handle after its graph is dropped panics.
///
/// # Example
///
/// ```rust
/// use attrgraph_core::Graph;
///
/// let graph = Graph::new();
/// let a = graph.input("A", 10);
/// let b = graph.input("B", 20);
/// let sum = graph.rule("C", {
///     let (a, b) = (a.clone(), b.clone());
///     move || a.read() + b.read()
/// });
///
/// assert_eq!(sum.read(), 30);
/// a.write(40);
/// assert_eq!(sum.read(), 60);
/// ```
pub struct Node<T> {
    graph: Weak<GraphState>,
    id: NodeId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Node<T> {
    pub(crate) fn new(graph: Weak<GraphState>, id: NodeId) -> Self {
        Self {
            graph,
            id,
            _marker: PhantomData,
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    fn state(&self) -> Rc<GraphState> {
        self.graph
            .upgrade()
            .unwrap_or_else(|| panic!("{}", GraphError::GraphDropped))
    }

    /// Get the node's diagnostic name.
    pub fn name(&self) -> String {
        self.state().arena.borrow().record(self.id).name.clone()
    }

    /// Get the node's kind.
    pub fn kind(&self) -> NodeKind {
        self.state().arena.borrow().record(self.id).kind
    }

    /// Whether the node may need to recompute.
    pub fn is_dirty(&self) -> bool {
        self.state().arena.borrow().record(self.id).dirty
    }

    /// Whether the node holds a cached value.
    pub fn has_value(&self) -> bool {
        self.state().arena.borrow().record(self.id).has_value()
    }

    /// Nodes this node has read, one entry per recorded edge.
    pub fn dependencies(&self) -> Vec<NodeId> {
        let state = self.state();
        let arena = state.arena.borrow();
        arena
            .record(self.id)
            .incoming
            .iter()
            .map(|edge| arena.edges[edge.0].producer())
            .collect()
    }

    /// Rules that have read this node, one entry per recorded edge.
    pub fn dependents(&self) -> Vec<NodeId> {
        let state = self.state();
        let arena = state.arena.borrow();
        arena
            .record(self.id)
            .outgoing
            .iter()
            .map(|edge| arena.edges[edge.0].consumer())
            .collect()
    }
}

impl<T: Clone + 'static> Node<T> {
    /// Get the current value, evaluating the rule first if necessary.
    ///
    /// Called from inside another rule, this records that rule as a reader
    /// of this node.
    pub fn read(&self) -> T {
        self.read_with(true)
    }

    /// Get the current value without recording a dependency.
    ///
    /// The node is still evaluated if it has no cached value; only the edge
    /// to the calling rule is skipped.
    pub fn read_untracked(&self) -> T {
        self.read_with(false)
    }

    fn read_with(&self, track: bool) -> T {
        let state = self.state();

        if track {
            if let Some(reader) = state.current.get().filter(|reader| *reader != self.id) {
                state.arena.borrow_mut().link(self.id, reader);
            }
        }

        let rule = {
            let mut arena = state.arena.borrow_mut();
            let record = arena.record(self.id);
            let slot = record.slot::<T>();
            if let Some(value) = &slot.value {
                return value.clone();
            }
            let Some(rule) = slot.rule.clone() else {
                panic!(
                    "{}",
                    GraphError::MissingRule {
                        name: record.name.clone()
                    }
                );
            };
            if record.evaluating {
                panic!(
                    "{}",
                    GraphError::Cycle {
                        name: record.name.clone()
                    }
                );
            }
            debug!(node = %record.name, "evaluating rule");
            arena.begin_evaluation(self.id, state.config.prune_stale_edges);
            rule
        };

        let value = {
            let _scope = EvaluationScope::enter(&state, self.id);
            rule()
        };

        let mut arena = state.arena.borrow_mut();
        arena.finish_evaluation(self.id, value.clone());
        trace!(
            node = %arena.record(self.id).name,
            dependencies = arena.record(self.id).incoming.len(),
            "rule evaluated"
        );
        value
    }

    /// Replace an input's value and mark its readers dirty.
    ///
    /// # Panics
    ///
    /// Panics if this node is a rule.
    pub fn write(&self, value: T) {
        if let Err(err) = self.try_write(value) {
            panic!("{err}");
        }
    }

    /// Like [`write`](Self::write), but reports misuse as an error.
    pub fn try_write(&self, value: T) -> Result<()> {
        let state = self.graph.upgrade().ok_or(GraphError::GraphDropped)?;
        let invalidate = state.config.invalidate_on_dirty;
        let result = state.arena.borrow_mut().write(self.id, value, invalidate);
        result
    }

    /// Write a value derived from the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.read_untracked());
        self.write(next);
    }
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        Self {
            graph: Weak::clone(&self.graph),
            id: self.id,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Node");
        debug.field("id", &self.id);
        if let Some(state) = self.graph.upgrade() {
            let arena = state.arena.borrow();
            let record = arena.record(self.id);
            debug
                .field("name", &record.name)
                .field("kind", &record.kind)
                .field("dirty", &record.dirty);
        }
        debug.finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
