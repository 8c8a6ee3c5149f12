//! Graph Edges
//!
//! An edge records that a rule read another node while it was evaluating.
//! Edges point from the producer (the node that was read) to the consumer
//! (the rule that read it) and live in a slab owned by the graph, so nodes
//! refer to them by [`EdgeId`].

use super::node::NodeId;

/// Identifier of an edge inside its graph's edge slab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(pub(crate) usize);

impl EdgeId {
    /// Get the raw slab key.
    pub fn raw(&self) -> usize {
        self.0
    }
}

/// A recorded dependency between two nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    producer: NodeId,
    consumer: NodeId,

    /// Set when the producer is written; reported by the diagnostics.
    pending: bool,
}

impl Edge {
    pub(crate) fn new(producer: NodeId, consumer: NodeId) -> Self {
        Self {
            producer,
            consumer,
            pending: false,
        }
    }

    /// The node that was read.
    pub fn producer(&self) -> NodeId {
        self.producer
    }

    /// The rule that read it.
    pub fn consumer(&self) -> NodeId {
        self.consumer
    }

    /// Whether the producer has been written since this edge was recorded.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub(crate) fn mark_pending(&mut self) {
        self.pending = true;
    }
}
