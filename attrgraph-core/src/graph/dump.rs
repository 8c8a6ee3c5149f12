//! Diagnostics
//!
//! Two read-only views of a graph:
//!
//! - [`Graph::graphviz`] renders the Graphviz `digraph` text used to inspect
//!   dirty nodes and pending edges.
//! - [`Graph::snapshot`] returns the same information as plain data that can
//!   be serialized with serde.
//!
//! Both list nodes in registration order and edges grouped by producer, in
//! the order each producer's edges were recorded.

use serde::{Deserialize, Serialize};

use super::node::{NodeId, NodeKind};
use super::Graph;
use crate::error::{GraphError, Result};

const DASHED: &str = " [style=dashed]";

/// Serializable view of a whole graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Nodes in registration order.
    pub nodes: Vec<NodeSnapshot>,
    /// Edges grouped by producer.
    pub edges: Vec<EdgeSnapshot>,
}

/// Serializable view of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Registration index of the node.
    pub id: NodeId,
    /// Diagnostic name; not necessarily unique.
    pub name: String,
    /// Whether the node is an input or a rule.
    pub kind: NodeKind,
    /// Whether the node may need to recompute.
    pub dirty: bool,
    /// Whether the node holds a cached value.
    pub cached: bool,
}

/// Serializable view of one edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    /// The node that was read.
    pub producer: NodeId,
    /// The rule that read it.
    pub consumer: NodeId,
    /// Whether the producer was written since the edge was recorded.
    pub pending: bool,
}

impl Graph {
    /// Render the graph as Graphviz text.
    ///
    /// Dirty nodes and pending edges are drawn dashed.
    pub fn graphviz(&self) -> String {
        let snapshot = self.snapshot();
        let name = |id: NodeId| snapshot.nodes[id.index()].name.as_str();

        let nodes = snapshot
            .nodes
            .iter()
            .map(|node| {
                let style = if node.dirty { DASHED } else { "" };
                format!("{}{}", node.name, style)
            })
            .collect::<Vec<_>>()
            .join("\n");

        let edges = snapshot
            .edges
            .iter()
            .map(|edge| {
                let style = if edge.pending { DASHED } else { "" };
                format!("{} -> {}{}", name(edge.producer), name(edge.consumer), style)
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!("digraph {{\n{nodes}\n{edges}\n}}")
    }

    /// Capture the current node and edge state.
    pub fn snapshot(&self) -> GraphSnapshot {
        let arena = self.state.arena.borrow();

        let nodes = arena
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| NodeSnapshot {
                id: NodeId(index),
                name: node.name.clone(),
                kind: node.kind,
                dirty: node.dirty,
                cached: node.has_value(),
            })
            .collect();

        let edges = arena
            .nodes
            .iter()
            .flat_map(|node| node.outgoing.iter())
            .map(|id| {
                let edge = &arena.edges[id.0];
                EdgeSnapshot {
                    producer: edge.producer(),
                    consumer: edge.consumer(),
                    pending: edge.is_pending(),
                }
            })
            .collect();

        GraphSnapshot { nodes, edges }
    }

    /// Capture the current state as pretty-printed JSON.
    pub fn snapshot_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.snapshot()).map_err(GraphError::Snapshot)
    }
}
