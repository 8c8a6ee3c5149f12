//! Evaluation Context
//!
//! The evaluation context tracks which rule is currently running, so that
//! reads can be attributed to it as dependencies.
//!
//! # Implementation
//!
//! The graph keeps a single "current" slot. Entering a scope saves the slot's
//! previous value and installs the rule being evaluated; dropping the scope
//! puts the previous value back. Because the saved value lives on the call
//! stack, nested evaluations (a rule reading another unevaluated rule)
//! compose, and the slot is restored even if the rule panics.

use tracing::warn;

use super::node::NodeId;
use super::GraphState;

/// Guard that restores the previous evaluation context when dropped.
pub(crate) struct EvaluationScope<'a> {
    state: &'a GraphState,
    node: NodeId,
    previous: Option<NodeId>,
}

impl<'a> EvaluationScope<'a> {
    /// Make `node` the current rule until the returned guard is dropped.
    pub(crate) fn enter(state: &'a GraphState, node: NodeId) -> Self {
        let previous = state.current.replace(Some(node));
        Self {
            state,
            node,
            previous,
        }
    }
}

impl Drop for EvaluationScope<'_> {
    fn drop(&mut self) {
        let current = self.state.current.replace(self.previous);
        debug_assert_eq!(
            current,
            Some(self.node),
            "evaluation context mismatch: expected {:?}, got {:?}",
            self.node,
            current
        );

        match self.state.arena.try_borrow_mut() {
            Ok(mut arena) => arena.nodes[self.node.index()].evaluating = false,
            Err(_) => warn!(node = self.node.index(), "graph busy while leaving evaluation"),
        }
    }
}
