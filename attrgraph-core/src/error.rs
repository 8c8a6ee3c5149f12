//! Error types for the attribute graph.
//!
//! Most misuse of the graph is a programming error and surfaces as a panic
//! whose message is the [`GraphError`] display text. The fallible entry
//! points (`Node::try_write`, `GraphConfig::from_json`, `Graph::snapshot_json`)
//! return the same type instead.

use thiserror::Error;

/// Errors raised by graph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// An external write was attempted on a rule node.
    #[error("cannot write to rule node `{name}`: only input nodes accept writes")]
    WriteToRule {
        /// Name of the rule node.
        name: String,
    },

    /// A rule node has neither a cached value nor a rule to compute one.
    #[error("rule node `{name}` has no cached value and no rule")]
    MissingRule {
        /// Name of the corrupted node.
        name: String,
    },

    /// A rule read its own node, directly or through other rules, while
    /// it was being evaluated.
    #[error("dependency cycle detected while evaluating `{name}`")]
    Cycle {
        /// Name of the node that was re-entered.
        name: String,
    },

    /// A node was accessed through a handle of the wrong value type.
    #[error("node `{name}` accessed with a mismatched value type")]
    TypeMismatch {
        /// Name of the node.
        name: String,
    },

    /// A node handle outlived the graph that created it.
    #[error("node used after its graph was dropped")]
    GraphDropped,

    /// The configuration document could not be parsed.
    #[error("invalid graph configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The graph snapshot could not be serialized.
    #[error("failed to serialize graph snapshot: {0}")]
    Snapshot(#[source] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T, E = GraphError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_node() {
        let err = GraphError::WriteToRule { name: "C".into() };
        assert_eq!(
            err.to_string(),
            "cannot write to rule node `C`: only input nodes accept writes"
        );

        let err = GraphError::Cycle { name: "loop".into() };
        assert_eq!(
            err.to_string(),
            "dependency cycle detected while evaluating `loop`"
        );
    }

    #[test]
    fn config_errors_convert_from_serde() {
        let parse = serde_json::from_str::<bool>("nope").unwrap_err();
        let err: GraphError = parse.into();
        assert!(matches!(err, GraphError::Config(_)));
        assert!(err.to_string().starts_with("invalid graph configuration"));
    }
}
