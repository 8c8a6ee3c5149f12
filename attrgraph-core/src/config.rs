//! Graph Configuration
//!
//! A [`GraphConfig`] selects between the two invalidation behaviours a graph
//! can run with and whether stale dependency edges are dropped when a rule
//! re-runs. Every field has a default, so partial JSON documents are valid.
//!
//! ```rust
//! use attrgraph_core::GraphConfig;
//!
//! let config = GraphConfig::from_json(r#"{ "prune_stale_edges": false }"#).unwrap();
//! assert!(!config.prune_stale_edges);
//! assert!(config.invalidate_on_dirty);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for a [`Graph`](crate::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Remove a rule's incoming edges (and the producers' matching outgoing
    /// registrations) before the rule re-runs.
    ///
    /// With this off, every evaluation appends a fresh set of edges and
    /// edges from earlier passes are kept forever.
    pub prune_stale_edges: bool,

    /// Drop a rule's cached value when its dirty flag goes from false to
    /// true, so the next read recomputes it.
    ///
    /// With this off, the dirty flag is diagnostic only: a rule computes
    /// once and keeps its first value for the lifetime of the graph.
    pub invalidate_on_dirty: bool,
}

impl GraphConfig {
    /// Parse a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            prune_stale_edges: true,
            invalidate_on_dirty: true,
        }
    }
}
