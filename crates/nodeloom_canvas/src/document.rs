// SPDX-License-Identifier: MIT OR Apache-2.0
//! JSON interchange document: `{ nodes, connections, viewport }`.
//!
//! Export reflects live in-memory state 1:1; load replaces the whole graph
//! and selection. Connections whose endpoints no longer resolve are pruned
//! on load rather than rejected.

use crate::viewport::Viewport;
use nodeloom_graph::{Connection, GraphStore, Node};
use serde::{Deserialize, Serialize};

/// The persisted graph shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    /// All nodes.
    pub nodes: Vec<Node>,
    /// All connections.
    pub connections: Vec<Connection>,
    /// Viewport pan/zoom.
    pub viewport: Viewport,
}

impl GraphDocument {
    /// Snapshot the store and viewport into a document.
    pub fn from_store(store: &GraphStore, viewport: Viewport) -> Self {
        Self {
            nodes: store.nodes().cloned().collect(),
            connections: store.connections().cloned().collect(),
            viewport,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
