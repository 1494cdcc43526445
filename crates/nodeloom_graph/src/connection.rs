// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::node::NodeId;
use crate::port::PortId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Create a connection id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// A directed edge from a source port to a target port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection id.
    pub id: ConnectionId,
    /// Source node id.
    pub from_node: NodeId,
    /// Source port id (an output on the source node).
    pub from_port: PortId,
    /// Target node id.
    pub to_node: NodeId,
    /// Target port id (an input on the target node).
    pub to_port: PortId,
    /// Manual routing points, in graph space and drag order.
    #[serde(default)]
    pub control_points: Vec<[f32; 2]>,
    /// Opaque host payload.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Whether the host renders this connection animated.
    #[serde(default)]
    pub animated: bool,
}

impl Connection {
    /// Create a new connection between two ports.
    pub fn new(
        id: ConnectionId,
        from_node: NodeId,
        from_port: PortId,
        to_node: NodeId,
        to_port: PortId,
    ) -> Self {
        Self {
            id,
            from_node,
            from_port,
            to_node,
            to_port,
            control_points: Vec::new(),
            payload: serde_json::Value::Null,
            animated: false,
        }
    }

    /// Check if this connection involves a specific node.
    pub fn involves_node(&self, node_id: &NodeId) -> bool {
        self.from_node == *node_id || self.to_node == *node_id
    }

    /// Check if this connection involves a specific port on a specific node.
    pub fn involves_port(&self, node_id: &NodeId, port_id: &PortId) -> bool {
        (self.from_node == *node_id && self.from_port == *port_id)
            || (self.to_node == *node_id && self.to_port == *port_id)
    }
}
