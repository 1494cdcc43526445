// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph data model and mutation engine for NodeLoom.
//!
//! This crate owns the editable graph itself:
//! - Nodes with typed ports, kinds (regular / group / comment) and z-order
//! - Directed connections with manual routing points
//! - The [`graph::GraphStore`] mutation surface with cascade semantics and
//!   batched change notification
//! - On-demand algorithms (cycle detection, orphan scan, bounds)
//!
//! Rendering, input handling and viewport math live in `nodeloom_canvas`.

pub mod algorithms;
pub mod connection;
pub mod event;
pub mod graph;
pub mod ids;
pub mod node;
pub mod port;

pub use connection::{Connection, ConnectionId};
pub use event::{EventBus, GraphEvent, Observable, SubscriberId};
pub use graph::{GraphError, GraphStore};
pub use ids::IdGenerator;
pub use node::{CommentData, GroupBehavior, GroupData, Groupable, Node, NodeId, NodeKind};
pub use port::{Port, PortDirection, PortId};
