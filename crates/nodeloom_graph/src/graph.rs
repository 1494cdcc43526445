// SPDX-License-Identifier: MIT OR Apache-2.0
//! The mutable graph store: nodes, connections, cascades and batching.
//!
//! Mutation error policy is deliberately asymmetric. Destructive operations
//! on an explicitly referenced entity (`remove_connection`, `remove_port`,
//! control-point edits) fail hard with [`GraphError`]; incidental mutations
//! of something that may already be gone (move, resize, visibility,
//! `duplicate_node`) are silent no-ops so bulk edits stay idempotent.

use crate::connection::{Connection, ConnectionId};
use crate::event::{EventBus, GraphEvent, SubscriberId};
use crate::ids::{IdGenerator, CONNECTION_ID_PREFIX, NODE_ID_PREFIX};
use crate::node::{Node, NodeId, NodeKind};
use crate::port::{Port, PortDirection, PortId};
use indexmap::IndexMap;
use tracing::{debug, warn};

/// Position offset applied to duplicated nodes so copies never overlap the
/// original exactly.
pub const DUPLICATE_OFFSET: [f32; 2] = [50.0, 50.0];

/// Z-index magnitude past which the front/back counters are renumbered.
const Z_NORMALIZE_LIMIT: i32 = 1 << 20;

/// Error for hard-failure mutations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Node id does not exist.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port id does not exist on the given node.
    #[error("port not found: {port} on node {node}")]
    PortNotFound {
        /// Owning node id.
        node: NodeId,
        /// Missing port id.
        port: PortId,
    },

    /// Port exists but has the wrong direction for the requested endpoint.
    #[error("port {port} on node {node} has the wrong direction for this endpoint")]
    DirectionMismatch {
        /// Owning node id.
        node: NodeId,
        /// Mismatched port id.
        port: PortId,
    },

    /// Connection id does not exist.
    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),
}

/// Result type for graph mutations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// The mutable node graph.
#[derive(Debug)]
pub struct GraphStore {
    nodes: IndexMap<NodeId, Node>,
    connections: IndexMap<ConnectionId, Connection>,
    ids: IdGenerator,
    events: EventBus,
    batch_depth: u32,
    batch_reason: String,
    z_top: i32,
    z_bottom: i32,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    /// Create an empty store with a fresh id generator.
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            ids: IdGenerator::new(),
            events: EventBus::new(),
            batch_depth: 0,
            batch_reason: String::new(),
            z_top: 0,
            z_bottom: 0,
        }
    }

    // --- Node CRUD ---------------------------------------------------------

    /// Insert a node, replacing any node with the same id.
    ///
    /// Nodes arriving with the default z-index of zero are placed in front.
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        if node.z_index == 0 {
            node.z_index = self.next_front_z();
        } else {
            self.z_top = self.z_top.max(node.z_index);
            self.z_bottom = self.z_bottom.min(node.z_index);
        }
        let id = node.id.clone();
        debug!(node = %id, kind = node.kind.label(), "add node");
        self.nodes.insert(id.clone(), node);
        self.events.emit(&GraphEvent::NodeAdded(id.clone()));
        id
    }

    /// Create a node of the given kind with a generated id.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let nodes = &self.nodes;
        let id = self
            .ids
            .next_free(NODE_ID_PREFIX, |candidate| nodes.contains_key(&NodeId::new(candidate)));
        self.add_node(Node::new(id, kind))
    }

    /// Remove a node, cascading to incident connections, group member sets
    /// and the selected flag. Returns the node, or `None` if it was gone.
    pub fn remove_node(&mut self, node_id: &NodeId) -> Option<Node> {
        let node = self.nodes.shift_remove(node_id)?;

        let incident: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.involves_node(node_id))
            .map(|c| c.id.clone())
            .collect();
        for conn_id in incident {
            self.connections.shift_remove(&conn_id);
            self.events.emit(&GraphEvent::ConnectionRemoved(conn_id));
        }

        for other in self.nodes.values_mut() {
            if let Some(group) = other.as_groupable_mut() {
                group.remove_member(node_id);
            }
        }

        debug!(node = %node_id, "remove node");
        self.events.emit(&GraphEvent::NodeRemoved(node_id.clone()));
        Some(node)
    }

    /// Clone an existing node under a derived id (`<id>_copy_<n>`), offset
    /// by [`DUPLICATE_OFFSET`]. No-op on a missing id.
    pub fn duplicate_node(&mut self, node_id: &NodeId) -> Option<NodeId> {
        let source = self.nodes.get(node_id)?;
        let mut copy = source.clone();

        let mut n = 1;
        let new_id = loop {
            let candidate = NodeId::new(format!("{}_copy_{}", node_id.as_str(), n));
            if !self.nodes.contains_key(&candidate) {
                break candidate;
            }
            n += 1;
        };

        copy.id = new_id.clone();
        copy.position[0] += DUPLICATE_OFFSET[0];
        copy.position[1] += DUPLICATE_OFFSET[1];
        copy.selected = false;
        copy.dragging = false;
        copy.z_index = 0;
        self.add_node(copy);
        Some(new_id)
    }

    /// Get a node by id.
    pub fn node(&self, node_id: &NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    /// Get a mutable node by id.
    pub fn node_mut(&mut self, node_id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node_id)
    }

    /// Iterate over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterate over all node ids.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // --- Soft node mutations -----------------------------------------------

    /// Translate a node by a delta. No-op on a missing id.
    pub fn move_node(&mut self, node_id: &NodeId, delta: [f32; 2]) {
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.position[0] += delta[0];
            node.position[1] += delta[1];
            self.events.emit(&GraphEvent::NodeChanged(node_id.clone()));
        }
    }

    /// Set a node's position. No-op on a missing id.
    pub fn set_position(&mut self, node_id: &NodeId, position: [f32; 2]) {
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.position = position;
            self.events.emit(&GraphEvent::NodeChanged(node_id.clone()));
        }
    }

    /// Set a node's size. No-op on a missing id.
    pub fn set_size(&mut self, node_id: &NodeId, size: [f32; 2]) {
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.size = size;
            self.events.emit(&GraphEvent::NodeChanged(node_id.clone()));
        }
    }

    /// Set a node's visibility. No-op on a missing id.
    pub fn set_visible(&mut self, node_id: &NodeId, visible: bool) {
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.visible = visible;
            self.events.emit(&GraphEvent::NodeChanged(node_id.clone()));
        }
    }

    /// Raise a node above every other node. No-op on a missing id.
    pub fn bring_to_front(&mut self, node_id: &NodeId) {
        let z = self.next_front_z();
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.z_index = z;
        }
    }

    /// Push a node below every other node. No-op on a missing id.
    pub fn send_to_back(&mut self, node_id: &NodeId) {
        self.z_bottom -= 1;
        if self.z_bottom < -Z_NORMALIZE_LIMIT {
            self.normalize_z();
            self.z_bottom -= 1;
        }
        let z = self.z_bottom;
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.z_index = z;
        }
    }

    fn next_front_z(&mut self) -> i32 {
        self.z_top += 1;
        if self.z_top > Z_NORMALIZE_LIMIT {
            self.normalize_z();
            self.z_top += 1;
        }
        self.z_top
    }

    /// Renumber z-indices to a compact 0..n range, preserving order.
    fn normalize_z(&mut self) {
        let mut order: Vec<NodeId> = self.nodes.keys().cloned().collect();
        order.sort_by_key(|id| self.nodes[id].z_index);
        for (z, id) in order.into_iter().enumerate() {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.z_index = z as i32;
            }
        }
        self.z_top = self.nodes.len() as i32;
        self.z_bottom = 0;
    }

    // --- Group membership --------------------------------------------------

    /// Add a node to a group's member set. No-op unless both nodes exist and
    /// `group_id` names a group.
    pub fn add_to_group(&mut self, group_id: &NodeId, member_id: &NodeId) {
        if !self.nodes.contains_key(member_id) || group_id == member_id {
            return;
        }
        if let Some(group) = self.nodes.get_mut(group_id).and_then(Node::as_groupable_mut) {
            group.add_member(member_id.clone());
        }
    }

    /// Remove a node from a group's member set. No-op if either is missing.
    pub fn remove_from_group(&mut self, group_id: &NodeId, member_id: &NodeId) {
        if let Some(group) = self.nodes.get_mut(group_id).and_then(Node::as_groupable_mut) {
            group.remove_member(member_id);
        }
    }

    // --- Port CRUD ---------------------------------------------------------

    /// Add a port to a node. No-op on a missing node.
    pub fn add_port(&mut self, node_id: &NodeId, port: Port) {
        if let Some(node) = self.nodes.get_mut(node_id) {
            match port.direction {
                PortDirection::Input => node.inputs.push(port),
                PortDirection::Output => node.outputs.push(port),
            }
            self.events.emit(&GraphEvent::NodeChanged(node_id.clone()));
        }
    }

    /// Remove a port, cascading to every connection referencing it.
    ///
    /// Removing an explicitly referenced port that does not exist is an
    /// error, unlike the soft node mutations.
    pub fn remove_port(&mut self, node_id: &NodeId, port_id: &PortId) -> Result<Port> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.clone()))?;

        let port = if let Some(i) = node.inputs.iter().position(|p| p.id == *port_id) {
            node.inputs.remove(i)
        } else if let Some(i) = node.outputs.iter().position(|p| p.id == *port_id) {
            node.outputs.remove(i)
        } else {
            return Err(GraphError::PortNotFound {
                node: node_id.clone(),
                port: port_id.clone(),
            });
        };

        let referencing: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.involves_port(node_id, port_id))
            .map(|c| c.id.clone())
            .collect();
        for conn_id in referencing {
            self.connections.shift_remove(&conn_id);
            self.events.emit(&GraphEvent::ConnectionRemoved(conn_id));
        }

        self.events.emit(&GraphEvent::NodeChanged(node_id.clone()));
        Ok(port)
    }

    // --- Connection CRUD ---------------------------------------------------

    /// Create a connection with a generated id.
    ///
    /// Both endpoints must exist and have matching directions (source port
    /// is an output, target port is an input). Self-referencing connections
    /// are allowed; cycle detection reports them as one-node cycles.
    pub fn create_connection(
        &mut self,
        from_node: &NodeId,
        from_port: &PortId,
        to_node: &NodeId,
        to_port: &PortId,
    ) -> Result<ConnectionId> {
        self.validate_endpoint(from_node, from_port, PortDirection::Output)?;
        self.validate_endpoint(to_node, to_port, PortDirection::Input)?;

        let connections = &self.connections;
        let id = ConnectionId::new(self.ids.next_free(CONNECTION_ID_PREFIX, |candidate| {
            connections.contains_key(&ConnectionId::new(candidate))
        }));
        let connection = Connection::new(
            id.clone(),
            from_node.clone(),
            from_port.clone(),
            to_node.clone(),
            to_port.clone(),
        );
        debug!(connection = %id, from = %from_node, to = %to_node, "add connection");
        self.connections.insert(id.clone(), connection);
        self.events.emit(&GraphEvent::ConnectionAdded(id.clone()));
        Ok(id)
    }

    /// Insert a pre-built connection after validating its endpoints.
    pub fn add_connection(&mut self, connection: Connection) -> Result<ConnectionId> {
        self.validate_endpoint(&connection.from_node, &connection.from_port, PortDirection::Output)?;
        self.validate_endpoint(&connection.to_node, &connection.to_port, PortDirection::Input)?;
        let id = connection.id.clone();
        self.connections.insert(id.clone(), connection);
        self.events.emit(&GraphEvent::ConnectionAdded(id.clone()));
        Ok(id)
    }

    fn validate_endpoint(
        &self,
        node_id: &NodeId,
        port_id: &PortId,
        expected: PortDirection,
    ) -> Result<()> {
        let node = self
            .nodes
            .get(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.clone()))?;
        let port = node.port(port_id).ok_or_else(|| GraphError::PortNotFound {
            node: node_id.clone(),
            port: port_id.clone(),
        })?;
        if port.direction != expected {
            return Err(GraphError::DirectionMismatch {
                node: node_id.clone(),
                port: port_id.clone(),
            });
        }
        Ok(())
    }

    /// Remove a connection. Referencing a missing id is an error.
    pub fn remove_connection(&mut self, connection_id: &ConnectionId) -> Result<Connection> {
        let connection = self
            .connections
            .shift_remove(connection_id)
            .ok_or_else(|| GraphError::ConnectionNotFound(connection_id.clone()))?;
        debug!(connection = %connection_id, "remove connection");
        self.events
            .emit(&GraphEvent::ConnectionRemoved(connection_id.clone()));
        Ok(connection)
    }

    /// Get a connection by id.
    pub fn connection(&self, connection_id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(connection_id)
    }

    /// Iterate over all connections.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Iterate over connections involving a node.
    pub fn connections_for_node<'a>(
        &'a self,
        node_id: &'a NodeId,
    ) -> impl Iterator<Item = &'a Connection> {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Number of connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Set a connection's animated flag. No-op on a missing id.
    pub fn set_animated(&mut self, connection_id: &ConnectionId, animated: bool) {
        if let Some(connection) = self.connections.get_mut(connection_id) {
            connection.animated = animated;
        }
    }

    /// Remove connections whose endpoints no longer resolve. Returns how
    /// many were pruned.
    pub fn prune_dangling_connections(&mut self) -> usize {
        let dangling: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| {
                self.validate_endpoint(&c.from_node, &c.from_port, PortDirection::Output)
                    .and_then(|()| self.validate_endpoint(&c.to_node, &c.to_port, PortDirection::Input))
                    .is_err()
            })
            .map(|c| c.id.clone())
            .collect();
        let pruned = dangling.len();
        for conn_id in dangling {
            warn!(connection = %conn_id, "pruning dangling connection");
            self.connections.shift_remove(&conn_id);
            self.events.emit(&GraphEvent::ConnectionRemoved(conn_id));
        }
        pruned
    }

    // --- Control points ----------------------------------------------------

    /// Append a control point. The connection must exist.
    pub fn add_control_point(&mut self, connection_id: &ConnectionId, point: [f32; 2]) -> Result<()> {
        let connection = self
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| GraphError::ConnectionNotFound(connection_id.clone()))?;
        connection.control_points.push(point);
        Ok(())
    }

    /// Insert a control point at `index`. The connection must exist; an
    /// out-of-range index is a tolerated no-op.
    pub fn insert_control_point(
        &mut self,
        connection_id: &ConnectionId,
        index: usize,
        point: [f32; 2],
    ) -> Result<()> {
        let connection = self
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| GraphError::ConnectionNotFound(connection_id.clone()))?;
        if index <= connection.control_points.len() {
            connection.control_points.insert(index, point);
        }
        Ok(())
    }

    /// Replace the control point at `index`. The connection must exist; an
    /// out-of-range index is a tolerated no-op.
    pub fn update_control_point(
        &mut self,
        connection_id: &ConnectionId,
        index: usize,
        point: [f32; 2],
    ) -> Result<()> {
        let connection = self
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| GraphError::ConnectionNotFound(connection_id.clone()))?;
        if let Some(existing) = connection.control_points.get_mut(index) {
            *existing = point;
        }
        Ok(())
    }

    /// Remove the control point at `index`. The connection must exist; an
    /// out-of-range index is a tolerated no-op.
    pub fn remove_control_point(&mut self, connection_id: &ConnectionId, index: usize) -> Result<()> {
        let connection = self
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| GraphError::ConnectionNotFound(connection_id.clone()))?;
        if index < connection.control_points.len() {
            connection.control_points.remove(index);
        }
        Ok(())
    }

    // --- Batching and events -----------------------------------------------

    /// Run `f` as a batch: the outermost call emits exactly one
    /// `BatchStarted`/`BatchEnded` pair around the whole sequence. Nested
    /// calls only adjust the depth counter. `BatchEnded` is emitted even if
    /// `f` unwinds.
    pub fn batch<T>(&mut self, reason: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        struct Guard<'a>(&'a mut GraphStore);
        impl Drop for Guard<'_> {
            fn drop(&mut self) {
                self.0.end_batch();
            }
        }

        self.begin_batch(reason);
        let guard = Guard(self);
        f(guard.0)
    }

    fn begin_batch(&mut self, reason: &str) {
        self.batch_depth += 1;
        if self.batch_depth == 1 {
            self.batch_reason = reason.to_owned();
            debug!(reason, "batch started");
            self.events.emit(&GraphEvent::BatchStarted {
                reason: reason.to_owned(),
            });
        }
    }

    fn end_batch(&mut self) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth == 0 {
            let reason = std::mem::take(&mut self.batch_reason);
            debug!(reason, "batch ended");
            self.events.emit(&GraphEvent::BatchEnded { reason });
        }
    }

    /// Register a graph-event listener.
    pub fn subscribe(&mut self, listener: impl FnMut(&GraphEvent) + 'static) -> SubscriberId {
        self.events.subscribe(listener)
    }

    /// Remove a graph-event listener.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.events.unsubscribe(id)
    }

    // --- Bulk --------------------------------------------------------------

    /// Drop every node and connection and reset id counters. Listeners are
    /// kept; used when a document load replaces the graph wholesale.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.connections.clear();
        self.ids.reset();
        self.z_top = 0;
        self.z_bottom = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn two_node_graph() -> GraphStore {
        let mut store = GraphStore::new();
        store.add_node(
            Node::regular("node-a").with_output(Port::output("out", "Out")),
        );
        store.add_node(
            Node::regular("node-b").with_input(Port::input("in", "In")),
        );
        store
    }

    #[test]
    fn test_remove_node_cascades_connections() {
        let mut store = two_node_graph();
        store
            .create_connection(&"node-a".into(), &"out".into(), &"node-b".into(), &"in".into())
            .unwrap();
        assert_eq!(store.connection_count(), 1);

        store.remove_node(&"node-a".into());
        assert_eq!(store.connection_count(), 0);
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn test_remove_node_strips_group_membership() {
        let mut store = two_node_graph();
        let group = store.create_node(NodeKind::Group(crate::node::GroupData::default()));
        store.add_to_group(&group, &"node-a".into());
        assert_eq!(
            store.node(&group).unwrap().as_groupable().unwrap().members().len(),
            1
        );

        store.remove_node(&"node-a".into());
        assert!(store.node(&group).unwrap().as_groupable().unwrap().members().is_empty());
    }

    #[test]
    fn test_duplicate_node_derived_id_and_offset() {
        let mut store = two_node_graph();
        let copy = store.duplicate_node(&"node-a".into()).unwrap();
        assert_eq!(copy.as_str(), "node-a_copy_1");

        let original = store.node(&"node-a".into()).unwrap().position;
        let duplicated = store.node(&copy).unwrap().position;
        assert_eq!(duplicated, [original[0] + 50.0, original[1] + 50.0]);

        let second = store.duplicate_node(&"node-a".into()).unwrap();
        assert_eq!(second.as_str(), "node-a_copy_2");
    }

    #[test]
    fn test_duplicate_missing_node_is_noop() {
        let mut store = two_node_graph();
        assert!(store.duplicate_node(&"ghost".into()).is_none());
        assert_eq!(store.node_count(), 2);
    }

    #[test]
    fn test_remove_connection_missing_is_error() {
        let mut store = two_node_graph();
        assert!(matches!(
            store.remove_connection(&"ghost".into()),
            Err(GraphError::ConnectionNotFound(_))
        ));
    }

    #[test]
    fn test_soft_mutations_on_missing_node() {
        let mut store = two_node_graph();
        store.move_node(&"ghost".into(), [1.0, 1.0]);
        store.set_visible(&"ghost".into(), false);
        store.set_position(&"ghost".into(), [9.0, 9.0]);
        assert_eq!(store.node_count(), 2);
    }

    #[test]
    fn test_connection_direction_validation() {
        let mut store = two_node_graph();
        // Reversed endpoints: "in" is not an output.
        assert!(matches!(
            store.create_connection(&"node-b".into(), &"in".into(), &"node-a".into(), &"out".into()),
            Err(GraphError::DirectionMismatch { .. })
        ));
    }

    #[test]
    fn test_remove_port_cascades_connections() {
        let mut store = two_node_graph();
        store
            .create_connection(&"node-a".into(), &"out".into(), &"node-b".into(), &"in".into())
            .unwrap();

        store.remove_port(&"node-b".into(), &"in".into()).unwrap();
        assert_eq!(store.connection_count(), 0);
        assert!(matches!(
            store.remove_port(&"node-b".into(), &"in".into()),
            Err(GraphError::PortNotFound { .. })
        ));
    }

    #[test]
    fn test_control_point_policy() {
        let mut store = two_node_graph();
        let conn = store
            .create_connection(&"node-a".into(), &"out".into(), &"node-b".into(), &"in".into())
            .unwrap();

        store.add_control_point(&conn, [1.0, 2.0]).unwrap();
        // Out-of-range index: tolerated no-op.
        store.update_control_point(&conn, 99, [0.0, 0.0]).unwrap();
        store.remove_control_point(&conn, 99).unwrap();
        assert_eq!(store.connection(&conn).unwrap().control_points, vec![[1.0, 2.0]]);

        // Missing connection: hard failure.
        assert!(store.add_control_point(&"ghost".into(), [0.0, 0.0]).is_err());
    }

    #[test]
    fn test_nested_batch_single_pair() {
        let mut store = GraphStore::new();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        store.subscribe(move |event| {
            if matches!(event, GraphEvent::BatchStarted { .. } | GraphEvent::BatchEnded { .. }) {
                sink.borrow_mut().push(event.clone());
            }
        });

        store.batch("outer", |store| {
            store.create_node(NodeKind::Regular);
            store.batch("inner", |store| {
                store.create_node(NodeKind::Regular);
            });
        });

        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], GraphEvent::BatchStarted { reason } if reason == "outer"));
        assert!(matches!(&events[1], GraphEvent::BatchEnded { reason } if reason == "outer"));
    }

    #[test]
    fn test_batch_ended_emitted_on_unwind() {
        let store = Rc::new(RefCell::new(GraphStore::new()));
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        store.borrow_mut().subscribe(move |event| {
            if matches!(event, GraphEvent::BatchEnded { .. }) {
                sink.borrow_mut().push(event.clone());
            }
        });

        let panicking = Rc::clone(&store);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            panicking.borrow_mut().batch("doomed", |_| panic!("boom"));
        }));
        assert!(result.is_err());
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn test_bring_to_front_renumbers() {
        let mut store = two_node_graph();
        let z_b = store.node(&"node-b".into()).unwrap().z_index;
        store.bring_to_front(&"node-a".into());
        assert!(store.node(&"node-a".into()).unwrap().z_index > z_b);

        store.send_to_back(&"node-a".into());
        assert!(store.node(&"node-a".into()).unwrap().z_index < z_b);
    }

    #[test]
    fn test_prune_dangling_connections() {
        let mut store = two_node_graph();
        let conn = Connection::new(
            "conn-x".into(),
            "node-a".into(),
            "out".into(),
            "ghost".into(),
            "in".into(),
        );
        // Bypass validation to simulate a stale document.
        store.connections.insert(conn.id.clone(), conn);
        assert_eq!(store.prune_dangling_connections(), 1);
        assert_eq!(store.connection_count(), 0);
    }
}
