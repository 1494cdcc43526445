// SPDX-License-Identifier: MIT OR Apache-2.0
//! Selection bookkeeping for nodes and connections.
//!
//! Node selection and connection selection are mutually exclusive: making a
//! selection of one kind always empties the other. Every select-all /
//! invert / by-kind operation routes through the same replace-or-toggle
//! primitive so the exclusion law holds everywhere. Node `selected` flags in
//! the store are kept in sync as a convenience for renderers.

use nodeloom_graph::{ConnectionId, GraphStore, NodeId};
use std::collections::HashSet;

/// Tracks the current selection and mirrors it into node flags.
#[derive(Debug, Default)]
pub struct SelectionManager {
    nodes: HashSet<NodeId>,
    connections: HashSet<ConnectionId>,
}

impl SelectionManager {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected node ids.
    pub fn selected_nodes(&self) -> &HashSet<NodeId> {
        &self.nodes
    }

    /// Currently selected connection ids.
    pub fn selected_connections(&self) -> &HashSet<ConnectionId> {
        &self.connections
    }

    /// Whether a node is selected.
    pub fn is_node_selected(&self, id: &NodeId) -> bool {
        self.nodes.contains(id)
    }

    /// Whether a connection is selected.
    pub fn is_connection_selected(&self, id: &ConnectionId) -> bool {
        self.connections.contains(id)
    }

    /// Select a node. Non-toggle replaces the selection; toggle XORs
    /// membership. No-op for missing or unselectable nodes. Always clears
    /// connection selection.
    pub fn select_node(&mut self, store: &mut GraphStore, id: &NodeId, toggle: bool) {
        let selectable = store.node(id).is_some_and(|n| n.selectable);
        if !selectable {
            return;
        }
        self.clear_connections();
        if toggle {
            self.toggle_node(store, id);
        } else {
            self.replace_nodes(store, std::iter::once(id.clone()));
        }
    }

    /// Select a set of nodes through the replace-or-toggle primitive.
    /// Non-toggle replaces the whole node selection (an empty set empties
    /// it); toggle XORs each id.
    pub fn select_nodes<I>(&mut self, store: &mut GraphStore, ids: I, toggle: bool)
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.clear_connections();
        if toggle {
            for id in ids {
                if store.node(&id).is_some_and(|n| n.selectable) {
                    self.toggle_node(store, &id);
                }
            }
        } else {
            self.replace_nodes(store, ids);
        }
    }

    /// Select a connection. No-op on a missing id. Always clears node
    /// selection.
    pub fn select_connection(&mut self, store: &mut GraphStore, id: &ConnectionId, toggle: bool) {
        if store.connection(id).is_none() {
            return;
        }
        self.clear_nodes(store);
        if toggle {
            if !self.connections.remove(id) {
                self.connections.insert(id.clone());
            }
        } else {
            self.connections.clear();
            self.connections.insert(id.clone());
        }
    }

    /// Select every selectable node.
    pub fn select_all(&mut self, store: &mut GraphStore) {
        let all: Vec<NodeId> = store
            .nodes()
            .filter(|n| n.selectable)
            .map(|n| n.id.clone())
            .collect();
        self.select_nodes(store, all, false);
    }

    /// Invert the node selection over all selectable nodes.
    pub fn invert(&mut self, store: &mut GraphStore) {
        let inverted: Vec<NodeId> = store
            .nodes()
            .filter(|n| n.selectable && !self.nodes.contains(&n.id))
            .map(|n| n.id.clone())
            .collect();
        self.select_nodes(store, inverted, false);
    }

    /// Select every selectable node whose kind label matches (`"regular"`,
    /// `"group"`, `"comment"`).
    pub fn select_by_kind(&mut self, store: &mut GraphStore, kind: &str) {
        let matching: Vec<NodeId> = store
            .nodes()
            .filter(|n| n.selectable && n.kind.label() == kind)
            .map(|n| n.id.clone())
            .collect();
        self.select_nodes(store, matching, false);
    }

    /// Clear both selection kinds.
    pub fn clear(&mut self, store: &mut GraphStore) {
        self.clear_nodes(store);
        self.clear_connections();
    }

    /// Drop selected ids that no longer exist in the store.
    pub fn prune(&mut self, store: &GraphStore) {
        self.nodes.retain(|id| store.node(id).is_some());
        self.connections.retain(|id| store.connection(id).is_some());
    }

    /// Deselect a single connection, if selected.
    pub fn deselect_connection(&mut self, id: &ConnectionId) {
        self.connections.remove(id);
    }

    fn toggle_node(&mut self, store: &mut GraphStore, id: &NodeId) {
        if self.nodes.remove(id) {
            if let Some(node) = store.node_mut(id) {
                node.selected = false;
            }
        } else {
            self.nodes.insert(id.clone());
            if let Some(node) = store.node_mut(id) {
                node.selected = true;
            }
        }
    }

    fn replace_nodes(&mut self, store: &mut GraphStore, ids: impl IntoIterator<Item = NodeId>) {
        self.clear_nodes(store);
        for id in ids {
            if store.node(&id).is_some_and(|n| n.selectable) {
                if let Some(node) = store.node_mut(&id) {
                    node.selected = true;
                }
                self.nodes.insert(id);
            }
        }
    }

    fn clear_nodes(&mut self, store: &mut GraphStore) {
        for id in self.nodes.drain() {
            if let Some(node) = store.node_mut(&id) {
                node.selected = false;
            }
        }
    }

    fn clear_connections(&mut self) {
        self.connections.clear();
    }
}
