// SPDX-License-Identifier: MIT OR Apache-2.0
//! The editing session facade.
//!
//! A [`GraphController`] owns one graph plus every piece of session state:
//! selection, viewport, spatial index, interaction machine and auto-pan.
//! Hosts drive it from their input adapter and read it from their renderer;
//! all mutation goes through these methods so the cross-component cascades
//! (selection pruning, auto-pan freezing, index rebuilds) happen in one
//! place.

use crate::autopan::{AutoPanConfig, AutoPanner};
use crate::document::GraphDocument;
use crate::interaction::{InteractionState, InteractionStateMachine, ResizeHandle};
use crate::selection::SelectionManager;
use crate::spatial::SpatialIndex;
use crate::viewport::{Viewport, ViewportConfig, ViewportTransform};
use crate::CanvasError;
use egui::{Pos2, Rect, Vec2};
use nodeloom_graph::{
    algorithms, Connection, ConnectionId, GraphError, GraphStore, Node, NodeId, NodeKind, Port,
    PortId,
};
use std::collections::HashMap;
use tracing::debug;

/// One editing session: graph, selection, viewport and gesture state.
#[derive(Debug, Default)]
pub struct GraphController {
    store: GraphStore,
    selection: SelectionManager,
    interaction: InteractionStateMachine,
    viewport: ViewportTransform,
    spatial: SpatialIndex,
    autopan: AutoPanner,
}

impl GraphController {
    /// Create a session with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with explicit viewport and auto-pan configuration.
    pub fn with_config(viewport: ViewportConfig, autopan: AutoPanConfig) -> Self {
        Self {
            store: GraphStore::new(),
            selection: SelectionManager::new(),
            interaction: InteractionStateMachine::new(),
            viewport: ViewportTransform::new(viewport),
            spatial: SpatialIndex::default(),
            autopan: AutoPanner::new(autopan),
        }
    }

    // --- Component access --------------------------------------------------

    /// The graph store.
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Mutable graph store, for mutations without a dedicated facade
    /// method. Rebuild the spatial index after structural changes.
    pub fn store_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }

    /// The selection manager.
    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    /// The viewport transform.
    pub fn viewport(&self) -> &ViewportTransform {
        &self.viewport
    }

    /// Mutable viewport transform.
    pub fn viewport_mut(&mut self) -> &mut ViewportTransform {
        &mut self.viewport
    }

    /// The spatial index.
    pub fn spatial(&self) -> &SpatialIndex {
        &self.spatial
    }

    /// Mutable spatial index, for strategy replacement.
    pub fn spatial_mut(&mut self) -> &mut SpatialIndex {
        &mut self.spatial
    }

    /// The auto-panner.
    pub fn autopan(&self) -> &AutoPanner {
        &self.autopan
    }

    /// Transient interaction state.
    pub fn interaction_state(&self) -> &InteractionState {
        self.interaction.state()
    }

    /// The interaction state machine, for strategy installation.
    pub fn interaction_mut(&mut self) -> &mut InteractionStateMachine {
        &mut self.interaction
    }

    /// Rebuild the spatial index from the current graph.
    pub fn rebuild_spatial(&mut self) {
        self.spatial.rebuild(&self.store);
    }

    // --- Node and connection CRUD ------------------------------------------

    /// Create a node of the given kind with a generated id.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        self.store.create_node(kind)
    }

    /// Insert a pre-built node.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.store.add_node(node)
    }

    /// Remove a node with all cascades, including selection.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        let removed = self.store.remove_node(id);
        if removed.is_some() {
            self.selection.prune(&self.store);
        }
        removed
    }

    /// Duplicate a node. No-op on a missing id.
    pub fn duplicate_node(&mut self, id: &NodeId) -> Option<NodeId> {
        self.store.duplicate_node(id)
    }

    /// Look up a node.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.store.node(id)
    }

    /// Create a connection between two ports.
    pub fn create_connection(
        &mut self,
        from_node: &NodeId,
        from_port: &PortId,
        to_node: &NodeId,
        to_port: &PortId,
    ) -> Result<ConnectionId, GraphError> {
        self.store
            .create_connection(from_node, from_port, to_node, to_port)
    }

    /// Remove a connection; the id must exist. Drops it from the
    /// connection selection as well.
    pub fn remove_connection(&mut self, id: &ConnectionId) -> Result<Connection, GraphError> {
        let removed = self.store.remove_connection(id)?;
        self.selection.deselect_connection(id);
        Ok(removed)
    }

    /// Look up a connection.
    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.store.connection(id)
    }

    /// Add a port to a node. No-op on a missing node.
    pub fn add_port(&mut self, node_id: &NodeId, port: Port) {
        self.store.add_port(node_id, port);
    }

    /// Remove a port, cascading to its connections.
    pub fn remove_port(&mut self, node_id: &NodeId, port_id: &PortId) -> Result<Port, GraphError> {
        let port = self.store.remove_port(node_id, port_id)?;
        self.selection.prune(&self.store);
        Ok(port)
    }

    /// Toggle node visibility. No-op on a missing id.
    pub fn set_visible(&mut self, id: &NodeId, visible: bool) {
        self.store.set_visible(id, visible);
    }

    /// Run a mutation sequence as a single batch.
    pub fn batch<T>(&mut self, reason: &str, f: impl FnOnce(&mut GraphStore) -> T) -> T {
        self.store.batch(reason, f)
    }

    // --- Selection ---------------------------------------------------------

    /// Select a node (replace or toggle).
    pub fn select_node(&mut self, id: &NodeId, toggle: bool) {
        self.selection.select_node(&mut self.store, id, toggle);
    }

    /// Select a connection (replace or toggle).
    pub fn select_connection(&mut self, id: &ConnectionId, toggle: bool) {
        self.selection.select_connection(&mut self.store, id, toggle);
    }

    /// Select every selectable node.
    pub fn select_all(&mut self) {
        self.selection.select_all(&mut self.store);
    }

    /// Invert the node selection.
    pub fn invert_selection(&mut self) {
        self.selection.invert(&mut self.store);
    }

    /// Select nodes by kind label.
    pub fn select_by_kind(&mut self, kind: &str) {
        self.selection.select_by_kind(&mut self.store, kind);
    }

    /// Clear both selection kinds.
    pub fn clear_selection(&mut self) {
        self.selection.clear(&mut self.store);
    }

    /// Delete every selected node and connection in one batch.
    pub fn delete_selected(&mut self) {
        let nodes: Vec<NodeId> = self.selection.selected_nodes().iter().cloned().collect();
        let connections: Vec<ConnectionId> =
            self.selection.selected_connections().iter().cloned().collect();
        self.store.batch("delete selection", |store| {
            for id in &connections {
                // Best effort: a node removal above may have cascaded it.
                let _ = store.remove_connection(id);
            }
            for id in &nodes {
                store.remove_node(id);
            }
        });
        self.selection.prune(&self.store);
    }

    // --- Viewport ----------------------------------------------------------

    /// Current viewport value.
    pub fn viewport_value(&self) -> Viewport {
        self.viewport.viewport()
    }

    /// Fit the given nodes into view. Missing ids are skipped; a no-op if
    /// nothing remains or the screen size is unset.
    pub fn fit_to_view<'a>(&mut self, ids: impl IntoIterator<Item = &'a NodeId>, padding: f32) {
        let rects: Vec<Rect> = ids
            .into_iter()
            .filter_map(|id| self.store.node(id))
            .map(Node::rect)
            .collect();
        if rects.is_empty() {
            return;
        }
        let bounds = algorithms::nodes_bounds(rects);
        self.viewport.fit_to_view(bounds, padding);
    }

    /// Fit the whole graph into view.
    pub fn fit_all(&mut self, padding: f32) {
        if self.store.node_count() == 0 {
            return;
        }
        let bounds = algorithms::graph_bounds(&self.store);
        self.viewport.fit_to_view(bounds, padding);
    }

    /// Center a node in view, keeping zoom. No-op on a missing id.
    pub fn center_on_node(&mut self, id: &NodeId) {
        if let Some(center) = self.store.node(id).map(Node::center) {
            self.viewport.center_on(center);
        }
    }

    /// Center a node at an explicit zoom, immediately.
    pub fn center_on_node_with_zoom(&mut self, id: &NodeId, zoom: f32) {
        if let Some(center) = self.store.node(id).map(Node::center) {
            self.viewport.center_on_with_zoom(center, zoom);
        }
    }

    /// Animated variant of [`center_on_node`](Self::center_on_node).
    pub fn animate_to_node(&mut self, id: &NodeId) {
        if let Some(center) = self.store.node(id).map(Node::center) {
            self.viewport.animate_to_center(center);
        }
    }

    // --- Gestures ----------------------------------------------------------

    /// Begin dragging a node; starts auto-pan. Returns original positions
    /// for cancellation.
    pub fn start_node_drag(&mut self, id: &NodeId) -> HashMap<NodeId, Pos2> {
        self.autopan.start();
        self.interaction
            .start_node_drag(&mut self.store, &mut self.selection, id)
    }

    /// Apply a drag delta, gated through the auto-pan freeze law.
    pub fn move_node_drag(&mut self, delta: Vec2) {
        let effective = self.autopan.filter_drag_delta(delta);
        if effective != Vec2::ZERO {
            self.interaction.move_node_drag(&mut self.store, effective);
        }
    }

    /// Finish the node drag; stops auto-pan.
    pub fn end_node_drag(&mut self) {
        self.interaction.end_node_drag(&mut self.store);
        self.autopan.stop();
    }

    /// Cancel the node drag, restoring supplied positions; stops auto-pan.
    pub fn cancel_node_drag(&mut self, originals: &HashMap<NodeId, Pos2>) {
        self.interaction.cancel_node_drag(&mut self.store, originals);
        self.autopan.stop();
    }

    /// One auto-pan timer tick: pans the viewport toward the pointer and
    /// returns the applied delta.
    pub fn auto_pan_tick(&mut self, pointer: Pos2, bounds: Rect) -> Vec2 {
        let delta = self.autopan.tick(pointer, bounds);
        if delta != Vec2::ZERO {
            self.viewport.pan_by(delta);
        }
        delta
    }

    /// Stop auto-panning explicitly.
    pub fn stop_auto_pan(&mut self) {
        self.autopan.stop();
    }

    /// Begin resizing a node.
    pub fn start_resize(&mut self, id: &NodeId, handle: ResizeHandle, pointer: Pos2) {
        self.interaction.start_resize(&self.store, id, handle, pointer);
    }

    /// Apply the pointer position to the active resize.
    pub fn update_resize(&mut self, pointer: Pos2) {
        self.interaction.update_resize(&mut self.store, pointer);
    }

    /// Accumulate resize handle drift.
    pub fn set_handle_drift(&mut self, delta: Vec2) {
        self.interaction.set_handle_drift(delta);
    }

    /// Finish the resize.
    pub fn end_resize(&mut self) {
        self.interaction.end_resize();
    }

    /// Begin a connection drag from a port.
    pub fn start_connection_drag(&mut self, node_id: &NodeId, port_id: &PortId, start: Pos2) {
        self.interaction
            .start_connection_drag(&self.store, node_id, port_id, start);
    }

    /// Update the connection drag, resolving the hovered port through the
    /// spatial index.
    pub fn update_connection_drag(&mut self, current: Pos2) {
        let hovered = self.spatial.port_at(current);
        self.interaction.update_connection_drag(current, hovered);
    }

    /// Complete the connection drag against the hovered target.
    pub fn complete_connection_drag(&mut self) -> Option<ConnectionId> {
        self.interaction.complete_connection_drag(&mut self.store)
    }

    /// Abandon the connection drag.
    pub fn cancel_connection_drag(&mut self) {
        self.interaction.cancel_connection_drag();
    }

    /// Update a marquee selection, resolving intersecting nodes through the
    /// spatial index.
    pub fn update_marquee(&mut self, start: Option<Pos2>, rect: Rect, toggle: bool) {
        let intersecting = self.spatial.nodes_in(rect);
        self.interaction.update_selection(
            &mut self.store,
            &mut self.selection,
            start,
            Some(rect),
            &intersecting,
            toggle,
        );
    }

    /// Finish the marquee selection.
    pub fn finish_marquee(&mut self) {
        self.interaction.finish_selection();
    }

    /// Clear every transient gesture field.
    pub fn reset_state(&mut self) {
        self.interaction.reset_state(&mut self.store);
        self.autopan.stop();
    }

    // --- Queries -----------------------------------------------------------

    /// Whether the connection set induces any cycle.
    pub fn has_cycles(&self) -> bool {
        algorithms::has_cycles(&self.store)
    }

    /// All cycles in the connection set.
    pub fn get_cycles(&self) -> Vec<Vec<NodeId>> {
        algorithms::get_cycles(&self.store)
    }

    /// Nodes with no incident connections.
    pub fn orphan_nodes(&self) -> Vec<NodeId> {
        algorithms::orphan_nodes(&self.store)
    }

    /// Union bounds of every node rectangle.
    pub fn graph_bounds(&self) -> Rect {
        algorithms::graph_bounds(&self.store)
    }

    // --- Interchange -------------------------------------------------------

    /// Snapshot the session into a document.
    pub fn export_document(&self) -> GraphDocument {
        GraphDocument::from_store(&self.store, self.viewport.viewport())
    }

    /// Serialize the session to JSON.
    pub fn export_json(&self) -> Result<String, CanvasError> {
        Ok(self.export_document().to_json()?)
    }

    /// Replace the whole graph, selection and viewport with a document's
    /// contents. Dangling connections are pruned, gestures are reset and
    /// the spatial index is rebuilt.
    pub fn load_document(&mut self, document: GraphDocument) {
        self.store.clear();
        for mut node in document.nodes {
            node.selected = false;
            node.dragging = false;
            self.store.add_node(node);
        }
        let mut skipped = 0;
        for connection in document.connections {
            if self.store.add_connection(connection).is_err() {
                skipped += 1;
            }
        }
        if skipped > 0 {
            tracing::warn!(skipped, "dropped dangling connections on load");
        }
        self.selection.prune(&self.store);
        self.interaction.reset_state(&mut self.store);
        self.autopan.stop();
        self.viewport.set_viewport(document.viewport);
        self.spatial.rebuild(&self.store);
        debug!(
            nodes = self.store.node_count(),
            connections = self.store.connection_count(),
            "document loaded"
        );
    }

    /// Load a session from JSON.
    pub fn load_json(&mut self, json: &str) -> Result<(), CanvasError> {
        let document = GraphDocument::from_json(json)?;
        self.load_document(document);
        Ok(())
    }
}
