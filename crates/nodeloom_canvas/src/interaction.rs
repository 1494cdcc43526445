// SPDX-License-Identifier: MIT OR Apache-2.0
//! Interaction state machine: node drag, resize, connection drag, marquee.
//!
//! The machine tracks one gesture's transient state at a time but does not
//! enforce mutual exclusion between gestures; callers are responsible for
//! not starting a resize while a drag is active.
//! [`InteractionStateMachine::reset_state`] unconditionally clears every
//! transient field.

use crate::selection::SelectionManager;
use egui::{CursorIcon, Pos2, Rect, Vec2};
use nodeloom_graph::{ConnectionId, GraphStore, NodeId, PortDirection, PortId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Smallest node size a resize can produce.
const MIN_NODE_SIZE: Vec2 = Vec2::new(40.0, 30.0);

/// Resize handle identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    /// Top-left corner.
    TopLeft,
    /// Top edge.
    Top,
    /// Top-right corner.
    TopRight,
    /// Right edge.
    Right,
    /// Bottom-right corner.
    BottomRight,
    /// Bottom edge.
    Bottom,
    /// Bottom-left corner.
    BottomLeft,
    /// Left edge.
    Left,
}

impl ResizeHandle {
    /// Whether this is a corner handle (resizes both axes).
    pub fn is_corner(self) -> bool {
        matches!(self, Self::TopLeft | Self::TopRight | Self::BottomRight | Self::BottomLeft)
    }

    /// Cursor shown while this handle is active: diagonal for corners,
    /// axis-aligned for edges.
    pub fn cursor(self) -> CursorIcon {
        match self {
            Self::TopLeft | Self::BottomRight => CursorIcon::ResizeNwSe,
            Self::TopRight | Self::BottomLeft => CursorIcon::ResizeNeSw,
            Self::Top | Self::Bottom => CursorIcon::ResizeVertical,
            Self::Left | Self::Right => CursorIcon::ResizeHorizontal,
        }
    }
}

/// Strategy mapping a free position to a snapped one.
pub trait GridSnap {
    /// Snap `p` to the grid.
    fn snap(&self, p: Pos2) -> Pos2;
}

/// Snap to a uniform square grid.
#[derive(Debug, Clone, Copy)]
pub struct UniformGridSnap {
    /// Grid spacing in graph units.
    pub size: f32,
}

impl GridSnap for UniformGridSnap {
    fn snap(&self, p: Pos2) -> Pos2 {
        Pos2::new(
            (p.x / self.size).round() * self.size,
            (p.y / self.size).round() * self.size,
        )
    }
}

/// Ephemeral connection shown while dragging from a port.
#[derive(Debug, Clone)]
pub struct TempConnection {
    /// Point where the drag started, in graph space.
    pub start: Pos2,
    /// Node the drag started from.
    pub start_node: NodeId,
    /// Port the drag started from.
    pub start_port: PortId,
    /// Whether the drag started at an output port. Determines endpoint
    /// roles: from an output, start is the source; from an input, start is
    /// the target.
    pub from_output: bool,
    /// Current pointer position, in graph space.
    pub current: Pos2,
    /// Hovered candidate target, if any.
    pub hovered: Option<(NodeId, PortId)>,
}

/// Transient resize gesture state.
#[derive(Debug, Clone)]
pub struct ResizeState {
    /// Node being resized.
    pub node: NodeId,
    /// Active handle.
    pub handle: ResizeHandle,
    /// Pointer position when the gesture started.
    pub start_pointer: Pos2,
    /// Node bounds when the gesture started.
    pub original: Rect,
    /// Accumulated handle drift, used by callers to compensate when the
    /// pointer outruns a constrained resize.
    pub drift: Vec2,
}

/// All transient interaction fields. One active instance per session.
#[derive(Debug, Default)]
pub struct InteractionState {
    /// Node currently being dragged, if any.
    pub dragged_node: Option<NodeId>,
    /// Whether viewport panning is suppressed (held during resize).
    pub canvas_locked: bool,
    /// Marquee start point, if a box selection is active.
    pub selection_start: Option<Pos2>,
    /// Current marquee rectangle, if a box selection is active.
    pub selection_rect: Option<Rect>,
    /// Active resize gesture, if any.
    pub resize: Option<ResizeState>,
    /// Whether the pointer is interacting with the viewport itself.
    pub viewport_interacting: bool,
    /// Whether the pointer hovers a connection.
    pub hovering_connection: bool,
    /// Cursor override requested by the active gesture.
    pub cursor_override: Option<CursorIcon>,
    /// Last known pointer position, in graph space.
    pub last_pointer: Pos2,
    /// Active temporary connection, if a connection drag is underway.
    pub temp_connection: Option<TempConnection>,
    previously_intersecting: HashSet<NodeId>,
}

/// Drives interactive edits against the store and selection.
#[derive(Default)]
pub struct InteractionStateMachine {
    state: InteractionState,
    snap: Option<Box<dyn GridSnap>>,
    snap_enabled: bool,
}

impl InteractionStateMachine {
    /// Create an idle machine with no snap strategy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the transient state.
    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Install a grid-snap strategy.
    pub fn set_grid_snap(&mut self, snap: Option<Box<dyn GridSnap>>) {
        self.snap = snap;
    }

    /// Enable or disable snapping through the installed strategy.
    pub fn set_snap_enabled(&mut self, enabled: bool) {
        self.snap_enabled = enabled;
    }

    /// Record the pointer position.
    pub fn set_last_pointer(&mut self, p: Pos2) {
        self.state.last_pointer = p;
    }

    /// Flag that the pointer is manipulating the viewport.
    pub fn set_viewport_interacting(&mut self, interacting: bool) {
        self.state.viewport_interacting = interacting;
    }

    /// Flag that the pointer hovers a connection.
    pub fn set_hovering_connection(&mut self, hovering: bool) {
        self.state.hovering_connection = hovering;
    }

    /// Unconditionally clear every transient field, including dragging
    /// flags left on store nodes.
    pub fn reset_state(&mut self, store: &mut GraphStore) {
        let dragging: Vec<NodeId> = store
            .nodes()
            .filter(|n| n.dragging)
            .map(|n| n.id.clone())
            .collect();
        for id in dragging {
            if let Some(node) = store.node_mut(&id) {
                node.dragging = false;
            }
        }
        self.state = InteractionState::default();
    }

    // --- Node drag ---------------------------------------------------------

    /// Begin dragging a node: selects it if unselected, flags it (and every
    /// selected node, when the dragged node is selected) as dragging, and
    /// raises it to the front. Returns the original positions of all
    /// affected nodes, for cancellation.
    pub fn start_node_drag(
        &mut self,
        store: &mut GraphStore,
        selection: &mut SelectionManager,
        id: &NodeId,
    ) -> HashMap<NodeId, Pos2> {
        if store.node(id).is_none() {
            return HashMap::new();
        }
        if !selection.is_node_selected(id) {
            selection.select_node(store, id, false);
        }

        let affected: Vec<NodeId> = if selection.is_node_selected(id) {
            selection.selected_nodes().iter().cloned().collect()
        } else {
            // Unselectable node: it still drags alone.
            vec![id.clone()]
        };

        let mut originals = HashMap::new();
        for node_id in &affected {
            if let Some(node) = store.node_mut(node_id) {
                node.dragging = true;
                originals.insert(node_id.clone(), Pos2::new(node.position[0], node.position[1]));
            }
        }

        self.state.dragged_node = Some(id.clone());
        store.bring_to_front(id);
        debug!(node = %id, affected = affected.len(), "node drag started");
        originals
    }

    /// Apply a drag delta to every dragging node, through the snap strategy
    /// when enabled. No-op if nothing is dragging.
    pub fn move_node_drag(&mut self, store: &mut GraphStore, delta: Vec2) {
        let dragging: Vec<NodeId> = store
            .nodes()
            .filter(|n| n.dragging)
            .map(|n| n.id.clone())
            .collect();
        if dragging.is_empty() {
            return;
        }
        for id in dragging {
            let Some(node) = store.node(&id) else { continue };
            let mut target = Pos2::new(node.position[0] + delta.x, node.position[1] + delta.y);
            if self.snap_enabled {
                if let Some(snap) = &self.snap {
                    target = snap.snap(target);
                }
            }
            store.set_position(&id, [target.x, target.y]);
        }
    }

    /// Finish the drag, clearing dragging flags and the dragged-node id.
    pub fn end_node_drag(&mut self, store: &mut GraphStore) {
        self.clear_dragging(store);
        self.state.dragged_node = None;
    }

    /// Cancel the drag, restoring each affected node to its supplied
    /// original position. Nodes missing from the map keep their current
    /// position.
    pub fn cancel_node_drag(&mut self, store: &mut GraphStore, originals: &HashMap<NodeId, Pos2>) {
        let dragging: Vec<NodeId> = store
            .nodes()
            .filter(|n| n.dragging)
            .map(|n| n.id.clone())
            .collect();
        for id in dragging {
            if let Some(original) = originals.get(&id) {
                store.set_position(&id, [original.x, original.y]);
            }
        }
        self.clear_dragging(store);
        self.state.dragged_node = None;
    }

    fn clear_dragging(&mut self, store: &mut GraphStore) {
        let dragging: Vec<NodeId> = store
            .nodes()
            .filter(|n| n.dragging)
            .map(|n| n.id.clone())
            .collect();
        for id in dragging {
            if let Some(node) = store.node_mut(&id) {
                node.dragging = false;
            }
        }
    }

    // --- Resize ------------------------------------------------------------

    /// Begin resizing a node: records the handle and original bounds, sets
    /// a directional cursor, and locks the canvas against panning. No-op on
    /// a missing node.
    pub fn start_resize(
        &mut self,
        store: &GraphStore,
        id: &NodeId,
        handle: ResizeHandle,
        pointer: Pos2,
    ) {
        let Some(node) = store.node(id) else { return };
        self.state.resize = Some(ResizeState {
            node: id.clone(),
            handle,
            start_pointer: pointer,
            original: node.rect(),
            drift: Vec2::ZERO,
        });
        self.state.cursor_override = Some(handle.cursor());
        self.state.canvas_locked = true;
    }

    /// Accumulate handle drift. No-op when no resize is active.
    pub fn set_handle_drift(&mut self, delta: Vec2) {
        if let Some(resize) = &mut self.state.resize {
            resize.drift += delta;
        }
    }

    /// Recompute the node's bounds from the current pointer position and
    /// apply them, clamped to a minimum size. No-op when no resize is
    /// active.
    pub fn update_resize(&mut self, store: &mut GraphStore, pointer: Pos2) {
        let Some(resize) = &self.state.resize else { return };
        let delta = pointer - resize.start_pointer;
        let mut rect = resize.original;

        match resize.handle {
            ResizeHandle::TopLeft => {
                rect.min += delta;
            }
            ResizeHandle::Top => {
                rect.min.y += delta.y;
            }
            ResizeHandle::TopRight => {
                rect.min.y += delta.y;
                rect.max.x += delta.x;
            }
            ResizeHandle::Right => {
                rect.max.x += delta.x;
            }
            ResizeHandle::BottomRight => {
                rect.max += delta;
            }
            ResizeHandle::Bottom => {
                rect.max.y += delta.y;
            }
            ResizeHandle::BottomLeft => {
                rect.min.x += delta.x;
                rect.max.y += delta.y;
            }
            ResizeHandle::Left => {
                rect.min.x += delta.x;
            }
        }

        // Clamp to the minimum size by moving the edge being dragged.
        if rect.width() < MIN_NODE_SIZE.x {
            match resize.handle {
                ResizeHandle::TopLeft | ResizeHandle::BottomLeft | ResizeHandle::Left => {
                    rect.min.x = rect.max.x - MIN_NODE_SIZE.x;
                }
                _ => rect.max.x = rect.min.x + MIN_NODE_SIZE.x,
            }
        }
        if rect.height() < MIN_NODE_SIZE.y {
            match resize.handle {
                ResizeHandle::TopLeft | ResizeHandle::Top | ResizeHandle::TopRight => {
                    rect.min.y = rect.max.y - MIN_NODE_SIZE.y;
                }
                _ => rect.max.y = rect.min.y + MIN_NODE_SIZE.y,
            }
        }

        let node = resize.node.clone();
        store.set_position(&node, [rect.min.x, rect.min.y]);
        store.set_size(&node, [rect.width(), rect.height()]);
    }

    /// Finish the resize: clears resize state, unlocks the canvas and
    /// removes the cursor override.
    pub fn end_resize(&mut self) {
        self.state.resize = None;
        self.state.canvas_locked = false;
        self.state.cursor_override = None;
    }

    // --- Connection drag ---------------------------------------------------

    /// Begin a connection drag from a port. No-op if the node or port does
    /// not exist.
    pub fn start_connection_drag(
        &mut self,
        store: &GraphStore,
        node_id: &NodeId,
        port_id: &PortId,
        start: Pos2,
    ) {
        let Some(direction) = store
            .node(node_id)
            .and_then(|n| n.port(port_id))
            .map(|p| p.direction)
        else {
            return;
        };
        self.state.temp_connection = Some(TempConnection {
            start,
            start_node: node_id.clone(),
            start_port: port_id.clone(),
            from_output: direction == PortDirection::Output,
            current: start,
            hovered: None,
        });
    }

    /// Update the temporary connection's pointer position and hovered
    /// target. No-op when no drag is active.
    pub fn update_connection_drag(&mut self, current: Pos2, hovered: Option<(NodeId, PortId)>) {
        if let Some(temp) = &mut self.state.temp_connection {
            temp.current = current;
            temp.hovered = hovered;
        }
    }

    /// Try to complete the connection drag against the hovered target.
    ///
    /// Endpoint roles follow the drag origin: from an output port the start
    /// is the source and the target port the destination; from an input
    /// port the roles are reversed. Returns `None` if no drag is active or
    /// the target is missing/invalid; on success the temporary connection
    /// is cleared.
    pub fn complete_connection_drag(&mut self, store: &mut GraphStore) -> Option<ConnectionId> {
        let temp = self.state.temp_connection.as_ref()?;
        let (target_node, target_port) = temp.hovered.clone()?;
        let start_node = temp.start_node.clone();
        let start_port = temp.start_port.clone();

        let result = if temp.from_output {
            store.create_connection(&start_node, &start_port, &target_node, &target_port)
        } else {
            store.create_connection(&target_node, &target_port, &start_node, &start_port)
        };

        match result {
            Ok(id) => {
                self.state.temp_connection = None;
                Some(id)
            }
            Err(error) => {
                debug!(%error, "connection drag completion rejected");
                None
            }
        }
    }

    /// Abandon the connection drag.
    pub fn cancel_connection_drag(&mut self) {
        self.state.temp_connection = None;
    }

    // --- Box selection -----------------------------------------------------

    /// Update the marquee and the selection it implies.
    ///
    /// Non-toggle mode replaces the node selection with `intersecting` (an
    /// empty set empties the selection). Toggle mode XORs membership
    /// against the selection as of the previous update: only ids entering
    /// or leaving the marquee since the last call are toggled, so a node
    /// that leaves the marquee mid-drag is toggled back.
    pub fn update_selection(
        &mut self,
        store: &mut GraphStore,
        selection: &mut SelectionManager,
        start: Option<Pos2>,
        rect: Option<Rect>,
        intersecting: &[NodeId],
        toggle: bool,
    ) {
        if let Some(start) = start {
            self.state.selection_start = Some(start);
        }
        if let Some(rect) = rect {
            self.state.selection_rect = Some(rect);
        }

        let current: HashSet<NodeId> = intersecting.iter().cloned().collect();
        if toggle {
            let changed: Vec<NodeId> = current
                .symmetric_difference(&self.state.previously_intersecting)
                .cloned()
                .collect();
            selection.select_nodes(store, changed, true);
        } else {
            selection.select_nodes(store, intersecting.to_vec(), false);
        }
        self.state.previously_intersecting = current;
    }

    /// Finish the box selection, clearing the marquee and intersection
    /// tracking.
    pub fn finish_selection(&mut self) {
        self.state.selection_rect = None;
        self.state.selection_start = None;
        self.state.previously_intersecting.clear();
    }
}

impl std::fmt::Debug for InteractionStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionStateMachine")
            .field("state", &self.state)
            .field("snap_enabled", &self.snap_enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeloom_graph::{Node, Port};

    fn setup() -> (GraphStore, SelectionManager, InteractionStateMachine) {
        let mut store = GraphStore::new();
        store.add_node(
            Node::regular("a")
                .with_position(0.0, 0.0)
                .with_output(Port::output("out", "Out")),
        );
        store.add_node(
            Node::regular("b")
                .with_position(200.0, 0.0)
                .with_input(Port::input("in", "In")),
        );
        store.add_node(Node::regular("c").with_position(400.0, 0.0));
        (store, SelectionManager::new(), InteractionStateMachine::new())
    }

    #[test]
    fn test_start_drag_selects_and_flags() {
        let (mut store, mut selection, mut machine) = setup();
        machine.start_node_drag(&mut store, &mut selection, &"a".into());

        assert!(selection.is_node_selected(&"a".into()));
        assert!(store.node(&"a".into()).unwrap().dragging);
        assert_eq!(machine.state().dragged_node, Some("a".into()));
    }

    #[test]
    fn test_drag_moves_all_selected() {
        let (mut store, mut selection, mut machine) = setup();
        selection.select_node(&mut store, &"a".into(), false);
        selection.select_node(&mut store, &"b".into(), true);
        machine.start_node_drag(&mut store, &mut selection, &"a".into());
        machine.move_node_drag(&mut store, Vec2::new(10.0, 5.0));

        assert_eq!(store.node(&"a".into()).unwrap().position, [10.0, 5.0]);
        assert_eq!(store.node(&"b".into()).unwrap().position, [210.0, 5.0]);
        assert_eq!(store.node(&"c".into()).unwrap().position, [400.0, 0.0]);
    }

    #[test]
    fn test_move_without_drag_is_noop() {
        let (mut store, _, mut machine) = setup();
        machine.move_node_drag(&mut store, Vec2::new(10.0, 10.0));
        assert_eq!(store.node(&"a".into()).unwrap().position, [0.0, 0.0]);
    }

    #[test]
    fn test_cancel_restores_positions() {
        let (mut store, mut selection, mut machine) = setup();
        let originals = machine.start_node_drag(&mut store, &mut selection, &"a".into());
        machine.move_node_drag(&mut store, Vec2::new(50.0, 50.0));
        machine.cancel_node_drag(&mut store, &originals);

        assert_eq!(store.node(&"a".into()).unwrap().position, [0.0, 0.0]);
        assert!(!store.node(&"a".into()).unwrap().dragging);
        assert!(machine.state().dragged_node.is_none());
    }

    #[test]
    fn test_snap_applies_during_drag() {
        let (mut store, mut selection, mut machine) = setup();
        machine.set_grid_snap(Some(Box::new(UniformGridSnap { size: 20.0 })));
        machine.set_snap_enabled(true);
        machine.start_node_drag(&mut store, &mut selection, &"a".into());
        machine.move_node_drag(&mut store, Vec2::new(13.0, 27.0));

        assert_eq!(store.node(&"a".into()).unwrap().position, [20.0, 20.0]);
    }

    #[test]
    fn test_resize_locks_canvas_and_sets_cursor() {
        let (store, _, mut machine) = setup();
        machine.start_resize(&store, &"a".into(), ResizeHandle::BottomRight, Pos2::ZERO);

        assert!(machine.state().canvas_locked);
        assert_eq!(machine.state().cursor_override, Some(CursorIcon::ResizeNwSe));

        machine.set_handle_drift(Vec2::new(3.0, 4.0));
        assert_eq!(machine.state().resize.as_ref().unwrap().drift, Vec2::new(3.0, 4.0));

        machine.end_resize();
        assert!(!machine.state().canvas_locked);
        assert!(machine.state().cursor_override.is_none());
        assert!(machine.state().resize.is_none());
    }

    #[test]
    fn test_update_resize_applies_bounds() {
        let (mut store, _, mut machine) = setup();
        machine.start_resize(&store, &"a".into(), ResizeHandle::BottomRight, Pos2::new(180.0, 100.0));
        machine.update_resize(&mut store, Pos2::new(200.0, 130.0));

        let node = store.node(&"a".into()).unwrap();
        assert_eq!(node.position, [0.0, 0.0]);
        assert_eq!(node.size, [200.0, 130.0]);
    }

    #[test]
    fn test_resize_clamps_to_minimum() {
        let (mut store, _, mut machine) = setup();
        machine.start_resize(&store, &"a".into(), ResizeHandle::Right, Pos2::new(180.0, 0.0));
        machine.update_resize(&mut store, Pos2::new(-500.0, 0.0));

        assert_eq!(store.node(&"a".into()).unwrap().size[0], MIN_NODE_SIZE.x);
    }

    #[test]
    fn test_connection_drag_from_output() {
        let (mut store, _, mut machine) = setup();
        machine.start_connection_drag(&store, &"a".into(), &"out".into(), Pos2::ZERO);
        machine.update_connection_drag(Pos2::new(100.0, 0.0), Some(("b".into(), "in".into())));
        let conn = machine.complete_connection_drag(&mut store).unwrap();

        let connection = store.connection(&conn).unwrap();
        assert_eq!(connection.from_node, "a".into());
        assert_eq!(connection.to_node, "b".into());
        assert!(machine.state().temp_connection.is_none());
    }

    #[test]
    fn test_connection_drag_from_input_reverses_roles() {
        let (mut store, _, mut machine) = setup();
        machine.start_connection_drag(&store, &"b".into(), &"in".into(), Pos2::ZERO);
        machine.update_connection_drag(Pos2::ZERO, Some(("a".into(), "out".into())));
        let conn = machine.complete_connection_drag(&mut store).unwrap();

        let connection = store.connection(&conn).unwrap();
        assert_eq!(connection.from_node, "a".into());
        assert_eq!(connection.to_node, "b".into());
    }

    #[test]
    fn test_complete_without_target_returns_none() {
        let (mut store, _, mut machine) = setup();
        assert!(machine.complete_connection_drag(&mut store).is_none());

        machine.start_connection_drag(&store, &"a".into(), &"out".into(), Pos2::ZERO);
        machine.update_connection_drag(Pos2::ZERO, Some(("ghost".into(), "in".into())));
        assert!(machine.complete_connection_drag(&mut store).is_none());
        assert_eq!(store.connection_count(), 0);
    }

    #[test]
    fn test_marquee_replace_mode() {
        let (mut store, mut selection, mut machine) = setup();
        machine.update_selection(&mut store, &mut selection, None, None, &["a".into(), "b".into()], false);
        assert_eq!(selection.selected_nodes().len(), 2);

        machine.update_selection(&mut store, &mut selection, None, None, &[], false);
        assert!(selection.selected_nodes().is_empty());
    }

    #[test]
    fn test_marquee_toggle_xors_against_previous() {
        let (mut store, mut selection, mut machine) = setup();
        // "a" selected before the marquee starts.
        selection.select_node(&mut store, &"a".into(), false);

        // Marquee covers a and b: a toggles off, b toggles on.
        machine.update_selection(&mut store, &mut selection, None, None, &["a".into(), "b".into()], true);
        assert!(!selection.is_node_selected(&"a".into()));
        assert!(selection.is_node_selected(&"b".into()));

        // b leaves the marquee: toggled back off. a stays untouched.
        machine.update_selection(&mut store, &mut selection, None, None, &["a".into()], true);
        assert!(!selection.is_node_selected(&"b".into()));
        assert!(!selection.is_node_selected(&"a".into()));

        machine.finish_selection();
        assert!(machine.state().selection_rect.is_none());
    }

    #[test]
    fn test_reset_state_clears_everything() {
        let (mut store, mut selection, mut machine) = setup();
        machine.start_node_drag(&mut store, &mut selection, &"a".into());
        machine.start_resize(&store, &"b".into(), ResizeHandle::Left, Pos2::ZERO);
        machine.start_connection_drag(&store, &"a".into(), &"out".into(), Pos2::ZERO);

        machine.reset_state(&mut store);
        assert!(machine.state().dragged_node.is_none());
        assert!(machine.state().resize.is_none());
        assert!(machine.state().temp_connection.is_none());
        assert!(!machine.state().canvas_locked);
        assert!(!store.node(&"a".into()).unwrap().dragging);
    }
}
