// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph engine.
//!
//! Node specialization (group, comment) is a tagged variant on [`NodeKind`]
//! rather than a class hierarchy, so generic graph code can match on kind.
//! Group membership bookkeeping is exposed through the [`Groupable`]
//! capability trait, queried via [`Node::as_groupable`].

use crate::port::{Port, PortDirection, PortId};
use egui::{Pos2, Rect, Vec2};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default node size used when the host supplies none.
pub const DEFAULT_NODE_SIZE: [f32; 2] = [180.0, 100.0];

/// Unique identifier for a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a node id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// How a group determines which nodes belong to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupBehavior {
    /// Members are whatever lies inside the group's bounds.
    Bounds,
    /// Members are exactly the explicit member set.
    Explicit,
    /// Members are the group's children in a host-defined hierarchy.
    Parent,
}

/// Group-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupData {
    /// Membership behavior.
    pub behavior: GroupBehavior,
    /// Member node ids. Only ids of live nodes are retained.
    #[serde(default)]
    pub members: IndexSet<NodeId>,
    /// Padding insets (left, top, right, bottom) around member bounds.
    #[serde(default)]
    pub padding: [f32; 4],
}

impl Default for GroupData {
    fn default() -> Self {
        Self {
            behavior: GroupBehavior::Explicit,
            members: IndexSet::new(),
            padding: [16.0; 4],
        }
    }
}

/// Comment-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentData {
    /// Text body.
    pub text: String,
    /// Font size in graph units.
    pub font_size: f32,
    /// Optional RGB text color.
    pub color: Option<[u8; 3]>,
}

impl Default for CommentData {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 14.0,
            color: None,
        }
    }
}

/// Node kind, with kind-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    /// A plain node.
    Regular,
    /// A group node that tracks member nodes.
    Group(GroupData),
    /// A comment node carrying a text body.
    Comment(CommentData),
}

impl NodeKind {
    /// Short label for logging and kind-based selection.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Group(_) => "group",
            Self::Comment(_) => "comment",
        }
    }
}

/// Capability for node variants that track group membership.
pub trait Groupable {
    /// The current member set.
    fn members(&self) -> &IndexSet<NodeId>;
    /// Add a member id. Returns false if it was already present.
    fn add_member(&mut self, id: NodeId) -> bool;
    /// Remove a member id. Returns true if it was present.
    fn remove_member(&mut self, id: &NodeId) -> bool;
}

impl Groupable for GroupData {
    fn members(&self) -> &IndexSet<NodeId> {
        &self.members
    }

    fn add_member(&mut self, id: NodeId) -> bool {
        self.members.insert(id)
    }

    fn remove_member(&mut self, id: &NodeId) -> bool {
        self.members.shift_remove(id)
    }
}

/// A positioned, sized graph vertex with ports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique node id.
    pub id: NodeId,
    /// Node kind and kind-specific payload.
    pub kind: NodeKind,
    /// Position in graph space (top-left corner).
    pub position: [f32; 2],
    /// Size in graph space.
    pub size: [f32; 2],
    /// Render order; higher values draw in front.
    pub z_index: i32,
    /// Whether the node is visible.
    pub visible: bool,
    /// Whether the node can be selected.
    pub selectable: bool,
    /// Whether the node is currently selected.
    #[serde(default)]
    pub selected: bool,
    /// Whether the node is currently being dragged. Transient.
    #[serde(skip)]
    pub dragging: bool,
    /// Input ports.
    #[serde(default)]
    pub inputs: Vec<Port>,
    /// Output ports.
    #[serde(default)]
    pub outputs: Vec<Port>,
    /// Opaque host payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Node {
    /// Create a new node of the given kind.
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            position: [0.0, 0.0],
            size: DEFAULT_NODE_SIZE,
            z_index: 0,
            visible: true,
            selectable: true,
            selected: false,
            dragging: false,
            inputs: Vec::new(),
            outputs: Vec::new(),
            payload: serde_json::Value::Null,
        }
    }

    /// Create a regular node.
    pub fn regular(id: impl Into<NodeId>) -> Self {
        Self::new(id, NodeKind::Regular)
    }

    /// Set the position.
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Set the size.
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = [width, height];
        self
    }

    /// Add an input port.
    pub fn with_input(mut self, port: Port) -> Self {
        debug_assert_eq!(port.direction, PortDirection::Input);
        self.inputs.push(port);
        self
    }

    /// Add an output port.
    pub fn with_output(mut self, port: Port) -> Self {
        debug_assert_eq!(port.direction, PortDirection::Output);
        self.outputs.push(port);
        self
    }

    /// Bounding rectangle in graph space.
    pub fn rect(&self) -> Rect {
        Rect::from_min_size(
            Pos2::new(self.position[0], self.position[1]),
            Vec2::new(self.size[0], self.size[1]),
        )
    }

    /// Center point in graph space.
    pub fn center(&self) -> Pos2 {
        self.rect().center()
    }

    /// Look up a port by id across inputs and outputs.
    pub fn port(&self, port_id: &PortId) -> Option<&Port> {
        self.inputs
            .iter()
            .find(|p| p.id == *port_id)
            .or_else(|| self.outputs.iter().find(|p| p.id == *port_id))
    }

    /// Iterate over all ports, inputs first.
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Group-membership capability, present on group nodes only.
    pub fn as_groupable(&self) -> Option<&dyn Groupable> {
        match &self.kind {
            NodeKind::Group(data) => Some(data),
            _ => None,
        }
    }

    /// Mutable group-membership capability.
    pub fn as_groupable_mut(&mut self) -> Option<&mut dyn Groupable> {
        match &mut self.kind {
            NodeKind::Group(data) => Some(data),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_from_position_and_size() {
        let node = Node::regular("a").with_position(10.0, 20.0).with_size(100.0, 50.0);
        let rect = node.rect();
        assert_eq!(rect.min, Pos2::new(10.0, 20.0));
        assert_eq!(rect.max, Pos2::new(110.0, 70.0));
    }

    #[test]
    fn test_port_lookup() {
        let node = Node::regular("a")
            .with_input(Port::input("in", "In"))
            .with_output(Port::output("out", "Out"));
        assert_eq!(node.port(&"in".into()).map(|p| p.direction), Some(PortDirection::Input));
        assert_eq!(node.port(&"out".into()).map(|p| p.direction), Some(PortDirection::Output));
        assert!(node.port(&"missing".into()).is_none());
    }

    #[test]
    fn test_groupable_capability() {
        let mut group = Node::new("g", NodeKind::Group(GroupData::default()));
        assert!(Node::regular("a").as_groupable().is_none());

        let members = group.as_groupable_mut().expect("group node");
        assert!(members.add_member("a".into()));
        assert!(!members.add_member("a".into()));
        assert!(members.remove_member(&"a".into()));
        assert!(!members.remove_member(&"a".into()));
    }
}
