// SPDX-License-Identifier: MIT OR Apache-2.0
//! Uniform-grid spatial index for hit-testing and culling.
//!
//! The index caches bounding data at [`SpatialIndex::rebuild`] time and
//! answers queries from the cache alone. It never rebuilds reactively;
//! callers rebuild after structural changes (node add/remove/resize,
//! connection add/remove, or strategy replacement) so update cost stays
//! predictable and batched.

use egui::{Pos2, Rect, Vec2};
use nodeloom_graph::{Connection, ConnectionId, GraphStore, Node, NodeId, Port, PortId};
use std::collections::{HashMap, HashSet};

/// Vertical space reserved for a node's header before the first port row.
const PORT_HEADER_HEIGHT: f32 = 24.0;

/// Grid cell edge length, in graph units.
const CELL_SIZE: f32 = 256.0;

/// Supplies the hit extent of a port (width = hit diameter, height = row
/// spacing). The index does not know how the host lays ports out visually.
pub trait PortSizeResolver {
    /// Hit extent for `port` on `node`.
    fn port_extent(&self, node: &Node, port: &Port) -> Vec2;
}

/// Fixed-size resolver used when the host supplies nothing better.
#[derive(Debug, Default)]
pub struct DefaultPortSize;

impl PortSizeResolver for DefaultPortSize {
    fn port_extent(&self, _node: &Node, _port: &Port) -> Vec2 {
        Vec2::new(12.0, 22.0)
    }
}

/// Optional override for a node's bounding rectangle, for hosts whose nodes
/// are not plain position+size boxes.
pub trait NodeShapeBuilder {
    /// Bounding rectangle for `node` in graph space.
    fn node_rect(&self, node: &Node) -> Rect;
}

/// Optional supplier of a connection's route as line segments, enabling
/// connection hit-testing.
pub trait SegmentCalculator {
    /// Route segments for `connection` in graph space.
    fn segments(&self, connection: &Connection, store: &GraphStore) -> Vec<(Pos2, Pos2)>;
}

#[derive(Debug, Clone)]
struct NodeEntry {
    id: NodeId,
    rect: Rect,
    z_index: i32,
}

#[derive(Debug, Clone)]
struct PortEntry {
    node: NodeId,
    port: PortId,
    center: Pos2,
    radius: f32,
}

/// Bounding-box index over nodes, ports and (optionally) connection routes.
pub struct SpatialIndex {
    cells: HashMap<(i32, i32), Vec<usize>>,
    entries: Vec<NodeEntry>,
    ports: Vec<PortEntry>,
    connection_segments: Vec<(ConnectionId, Vec<(Pos2, Pos2)>)>,
    port_sizes: Box<dyn PortSizeResolver>,
    shape: Option<Box<dyn NodeShapeBuilder>>,
    segments: Option<Box<dyn SegmentCalculator>>,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(Box::new(DefaultPortSize))
    }
}

impl SpatialIndex {
    /// Create an empty index with the given port-size resolver.
    pub fn new(port_sizes: Box<dyn PortSizeResolver>) -> Self {
        Self {
            cells: HashMap::new(),
            entries: Vec::new(),
            ports: Vec::new(),
            connection_segments: Vec::new(),
            port_sizes,
            shape: None,
            segments: None,
        }
    }

    /// Replace the port-size resolver. Takes effect on the next rebuild.
    pub fn set_port_size_resolver(&mut self, resolver: Box<dyn PortSizeResolver>) {
        self.port_sizes = resolver;
    }

    /// Install or remove the node-shape builder. Takes effect on the next
    /// rebuild.
    pub fn set_node_shape_builder(&mut self, builder: Option<Box<dyn NodeShapeBuilder>>) {
        self.shape = builder;
    }

    /// Install or remove the connection-segment calculator. Takes effect on
    /// the next rebuild.
    pub fn set_segment_calculator(&mut self, calculator: Option<Box<dyn SegmentCalculator>>) {
        self.segments = calculator;
    }

    /// Rebuild every cached rectangle from the store's current state.
    /// Invisible nodes are excluded and can never be hit.
    pub fn rebuild(&mut self, store: &GraphStore) {
        self.cells.clear();
        self.entries.clear();
        self.ports.clear();
        self.connection_segments.clear();

        for node in store.nodes() {
            if !node.visible {
                continue;
            }
            let rect = match &self.shape {
                Some(builder) => builder.node_rect(node),
                None => node.rect(),
            };
            let index = self.entries.len();
            self.entries.push(NodeEntry {
                id: node.id.clone(),
                rect,
                z_index: node.z_index,
            });
            for cell in cells_covering(rect) {
                self.cells.entry(cell).or_default().push(index);
            }

            self.index_ports(node, rect);
        }

        if let Some(calculator) = &self.segments {
            for connection in store.connections() {
                let segments = calculator.segments(connection, store);
                if !segments.is_empty() {
                    self.connection_segments.push((connection.id.clone(), segments));
                }
            }
        }
    }

    fn index_ports(&mut self, node: &Node, rect: Rect) {
        for (i, port) in node.inputs.iter().enumerate() {
            let extent = self.port_sizes.port_extent(node, port);
            self.ports.push(PortEntry {
                node: node.id.clone(),
                port: port.id.clone(),
                center: Pos2::new(rect.left(), port_row_y(rect, i, extent.y)),
                radius: extent.x / 2.0,
            });
        }
        for (i, port) in node.outputs.iter().enumerate() {
            let extent = self.port_sizes.port_extent(node, port);
            self.ports.push(PortEntry {
                node: node.id.clone(),
                port: port.id.clone(),
                center: Pos2::new(rect.right(), port_row_y(rect, i, extent.y)),
                radius: extent.x / 2.0,
            });
        }
    }

    // --- Queries -----------------------------------------------------------

    /// Nodes whose rectangles overlap `rect`.
    pub fn nodes_in(&self, rect: Rect) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for cell in cells_covering(rect) {
            let Some(indices) = self.cells.get(&cell) else {
                continue;
            };
            for &index in indices {
                let entry = &self.entries[index];
                if seen.insert(index) && entry.rect.intersects(rect) {
                    result.push(entry.id.clone());
                }
            }
        }
        result
    }

    /// Topmost node (by z-index) containing `point`.
    pub fn node_at(&self, point: Pos2) -> Option<NodeId> {
        let cell = cell_of(point);
        self.cells
            .get(&cell)?
            .iter()
            .map(|&index| &self.entries[index])
            .filter(|entry| entry.rect.contains(point))
            .max_by_key(|entry| entry.z_index)
            .map(|entry| entry.id.clone())
    }

    /// Port whose hit circle contains `point`; the nearest wins on overlap.
    pub fn port_at(&self, point: Pos2) -> Option<(NodeId, PortId)> {
        self.ports
            .iter()
            .filter(|entry| entry.center.distance(point) <= entry.radius)
            .min_by(|a, b| {
                a.center
                    .distance(point)
                    .total_cmp(&b.center.distance(point))
            })
            .map(|entry| (entry.node.clone(), entry.port.clone()))
    }

    /// Connection whose route passes within `tolerance` of `point`. Requires
    /// a segment calculator; returns the nearest match.
    pub fn connection_at(&self, point: Pos2, tolerance: f32) -> Option<ConnectionId> {
        let mut best: Option<(f32, &ConnectionId)> = None;
        for (id, segments) in &self.connection_segments {
            for &(a, b) in segments {
                let distance = point_segment_distance(point, a, b);
                if distance <= tolerance && best.map_or(true, |(d, _)| distance < d) {
                    best = Some((distance, id));
                }
            }
        }
        best.map(|(_, id)| id.clone())
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("nodes", &self.entries.len())
            .field("ports", &self.ports.len())
            .field("connections", &self.connection_segments.len())
            .finish()
    }
}

fn cell_of(point: Pos2) -> (i32, i32) {
    (
        (point.x / CELL_SIZE).floor() as i32,
        (point.y / CELL_SIZE).floor() as i32,
    )
}

fn cells_covering(rect: Rect) -> impl Iterator<Item = (i32, i32)> {
    let (min_x, min_y) = cell_of(rect.min);
    let (max_x, max_y) = cell_of(rect.max);
    (min_x..=max_x).flat_map(move |x| (min_y..=max_y).map(move |y| (x, y)))
}

fn port_row_y(rect: Rect, row: usize, spacing: f32) -> f32 {
    rect.top() + PORT_HEADER_HEIGHT + row as f32 * spacing + spacing / 2.0
}

/// Distance from `point` to the segment `a`-`b`.
fn point_segment_distance(point: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let length_sq = ab.length_sq();
    if length_sq == 0.0 {
        return a.distance(point);
    }
    let t = ((point - a).dot(ab) / length_sq).clamp(0.0, 1.0);
    (a + ab * t).distance(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeloom_graph::{Node, Port};

    struct StraightSegments;

    impl SegmentCalculator for StraightSegments {
        fn segments(&self, connection: &Connection, store: &GraphStore) -> Vec<(Pos2, Pos2)> {
            let from = store.node(&connection.from_node).map(Node::center);
            let to = store.node(&connection.to_node).map(Node::center);
            match (from, to) {
                (Some(a), Some(b)) => vec![(a, b)],
                _ => Vec::new(),
            }
        }
    }

    fn store_with_nodes() -> GraphStore {
        let mut store = GraphStore::new();
        store.add_node(
            Node::regular("a")
                .with_position(0.0, 0.0)
                .with_size(100.0, 60.0)
                .with_output(Port::output("out", "Out")),
        );
        store.add_node(
            Node::regular("b")
                .with_position(400.0, 400.0)
                .with_size(100.0, 60.0)
                .with_input(Port::input("in", "In")),
        );
        store
    }

    #[test]
    fn test_nodes_in_overlap_query() {
        let store = store_with_nodes();
        let mut index = SpatialIndex::default();
        index.rebuild(&store);

        let hits = index.nodes_in(Rect::from_min_max(Pos2::new(50.0, 30.0), Pos2::new(500.0, 80.0)));
        assert!(hits.contains(&"a".into()));
        assert!(!hits.contains(&"b".into()));

        let all = index.nodes_in(Rect::from_min_max(Pos2::new(-10.0, -10.0), Pos2::new(600.0, 600.0)));
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_node_at_picks_topmost() {
        let mut store = store_with_nodes();
        store.add_node(
            Node::regular("overlap")
                .with_position(50.0, 20.0)
                .with_size(100.0, 60.0),
        );
        store.bring_to_front(&"overlap".into());
        let mut index = SpatialIndex::default();
        index.rebuild(&store);

        assert_eq!(index.node_at(Pos2::new(60.0, 30.0)), Some("overlap".into()));
        assert_eq!(index.node_at(Pos2::new(10.0, 10.0)), Some("a".into()));
        assert_eq!(index.node_at(Pos2::new(1000.0, 1000.0)), None);
    }

    #[test]
    fn test_invisible_nodes_are_not_hit() {
        let mut store = store_with_nodes();
        store.set_visible(&"a".into(), false);
        let mut index = SpatialIndex::default();
        index.rebuild(&store);

        assert_eq!(index.node_at(Pos2::new(10.0, 10.0)), None);
    }

    #[test]
    fn test_rebuild_is_explicit() {
        let mut store = store_with_nodes();
        let mut index = SpatialIndex::default();
        index.rebuild(&store);

        store.remove_node(&"a".into());
        // Stale until rebuilt.
        assert_eq!(index.node_at(Pos2::new(10.0, 10.0)), Some("a".into()));
        index.rebuild(&store);
        assert_eq!(index.node_at(Pos2::new(10.0, 10.0)), None);
    }

    #[test]
    fn test_port_hit_test() {
        let store = store_with_nodes();
        let mut index = SpatialIndex::default();
        index.rebuild(&store);

        // First output port row of node "a" sits on its right edge.
        let hit = index.port_at(Pos2::new(100.0, 35.0));
        assert_eq!(hit, Some(("a".into(), "out".into())));
        assert_eq!(index.port_at(Pos2::new(500.0, 35.0)), None);
    }

    #[test]
    fn test_connection_hit_test() {
        let mut store = store_with_nodes();
        store
            .create_connection(&"a".into(), &"out".into(), &"b".into(), &"in".into())
            .unwrap();
        let mut index = SpatialIndex::default();
        index.set_segment_calculator(Some(Box::new(StraightSegments)));
        index.rebuild(&store);

        // Midpoint of the straight route between node centers.
        let midpoint = Pos2::new((50.0 + 450.0) / 2.0, (30.0 + 430.0) / 2.0);
        assert!(index.connection_at(midpoint, 5.0).is_some());
        assert!(index.connection_at(Pos2::new(0.0, 400.0), 5.0).is_none());
    }
}
