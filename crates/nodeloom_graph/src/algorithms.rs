// SPDX-License-Identifier: MIT OR Apache-2.0
//! On-demand graph algorithms: cycle detection, orphan scan, bounds.
//!
//! All functions read the store's current connection set; nothing is cached.

use crate::graph::GraphStore;
use crate::node::NodeId;
use egui::Rect;
use std::collections::{HashMap, HashSet};

/// Find every cycle reachable in the node-to-node adjacency induced by the
/// connection set. Each cycle is reported as the path of node ids on the
/// recursion stack from the back-edge target to the current node; a
/// self-referencing connection yields a one-node cycle.
pub fn get_cycles(store: &GraphStore) -> Vec<Vec<NodeId>> {
    let mut adjacency: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
    for connection in store.connections() {
        adjacency
            .entry(&connection.from_node)
            .or_default()
            .push(&connection.to_node);
    }

    let mut cycles = Vec::new();
    let mut visited: HashSet<&NodeId> = HashSet::new();
    let mut on_stack: HashSet<&NodeId> = HashSet::new();
    let mut stack: Vec<&NodeId> = Vec::new();

    for node_id in store.node_ids() {
        if !visited.contains(node_id) {
            visit(
                node_id,
                &adjacency,
                &mut visited,
                &mut on_stack,
                &mut stack,
                &mut cycles,
            );
        }
    }

    cycles
}

fn visit<'a>(
    node_id: &'a NodeId,
    adjacency: &HashMap<&'a NodeId, Vec<&'a NodeId>>,
    visited: &mut HashSet<&'a NodeId>,
    on_stack: &mut HashSet<&'a NodeId>,
    stack: &mut Vec<&'a NodeId>,
    cycles: &mut Vec<Vec<NodeId>>,
) {
    visited.insert(node_id);
    on_stack.insert(node_id);
    stack.push(node_id);

    if let Some(neighbors) = adjacency.get(node_id) {
        for &neighbor in neighbors {
            if on_stack.contains(neighbor) {
                // Back edge: the cycle is the stack slice from the target.
                let start = stack
                    .iter()
                    .position(|id| *id == neighbor)
                    .unwrap_or_default();
                cycles.push(stack[start..].iter().map(|id| (*id).clone()).collect());
            } else if !visited.contains(neighbor) {
                visit(neighbor, adjacency, visited, on_stack, stack, cycles);
            }
        }
    }

    stack.pop();
    on_stack.remove(node_id);
}

/// Whether the graph contains at least one cycle.
pub fn has_cycles(store: &GraphStore) -> bool {
    !get_cycles(store).is_empty()
}

/// Nodes touched by zero connections, as either endpoint.
pub fn orphan_nodes(store: &GraphStore) -> Vec<NodeId> {
    let mut connected: HashSet<&NodeId> = HashSet::new();
    for connection in store.connections() {
        connected.insert(&connection.from_node);
        connected.insert(&connection.to_node);
    }
    store
        .node_ids()
        .filter(|id| !connected.contains(id))
        .cloned()
        .collect()
}

/// Axis-aligned union of every node rectangle. An empty graph yields the
/// degenerate zero rectangle.
pub fn graph_bounds(store: &GraphStore) -> Rect {
    nodes_bounds(store.nodes().map(|n| n.rect()))
}

/// Axis-aligned union of an arbitrary rectangle set.
pub fn nodes_bounds(rects: impl IntoIterator<Item = Rect>) -> Rect {
    let mut rects = rects.into_iter();
    let Some(first) = rects.next() else {
        return Rect::ZERO;
    };
    rects.fold(first, |acc, rect| acc.union(rect))
}
