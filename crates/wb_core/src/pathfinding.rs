//! Node graph topology and breadth-first pathfinding.
//!
//! The 13-node graph is fixed: a spine from crown to belly, two arms ending in
//! the chaos and order hands, and a small belly/root triangle. Edges are
//! unweighted, so BFS gives shortest paths.

use std::collections::{BTreeSet, VecDeque};

use crate::components::NodeId;

/// Neighbours of a node, in search order.
#[must_use]
pub const fn neighbors(node: NodeId) -> &'static [NodeId] {
    match node {
        NodeId::Crown => &[NodeId::ThirdEye],
        NodeId::ThirdEye => &[NodeId::Crown, NodeId::Throat],
        NodeId::Throat => &[NodeId::ThirdEye, NodeId::Sternum],
        NodeId::Sternum => &[
            NodeId::Throat,
            NodeId::Belly,
            NodeId::LeftShoulder,
            NodeId::RightShoulder,
        ],
        NodeId::Belly => &[NodeId::Sternum, NodeId::LeftRoot, NodeId::RightRoot],
        NodeId::LeftShoulder => &[NodeId::Sternum, NodeId::LeftElbow],
        NodeId::RightShoulder => &[NodeId::Sternum, NodeId::RightElbow],
        NodeId::LeftElbow => &[NodeId::LeftShoulder, NodeId::LeftHand],
        NodeId::RightElbow => &[NodeId::RightShoulder, NodeId::RightHand],
        NodeId::LeftHand => &[NodeId::LeftElbow],
        NodeId::RightHand => &[NodeId::RightElbow],
        NodeId::LeftRoot => &[NodeId::Belly, NodeId::RightRoot],
        NodeId::RightRoot => &[NodeId::Belly, NodeId::LeftRoot],
    }
}

/// Whether two nodes share an edge.
#[must_use]
pub fn are_adjacent(a: NodeId, b: NodeId) -> bool {
    neighbors(a).contains(&b)
}

/// Shortest path from `from` to `to`, inclusive of both ends.
///
/// Returns `[from]` when the endpoints match and an empty path if `to` is
/// unreachable (which cannot happen on the connected graph).
#[must_use]
pub fn find_path(from: NodeId, to: NodeId) -> Vec<NodeId> {
    if from == to {
        return vec![from];
    }

    let mut visited = BTreeSet::from([from]);
    let mut queue = VecDeque::from([vec![from]]);

    while let Some(path) = queue.pop_front() {
        let Some(&current) = path.last() else {
            continue;
        };
        for &next in neighbors(current) {
            if !visited.insert(next) {
                continue;
            }
            let mut extended = path.clone();
            extended.push(next);
            if next == to {
                return extended;
            }
            queue.push_back(extended);
        }
    }

    Vec::new()
}

/// Root node closest to `from` (a root returns itself).
#[must_use]
pub fn find_nearest_root(from: NodeId) -> NodeId {
    if NodeId::ROOTS.contains(&from) {
        return from;
    }

    let mut visited = BTreeSet::from([from]);
    let mut queue = VecDeque::from([from]);

    while let Some(current) = queue.pop_front() {
        for &next in neighbors(current) {
            if !visited.insert(next) {
                continue;
            }
            if NodeId::ROOTS.contains(&next) {
                return next;
            }
            queue.push_back(next);
        }
    }

    NodeId::ROOTS[0]
}

/// Player-side pixel position of a node. The enemy mirrors it horizontally.
#[must_use]
pub const fn layout(node: NodeId) -> (i32, i32) {
    match node {
        NodeId::Crown => (98, 335),
        NodeId::ThirdEye => (98, 357),
        NodeId::Throat => (98, 388),
        NodeId::LeftShoulder => (130, 410),
        NodeId::RightShoulder => (62, 410),
        NodeId::LeftRoot => (133, 499),
        NodeId::RightRoot => (59, 499),
        NodeId::Belly => (98, 458),
        NodeId::LeftHand => (171, 494),
        NodeId::RightHand => (22, 494),
        NodeId::Sternum => (98, 410),
        NodeId::LeftElbow => (143, 459),
        NodeId::RightElbow => (49, 459),
    }
}
