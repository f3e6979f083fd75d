//! Acyclic path enumeration.
//!
//! Depth-first over adjacency lists in insertion order, so the output order
//! is deterministic for a fixed topology. Consumers break metric ties by
//! taking the first path at the minimum, which makes this order part of the
//! routing contract.

use lattice_net::{Graph, NodeId, Role};

/// Default bound on path length, in nodes.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// All simple paths from `src` to `dst` whose interior nodes can forward
/// traffic (clients are leaves, never transit), bounded by
/// [`DEFAULT_MAX_DEPTH`].
pub fn find_all_paths(graph: &Graph, src: NodeId, dst: NodeId) -> Vec<Vec<NodeId>> {
    find_all_paths_bounded(graph, src, dst, DEFAULT_MAX_DEPTH)
}

/// [`find_all_paths`] with an explicit depth bound.
pub fn find_all_paths_bounded(
    graph: &Graph,
    src: NodeId,
    dst: NodeId,
    max_depth: usize,
) -> Vec<Vec<NodeId>> {
    if graph.node(src).is_none() || graph.node(dst).is_none() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut path = vec![src];
    let mut visited = vec![src];
    dfs(graph, src, dst, max_depth, &mut path, &mut visited, &mut out);
    out
}

fn dfs(
    graph: &Graph,
    current: NodeId,
    dst: NodeId,
    max_depth: usize,
    path: &mut Vec<NodeId>,
    visited: &mut Vec<NodeId>,
    out: &mut Vec<Vec<NodeId>>,
) {
    if current == dst {
        out.push(path.clone());
        return;
    }
    if path.len() > max_depth {
        return;
    }
    let node = match graph.node(current) {
        Some(n) => n,
        None => return,
    };
    for neighbor in node.neighbors() {
        if visited.contains(&neighbor) {
            continue;
        }
        let neighbor_node = match graph.node(neighbor) {
            Some(n) => n,
            None => continue,
        };
        if neighbor_node.role() == Role::Client && neighbor != dst {
            continue;
        }
        match graph.edge_between(current, neighbor) {
            Some(edge) if edge.is_active() => {}
            _ => continue,
        }

        visited.push(neighbor);
        path.push(neighbor);
        dfs(graph, neighbor, dst, max_depth, path, visited, out);
        path.pop();
        visited.pop();
    }
}

/// Whether a path's interior contains no client nodes.
pub fn interior_is_routable(graph: &Graph, path: &[NodeId]) -> bool {
    if path.len() <= 2 {
        return true;
    }
    path[1..path.len() - 1].iter().all(|id| {
        graph
            .node(*id)
            .map(|n| n.role() != Role::Client)
            .unwrap_or(false)
    })
}
