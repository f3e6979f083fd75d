//! Hop-count routing: breadth-first shortest path.

use std::collections::{HashSet, VecDeque};

use lattice_net::{Graph, NodeId, PolicyKind, Role, RoutingPolicy};

/// Shortest path from `src` to `dst` by hop count.
///
/// Honors the same constraints as path enumeration: clients only ever appear
/// as endpoints and inactive edges do not carry traffic. Ties resolve in
/// adjacency order. Returns `None` when `src == dst` or no path exists.
pub fn shortest_path(graph: &Graph, src: NodeId, dst: NodeId) -> Option<Vec<NodeId>> {
    if src == dst {
        return None;
    }
    graph.node(src)?;
    graph.node(dst)?;

    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<(NodeId, Vec<NodeId>)> = VecDeque::new();
    queue.push_back((src, vec![src]));

    while let Some((current, path)) = queue.pop_front() {
        if !visited.insert(current) {
            continue;
        }
        if current == dst {
            return Some(path);
        }
        let node = graph.node(current)?;
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
            let mut next_path = path.clone();
            next_path.push(neighbor);
            queue.push_back((neighbor, next_path));
        }
    }
    None
}

/// Minimum-hop routing policy.
#[derive(Debug, Default)]
pub struct HopCountRouting;

impl RoutingPolicy for HopCountRouting {
    fn kind(&self) -> PolicyKind {
        PolicyKind::HopCount
    }

    fn compute_next_hop(&self, graph: &Graph, src: NodeId, dst: NodeId) -> Option<NodeId> {
        shortest_path(graph, src, dst).and_then(|path| path.get(1).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_and_multi_hop() {
        let mut g = Graph::new();
        let a = g.create_node(Role::Router);
        let b = g.create_node(Role::Router);
        let c = g.create_node(Role::Router);
        g.add_edge(a, b, 100.0, 0.01);
        g.add_edge(b, c, 100.0, 0.01);

        assert_eq!(shortest_path(&g, a, b), Some(vec![a, b]));
        assert_eq!(shortest_path(&g, a, c), Some(vec![a, b, c]));
    }

    #[test]
    fn unreachable_is_none() {
        let mut g = Graph::new();
        let a = g.create_node(Role::Router);
        let b = g.create_node(Role::Router);
        let island = g.create_node(Role::Router);
        g.add_edge(a, b, 100.0, 0.0);
        assert_eq!(shortest_path(&g, a, island), None);
    }

    #[test]
    fn src_equals_dst_has_no_next_hop() {
        let mut g = Graph::new();
        let a = g.create_node(Role::Router);
        assert_eq!(shortest_path(&g, a, a), None);
        assert_eq!(HopCountRouting.compute_next_hop(&g, a, a), None);
    }

    #[test]
    fn prefers_fewest_hops() {
        let mut g = Graph::new();
        let gw = g.create_node(Role::Gateway);
        let r1 = g.create_node(Role::Router);
        let r2 = g.create_node(Role::Router);
        let c = g.create_node(Role::Client);
        // Long way round: c - r1 - r2 - gw. Short way: c - r1 - gw? No:
        // direct edge c - gw is shortest.
        g.add_edge(c, r1, 100.0, 0.0);
        g.add_edge(r1, r2, 100.0, 0.0);
        g.add_edge(r2, gw, 100.0, 0.0);
        g.add_edge(c, gw, 10.0, 0.5);

        let path = shortest_path(&g, c, gw).unwrap();
        assert_eq!(path, vec![c, gw], "hop count ignores bandwidth and loss");
    }

    #[test]
    fn clients_are_not_transit() {
        let mut g = Graph::new();
        let gw = g.create_node(Role::Gateway);
        let leaf = g.create_node(Role::Client);
        let src = g.create_node(Role::Client);
        g.add_edge(gw, leaf, 100.0, 0.0);
        g.add_edge(leaf, src, 100.0, 0.0);
        assert_eq!(shortest_path(&g, src, gw), None);
    }

    #[test]
    fn next_hop_is_second_path_element() {
        let mut g = Graph::new();
        let gw = g.create_node(Role::Gateway);
        let r = g.create_node(Role::Router);
        let c = g.create_node(Role::Client);
        g.add_edge(gw, r, 100.0, 0.0);
        g.add_edge(r, c, 100.0, 0.0);
        assert_eq!(HopCountRouting.compute_next_hop(&g, c, gw), Some(r));
        assert_eq!(HopCountRouting.compute_next_hop(&g, r, gw), Some(gw));
    }
}
