//! Load-aware augmentation of WCETT.
//!
//! WCETT-LB adds, for every interior node of a path, a queue-pressure term
//! (`queue_len / total active neighbor bandwidth`) and a traffic-concentration
//! term (`min_ett_network * N_i`, where `N_i` counts the nodes currently
//! forwarding through node `i`). Lower is better.
//!
//! The congestion *signal* compared against σ is related but distinct: it
//! divides the queue depth by the node's *average* active-neighbor bandwidth,
//! mirroring how the monitor estimates a node's nominal drain rate.

use std::collections::HashMap;

use lattice_net::{Graph, Node, NodeId};

use crate::metric;

/// Parameters shared by the WCETT-LB policies.
#[derive(Debug, Clone, Copy)]
pub struct LbParams {
    /// Reference packet size used when scoring paths, in bytes.
    pub packet_size: u32,
    /// WCETT channel-diversity weight β.
    pub beta: f64,
    /// CONGESTION_THRESHOLD σ: ql/b signal above which a node counts as
    /// congested (reactive) or predicted congested (predictive).
    pub sigma: f64,
    /// LOAD_BALANCE_THRESHOLD δ: minimum WCETT-LB improvement required to
    /// commit a path switch.
    pub delta: f64,
}

impl Default for LbParams {
    fn default() -> Self {
        LbParams {
            packet_size: 1024,
            beta: 0.5,
            sigma: 0.5,
            delta: 0.4,
        }
    }
}

/// ql/b congestion signal for a node: queue depth over average active
/// neighbor bandwidth. A node with no active neighbors cannot drain at all
/// and signals unconditional congestion (`+inf`).
pub fn congestion_signal(graph: &Graph, node: &Node) -> f64 {
    let mut total_bw = 0.0;
    let mut count = 0u32;
    for neighbor in node.neighbors() {
        if let Some(edge) = graph.edge_between(node.id(), neighbor) {
            if edge.is_active() {
                total_bw += edge.bandwidth_mbps();
                count += 1;
            }
        }
    }
    if count == 0 || total_bw <= 0.0 {
        return f64::INFINITY;
    }
    let avg = total_bw / count as f64;
    node.queue_len() as f64 / avg
}

/// Queue-pressure penalty term for the WCETT-LB metric: queue depth over the
/// node's total active neighbor bandwidth (raw depth when the node has none).
pub fn queue_pressure(graph: &Graph, node: &Node) -> f64 {
    let mut total_bw = 0.0;
    for neighbor in node.neighbors() {
        if let Some(edge) = graph.edge_between(node.id(), neighbor) {
            if edge.is_active() {
                total_bw += edge.bandwidth_mbps();
            }
        }
    }
    let queue_len = node.queue_len() as f64;
    if total_bw > 0.0 {
        queue_len / total_bw
    } else {
        queue_len
    }
}

/// `N_i` for every node: how many *other* nodes currently route through it.
pub fn traffic_concentration(graph: &Graph) -> HashMap<NodeId, usize> {
    let mut counts: HashMap<NodeId, usize> =
        graph.node_ids().into_iter().map(|id| (id, 0)).collect();
    for node in graph.nodes() {
        let mut hops: Vec<NodeId> = node
            .table_snapshot()
            .into_iter()
            .map(|(_, hop)| hop)
            .collect();
        hops.sort_unstable();
        hops.dedup();
        for hop in hops {
            if hop != node.id() {
                if let Some(c) = counts.get_mut(&hop) {
                    *c += 1;
                }
            }
        }
    }
    counts
}

/// Nodes whose routing table currently points at `parent` as a next hop.
pub fn child_nodes(graph: &Graph, parent: NodeId) -> Vec<NodeId> {
    graph
        .nodes()
        .filter(|n| n.id() != parent)
        .filter(|n| n.table_snapshot().iter().any(|(_, hop)| *hop == parent))
        .map(|n| n.id())
        .collect()
}

/// WCETT-LB of a path, or `None` when the path's edges cannot be resolved.
pub fn wcett_lb(graph: &Graph, path: &[NodeId], params: &LbParams) -> Option<f64> {
    let edges = graph.path_edges(path)?;
    if edges.is_empty() {
        return None;
    }
    let base = metric::wcett(&edges, params.packet_size, params.beta);

    let concentration = traffic_concentration(graph);
    let min_ett = metric::min_ett(graph, params.packet_size);

    let mut penalty = 0.0;
    for id in &path[1..path.len().saturating_sub(1)] {
        let node = graph.node(*id)?;
        let ni = concentration.get(id).copied().unwrap_or(0);
        penalty += queue_pressure(graph, node) + min_ett * ni as f64;
    }
    Some(base + penalty)
}
