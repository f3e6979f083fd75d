//! Routing-table population.
//!
//! Before traffic starts, every node learns a next hop toward every gateway
//! by asking the active policy. Tables are only mutated afterwards by the
//! load-balancing feedback loop.

use std::sync::Arc;

use lattice_net::{Graph, Role, RoutingPolicy};
use tracing::{debug, trace};

/// Install `policy` on the graph and populate all routing tables with it.
pub fn install_policy(graph: &mut Graph, policy: Arc<dyn RoutingPolicy>) {
    graph.set_policy(policy);
    populate_tables(graph);
}

/// Compute a next hop for every `(node, gateway)` pair using the graph's
/// active policy. Pairs without a usable route simply stay absent from the
/// table; the send path reports them as `no_route_found`.
pub fn populate_tables(graph: &Graph) {
    let Some(policy) = graph.policy().cloned() else {
        return;
    };
    let gateways = graph.nodes_with_role(Role::Gateway);
    let mut entries = 0u32;
    for node_id in graph.node_ids() {
        for &gw in &gateways {
            if gw == node_id {
                continue;
            }
            match policy.compute_next_hop(graph, node_id, gw) {
                Some(hop) => {
                    let node = graph.node(node_id).expect("node id came from the graph");
                    node.set_next_hop(gw, hop);
                    entries += 1;
                }
                None => trace!(node = %node_id, %gw, "no route"),
            }
        }
    }
    debug!(
        policy = %policy.kind(),
        entries,
        gateways = gateways.len(),
        "routing tables populated"
    );
}
