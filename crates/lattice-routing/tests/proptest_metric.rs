//! Property tests for the ETT/WCETT metric family.

use std::sync::Arc;

use proptest::prelude::*;

use lattice_net::{Edge, Graph, Role};
use lattice_routing::metric;

/// Build a chain of routers carrying the given `(bandwidth, loss, channel)`
/// edges and return the edges in chain order.
fn chain_edges(links: &[(f64, f64, u8)]) -> (Graph, Vec<Arc<Edge>>) {
    let mut g = Graph::new();
    let mut prev = g.create_node(Role::Router);
    let mut edges = Vec::with_capacity(links.len());
    for (bandwidth, loss, channel) in links {
        let next = g.create_node(Role::Router);
        let id = g
            .add_edge_on_channel(prev, next, *bandwidth, *loss, *channel)
            .expect("chain edges are unique");
        edges.push(Arc::clone(g.edge(id).unwrap()));
        prev = next;
    }
    (g, edges)
}

fn link_strategy() -> impl Strategy<Value = (f64, f64, u8)> {
    (1.0f64..400.0, 0.0f64..0.95, 1u8..=3)
}

proptest! {
    #[test]
    fn ett_is_positive_and_finite(link in link_strategy(), size in 64u32..9000) {
        let (_g, edges) = chain_edges(&[link]);
        let v = metric::ett(&edges[0], size);
        prop_assert!(v > 0.0, "ett must be positive, got {v}");
        prop_assert!(v.is_finite(), "ett must be finite, got {v}");
    }

    #[test]
    fn etx_forms_agree(p in 0.0f64..0.95) {
        let via_q = metric::etx(p);
        let direct = 1.0 / ((1.0 - p) * (1.0 - p));
        prop_assert!((via_q - direct).abs() < 1e-9 * direct.max(1.0));
    }

    #[test]
    fn wcett_dominates_channel_and_edge_maxima(
        links in prop::collection::vec(link_strategy(), 1..6),
        size in 64u32..9000,
    ) {
        let (_g, edges) = chain_edges(&links);
        let wcett = metric::wcett(&edges, size, 0.5);

        let mut per_channel = std::collections::HashMap::new();
        let mut max_edge_ett = 0.0f64;
        for edge in &edges {
            let e = metric::ett(edge, size);
            *per_channel.entry(edge.channel()).or_insert(0.0) += e;
            max_edge_ett = max_edge_ett.max(e);
        }
        let max_channel = per_channel.values().copied().fold(0.0f64, f64::max);

        let slack = 1e-9 * wcett.max(1.0);
        prop_assert!(
            wcett + slack >= max_channel,
            "WCETT {wcett} must dominate the busiest channel {max_channel}"
        );
        prop_assert!(
            max_channel + slack >= max_edge_ett,
            "busiest channel {max_channel} must dominate the slowest edge {max_edge_ett}"
        );
    }

    #[test]
    fn wcett_grows_with_beta_zero_sum(
        links in prop::collection::vec(link_strategy(), 1..6),
    ) {
        // β = 0 degenerates to the plain ETT sum.
        let (_g, edges) = chain_edges(&links);
        let sum: f64 = edges.iter().map(|e| metric::ett(e, 1024)).sum();
        let w = metric::wcett(&edges, 1024, 0.0);
        prop_assert!((w - sum).abs() < 1e-9 * sum.max(1.0));
    }
}
