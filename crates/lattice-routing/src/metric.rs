//! Expected-transmission-time metrics.
//!
//! For an edge with loss probability `p`, the link-level failure probability
//! over forward and reverse is `q = 1 - (1-p)^2`, the expected transmission
//! count is `etx = 1/(1-q)`, and `ett = etx * size / bandwidth` with
//! bandwidth converted from Mbps to bytes per second.
//!
//! WCETT balances the total path time against the busiest channel:
//! `(1-β) * Σ ett + β * max_channel(Σ ett per channel)`.

use std::collections::HashMap;
use std::sync::Arc;

use lattice_net::{Edge, Graph};

/// Mbps to bytes per second.
pub const MBPS_TO_BYTES_PER_SEC: f64 = 125_000.0;

/// Expected transmission count for a loss rate.
pub fn etx(loss_rate: f64) -> f64 {
    let q = 1.0 - (1.0 - loss_rate) * (1.0 - loss_rate);
    1.0 / (1.0 - q)
}

/// Expected transmission time of one packet over an edge, in seconds.
pub fn ett(edge: &Edge, packet_size: u32) -> f64 {
    let bandwidth_bytes = edge.bandwidth_mbps() * MBPS_TO_BYTES_PER_SEC;
    etx(edge.loss_rate()) * (packet_size as f64 / bandwidth_bytes)
}

/// WCETT of a path's edge sequence.
///
/// Returns 0.0 for an empty sequence; callers skip degenerate paths before
/// scoring.
pub fn wcett(edges: &[Arc<Edge>], packet_size: u32, beta: f64) -> f64 {
    if edges.is_empty() {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut per_channel: HashMap<u8, f64> = HashMap::new();
    for edge in edges {
        let e = ett(edge, packet_size);
        sum += e;
        *per_channel.entry(edge.channel()).or_insert(0.0) += e;
    }
    let max_channel = per_channel.values().copied().fold(0.0f64, f64::max);
    (1.0 - beta) * sum + beta * max_channel
}

/// Minimum ETT across active edges, 1.0 when the graph has no active edge.
pub fn min_ett(graph: &Graph, packet_size: u32) -> f64 {
    let best = graph
        .edges()
        .filter(|e| e.is_active())
        .map(|e| ett(e, packet_size))
        .fold(f64::INFINITY, f64::min);
    if best.is_finite() {
        best
    } else {
        1.0
    }
}
