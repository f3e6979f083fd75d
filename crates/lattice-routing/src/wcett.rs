//! WCETT routing: minimize weighted cumulative expected transmission time.

use lattice_net::{Graph, NodeId, PolicyKind, RoutingPolicy};
use tracing::trace;

use crate::metric;
use crate::paths;

/// WCETT routing policy.
#[derive(Debug, Clone, Copy)]
pub struct WcettRouting {
    /// Reference packet size used when scoring, in bytes.
    pub packet_size: u32,
    /// Channel-diversity weight β.
    pub beta: f64,
}

impl Default for WcettRouting {
    fn default() -> Self {
        WcettRouting {
            packet_size: 1024,
            beta: 0.5,
        }
    }
}

impl WcettRouting {
    /// Best-scoring path from `src` to `dst`, first wins on ties.
    pub fn best_path(&self, graph: &Graph, src: NodeId, dst: NodeId) -> Option<Vec<NodeId>> {
        let mut best: Option<(Vec<NodeId>, f64)> = None;
        for path in paths::find_all_paths(graph, src, dst) {
            if path.len() < 2 {
                continue;
            }
            let Some(edges) = graph.path_edges(&path) else {
                continue;
            };
            let score = metric::wcett(&edges, self.packet_size, self.beta);
            trace!(?path, score, "scored candidate path");
            if best.as_ref().is_none_or(|(_, s)| score < *s) {
                best = Some((path, score));
            }
        }
        best.map(|(path, _)| path)
    }
}

impl RoutingPolicy for WcettRouting {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Wcett
    }

    fn compute_next_hop(&self, graph: &Graph, src: NodeId, dst: NodeId) -> Option<NodeId> {
        self.best_path(graph, src, dst)
            .and_then(|path| path.get(1).copied())
    }
}
