//! WCETT-LB with predictive advisories.
//!
//! Instead of waiting for downstream nodes to observe congestion, each node
//! forecasts its own state from the ql/b signal and multicasts
//! `(dst, path, metric)` advisories to its child nodes — every node whose
//! routing table currently points at it — whenever the forecast flips, and
//! periodically regardless. A child holding a live advisory re-scores its
//! cached path against the best enumerable alternative and switches when the
//! improvement reaches δ.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Instant;

use lattice_net::node::{Advisory, AdvisedPath};
use lattice_net::{Graph, Node, NodeId, PolicyKind, RoutingPolicy};
use tracing::{debug, info, warn};

use crate::load::{self, LbParams};
use crate::paths;

/// Predictive WCETT-LB routing policy.
pub struct WcettLbPreRouting {
    params: LbParams,
    path_cache: Mutex<HashMap<(NodeId, NodeId), Vec<NodeId>>>,
}

impl WcettLbPreRouting {
    pub fn new(params: LbParams) -> Self {
        WcettLbPreRouting {
            params,
            path_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn params(&self) -> &LbParams {
        &self.params
    }

    /// The full path currently cached for `(src, dst)`.
    pub fn cached_path(&self, src: NodeId, dst: NodeId) -> Option<Vec<NodeId>> {
        self.path_cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(src, dst))
            .cloned()
    }

    fn cache_path(&self, src: NodeId, dst: NodeId, path: Vec<NodeId>) {
        self.path_cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((src, dst), path);
    }

    /// Cached paths originating at `src`, with their current metrics.
    fn advised_paths(&self, graph: &Graph, src: NodeId) -> Vec<AdvisedPath> {
        let cached: Vec<(NodeId, Vec<NodeId>)> = {
            let cache = self.path_cache.lock().unwrap_or_else(|e| e.into_inner());
            cache
                .iter()
                .filter(|((s, _), _)| *s == src)
                .map(|((_, d), path)| (*d, path.clone()))
                .collect()
        };
        cached
            .into_iter()
            .filter_map(|(dst, path)| {
                load::wcett_lb(graph, &path, &self.params)
                    .map(|metric| AdvisedPath { dst, path, metric })
            })
            .collect()
    }

    fn best_path(&self, graph: &Graph, src: NodeId, dst: NodeId) -> Option<(Vec<NodeId>, f64)> {
        let mut best: Option<(Vec<NodeId>, f64)> = None;
        for path in paths::find_all_paths(graph, src, dst) {
            if path.len() < 2 {
                continue;
            }
            let Some(score) = load::wcett_lb(graph, &path, &self.params) else {
                continue;
            };
            if best.as_ref().is_none_or(|(_, s)| score < *s) {
                best = Some((path, score));
            }
        }
        best
    }
}

impl Default for WcettLbPreRouting {
    fn default() -> Self {
        Self::new(LbParams::default())
    }
}

impl RoutingPolicy for WcettLbPreRouting {
    fn kind(&self) -> PolicyKind {
        PolicyKind::WcettLbPre
    }

    fn compute_next_hop(&self, graph: &Graph, src: NodeId, dst: NodeId) -> Option<NodeId> {
        let (path, _) = self.best_path(graph, src, dst)?;
        let hop = path.get(1).copied();
        self.cache_path(src, dst, path);
        hop
    }

    fn alternative_path(
        &self,
        graph: &Graph,
        src: NodeId,
        dst: NodeId,
        avoid: &HashSet<NodeId>,
    ) -> Option<Vec<NodeId>> {
        let mut best: Option<(Vec<NodeId>, f64)> = None;
        for path in paths::find_all_paths(graph, src, dst) {
            if path.len() < 2 {
                continue;
            }
            if path[1..path.len() - 1].iter().any(|id| avoid.contains(id)) {
                continue;
            }
            let Some(score) = load::wcett_lb(graph, &path, &self.params) else {
                continue;
            };
            if best.as_ref().is_none_or(|(_, s)| score < *s) {
                best = Some((path, score));
            }
        }
        best.map(|(path, _)| path)
    }

    /// Forecast congestion and multicast advisories to child nodes.
    fn monitor_tick(&self, graph: &Graph, node: &Node) {
        let signal = load::congestion_signal(graph, node);
        let now = Instant::now();

        let (changed, multicast) = {
            let mut cong = node.congestion();
            cong.last_signal = signal;
            let predicted = signal >= self.params.sigma;
            let changed = predicted != cong.predicted;
            cong.predicted = predicted;
            if changed {
                cong.last_change = Some(now);
            }
            let force = match cong.last_multicast {
                Some(t) => now.duration_since(t) >= graph.config().multicast_interval,
                // First tick only starts the multicast clock.
                None => {
                    cong.last_multicast = Some(now);
                    false
                }
            };
            if changed || force {
                cong.last_multicast = Some(now);
                cong.reported = predicted;
            }
            (changed, changed || force)
        };

        if !multicast {
            return;
        }

        let paths = self.advised_paths(graph, node.id());
        let children = load::child_nodes(graph, node.id());
        debug!(
            node = %node.id(),
            children = children.len(),
            paths = paths.len(),
            changed,
            "multicasting advisories"
        );
        for child in children {
            if let Some(child_node) = graph.node(child) {
                child_node.advisories().insert(
                    node.id(),
                    Advisory {
                        paths: paths.clone(),
                        received_at: now,
                        state_changed: changed,
                    },
                );
            }
        }
    }

    /// Re-evaluate the cached route while a live advisory is held.
    fn update_path(&self, graph: &Graph, node: &Node, dst: NodeId) {
        let now = Instant::now();
        let advisory_ttl = graph.config().advisory_ttl;
        let (live, state_changed) = {
            let inbox = node.advisories();
            let mut live = false;
            let mut state_changed = false;
            for adv in inbox.values() {
                if now.duration_since(adv.received_at) < advisory_ttl {
                    live = true;
                    state_changed |= adv.state_changed;
                }
            }
            (live, state_changed)
        };
        if !live {
            return;
        }

        let Some(current) = self.cached_path(node.id(), dst) else {
            return;
        };
        let Some(current_metric) = load::wcett_lb(graph, &current, &self.params) else {
            return;
        };

        let all_paths = paths::find_all_paths(graph, node.id(), dst);
        if all_paths.len() <= 1 {
            debug!(node = %node.id(), %dst, "no alternative path exists");
            return;
        }

        let mut best: Option<(Vec<NodeId>, f64)> = None;
        for path in all_paths {
            if path == current || path.len() < 2 {
                continue;
            }
            let Some(score) = load::wcett_lb(graph, &path, &self.params) else {
                continue;
            };
            if best.as_ref().is_none_or(|(_, s)| score < *s) {
                best = Some((path, score));
            }
        }
        let Some((best_path, best_metric)) = best else {
            return;
        };

        if current_metric - best_metric >= self.params.delta {
            if let Some(hop) = best_path.get(1).copied() {
                node.set_next_hop(dst, hop);
            }
            info!(
                node = %node.id(),
                %dst,
                "proactively switched path {:?} -> {:?}",
                current,
                best_path
            );
            self.cache_path(node.id(), dst, best_path);
        } else if state_changed {
            warn!(
                node = %node.id(),
                %dst,
                "no alternative path with sufficient improvement"
            );
        }
    }
}
