//! WCETT-LB with reactive path switching.
//!
//! Selection scores paths with WCETT-LB and caches the winner. Each node's
//! monitor tick re-evaluates the ql/b signal against σ; a fresh crossing into
//! congestion leaves a timestamped report behind. Nodes routing through a
//! reporter react: they re-score their current path, ask for an alternative
//! that avoids every fresh reporter, and switch when the improvement clears δ.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Instant;

use lattice_net::{Graph, Node, NodeId, PolicyKind, RoutingPolicy};
use tracing::{debug, info, warn};

use crate::load::{self, LbParams};
use crate::paths;

/// Reactive WCETT-LB routing policy.
pub struct WcettLbPostRouting {
    params: LbParams,
    path_cache: Mutex<HashMap<(NodeId, NodeId), Vec<NodeId>>>,
}

impl WcettLbPostRouting {
    pub fn new(params: LbParams) -> Self {
        WcettLbPostRouting {
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

    /// Lowest-metric path from `src` to `dst`, optionally avoiding a set of
    /// interior nodes. First wins on ties.
    fn best_path(
        &self,
        graph: &Graph,
        src: NodeId,
        dst: NodeId,
        avoid: Option<&HashSet<NodeId>>,
    ) -> Option<(Vec<NodeId>, f64)> {
        let mut best: Option<(Vec<NodeId>, f64)> = None;
        for path in paths::find_all_paths(graph, src, dst) {
            if path.len() < 2 {
                continue;
            }
            if let Some(avoid) = avoid {
                if path[1..path.len() - 1].iter().any(|id| avoid.contains(id)) {
                    continue;
                }
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

impl Default for WcettLbPostRouting {
    fn default() -> Self {
        Self::new(LbParams::default())
    }
}

impl RoutingPolicy for WcettLbPostRouting {
    fn kind(&self) -> PolicyKind {
        PolicyKind::WcettLbPost
    }

    fn compute_next_hop(&self, graph: &Graph, src: NodeId, dst: NodeId) -> Option<NodeId> {
        let (path, _) = self.best_path(graph, src, dst, None)?;
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
        self.best_path(graph, src, dst, Some(avoid))
            .map(|(path, _)| path)
    }

    /// Reactive congestion state machine, once per monitor cadence.
    fn monitor_tick(&self, graph: &Graph, node: &Node) {
        let signal = load::congestion_signal(graph, node);
        let mut cong = node.congestion();
        cong.last_signal = signal;
        let crossed = signal >= self.params.sigma;
        if crossed && !cong.congested {
            cong.congested = true;
            cong.reported = true;
            cong.last_change = Some(Instant::now());
            debug!(node = %node.id(), signal, "congestion threshold crossed");
        } else if !crossed && cong.congested {
            cong.congested = false;
            debug!(node = %node.id(), signal, "congestion cleared");
        }
    }

    /// React to fresh congestion reports on the current path.
    fn update_path(&self, graph: &Graph, node: &Node, dst: NodeId) {
        let Some(current) = self.cached_path(node.id(), dst) else {
            return;
        };
        if current.len() < 3 {
            return;
        }

        let now = Instant::now();
        let report_ttl = graph.config().report_ttl;
        let mut reporters: HashSet<NodeId> = HashSet::new();
        for id in &current[1..current.len() - 1] {
            let Some(transit) = graph.node(*id) else {
                continue;
            };
            let cong = transit.congestion();
            let fresh = cong
                .last_change
                .is_some_and(|t| now.duration_since(t) < report_ttl);
            if cong.reported && fresh {
                reporters.insert(*id);
            }
        }
        if reporters.is_empty() {
            return;
        }

        let Some(current_metric) = load::wcett_lb(graph, &current, &self.params) else {
            return;
        };
        let Some(candidate) = self.alternative_path(graph, node.id(), dst, &reporters) else {
            warn!(
                node = %node.id(),
                %dst,
                ?reporters,
                "no alternative path avoiding congested nodes"
            );
            return;
        };
        if candidate == current {
            return;
        }
        let Some(candidate_metric) = load::wcett_lb(graph, &candidate, &self.params) else {
            return;
        };

        if current_metric - candidate_metric > self.params.delta {
            if let Some(hop) = candidate.get(1).copied() {
                node.set_next_hop(dst, hop);
            }
            info!(
                node = %node.id(),
                %dst,
                "switched path {:?} -> {:?}",
                current,
                candidate
            );
            self.cache_path(node.id(), dst, candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables;
    use lattice_net::{Packet, Role};
    use std::sync::Arc;
    use std::time::Duration;

    /// Two disjoint 3-hop branches between a client and a gateway, slow
    /// enough links that a saturated queue dwarfs δ.
    ///
    /// ```text
    ///        a ── b
    ///      /        \
    ///   c             gw
    ///      \        /
    ///        d ── e
    /// ```
    fn parallel_branches() -> (Graph, NodeId, NodeId, NodeId, NodeId) {
        let mut g = Graph::new();
        let c = g.create_node(Role::Client);
        let a = g.create_node(Role::Router);
        let b = g.create_node(Role::Router);
        let d = g.create_node(Role::Router);
        let e = g.create_node(Role::Router);
        let gw = g.create_node(Role::Gateway);
        g.add_edge_on_channel(c, a, 10.0, 0.0, 1);
        g.add_edge_on_channel(a, b, 10.0, 0.0, 2);
        g.add_edge_on_channel(b, gw, 10.0, 0.0, 3);
        g.add_edge_on_channel(c, d, 10.0, 0.0, 1);
        g.add_edge_on_channel(d, e, 10.0, 0.0, 2);
        g.add_edge_on_channel(e, gw, 10.0, 0.0, 3);
        (g, c, a, d, gw)
    }

    fn saturate(graph: &Graph, id: NodeId) {
        let node = graph.node(id).unwrap();
        let from = node.neighbors()[0];
        for _ in 0..node.queue_capacity() {
            assert!(node.receive(Packet::data(from, id, 64), from));
        }
    }

    #[test]
    fn selection_caches_the_winning_path() {
        let (mut g, c, a, _d, gw) = parallel_branches();
        let policy = Arc::new(WcettLbPostRouting::default());
        g.set_policy(policy.clone());
        tables::populate_tables(&g);

        assert_eq!(g.node(c).unwrap().next_hop(gw), Some(a), "a-branch enumerates first");
        let cached = policy.cached_path(c, gw).unwrap();
        assert_eq!(cached.len(), 4);
        assert_eq!(cached[0], c);
        assert_eq!(cached[1], a);
        assert_eq!(*cached.last().unwrap(), gw);
    }

    #[test]
    fn monitor_tick_marks_a_fresh_crossing() {
        let (g, _c, a, _d, _gw) = parallel_branches();
        let policy = WcettLbPostRouting::default();
        let node_a = g.node(a).unwrap();

        policy.monitor_tick(&g, node_a);
        assert!(!node_a.congestion().congested, "idle node is not congested");

        saturate(&g, a);
        policy.monitor_tick(&g, node_a);
        let cong = node_a.congestion();
        assert!(cong.congested);
        assert!(cong.reported, "fresh crossing leaves a report");
        assert!(cong.last_change.is_some());
    }

    #[test]
    fn congestion_clears_when_the_queue_drains() {
        use lattice_net::{NetConfig, NetRunner};

        let cfg = NetConfig {
            queue_process_time: Duration::from_millis(1),
            ..NetConfig::default()
        };
        let mut g = Graph::with_config(cfg);
        let a = g.create_node(Role::Router);
        let b = g.create_node(Role::Router);
        g.add_edge_on_channel(a, b, 10.0, 0.0, 1);

        let policy = WcettLbPostRouting::default();
        saturate(&g, a);
        policy.monitor_tick(&g, g.node(a).unwrap());
        assert!(g.node(a).unwrap().congestion().congested);

        let graph = Arc::new(g);
        let mut runner = NetRunner::start(Arc::clone(&graph));
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline && graph.node(a).unwrap().queue_len() > 0 {
            std::thread::sleep(Duration::from_millis(10));
        }
        runner.shutdown();
        assert_eq!(graph.node(a).unwrap().queue_len(), 0, "workers should drain the queue");

        policy.monitor_tick(&graph, graph.node(a).unwrap());
        let cong = graph.node(a).unwrap().congestion();
        assert!(!cong.congested, "signal below threshold clears congestion");
        assert!(cong.reported, "the historical report flag survives clearing");
    }

    #[test]
    fn congested_interior_triggers_a_switch() {
        let (mut g, c, a, d, gw) = parallel_branches();
        let params = LbParams {
            delta: 0.4,
            ..LbParams::default()
        };
        let policy = Arc::new(WcettLbPostRouting::new(params));
        g.set_policy(policy.clone());
        tables::populate_tables(&g);
        assert_eq!(g.node(c).unwrap().next_hop(gw), Some(a));

        // Saturate the first-branch transit node and let its monitor notice.
        saturate(&g, a);
        policy.monitor_tick(&g, g.node(a).unwrap());
        assert!(g.node(a).unwrap().congestion().congested);

        // The client reacts on its own monitor cadence.
        policy.update_path(&g, g.node(c).unwrap(), gw);

        assert_eq!(
            g.node(c).unwrap().next_hop(gw),
            Some(d),
            "client should reroute via the idle branch"
        );
        let cached = policy.cached_path(c, gw).unwrap();
        assert_eq!(cached[1], d);
        assert_eq!(*cached.last().unwrap(), gw);
    }

    #[test]
    fn stale_reports_do_not_trigger() {
        let (mut g, c, a, _d, gw) = parallel_branches();
        let policy = Arc::new(WcettLbPostRouting::default());
        g.set_policy(policy.clone());
        tables::populate_tables(&g);

        saturate(&g, a);
        policy.monitor_tick(&g, g.node(a).unwrap());
        // Age the report past the freshness window.
        {
            let node_a = g.node(a).unwrap();
            let mut cong = node_a.congestion();
            cong.last_change = Some(Instant::now() - Duration::from_secs(6));
        }
        policy.update_path(&g, g.node(c).unwrap(), gw);
        assert_eq!(
            g.node(c).unwrap().next_hop(gw),
            Some(a),
            "stale report must not cause a switch"
        );
    }

    #[test]
    fn small_improvement_does_not_commit() {
        let (mut g, c, a, _d, gw) = parallel_branches();
        // Enormous δ: even a saturated queue is not enough improvement.
        let params = LbParams {
            delta: 1_000_000.0,
            ..LbParams::default()
        };
        let policy = Arc::new(WcettLbPostRouting::new(params));
        g.set_policy(policy.clone());
        tables::populate_tables(&g);

        saturate(&g, a);
        policy.monitor_tick(&g, g.node(a).unwrap());
        policy.update_path(&g, g.node(c).unwrap(), gw);
        assert_eq!(g.node(c).unwrap().next_hop(gw), Some(a));
    }

    #[test]
    fn alternative_path_respects_avoid_set() {
        let (mut g, c, a, d, gw) = parallel_branches();
        let policy = Arc::new(WcettLbPostRouting::default());
        g.set_policy(policy.clone());
        tables::populate_tables(&g);

        let avoid: HashSet<NodeId> = [a].into_iter().collect();
        let alt = policy.alternative_path(&g, c, gw, &avoid).unwrap();
        assert_eq!(alt[1], d);
        assert!(!alt.contains(&a));

        // Avoiding both branches leaves nothing.
        let b = g.node(a).unwrap().neighbors()[1];
        let e = g.node(d).unwrap().neighbors()[1];
        let avoid: HashSet<NodeId> = [a, b, d, e].into_iter().collect();
        assert!(policy.alternative_path(&g, c, gw, &avoid).is_none());
    }
}
