//! # lattice-sim
//!
//! Harness for the Lattice mesh simulator: builds a reference topology,
//! installs a routing policy, starts the network, injects rate-paced
//! client→gateway traffic across a load series, and aggregates error rate,
//! throughput, and transit time per load.
//!
//! ## Crate structure
//!
//! - [`topology`] — the `small` and `big` reference meshes
//! - [`traffic`] — rate-paced injection and per-run statistics
//! - [`report`] — JSON results document and transit-time CSVs
//! - [`config`] — TOML overrides for tuned constants

pub mod config;
pub mod report;
pub mod topology;
pub mod traffic;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use lattice_net::{ids, NetConfig, PacketId, PolicyKind, RoutingPolicy};
use lattice_routing::{
    install_policy, HopCountRouting, LbParams, WcettLbPostRouting, WcettLbPreRouting,
    WcettRouting,
};

use report::AlgoSeries;
use topology::Topology;
use traffic::TrafficConfig;

/// One of the comparable routing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    HopCount,
    Wcett,
    WcettLbPost,
    WcettLbPre,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::HopCount,
        Algorithm::Wcett,
        Algorithm::WcettLbPost,
        Algorithm::WcettLbPre,
    ];

    pub fn kind(&self) -> PolicyKind {
        match self {
            Algorithm::HopCount => PolicyKind::HopCount,
            Algorithm::Wcett => PolicyKind::Wcett,
            Algorithm::WcettLbPost => PolicyKind::WcettLbPost,
            Algorithm::WcettLbPre => PolicyKind::WcettLbPre,
        }
    }

    /// Report key and filename stem.
    pub fn label(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Instantiate the routing policy for this algorithm.
    pub fn make_policy(&self, params: LbParams) -> Arc<dyn RoutingPolicy> {
        match self {
            Algorithm::HopCount => Arc::new(HopCountRouting),
            Algorithm::Wcett => Arc::new(WcettRouting {
                packet_size: params.packet_size,
                beta: params.beta,
            }),
            Algorithm::WcettLbPost => Arc::new(WcettLbPostRouting::new(params)),
            Algorithm::WcettLbPre => Arc::new(WcettLbPreRouting::new(params)),
        }
    }
}

/// Everything needed to run one algorithm over the load series.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub topology: Topology,
    /// Offered loads, packets per second, one traffic run each.
    pub loads: Vec<f64>,
    /// Duration of each traffic run.
    pub duration: Duration,
    pub net_config: NetConfig,
    pub lb_params: LbParams,
    /// Concurrency cap on in-flight forwarding tasks.
    pub max_in_flight: usize,
}

/// Results of one algorithm over the whole load series.
#[derive(Debug, Clone)]
pub struct AlgoRun {
    pub series: AlgoSeries,
    /// Per-packet transit samples across all loads (LB variants only).
    pub transits: Vec<(PacketId, f64)>,
}

/// Derive the offered-load series from a base load.
pub fn load_series(base: f64) -> Vec<f64> {
    vec![base, base + 5.0, base + 15.0, base + 25.0, base + 30.0]
}

/// Build the topology fresh, install the policy, start the network, and run
/// traffic once per load. Id counters are reset so packet ids are comparable
/// across algorithms.
pub fn run_algorithm(algorithm: Algorithm, plan: &RunPlan) -> Result<AlgoRun> {
    ids::reset();
    let mut graph = plan.topology.build(plan.net_config.clone());
    install_policy(&mut graph, algorithm.make_policy(plan.lb_params));
    let graph = Arc::new(graph);
    let mut runner = graph.start_network();

    let mut series = AlgoSeries::default();
    let mut transits = Vec::new();
    let collect_transits = algorithm.kind().is_load_balanced();

    for &load in &plan.loads {
        info!(
            algorithm = algorithm.label(),
            load,
            duration = ?plan.duration,
            "starting traffic run"
        );
        let cfg = TrafficConfig {
            load_pps: load,
            duration: plan.duration,
            max_in_flight: plan.max_in_flight,
            drain_timeout: Duration::from_secs(10),
        };
        let stats = traffic::run(&graph, &cfg)?;
        series.er.push(stats.error_rate());
        series
            .throughput
            .push(stats.throughput_kbps(plan.net_config.data_packet_size));
        series.tx.push(stats.mean_transit());
        if collect_transits {
            transits.extend(stats.transits);
        }
    }

    runner.shutdown();
    Ok(AlgoRun { series, transits })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_series_increments() {
        assert_eq!(load_series(5.0), vec![5.0, 10.0, 20.0, 30.0, 35.0]);
        assert_eq!(load_series(1.0), vec![1.0, 6.0, 16.0, 26.0, 31.0]);
    }

    #[test]
    fn algorithm_labels_match_policy_kinds() {
        for algo in Algorithm::ALL {
            assert_eq!(algo.make_policy(LbParams::default()).kind(), algo.kind());
        }
    }

    #[test]
    fn only_lb_algorithms_collect_transits() {
        assert!(!Algorithm::HopCount.kind().is_load_balanced());
        assert!(!Algorithm::Wcett.kind().is_load_balanced());
        assert!(Algorithm::WcettLbPost.kind().is_load_balanced());
        assert!(Algorithm::WcettLbPre.kind().is_load_balanced());
    }
}
