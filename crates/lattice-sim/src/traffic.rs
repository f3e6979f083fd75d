//! Rate-paced traffic generation and per-run aggregation.
//!
//! The generator keeps a monotonically advancing next-emit time and releases
//! a packet whenever wall time reaches it, advancing by `1/load`. Each packet
//! is driven by a short-lived worker thread; the number of in-flight workers
//! is capped, and the generator stalls briefly while the cap is full.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use crossbeam_channel::unbounded;
use rand::RngExt;
use tracing::{debug, info, warn};

use lattice_net::{Graph, PacketId, Role, SendError};

/// Offered-load parameters for one traffic run.
#[derive(Debug, Clone)]
pub struct TrafficConfig {
    /// Offered load in packets per second.
    pub load_pps: f64,
    /// How long to keep injecting.
    pub duration: Duration,
    /// Cap on concurrently in-flight forwarding tasks.
    pub max_in_flight: usize,
    /// How long to wait for stragglers after injection stops.
    pub drain_timeout: Duration,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        TrafficConfig {
            load_pps: 5.0,
            duration: Duration::from_secs(180),
            max_in_flight: 50,
            drain_timeout: Duration::from_secs(10),
        }
    }
}

/// Outcome of a single offered packet.
#[derive(Debug, Clone)]
struct PacketSample {
    packet_id: PacketId,
    outcome: Result<f64, SendError>,
}

/// Aggregated results of one traffic run.
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Packets offered to the network.
    pub offered: u64,
    /// Packets that reached their gateway.
    pub delivered: u64,
    /// Wall-clock span of the run, including the drain phase.
    pub elapsed: Duration,
    /// Failure counts keyed by taxonomy label.
    pub failures: BTreeMap<&'static str, u64>,
    /// Per-delivered-packet transit time, in seconds.
    pub transits: Vec<(PacketId, f64)>,
}

impl RunStats {
    /// Error rate as a percentage of offered packets.
    pub fn error_rate(&self) -> f64 {
        if self.offered == 0 {
            return 0.0;
        }
        (self.offered - self.delivered) as f64 / self.offered as f64 * 100.0
    }

    /// Goodput in Kbps for the given payload size.
    pub fn throughput_kbps(&self, packet_size: u32) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.delivered as f64 * packet_size as f64 * 8.0 / 1000.0 / secs
    }

    /// Mean end-to-end transit time in seconds over delivered packets.
    pub fn mean_transit(&self) -> f64 {
        if self.transits.is_empty() {
            return 0.0;
        }
        self.transits.iter().map(|(_, t)| t).sum::<f64>() / self.transits.len() as f64
    }
}

/// Inject uniform client→gateway data traffic at `config.load_pps` for
/// `config.duration`, then wait for in-flight packets to resolve.
pub fn run(graph: &Arc<Graph>, config: &TrafficConfig) -> Result<RunStats> {
    let clients = graph.nodes_with_role(Role::Client);
    let gateways = graph.nodes_with_role(Role::Gateway);
    if gateways.is_empty() {
        bail!("topology has no gateway nodes; refusing to generate traffic");
    }
    if clients.is_empty() {
        bail!("topology has no client nodes; refusing to generate traffic");
    }
    if config.load_pps <= 0.0 {
        bail!("offered load must be positive, got {}", config.load_pps);
    }

    let interval = Duration::from_secs_f64(1.0 / config.load_pps);
    let in_flight = Arc::new(AtomicUsize::new(0));
    let (sample_tx, sample_rx) = unbounded::<PacketSample>();

    let start = Instant::now();
    let mut next_emit = start;
    let mut offered = 0u64;

    while start.elapsed() < config.duration {
        let now = Instant::now();
        if now < next_emit {
            thread::sleep((next_emit - now).min(Duration::from_millis(5)));
            continue;
        }
        if in_flight.load(Ordering::Acquire) >= config.max_in_flight {
            // Concurrency cap reached; stall without advancing the clock so
            // pending emissions catch up once workers retire.
            thread::sleep(Duration::from_millis(1));
            continue;
        }

        let mut rng = rand::rng();
        let src = clients[rng.random_range(0..clients.len())];
        let dst = gateways[rng.random_range(0..gateways.len())];

        in_flight.fetch_add(1, Ordering::AcqRel);
        offered += 1;
        next_emit += interval;

        let graph = Arc::clone(graph);
        let in_flight = Arc::clone(&in_flight);
        let sample_tx = sample_tx.clone();
        thread::spawn(move || {
            let outcome = graph
                .send(src, dst)
                .map(|packet| (packet.id, packet.transit_time().unwrap_or_default()));
            let sample = match outcome {
                Ok((id, transit)) => PacketSample {
                    packet_id: id,
                    outcome: Ok(transit.as_secs_f64()),
                },
                Err(err) => {
                    debug!(%src, %dst, %err, "packet failed");
                    PacketSample {
                        packet_id: PacketId(0),
                        outcome: Err(err),
                    }
                }
            };
            let _ = sample_tx.send(sample);
            in_flight.fetch_sub(1, Ordering::AcqRel);
        });
    }
    drop(sample_tx);

    // Let stragglers resolve, bounded: a wedged worker must not hang the run.
    let drain_deadline = Instant::now() + config.drain_timeout;
    while in_flight.load(Ordering::Acquire) > 0 && Instant::now() < drain_deadline {
        thread::sleep(Duration::from_millis(10));
    }
    let unresolved = in_flight.load(Ordering::Acquire);
    if unresolved > 0 {
        warn!(unresolved, "in-flight packets did not resolve before the drain deadline");
    }

    let elapsed = start.elapsed();
    let mut stats = RunStats {
        offered,
        delivered: 0,
        elapsed,
        failures: BTreeMap::new(),
        transits: Vec::new(),
    };
    for sample in sample_rx.try_iter() {
        match sample.outcome {
            Ok(transit) => {
                stats.delivered += 1;
                stats.transits.push((sample.packet_id, transit));
            }
            Err(err) => {
                *stats.failures.entry(err.reason()).or_insert(0) += 1;
            }
        }
    }

    info!(
        offered = stats.offered,
        delivered = stats.delivered,
        error_rate = format!("{:.2}%", stats.error_rate()),
        elapsed = ?stats.elapsed,
        "traffic run complete"
    );
    Ok(stats)
}
