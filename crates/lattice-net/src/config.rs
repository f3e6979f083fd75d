//! Runtime tuning constants.
//!
//! Everything here was chosen empirically against the reference topologies;
//! none of it is load-bearing semantics. Defaults are calibrated so a router
//! saturates at roughly 20 packets per second.

use std::time::Duration;

use crate::node::Role;

/// Tunable constants for the network runtime.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Inbound queue capacity for gateway nodes.
    pub gateway_buffer: usize,
    /// Inbound queue capacity for router nodes.
    pub router_buffer: usize,
    /// Inbound queue capacity for client nodes.
    pub client_buffer: usize,
    /// Per-packet processing time at a router.
    pub queue_process_time: Duration,
    /// Gateways process this many times faster than routers.
    pub gateway_speedup: f64,
    /// Scale factor applied to `size / bandwidth` for the per-edge delay.
    pub edge_delay_scale: f64,
    /// Retry budget per hop for stochastic losses.
    pub hop_retries: u32,
    /// How long a sender waits for a hop acknowledgment.
    pub ack_timeout: Duration,
    /// Poll interval while waiting for an acknowledgment.
    pub ack_poll_interval: Duration,
    /// Cadence of the per-node congestion monitor.
    pub monitor_interval: Duration,
    /// Blocking-dequeue timeout of the processing worker.
    pub queue_recv_timeout: Duration,
    /// Upper bound on joining each worker thread at shutdown.
    pub join_timeout: Duration,
    /// Freshness window of a reactive congestion report.
    pub report_ttl: Duration,
    /// Freshness window of a predictive advisory.
    pub advisory_ttl: Duration,
    /// Predictive nodes re-multicast at least this often.
    pub multicast_interval: Duration,
    /// Payload size of generated data packets, in bytes.
    pub data_packet_size: u32,
    /// Size of acknowledgment packets, in bytes.
    pub ack_packet_size: u32,
}

impl Default for NetConfig {
    fn default() -> Self {
        NetConfig {
            gateway_buffer: 150,
            router_buffer: 75,
            client_buffer: 75,
            queue_process_time: Duration::from_millis(50),
            gateway_speedup: 100.0,
            edge_delay_scale: 0.01,
            hop_retries: 3,
            ack_timeout: Duration::from_millis(500),
            ack_poll_interval: Duration::from_millis(50),
            monitor_interval: Duration::from_secs(1),
            queue_recv_timeout: Duration::from_secs(1),
            join_timeout: Duration::from_secs(2),
            report_ttl: Duration::from_secs(5),
            advisory_ttl: Duration::from_secs(3),
            multicast_interval: Duration::from_secs(3),
            data_packet_size: 1024,
            ack_packet_size: 64,
        }
    }
}

impl NetConfig {
    /// Queue capacity for the given role.
    pub fn buffer_capacity(&self, role: Role) -> usize {
        match role {
            Role::Gateway => self.gateway_buffer,
            Role::Router => self.router_buffer,
            Role::Client => self.client_buffer,
        }
    }

    /// Per-packet processing delay for the given role.
    pub fn process_delay(&self, role: Role) -> Duration {
        match role {
            Role::Gateway => self.queue_process_time.div_f64(self.gateway_speedup),
            Role::Router | Role::Client => self.queue_process_time,
        }
    }
}
