//! Per-node worker threads and the network lifecycle.
//!
//! [`NetRunner::start`] spawns two threads per node: a processing worker that
//! drains the inbound queue and acknowledges data packets, and a congestion
//! monitor that re-evaluates the node's load signal and drives the active
//! policy's feedback hooks. Both poll the node's running flag at the queue
//! timeout granularity, so shutdown completes within one timeout per worker.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use tracing::{debug, trace, warn};

use crate::graph::Graph;
use crate::ids::NodeId;
use crate::node::Node;
use crate::packet::{Packet, PacketKind};

/// Handle over a started network. Shutting down (or dropping) the runner
/// stops every node worker and joins them within the configured bound.
pub struct NetRunner {
    graph: Arc<Graph>,
    handles: Vec<(NodeId, thread::JoinHandle<()>)>,
}

impl NetRunner {
    /// Start processing and congestion-monitor workers for every node.
    pub fn start(graph: Arc<Graph>) -> Self {
        let mut handles = Vec::with_capacity(graph.node_count() * 2);
        for node in graph.nodes() {
            node.set_running(true);

            let id = node.id();
            let g = Arc::clone(&graph);
            let n = Arc::clone(node);
            let proc_handle = thread::Builder::new()
                .name(format!("lattice-node-{id}-proc"))
                .spawn(move || process_loop(g, n))
                .expect("failed to spawn processing worker");
            handles.push((id, proc_handle));

            let g = Arc::clone(&graph);
            let n = Arc::clone(node);
            let mon_handle = thread::Builder::new()
                .name(format!("lattice-node-{id}-mon"))
                .spawn(move || monitor_loop(g, n))
                .expect("failed to spawn congestion monitor");
            handles.push((id, mon_handle));
        }
        NetRunner { graph, handles }
    }

    /// Stop all node workers and join them. Idempotent.
    pub fn shutdown(&mut self) {
        for node in self.graph.nodes() {
            node.set_running(false);
        }
        let join_timeout = self.graph.config().join_timeout;
        for (id, handle) in self.handles.drain(..) {
            let deadline = Instant::now() + join_timeout;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                warn!(node = %id, "worker did not stop within {join_timeout:?}, detaching");
            }
        }
    }
}

impl Drop for NetRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Graph {
    /// Start all node workers; convenience for [`NetRunner::start`].
    pub fn start_network(self: &Arc<Self>) -> NetRunner {
        NetRunner::start(Arc::clone(self))
    }
}

/// Drain the node's inbound queue: record, pace, and acknowledge.
fn process_loop(graph: Arc<Graph>, node: Arc<Node>) {
    let config = graph.config().clone();
    let rx = node.receiver();
    let delay = config.process_delay(node.role());

    while node.is_running() {
        match rx.recv_timeout(config.queue_recv_timeout) {
            Ok((packet, sender)) => {
                if packet.kind == PacketKind::Ack {
                    debug!(
                        node = %node.id(),
                        from = %packet.src,
                        "received ACK for packet to {}",
                        packet.dst
                    );
                }
                let is_data = packet.kind == PacketKind::Data;
                let origin = packet.src;
                node.push_received(packet);

                thread::sleep(delay);

                if is_data {
                    // The ACK is handed to the hop sender before the next
                    // message is taken off the queue.
                    let ack = Packet::ack(node.id(), origin, config.ack_packet_size);
                    match graph.node(sender) {
                        Some(sender_node) => sender_node.deliver_ack(ack, node.id()),
                        None => warn!(node = %node.id(), %sender, "ACK target unknown"),
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    trace!(node = %node.id(), "processing worker stopped");
}

/// Re-evaluate congestion once per cadence and let the policy react.
fn monitor_loop(graph: Arc<Graph>, node: Arc<Node>) {
    let interval = graph.config().monitor_interval;

    while node.is_running() {
        if let Some(policy) = graph.policy() {
            policy.monitor_tick(&graph, &node);
            node.congestion().last_queue_len = node.queue_len();
            for dst in node.destinations() {
                policy.update_path(&graph, &node, dst);
            }
        } else {
            node.congestion().last_queue_len = node.queue_len();
        }
        thread::sleep(interval);
    }
    trace!(node = %node.id(), "congestion monitor stopped");
}
