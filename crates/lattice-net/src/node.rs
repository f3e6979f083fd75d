//! Node state: bounded inbound queue, routing table, congestion bookkeeping.
//!
//! A node owns no threads itself — the [`crate::runtime`] module spawns its
//! processing and congestion-monitor workers and hands them the graph, so the
//! node carries only its id, its queue, and its mutable state behind locks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::debug;

use crate::config::NetConfig;
use crate::error::SendError;
use crate::ids::{NodeId, PacketId};
use crate::packet::{Packet, PacketKind};

/// Role of a node in the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Internet gateway; terminates client traffic.
    Gateway,
    /// Interior mesh router.
    Router,
    /// Leaf; only ever an endpoint of a path.
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Gateway => "gateway",
            Role::Router => "router",
            Role::Client => "client",
        }
    }
}

/// A message waiting in a node's inbound queue: the packet and the id of the
/// node that put it there.
pub type Inbound = (Packet, NodeId);

/// Record of a packet the node refused or discarded.
#[derive(Debug, Clone)]
pub struct DroppedPacket {
    pub packet_id: PacketId,
    pub src: NodeId,
    pub dst: NodeId,
    pub at: Instant,
    pub reason: SendError,
}

/// Congestion bookkeeping shared by both load-balancing variants.
///
/// Plain runs leave this at its default; the reactive variant drives
/// `congested`/`reported`, the predictive variant drives `predicted` and the
/// multicast clock.
#[derive(Debug, Clone, Default)]
pub struct CongestionState {
    /// Reactive: the node's queue pressure crossed the threshold.
    pub congested: bool,
    /// Reactive: a fresh congestion report is outstanding.
    pub reported: bool,
    /// When `congested` or `predicted` last flipped.
    pub last_change: Option<Instant>,
    /// Queue depth observed at the last monitor tick.
    pub last_queue_len: usize,
    /// ql/b signal observed at the last monitor tick.
    pub last_signal: f64,
    /// Predictive: congestion is forecast for this node.
    pub predicted: bool,
    /// Predictive: when advisories were last multicast.
    pub last_multicast: Option<Instant>,
}

/// One entry of a predictive advisory: a cached path and its metric.
#[derive(Debug, Clone)]
pub struct AdvisedPath {
    pub dst: NodeId,
    pub path: Vec<NodeId>,
    pub metric: f64,
}

/// A predictive-variant advisory multicast from a parent node.
#[derive(Debug, Clone)]
pub struct Advisory {
    pub paths: Vec<AdvisedPath>,
    pub received_at: Instant,
    pub state_changed: bool,
}

/// A mesh node.
pub struct Node {
    id: NodeId,
    role: Role,
    neighbors: RwLock<Vec<NodeId>>,
    routing_table: RwLock<HashMap<NodeId, NodeId>>,
    inbound_tx: Sender<Inbound>,
    inbound_rx: Receiver<Inbound>,
    queue_capacity: usize,
    received: Mutex<Vec<Packet>>,
    dropped: Mutex<Vec<DroppedPacket>>,
    sent_at: Mutex<HashMap<PacketId, Instant>>,
    congestion: Mutex<CongestionState>,
    advisories: Mutex<HashMap<NodeId, Advisory>>,
    running: AtomicBool,
}

impl Node {
    pub(crate) fn new(id: NodeId, role: Role, config: &NetConfig) -> Self {
        let capacity = config.buffer_capacity(role);
        let (inbound_tx, inbound_rx) = bounded(capacity);
        Node {
            id,
            role,
            neighbors: RwLock::new(Vec::new()),
            routing_table: RwLock::new(HashMap::new()),
            inbound_tx,
            inbound_rx,
            queue_capacity: capacity,
            received: Mutex::new(Vec::new()),
            dropped: Mutex::new(Vec::new()),
            sent_at: Mutex::new(HashMap::new()),
            congestion: Mutex::new(CongestionState::default()),
            advisories: Mutex::new(HashMap::new()),
            running: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    // ─── Adjacency ──────────────────────────────────────────────────────

    pub(crate) fn add_neighbor(&self, id: NodeId) {
        self.neighbors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(id);
    }

    /// Neighbor ids in insertion order.
    pub fn neighbors(&self) -> Vec<NodeId> {
        self.neighbors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_neighbor(&self, id: NodeId) -> bool {
        self.neighbors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&id)
    }

    // ─── Routing table ──────────────────────────────────────────────────

    /// Next hop toward `dst`, if the table has one.
    pub fn next_hop(&self, dst: NodeId) -> Option<NodeId> {
        self.routing_table
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&dst)
            .copied()
    }

    pub fn set_next_hop(&self, dst: NodeId, hop: NodeId) {
        self.routing_table
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(dst, hop);
    }

    /// Destinations currently present in the routing table.
    pub fn destinations(&self) -> Vec<NodeId> {
        let mut dsts: Vec<NodeId> = self
            .routing_table
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect();
        dsts.sort_unstable();
        dsts
    }

    /// Full copy of the routing table, sorted by destination.
    pub fn table_snapshot(&self) -> Vec<(NodeId, NodeId)> {
        let mut entries: Vec<(NodeId, NodeId)> = self
            .routing_table
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(d, h)| (*d, *h))
            .collect();
        entries.sort_unstable();
        entries
    }

    // ─── Queue ──────────────────────────────────────────────────────────

    pub fn queue_len(&self) -> usize {
        self.inbound_rx.len()
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub(crate) fn receiver(&self) -> Receiver<Inbound> {
        self.inbound_rx.clone()
    }

    /// Accept a packet arriving over an edge.
    ///
    /// ACKs bypass the queue and land directly on the received list — senders
    /// block on them, so they must never be lost to buffer pressure. Data
    /// packets take a non-blocking enqueue; a full queue drops the packet
    /// with reason `buffer_full` and returns `false`.
    pub fn receive(&self, packet: Packet, sender: NodeId) -> bool {
        if packet.kind == PacketKind::Ack {
            self.push_received(packet);
            return true;
        }
        match self.inbound_tx.try_send((packet, sender)) {
            Ok(()) => true,
            Err(TrySendError::Full((packet, _))) => {
                debug!(node = %self.id, packet = %packet.id, "dropping packet, buffer full");
                self.record_drop(&packet, SendError::BufferFull);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Hand an acknowledgment to this node (the sender of the acked hop).
    ///
    /// Tries the queue first so the ACK flows through normal processing; if
    /// the queue is saturated it is appended to the received list directly
    /// rather than dropped.
    pub(crate) fn deliver_ack(&self, ack: Packet, from: NodeId) {
        if let Err(TrySendError::Full((ack, _)) | TrySendError::Disconnected((ack, _))) =
            self.inbound_tx.try_send((ack, from))
        {
            self.push_received(ack);
        }
    }

    // ─── Bookkeeping ────────────────────────────────────────────────────

    pub(crate) fn push_received(&self, packet: Packet) {
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(packet);
    }

    pub fn received_count(&self) -> usize {
        self.received.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Remove stale ACKs from the received list before a new hop.
    pub fn purge_acks(&self) {
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|p| p.kind != PacketKind::Ack);
    }

    /// Whether an ACK from `from` addressed to `to` has arrived.
    pub fn has_ack(&self, from: NodeId, to: NodeId) -> bool {
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|p| p.kind == PacketKind::Ack && p.src == from && p.dst == to)
    }

    pub(crate) fn record_drop(&self, packet: &Packet, reason: SendError) {
        self.dropped
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(DroppedPacket {
                packet_id: packet.id,
                src: packet.src,
                dst: packet.dst,
                at: Instant::now(),
                reason,
            });
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn was_dropped(&self, id: PacketId) -> bool {
        self.dropped
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|d| d.packet_id == id)
    }

    pub fn record_sent(&self, id: PacketId) {
        self.sent_at
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Instant::now());
    }

    pub fn sent_count(&self) -> usize {
        self.sent_at.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    // ─── Congestion state ───────────────────────────────────────────────

    pub fn congestion(&self) -> MutexGuard<'_, CongestionState> {
        self.congestion.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn advisories(&self) -> MutexGuard<'_, HashMap<NodeId, Advisory>> {
        self.advisories.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("queue_len", &self.queue_len())
            .field("running", &self.is_running())
            .finish()
    }
}
