//! The packet transit record.

use std::time::{Duration, Instant};

use crate::ids::{self, NodeId, PacketId};

/// Payload class of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Data,
    Ack,
}

/// A packet in transit.
///
/// The driver owns the canonical copy and appends to `route_taken` on every
/// successful hop; node queues and received lists hold clones. Invariants:
/// `route_taken[0]` is the source, and `delivered_at` is set exactly when the
/// last element of `route_taken` is the destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub id: PacketId,
    pub src: NodeId,
    pub dst: NodeId,
    /// Size in bytes.
    pub size: u32,
    pub kind: PacketKind,
    pub created_at: Instant,
    pub delivered_at: Option<Instant>,
    pub route_taken: Vec<NodeId>,
}

impl Packet {
    /// Create a data packet. The route trace starts empty; the driver appends
    /// the source before the first hop.
    pub fn data(src: NodeId, dst: NodeId, size: u32) -> Self {
        Packet {
            id: ids::next_packet_id(),
            src,
            dst,
            size,
            kind: PacketKind::Data,
            created_at: Instant::now(),
            delivered_at: None,
            route_taken: Vec::new(),
        }
    }

    /// Create an acknowledgment. ACKs carry no payload and are never
    /// forwarded; the receiver of a data packet addresses one to the packet's
    /// original source.
    pub fn ack(from: NodeId, to: NodeId, size: u32) -> Self {
        Packet {
            id: ids::next_packet_id(),
            src: from,
            dst: to,
            size,
            kind: PacketKind::Ack,
            created_at: Instant::now(),
            delivered_at: None,
            route_taken: Vec::new(),
        }
    }

    /// End-to-end transit time, if the packet was delivered.
    pub fn transit_time(&self) -> Option<Duration> {
        self.delivered_at.map(|d| d.duration_since(self.created_at))
    }
}
