//! Stochastic point-to-point edge transport.
//!
//! An edge is undirected: either endpoint may send toward the other. A send
//! draws against the loss rate, sleeps in proportion to `size / bandwidth`,
//! and delivers into the receiving node's bounded queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use rand::RngExt;

use crate::config::NetConfig;
use crate::error::SendError;
use crate::ids::{EdgeId, NodeId};
use crate::node::Node;
use crate::packet::Packet;

/// Radio channels an edge can be assigned at creation.
pub const CHANNELS: std::ops::RangeInclusive<u8> = 1..=3;

/// An undirected link between two nodes.
#[derive(Debug)]
pub struct Edge {
    id: EdgeId,
    endpoints: (NodeId, NodeId),
    /// Bandwidth in Mbps.
    bandwidth_mbps: f64,
    /// Loss probability per transmission attempt, in `[0, 1]`.
    loss_rate: f64,
    /// Channel label drawn at creation.
    channel: u8,
    active: AtomicBool,
}

impl Edge {
    pub(crate) fn new(
        id: EdgeId,
        a: NodeId,
        b: NodeId,
        bandwidth_mbps: f64,
        loss_rate: f64,
        channel: u8,
    ) -> Self {
        Edge {
            id,
            endpoints: (a, b),
            bandwidth_mbps,
            loss_rate,
            channel,
            active: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn endpoints(&self) -> (NodeId, NodeId) {
        self.endpoints
    }

    pub fn bandwidth_mbps(&self) -> f64 {
        self.bandwidth_mbps
    }

    pub fn loss_rate(&self) -> f64 {
        self.loss_rate
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Activate or deactivate the edge. Sends over an inactive edge fail
    /// with [`SendError::EdgeInactive`].
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Whether this edge connects `a` and `b` in either orientation.
    pub fn connects(&self, a: NodeId, b: NodeId) -> bool {
        let (x, y) = self.endpoints;
        (x == a && y == b) || (x == b && y == a)
    }

    fn is_endpoint(&self, id: NodeId) -> bool {
        self.endpoints.0 == id || self.endpoints.1 == id
    }

    /// Attempt one transmission of `packet` from `src` to `dst`.
    ///
    /// On success the packet has been accepted into `dst`'s queue before this
    /// returns. Stochastic losses surface as [`SendError::PacketLoss`] and
    /// are the caller's to retry.
    pub fn transmit(
        &self,
        config: &NetConfig,
        src: &Node,
        dst: &Node,
        packet: &Packet,
    ) -> Result<(), SendError> {
        if !self.is_active() {
            return Err(SendError::EdgeInactive);
        }
        if !self.is_endpoint(src.id()) {
            return Err(SendError::InvalidSrc);
        }
        if !self.is_endpoint(dst.id()) {
            return Err(SendError::InvalidDst);
        }
        if rand::rng().random::<f64>() < self.loss_rate {
            return Err(SendError::PacketLoss);
        }

        let tx = packet.size as f64 / self.bandwidth_mbps * config.edge_delay_scale;
        thread::sleep(Duration::from_secs_f64(tx));

        if dst.receive(packet.clone(), src.id()) {
            Ok(())
        } else {
            Err(SendError::BufferFull)
        }
    }
}
