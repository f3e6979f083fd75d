//! Topology container and the hop-by-hop send loop.
//!
//! The graph is built single-threaded (`&mut self`), then shared behind an
//! `Arc` for the running phase: [`Graph::send`] may be called concurrently
//! from many driver threads while per-node workers mutate congestion state
//! and routing tables. A forwarding task may observe a routing-table entry
//! from either side of a concurrent rewrite; both values are valid neighbor
//! ids, so packet progress stays well-formed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use rand::RngExt;
use tracing::{debug, error};

use crate::config::NetConfig;
use crate::edge::{Edge, CHANNELS};
use crate::error::SendError;
use crate::ids::{self, EdgeId, NodeId};
use crate::node::{Node, Role};
use crate::packet::Packet;
use crate::policy::{PolicyKind, RoutingPolicy};

/// A mesh network: nodes, undirected edges, and the active routing policy.
pub struct Graph {
    config: NetConfig,
    nodes: BTreeMap<NodeId, Arc<Node>>,
    edges: BTreeMap<EdgeId, Arc<Edge>>,
    policy: Option<Arc<dyn RoutingPolicy>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::with_config(NetConfig::default())
    }

    pub fn with_config(config: NetConfig) -> Self {
        Graph {
            config,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            policy: None,
        }
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    // ─── Construction ───────────────────────────────────────────────────

    /// Create a node with a fresh id.
    pub fn create_node(&mut self, role: Role) -> NodeId {
        let node = Node::new(ids::next_node_id(), role, &self.config);
        let id = node.id();
        self.nodes.insert(id, Arc::new(node));
        id
    }

    /// Connect `a` and `b` with a fresh edge on a randomly drawn channel.
    ///
    /// A no-op returning `None` when the nodes are already adjacent (there is
    /// exactly one edge per unordered pair) or either id is unknown.
    pub fn add_edge(
        &mut self,
        a: NodeId,
        b: NodeId,
        bandwidth_mbps: f64,
        loss_rate: f64,
    ) -> Option<EdgeId> {
        let channel = rand::rng().random_range(CHANNELS);
        self.add_edge_on_channel(a, b, bandwidth_mbps, loss_rate, channel)
    }

    /// [`Graph::add_edge`] with a pinned channel, for topologies and tests
    /// that need a deterministic channel layout.
    pub fn add_edge_on_channel(
        &mut self,
        a: NodeId,
        b: NodeId,
        bandwidth_mbps: f64,
        loss_rate: f64,
        channel: u8,
    ) -> Option<EdgeId> {
        let node_a = self.nodes.get(&a)?;
        let node_b = self.nodes.get(&b)?;
        if node_a.is_neighbor(b) {
            return None;
        }
        let edge = Edge::new(ids::next_edge_id(), a, b, bandwidth_mbps, loss_rate, channel);
        let id = edge.id();
        node_a.add_neighbor(b);
        node_b.add_neighbor(a);
        self.edges.insert(id, Arc::new(edge));
        Some(id)
    }

    // ─── Lookup ─────────────────────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> Option<&Arc<Node>> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Arc<Node>> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Arc<Edge>> {
        self.edges.get(&id)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Arc<Edge>> {
        self.edges.values()
    }

    /// The unique edge between `a` and `b` in either orientation.
    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<&Arc<Edge>> {
        self.edges.values().find(|e| e.connects(a, b))
    }

    /// Ids of all nodes with the given role, in id order.
    pub fn nodes_with_role(&self, role: Role) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.role() == role)
            .map(|n| n.id())
            .collect()
    }

    /// Edges along a node-id path, or `None` if a consecutive pair has no
    /// connecting edge.
    pub fn path_edges(&self, path: &[NodeId]) -> Option<Vec<Arc<Edge>>> {
        path.windows(2)
            .map(|w| self.edge_between(w[0], w[1]).cloned())
            .collect()
    }

    // ─── Policy ─────────────────────────────────────────────────────────

    pub fn set_policy(&mut self, policy: Arc<dyn RoutingPolicy>) {
        self.policy = Some(policy);
    }

    pub fn policy(&self) -> Option<&Arc<dyn RoutingPolicy>> {
        self.policy.as_ref()
    }

    // ─── Forwarding ─────────────────────────────────────────────────────

    /// Walk a fresh data packet from `src` to `dst` hop by hop, following
    /// each node's routing table.
    ///
    /// Stochastic losses are retried per hop up to the configured budget;
    /// any other failure aborts the send. On success the returned packet
    /// carries its route trace and delivery timestamp.
    pub fn send(&self, src: NodeId, dst: NodeId) -> Result<Packet, SendError> {
        let src_node = self.nodes.get(&src).ok_or(SendError::InvalidNodeId)?;
        let dst_node = self.nodes.get(&dst).ok_or(SendError::InvalidNodeId)?;

        let mut packet = Packet::data(src, dst, self.config.data_packet_size);
        packet.route_taken.push(src);

        let wait_for_acks = self
            .policy
            .as_ref()
            .is_some_and(|p| p.kind() == PolicyKind::WcettLbPre);

        let mut current = Arc::clone(src_node);
        while current.id() != dst {
            let hop = current.next_hop(dst).ok_or(SendError::NoRouteFound)?;
            let next = self
                .nodes
                .get(&hop)
                .ok_or(SendError::NodesNotConnected)?;
            let edge = self
                .edge_between(current.id(), hop)
                .ok_or(SendError::NodesNotConnected)?;

            // Stale ACKs from earlier hops would satisfy the wait below.
            current.purge_acks();

            let mut delivered = false;
            for attempt in 0..self.config.hop_retries {
                match edge.transmit(&self.config, &current, next, &packet) {
                    Ok(()) => {
                        delivered = true;
                        break;
                    }
                    Err(SendError::PacketLoss) => {
                        debug!(
                            packet = %packet.id,
                            edge = %edge.id(),
                            attempt,
                            "packet lost on edge, retrying"
                        );
                    }
                    Err(err) => {
                        error!(packet = %packet.id, edge = %edge.id(), %err, "hop failed");
                        return Err(err);
                    }
                }
            }
            if !delivered {
                return Err(SendError::MaxTries);
            }

            packet.route_taken.push(hop);
            current.record_sent(packet.id);

            if wait_for_acks {
                self.wait_for_ack(&current, hop, packet.src);
            }
            current = Arc::clone(next);
        }

        if dst_node.was_dropped(packet.id) {
            return Err(SendError::DroppedAtDestination);
        }
        packet.delivered_at = Some(Instant::now());
        Ok(packet)
    }

    /// Poll the hop sender's received list for a matching acknowledgment,
    /// up to the configured deadline. The retry budget above still bounds
    /// attempts, so an absent ACK does not fail the hop.
    fn wait_for_ack(&self, sender: &Node, hop: NodeId, origin: NodeId) {
        let deadline = Instant::now() + self.config.ack_timeout;
        while Instant::now() < deadline {
            if sender.has_ack(hop, origin) {
                return;
            }
            thread::sleep(self.config.ack_poll_interval);
        }
        debug!(node = %sender.id(), %hop, "no ACK within deadline");
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
