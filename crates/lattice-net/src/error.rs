//! Per-send failure taxonomy.

use thiserror::Error;

/// Terminal outcome of a failed send, surfaced to the harness per packet.
///
/// `PacketLoss` is normally absorbed by the per-hop retry loop; a hop that
/// exhausts its retry budget surfaces as `MaxTries`. Every other variant
/// aborts the send at the hop where it occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// Source or destination id is not in the graph.
    #[error("invalid_node_id")]
    InvalidNodeId,
    /// The current node has no routing-table entry for the destination.
    #[error("no_route_found")]
    NoRouteFound,
    /// The routing table names a neighbor with no connecting edge.
    #[error("nodes_not_connected")]
    NodesNotConnected,
    /// The edge was deactivated.
    #[error("edge_inactive")]
    EdgeInactive,
    /// The sending node is not an endpoint of the edge.
    #[error("invalid_src")]
    InvalidSrc,
    /// The receiving node is not an endpoint of the edge.
    #[error("invalid_dst")]
    InvalidDst,
    /// Stochastic drop on the edge.
    #[error("packet_loss")]
    PacketLoss,
    /// The destination queue refused the packet.
    #[error("buffer_full")]
    BufferFull,
    /// The packet reached the destination but the receiver had dropped it.
    #[error("dropped_at_destination")]
    DroppedAtDestination,
    /// A hop exceeded its retry budget.
    #[error("max_tries")]
    MaxTries,
}

impl SendError {
    /// Stable snake_case label, used as the failure key in reports.
    pub fn reason(&self) -> &'static str {
        match self {
            SendError::InvalidNodeId => "invalid_node_id",
            SendError::NoRouteFound => "no_route_found",
            SendError::NodesNotConnected => "nodes_not_connected",
            SendError::EdgeInactive => "edge_inactive",
            SendError::InvalidSrc => "invalid_src",
            SendError::InvalidDst => "invalid_dst",
            SendError::PacketLoss => "packet_loss",
            SendError::BufferFull => "buffer_full",
            SendError::DroppedAtDestination => "dropped_at_destination",
            SendError::MaxTries => "max_tries",
        }
    }
}
