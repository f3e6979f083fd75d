//! Process-wide monotonic id allocation.
//!
//! Nodes, edges, and packets each draw from their own atomic counter, so ids
//! are unique and ordered by creation within a run. The harness calls
//! [`reset`] between algorithm runs (and tests call it for isolation) to make
//! id sequences reproducible.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NODE_IDS: AtomicU64 = AtomicU64::new(0);
static EDGE_IDS: AtomicU64 = AtomicU64::new(0);
static PACKET_IDS: AtomicU64 = AtomicU64::new(0);

/// Stable identifier of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

/// Stable identifier of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub u64);

/// Stable identifier of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PacketId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocate the next node id.
pub fn next_node_id() -> NodeId {
    NodeId(NODE_IDS.fetch_add(1, Ordering::Relaxed))
}

/// Allocate the next edge id.
pub fn next_edge_id() -> EdgeId {
    EdgeId(EDGE_IDS.fetch_add(1, Ordering::Relaxed))
}

/// Allocate the next packet id.
pub fn next_packet_id() -> PacketId {
    PacketId(PACKET_IDS.fetch_add(1, Ordering::Relaxed))
}

/// Reset all counters to zero.
///
/// Only safe between runs: ids handed out before the reset must no longer be
/// live when new ones are allocated.
pub fn reset() {
    NODE_IDS.store(0, Ordering::Relaxed);
    EDGE_IDS.store(0, Ordering::Relaxed);
    PACKET_IDS.store(0, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Counters are process-global and the test harness is multi-threaded, so
    // these assert ordering rather than exact values.

    #[test]
    fn ids_are_monotonic() {
        let a = next_node_id();
        let b = next_node_id();
        assert!(b.0 > a.0, "expected {b} > {a}");

        let a = next_edge_id();
        let b = next_edge_id();
        assert!(b.0 > a.0, "expected {b} > {a}");

        let a = next_packet_id();
        let b = next_packet_id();
        assert!(b.0 > a.0, "expected {b} > {a}");
    }

    #[test]
    fn ids_display_as_plain_integers() {
        assert_eq!(NodeId(7).to_string(), "7");
        assert_eq!(EdgeId(3).to_string(), "3");
        assert_eq!(PacketId(11).to_string(), "11");
    }
}
