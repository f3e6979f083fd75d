//! The seam between the node runtime and routing implementations.
//!
//! Routing lives in its own crate; the runtime only needs three operations
//! from it, plus a tag so variant-specific behavior (ACK waits, feedback) can
//! be gated without downcasting. The graph holds the active policy as a
//! shared trait object and workers receive it by argument — nodes keep no
//! back-reference to either.

use std::collections::HashSet;
use std::fmt;

use crate::graph::Graph;
use crate::ids::NodeId;
use crate::node::Node;

/// Which routing algorithm a policy implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    HopCount,
    Wcett,
    WcettLbPost,
    WcettLbPre,
}

impl PolicyKind {
    /// Stable label used in reports and filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::HopCount => "hop_count",
            PolicyKind::Wcett => "wcett",
            PolicyKind::WcettLbPost => "wcett_lb_post",
            PolicyKind::WcettLbPre => "wcett_lb_pre",
        }
    }

    /// Whether this policy participates in congestion feedback.
    pub fn is_load_balanced(&self) -> bool {
        matches!(self, PolicyKind::WcettLbPost | PolicyKind::WcettLbPre)
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A routing policy.
///
/// `compute_next_hop` is mandatory; the remaining hooks default to no-ops
/// and are only meaningful for the load-balancing variants.
pub trait RoutingPolicy: Send + Sync {
    fn kind(&self) -> PolicyKind;

    /// First hop from `src` toward `dst`, or `None` when no usable route
    /// exists (including `src == dst`).
    fn compute_next_hop(&self, graph: &Graph, src: NodeId, dst: NodeId) -> Option<NodeId>;

    /// Best path from `src` to `dst` whose interior avoids `avoid`.
    fn alternative_path(
        &self,
        _graph: &Graph,
        _src: NodeId,
        _dst: NodeId,
        _avoid: &HashSet<NodeId>,
    ) -> Option<Vec<NodeId>> {
        None
    }

    /// Called by a node's congestion-monitor worker once per cadence, before
    /// any path updates.
    fn monitor_tick(&self, _graph: &Graph, _node: &Node) {}

    /// Reassess the route from `node` to `dst`, switching the node's routing
    /// table if the policy decides an alternative is sufficiently better.
    fn update_path(&self, _graph: &Graph, _node: &Node, _dst: NodeId) {}
}
