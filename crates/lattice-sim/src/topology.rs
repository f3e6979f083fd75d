//! Reference topologies.
//!
//! Two fixed meshes used for algorithm comparisons: a small single-gateway
//! network and a bigger dual-gateway network with engineered bottlenecks and
//! diverse link quality. Node creation order is significant — adjacency
//! lists, and therefore path enumeration order, follow it.

use lattice_net::{Graph, NetConfig, Role};

/// Which reference mesh to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// 1 gateway, 6 routers, 6 clients.
    Small,
    /// 2 gateways, 10 routers, 6 clients.
    Big,
}

impl Topology {
    /// Integer key used on the command line: 0 = small, 1 = big.
    pub fn from_key(key: u8) -> Option<Self> {
        match key {
            0 => Some(Topology::Small),
            1 => Some(Topology::Big),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Topology::Small => "small",
            Topology::Big => "big",
        }
    }

    /// Build this topology with the given runtime configuration.
    pub fn build(&self, config: NetConfig) -> Graph {
        match self {
            Topology::Small => build_small(config),
            Topology::Big => build_big(config),
        }
    }
}

/// Single-gateway mesh: clients hang off the router fringe.
fn build_small(config: NetConfig) -> Graph {
    let mut g = Graph::with_config(config);

    let igw = g.create_node(Role::Gateway);
    let mr1 = g.create_node(Role::Router);
    let mr2 = g.create_node(Role::Router);
    let mr3 = g.create_node(Role::Router);
    let mr4 = g.create_node(Role::Router);
    let mr5 = g.create_node(Role::Router);
    let mr6 = g.create_node(Role::Router);
    let c7 = g.create_node(Role::Client);
    let c8 = g.create_node(Role::Client);
    let c9 = g.create_node(Role::Client);
    let c10 = g.create_node(Role::Client);
    let c11 = g.create_node(Role::Client);
    let c12 = g.create_node(Role::Client);

    g.add_edge(igw, mr1, 20.0, 0.1);
    g.add_edge(igw, mr2, 60.0, 0.1);
    g.add_edge(igw, mr3, 40.0, 0.1);

    g.add_edge(mr1, mr4, 20.0, 0.1);
    g.add_edge(mr2, mr5, 150.0, 0.1);
    g.add_edge(mr3, mr6, 5.0, 0.1);
    g.add_edge(mr4, mr5, 150.0, 0.1);
    g.add_edge(mr5, mr6, 70.0, 0.1);

    g.add_edge(c7, mr1, 45.0, 0.1);
    g.add_edge(c7, mr4, 55.0, 0.1);
    g.add_edge(c8, mr1, 45.0, 0.1);
    g.add_edge(c8, mr5, 180.0, 0.1);
    g.add_edge(c9, mr4, 55.0, 0.1);
    g.add_edge(c10, mr6, 35.0, 0.1);
    g.add_edge(c10, mr5, 180.0, 0.1);
    g.add_edge(c11, mr3, 45.0, 0.1);
    g.add_edge(c11, mr6, 75.0, 0.1);
    g.add_edge(c12, mr3, 45.0, 0.1);

    g
}

/// Dual-gateway mesh with strategic bottlenecks (the 40 Mbps / 12% loss
/// gateway link, the thin mr6–mr7 hop) to give load balancing something to
/// work around.
fn build_big(config: NetConfig) -> Graph {
    let mut g = Graph::with_config(config);

    let igw0 = g.create_node(Role::Gateway);
    let igw1 = g.create_node(Role::Gateway);
    let mr2 = g.create_node(Role::Router);
    let mr3 = g.create_node(Role::Router);
    let mr4 = g.create_node(Role::Router);
    let mr5 = g.create_node(Role::Router);
    let mr6 = g.create_node(Role::Router);
    let mr7 = g.create_node(Role::Router);
    let mr8 = g.create_node(Role::Router);
    let mr9 = g.create_node(Role::Router);
    let mr10 = g.create_node(Role::Router);
    let mr11 = g.create_node(Role::Router);
    let c12 = g.create_node(Role::Client);
    let c13 = g.create_node(Role::Client);
    let c14 = g.create_node(Role::Client);
    let c15 = g.create_node(Role::Client);
    let c16 = g.create_node(Role::Client);
    let c17 = g.create_node(Role::Client);

    g.add_edge(igw0, igw1, 350.0, 0.01);

    g.add_edge(igw0, mr2, 180.0, 0.02);
    g.add_edge(igw0, mr3, 220.0, 0.02);
    g.add_edge(igw1, mr3, 200.0, 0.02);
    g.add_edge(igw1, mr4, 40.0, 0.12);
    g.add_edge(igw1, mr5, 190.0, 0.03);

    g.add_edge(mr2, mr3, 180.0, 0.03);
    g.add_edge(mr2, mr6, 120.0, 0.05);
    g.add_edge(mr3, mr4, 100.0, 0.05);
    g.add_edge(mr3, mr6, 160.0, 0.15);
    g.add_edge(mr4, mr5, 130.0, 0.04);
    g.add_edge(mr4, mr7, 60.0, 0.06);
    g.add_edge(mr4, mr8, 50.0, 0.08);
    g.add_edge(mr4, mr9, 35.0, 0.10);
    g.add_edge(mr6, mr7, 25.0, 0.08);
    g.add_edge(mr6, mr10, 180.0, 0.06);
    g.add_edge(mr7, mr8, 140.0, 0.05);
    g.add_edge(mr8, mr10, 160.0, 0.04);
    g.add_edge(mr8, mr11, 140.0, 0.06);
    g.add_edge(mr9, mr11, 150.0, 0.05);

    g.add_edge(c12, mr2, 80.0, 0.15);
    g.add_edge(c12, mr6, 85.0, 0.18);
    g.add_edge(c13, mr6, 75.0, 0.15);
    g.add_edge(c13, mr10, 90.0, 0.20);
    g.add_edge(c14, mr10, 85.0, 0.15);
    g.add_edge(c14, mr7, 70.0, 0.18);
    g.add_edge(c14, mr8, 80.0, 0.15);
    g.add_edge(c15, mr10, 80.0, 0.16);
    g.add_edge(c15, mr8, 75.0, 0.14);
    g.add_edge(c15, mr11, 85.0, 0.17);
    g.add_edge(c16, mr11, 80.0, 0.15);
    g.add_edge(c16, mr9, 75.0, 0.16);
    g.add_edge(c17, mr9, 80.0, 0.15);
    g.add_edge(c17, mr5, 90.0, 0.18);

    g
}
