//! End-to-end scenarios: full network lifecycle with real worker threads.
//!
//! These tests share the process-global id counters and spawn node workers,
//! so they serialize on one lock rather than racing each other.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use lattice_net::{ids, Graph, NetConfig, NetRunner, Role, RoutingPolicy, SendError};
use lattice_routing::{
    hop_count, install_policy, HopCountRouting, WcettLbPostRouting, WcettLbPreRouting,
    WcettRouting,
};
use lattice_sim::topology::Topology;
use lattice_sim::traffic::{self, TrafficConfig};

static SIM_LOCK: Mutex<()> = Mutex::new(());

fn serialized() -> MutexGuard<'static, ()> {
    SIM_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

fn quick_config() -> NetConfig {
    NetConfig {
        queue_process_time: Duration::from_millis(1),
        edge_delay_scale: 0.001,
        ..NetConfig::default()
    }
}

#[test]
fn hop_count_delivers_over_a_line() {
    let _guard = serialized();
    ids::reset();

    let mut g = Graph::with_config(quick_config());
    let gw = g.create_node(Role::Gateway);
    let r1 = g.create_node(Role::Router);
    let r2 = g.create_node(Role::Router);
    let client = g.create_node(Role::Client);
    g.add_edge(gw, r1, 100.0, 0.0);
    g.add_edge(r1, r2, 100.0, 0.0);
    g.add_edge(r2, client, 100.0, 0.0);
    install_policy(&mut g, Arc::new(HopCountRouting));

    let graph = Arc::new(g);
    let mut runner = NetRunner::start(Arc::clone(&graph));

    let packet = graph.send(client, gw).expect("loss-free line must deliver");
    assert_eq!(packet.route_taken, vec![client, r2, r1, gw]);
    assert!(packet.delivered_at.is_some());
    assert!(packet.transit_time().unwrap().as_secs_f64() > 0.0);

    // Every consecutive pair on the route is adjacent in the graph.
    for pair in packet.route_taken.windows(2) {
        assert!(
            graph.edge_between(pair[0], pair[1]).is_some(),
            "route hop {:?} has no edge",
            pair
        );
    }

    runner.shutdown();
}

#[test]
fn wcett_avoids_the_lossy_branch() {
    let _guard = serialized();
    ids::reset();

    // Diamond: gw-a and gw-b, a-c and b-c, c-client; the b branch is lossy.
    let mut g = Graph::with_config(quick_config());
    let gw = g.create_node(Role::Gateway);
    let a = g.create_node(Role::Router);
    let b = g.create_node(Role::Router);
    let c = g.create_node(Role::Router);
    let client = g.create_node(Role::Client);
    g.add_edge_on_channel(gw, a, 100.0, 0.0, 1);
    g.add_edge_on_channel(gw, b, 100.0, 0.0, 1);
    g.add_edge_on_channel(a, c, 100.0, 0.0, 2);
    g.add_edge_on_channel(b, c, 100.0, 0.9, 2);
    g.add_edge_on_channel(c, client, 100.0, 0.0, 3);
    install_policy(&mut g, Arc::new(WcettRouting::default()));

    let graph = Arc::new(g);
    let mut runner = NetRunner::start(Arc::clone(&graph));

    for _ in 0..10 {
        let packet = graph.send(client, gw).expect("the clean branch is loss-free");
        assert!(
            packet.route_taken.contains(&a),
            "route {:?} should use the a branch",
            packet.route_taken
        );
        assert!(
            !packet.route_taken.contains(&b),
            "route {:?} should avoid the lossy b branch",
            packet.route_taken
        );
    }

    runner.shutdown();
}

#[test]
fn deactivated_edge_surfaces_as_terminal_failure() {
    let _guard = serialized();
    ids::reset();

    let mut g = Graph::with_config(quick_config());
    let gw = g.create_node(Role::Gateway);
    let r = g.create_node(Role::Router);
    let client = g.create_node(Role::Client);
    g.add_edge(gw, r, 100.0, 0.0);
    g.add_edge(r, client, 100.0, 0.0);
    install_policy(&mut g, Arc::new(HopCountRouting));

    let graph = Arc::new(g);
    let mut runner = NetRunner::start(Arc::clone(&graph));

    graph.send(client, gw).expect("sanity: route works while active");

    graph.edge_between(r, gw).unwrap().set_active(false);
    assert_eq!(
        graph.send(client, gw),
        Err(SendError::EdgeInactive),
        "non-loss failures are not retried away"
    );

    runner.shutdown();
}

#[test]
fn client_interior_yields_no_route() {
    let _guard = serialized();
    ids::reset();

    // The only physical path from src to the gateway transits another client.
    let mut g = Graph::with_config(quick_config());
    let gw = g.create_node(Role::Gateway);
    let leaf = g.create_node(Role::Client);
    let src = g.create_node(Role::Client);
    g.add_edge(gw, leaf, 100.0, 0.0);
    g.add_edge(leaf, src, 100.0, 0.0);
    install_policy(&mut g, Arc::new(HopCountRouting));

    let graph = Arc::new(g);
    assert_eq!(graph.send(src, gw), Err(SendError::NoRouteFound));
}

#[test]
fn gatewayless_topology_fails_before_traffic() {
    let _guard = serialized();
    ids::reset();

    let mut g = Graph::with_config(quick_config());
    let c = g.create_node(Role::Client);
    let r = g.create_node(Role::Router);
    g.add_edge(c, r, 100.0, 0.0);
    install_policy(&mut g, Arc::new(HopCountRouting));

    let graph = Arc::new(g);
    let err = traffic::run(&graph, &TrafficConfig::default()).unwrap_err();
    assert!(err.to_string().contains("no gateway"));
}

#[test]
fn total_loss_fails_every_send() {
    let _guard = serialized();
    ids::reset();

    let mut g = Graph::with_config(quick_config());
    let gw = g.create_node(Role::Gateway);
    let client = g.create_node(Role::Client);
    g.add_edge(client, gw, 100.0, 1.0);
    install_policy(&mut g, Arc::new(HopCountRouting));

    let graph = Arc::new(g);
    let mut runner = NetRunner::start(Arc::clone(&graph));
    let cfg = TrafficConfig {
        load_pps: 10.0,
        duration: Duration::from_secs(1),
        max_in_flight: 50,
        drain_timeout: Duration::from_secs(5),
    };
    let stats = traffic::run(&graph, &cfg).unwrap();
    runner.shutdown();

    assert!(stats.offered > 0);
    assert_eq!(stats.delivered, 0);
    assert_eq!(stats.error_rate(), 100.0);
    assert_eq!(stats.failures.get("max_tries").copied().unwrap_or(0), stats.offered);
}

#[test]
fn id_reset_reproduces_the_topology() {
    let _guard = serialized();

    ids::reset();
    let first = Topology::Small.build(quick_config());
    let first_ids = first.node_ids();
    let first_roles: Vec<Role> = first.nodes().map(|n| n.role()).collect();
    drop(first);

    ids::reset();
    let second = Topology::Small.build(quick_config());
    assert_eq!(second.node_ids(), first_ids, "id sequences repeat after a reset");
    let second_roles: Vec<Role> = second.nodes().map(|n| n.role()).collect();
    assert_eq!(second_roles, first_roles);
}

#[test]
fn hop_count_paths_are_never_longer() {
    let _guard = serialized();
    ids::reset();

    // Pinned channels so every policy sees the same deterministic graph.
    let mut g = Graph::with_config(quick_config());
    let gw = g.create_node(Role::Gateway);
    let r1 = g.create_node(Role::Router);
    let r2 = g.create_node(Role::Router);
    let r3 = g.create_node(Role::Router);
    let client = g.create_node(Role::Client);
    g.add_edge_on_channel(gw, r1, 20.0, 0.1, 1);
    g.add_edge_on_channel(gw, r2, 60.0, 0.1, 2);
    g.add_edge_on_channel(r1, r3, 50.0, 0.1, 3);
    g.add_edge_on_channel(r2, r3, 150.0, 0.1, 1);
    g.add_edge_on_channel(r1, r2, 80.0, 0.05, 2);
    g.add_edge_on_channel(client, r3, 45.0, 0.1, 3);

    let hop_len = hop_count::shortest_path(&g, client, gw)
        .expect("client can reach the gateway")
        .len();

    let wcett = WcettRouting::default();
    let wcett_len = wcett.best_path(&g, client, gw).unwrap().len();
    assert!(hop_len <= wcett_len, "hop count {hop_len} vs wcett {wcett_len}");

    let post = WcettLbPostRouting::default();
    post.compute_next_hop(&g, client, gw).unwrap();
    let post_len = post.cached_path(client, gw).unwrap().len();
    assert!(hop_len <= post_len, "hop count {hop_len} vs post {post_len}");

    let pre = WcettLbPreRouting::default();
    pre.compute_next_hop(&g, client, gw).unwrap();
    let pre_len = pre.cached_path(client, gw).unwrap().len();
    assert!(hop_len <= pre_len, "hop count {hop_len} vs pre {pre_len}");
}
