//! End-to-end scenarios driving full simulations with both strategies.

use routesim_core::{Bytes, Link, NodeId, Package, PkgId, RoutingStrategy, SimSpec, SimTime};
use routing_impls::{LinkStateRouting, SimpleQRouting};

const A: NodeId = NodeId::new(0);
const B: NodeId = NodeId::new(1);
const C: NodeId = NodeId::new(2);
const D: NodeId = NodeId::new(3);

fn line(n: usize) -> (Vec<NodeId>, Vec<Link>) {
    let nodes = (0..n).map(NodeId::new).collect::<Vec<_>>();
    let links = nodes
        .windows(2)
        .map(|w| Link::new(w[0], w[1], 1.0, 10))
        .collect();
    (nodes, links)
}

fn pkg(id: u64, src: NodeId, dst: NodeId, size: u64) -> Package {
    Package::builder()
        .id(PkgId::new(id))
        .src(src)
        .dst(dst)
        .size(Bytes::new(size))
        .build()
}

fn link_state(_: NodeId) -> Box<dyn RoutingStrategy> {
    Box::new(LinkStateRouting::new())
}

fn simple_q(_: NodeId) -> Box<dyn RoutingStrategy> {
    Box::new(SimpleQRouting::new(0.3))
}

#[test]
fn three_node_line_finish_time() -> anyhow::Result<()> {
    // One packet of size 5 over two hops of latency 1 and bandwidth 10:
    // finish = 2 * (5/10) + 2 * 1 = 3.0, with a trace entry at each of the three routers.
    for strategy in [link_state, simple_q] {
        let (nodes, links) = line(3);
        let mut sim = SimSpec::builder()
            .nodes(nodes)
            .links(links)
            .build()
            .build(strategy)?;
        sim.inject(SimTime::ZERO, A, pkg(0, A, C, 5))?;
        sim.run()?;
        let records = sim.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].time, SimTime::new(3.0));
        assert_eq!(records[0].pkg.trace.len(), 3);
    }
    Ok(())
}

#[test]
fn link_state_routes_the_full_line() -> anyhow::Result<()> {
    let (nodes, links) = line(4);
    let mut sim = SimSpec::builder()
        .nodes(nodes.clone())
        .links(links)
        .build()
        .build(link_state)?;
    // Per-router, not just the aggregate: a partially-converged network must not slip through.
    for &n in &nodes {
        let router = sim.router(n).expect("router exists");
        assert!(
            router.is_converged(),
            "router {n} never saw every announcement"
        );
    }
    assert!(sim.is_converged(), "initial floods reach every router");
    sim.inject(SimTime::ZERO, A, pkg(0, A, D, 5))?;
    sim.run()?;
    let records = sim.records();
    assert_eq!(records.len(), 1);
    let path = records[0].pkg.path().collect::<Vec<_>>();
    insta::assert_yaml_snapshot!(path, @r###"
    ---
    - 0
    - 1
    - 2
    - 3
    "###);
    // three hops, each 5/10 transmission + 1 latency
    assert_eq!(records[0].time, SimTime::new(4.5));
    Ok(())
}

#[test]
fn link_state_reroutes_around_a_break_and_back() -> anyhow::Result<()> {
    // Diamond: A-B-D is cheap (latency 1 per hop), A-C-D is expensive (latency 3 per hop).
    let nodes = vec![A, B, C, D];
    let links = vec![
        Link::new(A, B, 1.0, 10),
        Link::new(B, D, 1.0, 10),
        Link::new(A, C, 3.0, 10),
        Link::new(C, D, 3.0, 10),
    ];
    let mut sim = SimSpec::builder()
        .nodes(nodes)
        .links(links)
        .build()
        .build(link_state)?;

    sim.inject(SimTime::ZERO, A, pkg(0, A, D, 5))?;
    sim.break_link(SimTime::new(10.0), A, B)?;
    sim.inject(SimTime::new(11.0), A, pkg(1, A, D, 5))?;
    sim.restore_link(SimTime::new(20.0), A, B)?;
    sim.inject(SimTime::new(21.0), A, pkg(2, A, D, 5))?;
    sim.run()?;

    let paths = sim
        .records()
        .iter()
        .map(|r| (r.pkg.id, r.pkg.path().collect::<Vec<_>>()))
        .collect::<Vec<_>>();
    assert_eq!(
        paths,
        vec![
            (PkgId::new(0), vec![A, B, D]),
            (PkgId::new(1), vec![A, C, D]),
            (PkgId::new(2), vec![A, B, D]),
        ]
    );
    Ok(())
}

#[test]
fn simple_q_delivers_every_package_exactly_once() -> anyhow::Result<()> {
    let (nodes, links) = line(4);
    let mut sim = SimSpec::builder()
        .nodes(nodes)
        .links(links)
        .build()
        .build(simple_q)?;
    for id in 0..10 {
        sim.inject(SimTime::new(id as f64 * 5.0), A, pkg(id, A, D, 5))?;
    }
    sim.run()?;
    let records = sim.records();
    assert_eq!(records.len(), 10);
    let mut ids = records.iter().map(|r| r.pkg.id).collect::<Vec<_>>();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 10, "every delivery is reported exactly once");
    Ok(())
}

#[test]
fn simple_q_learns_the_hop_time_on_a_line() -> anyhow::Result<()> {
    // On a 3-node line every hop is 5/10 transmission + 1 latency = 1.5; the true remaining
    // time from B is 1.5, and from A it is 3.0. Deliveries confirm the learned estimates are
    // being exercised: traffic keeps flowing down the only path while estimates settle.
    let (nodes, links) = line(3);
    let mut sim = SimSpec::builder()
        .nodes(nodes)
        .links(links)
        .build()
        .build(simple_q)?;
    for id in 0..40 {
        sim.inject(SimTime::new(id as f64 * 10.0), A, pkg(id, A, C, 5))?;
    }
    sim.run()?;
    let records = sim.records();
    assert_eq!(records.len(), 40);
    // Spacing (10s) far exceeds per-packet service time, so every packet sees an idle network
    // and the last ones finish in exactly the unloaded transit time.
    let last = records.last().unwrap();
    assert_eq!(last.time, SimTime::new(39.0 * 10.0 + 3.0));
    assert_eq!(last.pkg.path().collect::<Vec<_>>(), vec![A, B, C]);
    Ok(())
}

#[test]
fn full_logging_attaches_feature_snapshots() -> anyhow::Result<()> {
    for strategy in [link_state, simple_q] {
        let (nodes, links) = line(3);
        let mut sim = SimSpec::builder()
            .nodes(nodes)
            .links(links)
            .full_log(true)
            .build()
            .build(strategy)?;
        sim.inject(SimTime::ZERO, A, pkg(7, A, C, 5))?;
        sim.run()?;
        let trace = &sim.records()[0].pkg.trace;
        assert!(trace.iter().all(|hop| hop.features.is_some()));
        let features = trace[1].features.as_ref().unwrap();
        assert_eq!(features[1], 7.0, "snapshot carries the package id");
    }
    Ok(())
}
