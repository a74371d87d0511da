use clap::{Parser, ValueEnum};
use routesim::{
    core::{Bytes, Link, NodeId, Package, PkgId, RoutingStrategy, SimSpec, SimTime},
    impls::{LinkStateRouting, SimpleQRouting},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Routing strategy
    #[arg(short, long, value_enum, default_value_t = Strategy::LinkState)]
    strategy: Strategy,

    /// Number of routers on the line
    #[arg(short, long, default_value_t = 4)]
    nodes: usize,

    /// Per-hop latency in seconds
    #[arg(short, long, default_value_t = 1.0)]
    latency: f64,

    /// Link bandwidth in bytes per second
    #[arg(short, long, default_value_t = 10)]
    bandwidth: u64,

    /// Package size in bytes
    #[arg(long, default_value_t = 5)]
    size: u64,

    /// Number of packages to send down the line
    #[arg(short, long, default_value_t = 3)]
    count: u64,

    /// Q-routing learning rate
    #[arg(long, default_value_t = 0.3)]
    learning_rate: f64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    LinkState,
    SimpleQ,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    anyhow::ensure!(args.nodes >= 2, "a line needs at least two routers");

    let nodes = (0..args.nodes).map(NodeId::new).collect::<Vec<_>>();
    let links = nodes
        .windows(2)
        .map(|w| Link::new(w[0], w[1], args.latency, args.bandwidth))
        .collect::<Vec<_>>();
    let spec = SimSpec::builder().nodes(nodes.clone()).links(links).build();

    let mut sim = spec.build(|_| -> Box<dyn RoutingStrategy> {
        match args.strategy {
            Strategy::LinkState => Box::new(LinkStateRouting::new()),
            Strategy::SimpleQ => Box::new(SimpleQRouting::new(args.learning_rate)),
        }
    })?;

    let first = nodes[0];
    let last = *nodes.last().expect("at least two nodes");
    for id in 0..args.count {
        let pkg = Package::builder()
            .id(PkgId::new(id))
            .src(first)
            .dst(last)
            .size(Bytes::new(args.size))
            .build();
        sim.inject(SimTime::new(id as f64), first, pkg)?;
    }
    log::info!(
        "sending {} packages of {}B from {first} to {last}",
        args.count,
        args.size
    );
    sim.run()?;

    for record in sim.records() {
        let path = record
            .pkg
            .path()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        println!(
            "package {} delivered at {}: {path}",
            record.pkg.id, record.time
        );
    }
    Ok(())
}
