use rustc_hash::FxHashMap;

use crate::package::Package;
use crate::strategy::{RouterCtx, RoutingStrategy};
use crate::topology::{Link, LinkSpec, NodeId, Topology};

/// A line of `n` nodes with uniform latency 1 and bandwidth 10.
pub(crate) fn line_config(n: usize) -> (Vec<NodeId>, Vec<Link>) {
    let nodes = (0..n).map(NodeId::new).collect::<Vec<_>>();
    let links = nodes
        .windows(2)
        .map(|w| Link::new(w[0], w[1], 1.0, 10))
        .collect();
    (nodes, links)
}

/// The neighbor table of node `i` on a line of `n` nodes.
pub(crate) fn line_neighbors_of(n: usize, i: usize) -> FxHashMap<NodeId, LinkSpec> {
    let (nodes, links) = line_config(n);
    Topology::new(&nodes, &links)
        .expect("line topologies are valid")
        .neighbors_of(NodeId::new(i))
}

/// A strategy that forwards every package to one fixed neighbor. Just enough routing to
/// exercise the kernel.
#[derive(Debug)]
pub(crate) struct FixedStrategy {
    next_hop: NodeId,
}

impl FixedStrategy {
    pub(crate) fn to(next_hop: NodeId) -> Self {
        Self { next_hop }
    }
}

impl RoutingStrategy for FixedStrategy {
    fn route_package(&mut self, _ctx: &RouterCtx, _pkg: &Package) -> Option<NodeId> {
        Some(self.next_hop)
    }
}

/// A strategy that forwards by a per-destination table, like a frozen routing table.
#[derive(Debug, Default)]
pub(crate) struct TableStrategy {
    pub(crate) next_hops: FxHashMap<NodeId, NodeId>,
}

impl RoutingStrategy for TableStrategy {
    fn route_package(&mut self, _ctx: &RouterCtx, pkg: &Package) -> Option<NodeId> {
        self.next_hops.get(&pkg.dst).copied()
    }
}
