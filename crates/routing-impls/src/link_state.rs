//! Link-state routing: topology discovery by flooding plus latency-weighted shortest paths.

use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use routesim_core::{
    AnnouncedLink, Announcement, Effect, NodeId, Package, RouterCtx, RoutingStrategy, SeqNo,
    ServiceMsg, SimTime,
};

/// Flooding-based link-state routing. Each router floods announcements describing its own link
/// states; everyone folds accepted announcements into a local latency-weighted graph and routes
/// along shortest paths. Topology changes propagate only by reflooding.
#[derive(Debug, Default)]
pub struct LinkStateRouting {
    graph: DiGraph<NodeId, SimTime>,
    idx: FxHashMap<NodeId, NodeIndex>,
    // Highest sequence number accepted per origin, self included.
    seen: FxHashMap<NodeId, SeqNo>,
    next_seq: SeqNo,
    nr_nodes: usize,
}

impl LinkStateRouting {
    pub fn new() -> Self {
        Self::default()
    }

    fn node_idx(&mut self, id: NodeId) -> NodeIndex {
        match self.idx.get(&id) {
            Some(&idx) => idx,
            None => {
                let idx = self.graph.add_node(id);
                self.idx.insert(id, idx);
                idx
            }
        }
    }

    /// Accepts `ann` iff its sequence number is strictly newer than the last one seen from its
    /// origin, folding the announced link states into the local graph. Stale and duplicate
    /// announcements are rejected and must not be reflooded.
    fn accept(&mut self, ann: &Announcement) -> bool {
        if let Some(&last) = self.seen.get(&ann.origin) {
            if ann.seq <= last {
                return false;
            }
        }
        self.seen.insert(ann.origin, ann.seq);
        let origin = self.node_idx(ann.origin);
        for &AnnouncedLink {
            neighbor,
            latency,
            alive,
        } in &ann.links
        {
            let neighbor = self.node_idx(neighbor);
            // Announcements describe the origin's outgoing direction only; the neighbor's own
            // announcement covers the reverse edge.
            match self.graph.find_edge(origin, neighbor) {
                Some(edge) if alive => self.graph[edge] = latency,
                Some(edge) => {
                    self.graph.remove_edge(edge);
                }
                None if alive => {
                    self.graph.add_edge(origin, neighbor, latency);
                }
                None => {}
            }
        }
        true
    }

    /// Builds an announcement for the current local link states, applies it locally, and floods
    /// it to every neighbor except `skip`.
    fn announce(&mut self, ctx: &RouterCtx, skip: Option<NodeId>) -> Vec<Effect> {
        let links = ctx
            .neighbors
            .iter()
            .map(|(&neighbor, spec)| AnnouncedLink {
                neighbor,
                latency: spec.latency,
                alive: ctx.link_states[&neighbor].alive,
            })
            .collect();
        let ann = Announcement {
            origin: ctx.addr,
            seq: self.next_seq,
            links,
        };
        self.next_seq += SeqNo::ONE;
        let accepted = self.accept(&ann);
        debug_assert!(accepted, "own announcements are always newer");
        self.broadcast(ctx, &ann, skip)
    }

    fn broadcast(&self, ctx: &RouterCtx, ann: &Announcement, skip: Option<NodeId>) -> Vec<Effect> {
        let mut neighbors = ctx.neighbors.keys().copied().collect::<Vec<_>>();
        neighbors.sort();
        neighbors
            .into_iter()
            .filter(|&n| Some(n) != skip)
            .map(|to| Effect::Service {
                to,
                msg: ServiceMsg::LinkState(ann.clone()),
            })
            .collect()
    }
}

impl RoutingStrategy for LinkStateRouting {
    fn on_init(&mut self, ctx: &RouterCtx) -> Vec<Effect> {
        self.nr_nodes = ctx.nodes.len();
        for &node in ctx.nodes {
            self.node_idx(node);
        }
        self.announce(ctx, None)
    }

    fn route_package(&mut self, ctx: &RouterCtx, pkg: &Package) -> Option<NodeId> {
        let start = *self.idx.get(&ctx.addr)?;
        let goal = *self.idx.get(&pkg.dst)?;
        let (_, path) = astar(
            &self.graph,
            start,
            |n| n == goal,
            |e| *e.weight(),
            |_| SimTime::ZERO,
        )?;
        path.get(1).map(|&idx| self.graph[idx])
    }

    fn on_service_message(&mut self, ctx: &RouterCtx, sender: NodeId, msg: &ServiceMsg) -> Vec<Effect> {
        let ServiceMsg::LinkState(ann) = msg else {
            return Vec::new();
        };
        if !self.accept(ann) {
            return Vec::new();
        }
        self.broadcast(ctx, ann, Some(sender))
    }

    fn on_link_break(&mut self, ctx: &RouterCtx, neighbor: NodeId) -> Vec<Effect> {
        log::debug!("router {}: reflooding after break of link to {neighbor}", ctx.addr);
        self.announce(ctx, None)
    }

    fn on_link_restore(&mut self, ctx: &RouterCtx, neighbor: NodeId) -> Vec<Effect> {
        log::debug!(
            "router {}: reflooding after restore of link to {neighbor}",
            ctx.addr
        );
        self.announce(ctx, None)
    }

    /// Converged once an announcement has been accepted from every node in the network.
    fn is_converged(&self) -> bool {
        self.seen.len() == self.nr_nodes
    }

    fn features(&self, ctx: &RouterCtx, pkg: &Package) -> Option<Vec<f64>> {
        Some(vec![ctx.now.into_f64(), pkg.id.inner() as f64])
    }
}
