//! Q-routing: per-(destination, neighbor) estimates of remaining delivery time, learned online
//! from round-tripped reward messages and exploited greedily.

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

use routesim_core::{
    Effect, NodeId, Package, PkgId, RouterCtx, RoutingStrategy, ServiceMsg, SimTime,
};

/// The value assigned to paths the router knows nothing about. Large enough that any observed
/// transit time beats it.
const Q_UNKNOWN: f64 = 100_500.0;
/// The bootstrap value for delivering straight to a neighboring destination.
const Q_DIRECT: f64 = 40.0;

#[derive(Debug, Clone, Copy)]
struct Pending {
    sent: SimTime,
    dst: NodeId,
}

/// Greedy Q-routing. Every forwarded package earns a reward message from the next hop carrying
/// that hop's best remaining-time estimate; the estimate plus the observed hop delay updates the
/// sender's value table. No exploration is performed: the minimizing neighbor always wins.
#[derive(Debug)]
pub struct SimpleQRouting {
    learning_rate: f64,
    // destination -> neighbor -> estimated remaining time
    q: FxHashMap<NodeId, FxHashMap<NodeId, f64>>,
    // Contexts for in-flight packages, keyed by package id. Last write wins, so ids must be
    // unique among packages concurrently in flight from this router.
    pending: FxHashMap<PkgId, Pending>,
    // Exact estimates saved across a link break, restored verbatim on link restore.
    stashed: FxHashMap<NodeId, FxHashMap<NodeId, f64>>,
}

impl SimpleQRouting {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            q: FxHashMap::default(),
            pending: FxHashMap::default(),
            stashed: FxHashMap::default(),
        }
    }

    /// The current estimate of remaining time to `dst` when forwarding via `via`.
    pub fn estimate(&self, dst: NodeId, via: NodeId) -> Option<f64> {
        self.q.get(&dst).and_then(|m| m.get(&via)).copied()
    }

    /// The neighbor minimizing the estimate for `dst`, ties broken by lowest address.
    fn best(&self, dst: NodeId) -> Option<(NodeId, f64)> {
        self.q
            .get(&dst)?
            .iter()
            .min_by_key(|&(&n, &v)| (OrderedFloat(v), n))
            .map(|(&n, &v)| (n, v))
    }
}

impl RoutingStrategy for SimpleQRouting {
    fn on_init(&mut self, ctx: &RouterCtx) -> Vec<Effect> {
        for &dst in ctx.nodes {
            let row = self.q.entry(dst).or_default();
            for &neighbor in ctx.neighbors.keys() {
                let value = if neighbor == dst { Q_DIRECT } else { Q_UNKNOWN };
                row.insert(neighbor, value);
            }
        }
        Vec::new()
    }

    fn route_package(&mut self, ctx: &RouterCtx, pkg: &Package) -> Option<NodeId> {
        self.pending.insert(
            pkg.id,
            Pending {
                sent: ctx.now,
                dst: pkg.dst,
            },
        );
        self.best(pkg.dst).map(|(neighbor, _)| neighbor)
    }

    /// Immediately rewards the previous hop with this router's best remaining-time estimate
    /// (zero if the package just arrived at its destination).
    fn on_receive_package(&mut self, ctx: &RouterCtx, sender: NodeId, pkg: &Package) -> Vec<Effect> {
        let estimate = if pkg.dst == ctx.addr {
            SimTime::ZERO
        } else {
            SimTime::new(self.best(pkg.dst).map_or(Q_UNKNOWN, |(_, v)| v))
        };
        vec![Effect::Service {
            to: sender,
            msg: ServiceMsg::Reward {
                pkg_id: pkg.id,
                time: ctx.now,
                estimate,
                dst: pkg.dst,
            },
        }]
    }

    fn on_service_message(&mut self, ctx: &RouterCtx, sender: NodeId, msg: &ServiceMsg) -> Vec<Effect> {
        let &ServiceMsg::Reward {
            pkg_id,
            time,
            estimate,
            dst,
        } = msg
        else {
            return Vec::new();
        };
        let Some(pending) = self.pending.remove(&pkg_id) else {
            // Recoverable: the context expired or the id was reused. No state mutation.
            log::warn!(
                "router {}: reward from {sender} for unknown package {pkg_id}",
                ctx.addr
            );
            return Vec::new();
        };
        if pending.dst != dst {
            log::warn!(
                "router {}: reward for package {pkg_id} names {dst}, context says {}",
                ctx.addr,
                pending.dst
            );
        }
        let Some(value) = self.q.get_mut(&dst).and_then(|m| m.get_mut(&sender)) else {
            log::warn!(
                "router {}: reward from non-neighbor {sender}, ignoring",
                ctx.addr
            );
            return Vec::new();
        };
        let new_estimate = estimate.into_f64() + (time - pending.sent).into_f64();
        *value += self.learning_rate * (new_estimate - *value);
        Vec::new()
    }

    /// Penalizes the broken neighbor for every destination, stashing the exact estimates so a
    /// restore can roll them back untouched.
    fn on_link_break(&mut self, _ctx: &RouterCtx, neighbor: NodeId) -> Vec<Effect> {
        let mut stash = FxHashMap::default();
        for (&dst, row) in self.q.iter_mut() {
            if let Some(value) = row.get_mut(&neighbor) {
                stash.insert(dst, *value);
                *value = Q_UNKNOWN;
            }
        }
        self.stashed.insert(neighbor, stash);
        Vec::new()
    }

    fn on_link_restore(&mut self, ctx: &RouterCtx, neighbor: NodeId) -> Vec<Effect> {
        let Some(stash) = self.stashed.remove(&neighbor) else {
            log::warn!(
                "router {}: restore of {neighbor} without a matching break",
                ctx.addr
            );
            return Vec::new();
        };
        for (dst, value) in stash {
            if let Some(row) = self.q.get_mut(&dst) {
                row.insert(neighbor, value);
            }
        }
        Vec::new()
    }

    fn features(&self, ctx: &RouterCtx, pkg: &Package) -> Option<Vec<f64>> {
        Some(vec![ctx.now.into_f64(), pkg.id.inner() as f64])
    }
}
