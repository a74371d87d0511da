//! The routing-strategy seam. A [`Router`](crate::Router) owns the event-dispatch mechanics; the
//! strategy owns the routing decision and any protocol state (topology graphs, value tables).
//! Hooks get a read-only [`RouterCtx`] view of the host router and communicate exclusively
//! through returned [`Effect`]s, so cross-node state never leaks.

use rustc_hash::FxHashMap;

use crate::events::Event;
use crate::package::{DeliveryRecord, Package, PkgId};
use crate::topology::{LinkSpec, LinkState, NodeId};
use crate::units::SimTime;

identifier!(SeqNo, u64);

/// One entry of a link-state announcement. Carries the latency so receivers can weight edges
/// they have never observed directly.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct AnnouncedLink {
    pub neighbor: NodeId,
    pub latency: SimTime,
    pub alive: bool,
}

/// A snapshot of one router's link states, flooded through the network. Immutable once created;
/// deduplicated by `(origin, seq)`, strictly monotonic per origin.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Announcement {
    pub origin: NodeId,
    pub seq: SeqNo,
    pub links: Vec<AnnouncedLink>,
}

/// Node-to-node control-plane traffic. Service messages travel outside the timed event stream:
/// they are delivered immediately, consuming no simulated time.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum ServiceMsg {
    /// A flooded link-state announcement.
    LinkState(Announcement),
    /// Per-hop feedback carrying the receiver's best remaining-time estimate for `dst`.
    Reward {
        pkg_id: PkgId,
        time: SimTime,
        estimate: SimTime,
        dst: NodeId,
    },
}

/// An externally visible consequence of dispatching one event. The driver owns delivery; routers
/// and strategies never touch each other's state directly.
#[derive(Debug)]
pub enum Effect {
    /// Schedule a timed event on another router's queue (data plane).
    Forward { to: NodeId, event: Event },
    /// Deliver a service message to another router, immediately (control plane).
    Service { to: NodeId, msg: ServiceMsg },
    /// Report a completed package to the overlord.
    Delivered(DeliveryRecord),
}

/// A read-only view of the host router, handed to every strategy hook.
#[derive(Debug)]
pub struct RouterCtx<'a> {
    /// The host router's address.
    pub addr: NodeId,
    /// The host router's local logical clock.
    pub now: SimTime,
    /// The static neighbor table.
    pub neighbors: &'a FxHashMap<NodeId, LinkSpec>,
    /// Current liveness and serialization cursors, per neighbor.
    pub link_states: &'a FxHashMap<NodeId, LinkState>,
    /// All node addresses in the network, sorted.
    pub nodes: &'a [NodeId],
}

/// A pluggable routing algorithm hosted by a [`Router`](crate::Router).
///
/// Unrecognized service messages must be ignored (return no effects); that is the
/// forward-compatibility policy for the control plane.
pub trait RoutingStrategy: std::fmt::Debug {
    /// Runs once, right after the host router initializes. Link-state strategies flood their
    /// first announcement here.
    fn on_init(&mut self, ctx: &RouterCtx) -> Vec<Effect> {
        let _ = ctx;
        Vec::new()
    }

    /// Picks the next hop for `pkg`, or `None` if the strategy knows no route. The chosen
    /// address must be a neighbor of the host router.
    fn route_package(&mut self, ctx: &RouterCtx, pkg: &Package) -> Option<NodeId>;

    /// Runs when a package forwarded by another router is processed, before the trace is
    /// appended and before any forwarding decision. Q-routing sends its reward here.
    fn on_receive_package(&mut self, ctx: &RouterCtx, sender: NodeId, pkg: &Package) -> Vec<Effect> {
        let _ = (ctx, sender, pkg);
        Vec::new()
    }

    /// Handles a control-plane message from `sender`.
    fn on_service_message(&mut self, ctx: &RouterCtx, sender: NodeId, msg: &ServiceMsg) -> Vec<Effect> {
        let _ = (ctx, sender, msg);
        Vec::new()
    }

    /// Runs after the host router marks the link to `neighbor` dead.
    fn on_link_break(&mut self, ctx: &RouterCtx, neighbor: NodeId) -> Vec<Effect> {
        let _ = (ctx, neighbor);
        Vec::new()
    }

    /// Runs after the host router marks the link to `neighbor` alive again.
    fn on_link_restore(&mut self, ctx: &RouterCtx, neighbor: NodeId) -> Vec<Effect> {
        let _ = (ctx, neighbor);
        Vec::new()
    }

    /// Policy for a package routed onto a dead link. The default drops it. Whatever the policy,
    /// it must not re-enter the same link synchronously.
    fn on_broken_link(&mut self, ctx: &RouterCtx, pkg: Package) -> Vec<Effect> {
        log::warn!(
            "router {}: dropping package {} to {}: next hop link is down",
            ctx.addr,
            pkg.id,
            pkg.dst
        );
        Vec::new()
    }

    /// Whether the strategy has gathered enough protocol state to route. Link-state strategies
    /// report true only once an announcement has been seen from every node.
    fn is_converged(&self) -> bool {
        true
    }

    /// A state snapshot appended to the package trace under full logging.
    fn features(&self, ctx: &RouterCtx, pkg: &Package) -> Option<Vec<f64>> {
        let _ = (ctx, pkg);
        None
    }
}
