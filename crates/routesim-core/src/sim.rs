//! The sequential simulation driver. Routers never share memory; the driver delivers every
//! cross-node effect and always dispatches the globally-smallest pending timestamp.

use std::collections::{BTreeMap, VecDeque};

use crate::events::{Event, EventKind};
use crate::package::{DeliveryRecord, Package};
use crate::router::{InitMsg, Router, RouterError};
use crate::strategy::Effect;
use crate::topology::NodeId;
use crate::units::SimTime;

/// A network of routers plus the delivery log. Built from a [`SimSpec`](crate::SimSpec).
#[derive(Debug)]
pub struct Simulation {
    routers: BTreeMap<NodeId, Router>,
    records: Vec<DeliveryRecord>,
    now: SimTime,
}

impl Simulation {
    pub(crate) fn new() -> Self {
        Self {
            routers: BTreeMap::new(),
            records: Vec::new(),
            now: SimTime::ZERO,
        }
    }

    pub(crate) fn add_router(&mut self, router: Router) {
        self.routers.insert(router.addr(), router);
    }

    /// Initializes every router, then delivers the collected init-time effects. Two-phase:
    /// every router passes its init gate before the first initial flood is delivered, so no
    /// announcement can hit an uninitialized router and be dropped.
    pub(crate) fn init_routers(
        &mut self,
        msgs: impl IntoIterator<Item = (NodeId, InitMsg)>,
    ) -> Result<(), SimError> {
        let mut pending = Vec::new();
        for (addr, msg) in msgs {
            let router = self.routers.get_mut(&addr).ok_or(SimError::UnknownNode(addr))?;
            pending.push((addr, router.init(msg)?));
        }
        // Drain init-time control traffic (initial link-state floods) so strategies converge
        // before the first timed event.
        for (addr, effects) in pending {
            self.apply_effects(addr, effects)?;
        }
        Ok(())
    }

    /// Injects a package at `node`, arriving at time `at`.
    pub fn inject(&mut self, at: SimTime, node: NodeId, pkg: Package) -> Result<(), SimError> {
        let router = self.routers.get_mut(&node).ok_or(SimError::UnknownNode(node))?;
        router.schedule(Event {
            due: at,
            kind: EventKind::IncomingPkg { sender: None, pkg },
        });
        Ok(())
    }

    /// Schedules the link between `a` and `b` to break at time `at`, at both endpoints.
    pub fn break_link(&mut self, at: SimTime, a: NodeId, b: NodeId) -> Result<(), SimError> {
        self.schedule_link_event(at, a, b, true)
    }

    /// Schedules the link between `a` and `b` to come back up at time `at`, at both endpoints.
    pub fn restore_link(&mut self, at: SimTime, a: NodeId, b: NodeId) -> Result<(), SimError> {
        self.schedule_link_event(at, a, b, false)
    }

    fn schedule_link_event(
        &mut self,
        at: SimTime,
        a: NodeId,
        b: NodeId,
        break_it: bool,
    ) -> Result<(), SimError> {
        for (node, neighbor) in [(a, b), (b, a)] {
            let router = self
                .routers
                .get(&node)
                .ok_or(SimError::UnknownNode(node))?;
            if !router.has_neighbor(neighbor) {
                return Err(SimError::NotLinked(a, b));
            }
        }
        for (node, neighbor) in [(a, b), (b, a)] {
            let kind = if break_it {
                EventKind::LinkBreak { neighbor }
            } else {
                EventKind::LinkRestore { neighbor }
            };
            let router = self.routers.get_mut(&node).expect("endpoint checked above");
            router.schedule(Event { due: at, kind });
        }
        Ok(())
    }

    /// Runs until no pending event remains.
    pub fn run(&mut self) -> Result<(), SimError> {
        self.run_until(SimTime::MAX)
    }

    /// Runs until no pending event remains with a timestamp at or before `limit`.
    pub fn run_until(&mut self, limit: SimTime) -> Result<(), SimError> {
        loop {
            // Globally-smallest pending timestamp; equal timestamps dispatch in ascending
            // address order, which keeps runs deterministic.
            let next = self
                .routers
                .iter()
                .filter_map(|(&id, r)| r.next_due().map(|due| (due, id)))
                .min();
            let Some((due, addr)) = next else { break };
            if due > limit {
                break;
            }
            self.now = due;
            let router = self.routers.get_mut(&addr).expect("router exists");
            let event = router.pop_event().expect("queue is non-empty");
            match router.dispatch(event) {
                Ok(effects) => self.apply_effects(addr, effects)?,
                // Uninitialized-access is fatal to the event, not the process: drop and log.
                Err(err @ RouterError::Uninitialized(_)) => {
                    log::warn!("dropping event: {err}");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn apply_effects(&mut self, source: NodeId, effects: Vec<Effect>) -> Result<(), SimError> {
        let mut pending: VecDeque<(NodeId, Effect)> =
            effects.into_iter().map(|e| (source, e)).collect();
        // Control-plane traffic is instantaneous, so delivering a service message may produce
        // more (refloods); the worklist drains to quiescence. Announcement dedup bounds it.
        while let Some((from, effect)) = pending.pop_front() {
            match effect {
                Effect::Forward { to, event } => {
                    let router = self
                        .routers
                        .get_mut(&to)
                        .ok_or(SimError::UnknownNode(to))?;
                    router.schedule(event);
                }
                Effect::Service { to, msg } => {
                    let router = self
                        .routers
                        .get_mut(&to)
                        .ok_or(SimError::UnknownNode(to))?;
                    match router.deliver_service(from, msg) {
                        Ok(more) => pending.extend(more.into_iter().map(|e| (to, e))),
                        Err(err @ RouterError::Uninitialized(_)) => {
                            log::warn!("dropping service message: {err}");
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                Effect::Delivered(record) => {
                    log::info!(
                        "package {} delivered to {} at {} after {} hops",
                        record.pkg.id,
                        record.node,
                        record.time,
                        record.pkg.trace.len()
                    );
                    self.records.push(record);
                }
            }
        }
        Ok(())
    }

    /// The completion reports collected so far, in delivery order.
    pub fn records(&self) -> &[DeliveryRecord] {
        &self.records
    }

    /// The timestamp of the last dispatched event.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Whether every router has initialized and its strategy has converged.
    pub fn is_converged(&self) -> bool {
        self.routers.values().all(Router::is_converged)
    }

    /// A reference to the router at `addr`.
    pub fn router(&self, addr: NodeId) -> Option<&Router> {
        self.routers.get(&addr)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("nodes {0} and {1} are not linked")]
    NotLinked(NodeId, NodeId),

    #[error(transparent)]
    Router(#[from] RouterError),
}
