//! The packet-forwarding router: a sequential logical process with exclusive ownership of its
//! event queue, link states, and strategy.

use rustc_hash::FxHashMap;

use crate::events::{Event, EventKind, EventQueue};
use crate::package::{DeliveryRecord, Package};
use crate::strategy::{Effect, RouterCtx, RoutingStrategy, ServiceMsg};
use crate::topology::{LinkSpec, LinkState, NodeId};
use crate::units::SimTime;

/// The initialization payload delivered once per router, before any event.
#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct InitMsg {
    /// The router's own address. Must match the address the router was constructed with.
    pub addr: NodeId,
    /// Neighbor address to link spec.
    pub neighbors: FxHashMap<NodeId, LinkSpec>,
    /// All node addresses in the network, sorted.
    pub nodes: Vec<NodeId>,
    /// The per-package processing delay of this router's service queue.
    #[builder(default = SimTime::ZERO)]
    pub process_delay: SimTime,
    /// Whether to append strategy feature snapshots to package traces.
    #[builder(default)]
    pub full_log: bool,
}

// Builds a `RouterCtx` from disjoint field borrows, so a `&mut` borrow of `self.strategy` can
// coexist with it.
macro_rules! ctx {
    ($self:ident) => {
        RouterCtx {
            addr: $self.addr,
            now: $self.clock,
            neighbors: &$self.neighbors,
            link_states: &$self.link_states,
            nodes: &$self.nodes,
        }
    };
}

/// An independently-clocked router process. All cross-node effects of dispatching an event are
/// returned as [`Effect`]s for the driver to deliver; the router mutates only its own state.
#[derive(Debug)]
pub struct Router {
    addr: NodeId,
    initialized: bool,
    clock: SimTime,
    queue: EventQueue,
    queue_time: SimTime,
    process_delay: SimTime,
    full_log: bool,
    neighbors: FxHashMap<NodeId, LinkSpec>,
    link_states: FxHashMap<NodeId, LinkState>,
    nodes: Vec<NodeId>,
    strategy: Box<dyn RoutingStrategy>,
}

impl Router {
    /// Creates an uninitialized router. Every event delivered before [`Router::init`] fails with
    /// [`RouterError::Uninitialized`].
    pub fn new(addr: NodeId, strategy: Box<dyn RoutingStrategy>) -> Self {
        Self {
            addr,
            initialized: false,
            clock: SimTime::ZERO,
            queue: EventQueue::new(),
            queue_time: SimTime::ZERO,
            process_delay: SimTime::ZERO,
            full_log: false,
            neighbors: FxHashMap::default(),
            link_states: FxHashMap::default(),
            nodes: Vec::new(),
            strategy,
        }
    }

    /// The router's address.
    pub fn addr(&self) -> NodeId {
        self.addr
    }

    /// The router's local logical clock: the timestamp of the last dispatched event.
    pub fn now(&self) -> SimTime {
        self.clock
    }

    /// Whether the base initialization gate has been passed and the strategy has converged.
    pub fn is_converged(&self) -> bool {
        self.initialized && self.strategy.is_converged()
    }

    /// Whether `neighbor` is in this router's neighbor table.
    pub fn has_neighbor(&self, neighbor: NodeId) -> bool {
        self.neighbors.contains_key(&neighbor)
    }

    delegate::delegate! {
        to self.queue {
            /// Inserts a timed event on this router's queue.
            pub fn schedule(&mut self, event: Event);

            /// Removes and returns the minimum-timestamp pending event.
            #[call(pop)]
            pub fn pop_event(&mut self) -> Option<Event>;

            /// The timestamp of the next pending event, if any.
            pub fn next_due(&self) -> Option<SimTime>;
        }
    }

    /// Transitions the router from Uninitialized to Initialized and runs the strategy's init
    /// hook. Fails if the router is already initialized or the payload is addressed elsewhere.
    pub fn init(&mut self, msg: InitMsg) -> Result<Vec<Effect>, RouterError> {
        if self.initialized {
            return Err(RouterError::AlreadyInitialized(self.addr));
        }
        if msg.addr != self.addr {
            return Err(RouterError::AddressMismatch {
                expected: self.addr,
                got: msg.addr,
            });
        }
        self.link_states = msg
            .neighbors
            .keys()
            .map(|&n| (n, LinkState::default()))
            .collect();
        self.neighbors = msg.neighbors;
        self.nodes = msg.nodes;
        self.process_delay = msg.process_delay;
        self.full_log = msg.full_log;
        self.initialized = true;
        Ok(self.strategy.on_init(&ctx!(self)))
    }

    /// Dispatches one event, advancing the local clock to the event's timestamp.
    pub fn dispatch(&mut self, event: Event) -> Result<Vec<Effect>, RouterError> {
        if !self.initialized {
            return Err(RouterError::Uninitialized(self.addr));
        }
        debug_assert!(event.due >= self.clock, "event timestamps are non-decreasing");
        self.clock = event.due;
        match event.kind {
            EventKind::IncomingPkg { sender, pkg } => {
                // Single-server processing queue: one package per process_delay, FIFO even when
                // arrivals land out of strict global order.
                self.queue_time = self.clock.max(self.queue_time) + self.process_delay;
                self.queue.schedule(Event {
                    due: self.queue_time,
                    kind: EventKind::ProcessPkg { sender, pkg },
                });
                Ok(Vec::new())
            }
            EventKind::ProcessPkg { sender, pkg } => self.process_package(sender, pkg),
            EventKind::LinkBreak { neighbor } => {
                let state = self
                    .link_states
                    .get_mut(&neighbor)
                    .ok_or(RouterError::UnknownNeighbor {
                        addr: self.addr,
                        neighbor,
                    })?;
                state.alive = false;
                log::debug!("router {}: link to {neighbor} broke", self.addr);
                Ok(self.strategy.on_link_break(&ctx!(self), neighbor))
            }
            EventKind::LinkRestore { neighbor } => {
                let state = self
                    .link_states
                    .get_mut(&neighbor)
                    .ok_or(RouterError::UnknownNeighbor {
                        addr: self.addr,
                        neighbor,
                    })?;
                state.alive = true;
                log::debug!("router {}: link to {neighbor} restored", self.addr);
                Ok(self.strategy.on_link_restore(&ctx!(self), neighbor))
            }
        }
    }

    /// Delivers a control-plane message, outside the timed event stream.
    pub fn deliver_service(
        &mut self,
        sender: NodeId,
        msg: ServiceMsg,
    ) -> Result<Vec<Effect>, RouterError> {
        if !self.initialized {
            return Err(RouterError::Uninitialized(self.addr));
        }
        Ok(self.strategy.on_service_message(&ctx!(self), sender, &msg))
    }

    fn process_package(
        &mut self,
        sender: Option<NodeId>,
        mut pkg: Package,
    ) -> Result<Vec<Effect>, RouterError> {
        let mut effects = Vec::new();
        // The receive hook fires before the trace is appended and before any routing decision,
        // so reward estimates reflect the state the package actually met.
        if let Some(sender) = sender {
            effects.extend(self.strategy.on_receive_package(&ctx!(self), sender, &pkg));
        }
        let features = self
            .full_log
            .then(|| self.strategy.features(&ctx!(self), &pkg))
            .flatten();
        pkg.record_hop(self.clock, self.addr, features);
        if pkg.dst == self.addr {
            log::debug!(
                "router {}: package {} delivered at {}",
                self.addr,
                pkg.id,
                self.clock
            );
            effects.push(Effect::Delivered(DeliveryRecord::new(
                self.clock, self.addr, pkg,
            )));
            return Ok(effects);
        }
        let Some(next) = self.strategy.route_package(&ctx!(self), &pkg) else {
            log::warn!(
                "router {}: dropping package {}: no route to {}",
                self.addr,
                pkg.id,
                pkg.dst
            );
            return Ok(effects);
        };
        log::trace!(
            "router {}: routing package {} for {} via {next}",
            self.addr,
            pkg.id,
            pkg.dst
        );
        let spec = *self
            .neighbors
            .get(&next)
            .ok_or(RouterError::NotANeighbor {
                addr: self.addr,
                chosen: next,
            })?;
        let state = self
            .link_states
            .get_mut(&next)
            .expect("every neighbor has a link state");
        if !state.alive {
            effects.extend(self.strategy.on_broken_link(&ctx!(self), pkg));
            return Ok(effects);
        }
        // Single-server link discipline: transmissions onto this link serialize behind the
        // transfer_time high-watermark.
        let transfer_start = self.clock.max(state.transfer_time);
        let transfer_end = transfer_start + pkg.size / spec.bandwidth;
        let finish = transfer_end + spec.latency;
        state.transfer_time = transfer_end;
        effects.push(Effect::Forward {
            to: next,
            event: Event {
                due: finish,
                kind: EventKind::IncomingPkg {
                    sender: Some(self.addr),
                    pkg,
                },
            },
        });
        Ok(effects)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("router {0} has not been initialized")]
    Uninitialized(NodeId),

    #[error("router {0} is already initialized")]
    AlreadyInitialized(NodeId),

    #[error("init message for {got} delivered to router {expected}")]
    AddressMismatch { expected: NodeId, got: NodeId },

    #[error("router {addr} has no link to {neighbor}")]
    UnknownNeighbor { addr: NodeId, neighbor: NodeId },

    #[error("strategy on router {addr} chose non-neighbor {chosen} as next hop")]
    NotANeighbor { addr: NodeId, chosen: NodeId },
}
