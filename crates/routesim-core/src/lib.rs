#![warn(unreachable_pub, missing_debug_implementations)]

//! The core `routesim` library. This crate defines the discrete-event kernel: logical time,
//! per-router event queues, the packet-forwarding [`Router`], the [`RoutingStrategy`] seam, and
//! the sequential [`Simulation`] driver that advances the network by globally-smallest timestamp.

#[macro_use]
mod ident;

pub mod events;
pub mod package;
pub mod router;
pub mod sim;
pub mod spec;
pub mod strategy;
pub mod topology;
pub mod units;

#[cfg(test)]
pub(crate) mod testing;

pub use events::{Event, EventKind, EventQueue};
pub use package::{DeliveryRecord, Hop, Package, PkgId};
pub use router::{InitMsg, Router, RouterError};
pub use sim::{SimError, Simulation};
pub use spec::{SimSpec, SpecError};
pub use strategy::{
    AnnouncedLink, Announcement, Effect, RouterCtx, RoutingStrategy, SeqNo, ServiceMsg,
};
pub use topology::{Link, LinkSpec, LinkState, NodeId, Topology, TopologyError};
pub use units::{Bytes, BytesPerSec, SimTime};
