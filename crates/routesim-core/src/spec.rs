//! Simulation specifications. A [`SimSpec`] lists nodes and links plus the per-router constants;
//! [`SimSpec::build`] validates it and produces an initialized [`Simulation`].

use crate::router::{InitMsg, Router};
use crate::sim::{SimError, Simulation};
use crate::strategy::RoutingStrategy;
use crate::topology::{Link, NodeId, Topology, TopologyError};
use crate::units::SimTime;

/// A simulation specification.
#[derive(Debug, typed_builder::TypedBuilder)]
pub struct SimSpec {
    /// Router addresses.
    pub nodes: Vec<NodeId>,
    /// Bidirectional links.
    pub links: Vec<Link>,
    /// The per-package processing delay applied at every router.
    #[builder(default = SimTime::ZERO)]
    pub process_delay: SimTime,
    /// Whether package traces carry strategy feature snapshots.
    #[builder(default)]
    pub full_log: bool,
}

impl SimSpec {
    /// Validates the specification and builds an initialized [`Simulation`], attaching the
    /// strategy produced by `strategies` to each router. Initialization runs to quiescence, so
    /// flooding strategies are converged on return.
    pub fn build<F>(self, mut strategies: F) -> Result<Simulation, SpecError>
    where
        F: FnMut(NodeId) -> Box<dyn RoutingStrategy>,
    {
        let topology = Topology::new(&self.nodes, &self.links)?;
        let mut nodes = self.nodes.clone();
        nodes.sort();
        let mut sim = Simulation::new();
        for &addr in &nodes {
            sim.add_router(Router::new(addr, strategies(addr)));
        }
        let msgs = nodes
            .iter()
            .map(|&addr| {
                let msg = InitMsg::builder()
                    .addr(addr)
                    .neighbors(topology.neighbors_of(addr))
                    .nodes(nodes.clone())
                    .process_delay(self.process_delay)
                    .full_log(self.full_log)
                    .build();
                (addr, msg)
            })
            .collect::<Vec<_>>();
        sim.init_routers(msgs)?;
        Ok(sim)
    }
}

/// Simulation specification error.
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    /// The topology is invalid.
    #[error("invalid topology")]
    InvalidTopology(#[from] TopologyError),

    /// A router rejected its initialization payload.
    #[error("failed to initialize routers")]
    Init(#[from] SimError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Package;
    use crate::strategy::{Announcement, Effect, RouterCtx, SeqNo, ServiceMsg};
    use crate::testing::{self, TableStrategy};

    // Pings every neighbor once at init time; converged only after hearing back from all of
    // them. Init-time service traffic must survive the build ordering for this to hold.
    #[derive(Debug, Default)]
    struct PingStrategy {
        expected: usize,
        received: usize,
    }

    impl RoutingStrategy for PingStrategy {
        fn on_init(&mut self, ctx: &RouterCtx) -> Vec<Effect> {
            self.expected = ctx.neighbors.len();
            ctx.neighbors
                .keys()
                .map(|&to| Effect::Service {
                    to,
                    msg: ServiceMsg::LinkState(Announcement {
                        origin: ctx.addr,
                        seq: SeqNo::ZERO,
                        links: Vec::new(),
                    }),
                })
                .collect()
        }

        fn route_package(&mut self, _ctx: &RouterCtx, _pkg: &Package) -> Option<NodeId> {
            None
        }

        fn on_service_message(
            &mut self,
            _ctx: &RouterCtx,
            _sender: NodeId,
            _msg: &ServiceMsg,
        ) -> Vec<Effect> {
            self.received += 1;
            Vec::new()
        }

        fn is_converged(&self) -> bool {
            self.received == self.expected
        }
    }

    #[test]
    fn init_time_service_traffic_reaches_every_router() {
        let (nodes, links) = testing::line_config(3);
        let spec = SimSpec::builder().nodes(nodes.clone()).links(links).build();
        let sim = spec
            .build(|_| Box::<PingStrategy>::default())
            .expect("line spec is valid");
        // Middle and last routers receive their pings only if delivery happens after every
        // router has initialized.
        for &addr in &nodes {
            let router = sim.router(addr).expect("router exists");
            assert!(
                router.is_converged(),
                "router {addr} missed an init-time message"
            );
        }
    }

    #[test]
    fn valid_spec_builds_converged_sim() {
        let (nodes, links) = testing::line_config(3);
        let spec = SimSpec::builder().nodes(nodes).links(links).build();
        let sim = spec.build(|_| Box::<TableStrategy>::default());
        let sim = sim.expect("line spec is valid");
        assert!(sim.is_converged());
        assert_eq!(sim.records().len(), 0);
    }

    #[test]
    fn invalid_topology_fails() {
        let (nodes, mut links) = testing::line_config(3);
        links.push(Link::new(NodeId::new(0), NodeId::new(9), 1.0, 10));
        let spec = SimSpec::builder().nodes(nodes).links(links).build();
        let res = spec.build(|_| Box::<TableStrategy>::default());
        assert!(matches!(res, Err(SpecError::InvalidTopology(..))));
    }
}
