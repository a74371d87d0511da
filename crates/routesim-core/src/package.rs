//! Packages and their route traces.

use crate::topology::NodeId;
use crate::units::{Bytes, SimTime};

identifier!(PkgId, u64);

/// A routed package. The trace grows by one [`Hop`] at every router the package passes through;
/// the package is consumed at the router whose address equals `dst`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, typed_builder::TypedBuilder)]
pub struct Package {
    /// The package ID. Must be unique among packages concurrently in flight from the same
    /// sender; see `SimpleQRouting::route_package`.
    pub id: PkgId,
    /// Where the package was injected.
    pub src: NodeId,
    /// Where the package is headed.
    pub dst: NodeId,
    /// The package size, which determines its transmission window on each link.
    pub size: Bytes,
    /// One record per router visited, in visit order.
    #[builder(default)]
    #[serde(default)]
    pub trace: Vec<Hop>,
}

impl Package {
    pub(crate) fn record_hop(&mut self, time: SimTime, node: NodeId, features: Option<Vec<f64>>) {
        self.trace.push(Hop {
            time,
            node,
            features,
        });
    }

    /// The addresses visited so far, in visit order.
    pub fn path(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.trace.iter().map(|hop| hop.node)
    }
}

/// One entry of a package's route trace. `features` is only populated when the simulation runs
/// with full logging enabled, and its contents are strategy-defined.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Hop {
    /// The router's local time when the package was processed.
    pub time: SimTime,
    /// The router's address.
    pub node: NodeId,
    /// A strategy-defined state snapshot, under full logging.
    pub features: Option<Vec<f64>>,
}

/// A completion report. Emitting exactly one of these per package is the simulation's sole
/// externally observable effect besides message sends.
#[derive(Debug, Clone, derive_new::new, serde::Serialize)]
pub struct DeliveryRecord {
    /// The destination router's local time at delivery.
    pub time: SimTime,
    /// The destination router's address.
    pub node: NodeId,
    /// The delivered package, trace included.
    pub pkg: Package,
}
