//! Network topology: nodes, links, and the per-neighbor link bookkeeping routers carry.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::units::{BytesPerSec, SimTime};

identifier!(NodeId, usize);

/// A bidirectional link between two routers.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Link {
    pub a: NodeId,
    pub b: NodeId,
    pub latency: SimTime,
    pub bandwidth: BytesPerSec,
}

impl Link {
    pub fn new(
        a: NodeId,
        b: NodeId,
        latency: impl Into<SimTime>,
        bandwidth: impl Into<BytesPerSec>,
    ) -> Self {
        Self {
            a,
            b,
            latency: latency.into(),
            bandwidth: bandwidth.into(),
        }
    }

    pub fn connects(&self, x: NodeId, y: NodeId) -> bool {
        self.a == x && self.b == y || self.a == y && self.b == x
    }
}

/// One direction of a link, as seen from a router's neighbor table. Static once delivered at
/// initialization.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct LinkSpec {
    pub latency: SimTime,
    pub bandwidth: BytesPerSec,
}

/// Per-neighbor liveness plus the transmission-serialization cursor. Owned exclusively by the
/// local router; `transfer_time` is a monotonically-advancing high-watermark that imposes a
/// single-server queue discipline on the link.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct LinkState {
    pub alive: bool,
    pub transfer_time: SimTime,
}

impl Default for LinkState {
    fn default() -> Self {
        Self {
            alive: true,
            transfer_time: SimTime::ZERO,
        }
    }
}

/// A validated network topology.
#[derive(Debug, Clone)]
pub struct Topology {
    graph: DiGraph<NodeId, LinkSpec>,
    id2idx: FxHashMap<NodeId, NodeIndex>,
}

impl Topology {
    /// Creates a network topology from a list of nodes and links. This function returns an error
    /// if the given specification fails to produce a valid topology. The checks are not
    /// exhaustive.
    ///
    /// Correctness properties:
    ///
    /// - Every node must have a unique ID.
    /// - Every link must have distinct endpoints in `nodes`.
    /// - Every node must be referenced by some link.
    /// - For any two nodes, there must be at most one link between them.
    /// - Every link must have nonzero bandwidth.
    pub fn new(nodes: &[NodeId], links: &[Link]) -> Result<Self, TopologyError> {
        let mut g = DiGraph::new();
        let mut id2idx = FxHashMap::default();
        for &id in nodes {
            let idx = g.add_node(id);
            if id2idx.insert(id, idx).is_some() {
                // CORRECTNESS: Every node must have a unique ID.
                return Err(TopologyError::DuplicateNodeId(id));
            }
        }
        let mut referenced_nodes = FxHashSet::default();
        for &link in links {
            let Link { a, b, .. } = link;
            // CORRECTNESS: Every link must have distinct endpoints in `nodes`.
            if a == b {
                return Err(TopologyError::NodeAdjacentSelf(a));
            }
            if !id2idx.contains_key(&a) {
                return Err(TopologyError::UndeclaredNode(a));
            }
            if !id2idx.contains_key(&b) {
                return Err(TopologyError::UndeclaredNode(b));
            }
            // CORRECTNESS: Every link must have nonzero bandwidth.
            if link.bandwidth == BytesPerSec::ZERO {
                return Err(TopologyError::ZeroBandwidth { n1: a, n2: b });
            }
            referenced_nodes.insert(a);
            referenced_nodes.insert(b);
            let spec = LinkSpec {
                latency: link.latency,
                bandwidth: link.bandwidth,
            };
            // Neighbor entries are unidirectional
            g.add_edge(id2idx[&a], id2idx[&b], spec);
            g.add_edge(id2idx[&b], id2idx[&a], spec);
        }
        // CORRECTNESS: Every node must be referenced by some link.
        for &id in id2idx.keys() {
            if !referenced_nodes.contains(&id) {
                return Err(TopologyError::IsolatedNode(id));
            }
        }
        for eidx in g.edge_indices() {
            // CORRECTNESS: For any two nodes, there must be at most one link between them.
            let (a, b) = g.edge_endpoints(eidx).expect("edge exists");
            if g.edges_connecting(a, b).count() > 1 {
                return Err(TopologyError::DuplicateLink {
                    n1: g[a],
                    n2: g[b],
                });
            }
        }
        Ok(Self { graph: g, id2idx })
    }

    /// Whether `id` is a node of this topology.
    pub fn contains(&self, id: NodeId) -> bool {
        self.id2idx.contains_key(&id)
    }

    /// The node addresses, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_weights().copied()
    }

    /// The neighbor table of `id`: neighbor address to link spec.
    pub fn neighbors_of(&self, id: NodeId) -> FxHashMap<NodeId, LinkSpec> {
        let Some(&idx) = self.id2idx.get(&id) else {
            return FxHashMap::default();
        };
        self.graph
            .edges(idx)
            .map(|edge| (self.graph[edge.target()], *edge.weight()))
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("Duplicate node ID {0}")]
    DuplicateNodeId(NodeId),

    #[error("Node {0} is connected to itself")]
    NodeAdjacentSelf(NodeId),

    #[error("Node {0} is not declared")]
    UndeclaredNode(NodeId),

    #[error("Duplicate links between {n1} and {n2}")]
    DuplicateLink { n1: NodeId, n2: NodeId },

    #[error("Link between {n1} and {n2} has zero bandwidth")]
    ZeroBandwidth { n1: NodeId, n2: NodeId },

    #[error("Node {0} is not connected to any other node")]
    IsolatedNode(NodeId),
}
