//! Routing strategy implementations: link-state flooding with shortest paths, and greedy
//! Q-routing with reward-driven value updates.

pub use routing_impls::*;
