#![warn(unreachable_pub, missing_debug_implementations)]

//! Routing strategy implementations for `routesim`: static link-state shortest-path routing and
//! online Q-value routing. Both plug into
//! [`RoutingStrategy`](routesim_core::RoutingStrategy).

pub mod link_state;
pub mod simple_q;

pub use link_state::LinkStateRouting;
pub use simple_q::SimpleQRouting;
