//! `routesim` simulates packet routing over a network of independently-clocked router
//! processes, each running a pluggable routing strategy. Time is logical: every router drains
//! its own event queue in timestamp order, and routers coordinate only through delivered
//! events. Ships with link-state shortest-path routing and online Q-routing.

#![warn(unreachable_pub, missing_docs)]

pub mod core;
pub mod impls;
