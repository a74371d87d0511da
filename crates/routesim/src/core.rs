//! Core simulation kernel: the event queue, the router state machine, the strategy seam, and
//! the sequential driver. The most common entry point is [`SimSpec::build`](SimSpec), which
//! turns a validated topology into a runnable [`Simulation`].

pub use routesim_core::*;
