/*!
Core of a parallel discrete-event network simulator: a conservative (lookahead-bounded) execution
engine, and a topology service answering latency/reliability/routability queries over a static
network graph.

This crate implements two loosely-coupled pieces:

- [`engine`] drives virtual time forward in fixed-width execution windows, dispatching due events
  to hosts in parallel while enforcing the lookahead invariant that keeps worker threads from
  racing ahead of each other's minimum achievable message delay.
- [`topology`] answers latency/reliability/routability queries for pairs of attached virtual hosts
  via cached shortest-path computation over a graph loaded once at startup.

Everything else — configuration parsing, logging setup, socket emulation, the CLI — is the
embedding application's job; this crate only consumes a validated [`config::EngineConfig`] and the
[`host::Host`] implementations the application provides.
*/

#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod host;
pub mod ids;
pub mod logging;
pub mod queue;
pub mod registry;
pub mod topology;
pub mod worker;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{LookaheadViolation, QueryError, StartupError};
pub use event::Event;
pub use host::Host;
pub use ids::{AddressId, HostId, WorkerId};
pub use sim_time::SimulationTime;
pub use topology::{Path, Topology};
pub use worker::WorkerContext;
