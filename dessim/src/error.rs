//! Structured error kinds.
//!
//! Startup failures (`ConfigInvalid`, `GraphUnloadable`, `UnconnectedTopology`,
//! `WorkerPoolFailure`) abort initialization; callers are expected to wrap construction with
//! whatever context-attaching error type their own application already uses to explain what was
//! being set up. `LookaheadViolation` is the one runtime error that aborts a run, since it
//! corrupts the determinism guarantee. Everything else (`AddressUnattached`,
//! `PathComputationFailed`) is a query-time condition: it never unwinds the window loop, it
//! surfaces as a sentinel value to the caller and gets logged.

use sim_time::SimulationTime;
use thiserror::Error;

use crate::ids::HostId;

/// Errors that abort engine setup before a run can begin.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("graph could not be loaded: {0}")]
    GraphUnloadable(String),

    #[error("topology graph is not strongly connected")]
    UnconnectedTopology,

    #[error("worker pool failed to start: {0}")]
    WorkerPoolFailure(String),
}

/// The one runtime error that aborts a run in progress: an event was pushed to a different host
/// with a delivery time inside the lookahead window, which would break the conservative
/// synchronization protocol's safety guarantee.
#[derive(Debug, Clone, Error)]
#[error(
    "lookahead violation: event from host {src:?} at {emit_time:?} targets host {dst:?} \
     at {delivery_time:?}, which is less than {emit_time:?} + minTimeJump ({min_time_jump:?})"
)]
pub struct LookaheadViolation {
    pub src: Option<HostId>,
    pub dst: HostId,
    pub emit_time: SimulationTime,
    pub delivery_time: SimulationTime,
    pub min_time_jump: SimulationTime,
}

/// A graph-query-time failure distinguishing "one of the endpoints was never attached" from "the
/// attached endpoints could not be routed between" (e.g. a path-computation bug). Both still
/// collapse to the `< 0` sentinel at the public [`crate::topology::Topology`] API, but are kept
/// distinct internally so the two cases can be logged at different severities per the error
/// policy (`AddressUnattached` at warning, `PathComputationFailed` at critical).
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("address is not attached to the topology")]
    AddressUnattached,

    #[error("path computation failed: {0}")]
    PathComputationFailed(String),
}
