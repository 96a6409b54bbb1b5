//! Per-thread execution context.
//!
//! Earlier schedulers of this shape kept a global, thread-local engine pointer that every worker
//! implicitly read from. That hides the dependency between a worker and its engine behind
//! thread-local magic and makes it impossible to run two engines in the same process (useful for
//! tests). Here the dependency is explicit: a [`WorkerContext`] borrows its [`Engine`] and is
//! handed to a host's [`Host::pop_and_deliver`](crate::host::Host::pop_and_deliver) directly,
//! rather than being recovered from thread-local storage.

use sim_time::SimulationTime;

use crate::engine::Engine;
use crate::error::LookaheadViolation;
use crate::event::Event;
use crate::host::Host;
use crate::ids::{HostId, WorkerId};

/// The state machine a [`WorkerContext`] moves through: idle between work items, running while
/// bound to a host for the duration of one `pop_and_deliver` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running(HostId),
}

/// The execution context a worker thread (or the engine thread itself, outside a window) is
/// operating under: which host it is currently bound to, what virtual time it has reached, and a
/// reference back to the engine so it can push new events.
pub struct WorkerContext<'a, H: Host> {
    engine: &'a Engine<H>,
    worker_id: WorkerId,
    host_id: Option<HostId>,
    current_time: SimulationTime,
}

impl<'a, H: Host> WorkerContext<'a, H> {
    pub(crate) fn new(engine: &'a Engine<H>, worker_id: WorkerId) -> Self {
        Self {
            engine,
            worker_id,
            host_id: None,
            current_time: engine.clock(),
        }
    }

    pub(crate) fn bind(&mut self, host_id: HostId, current_time: SimulationTime) {
        self.host_id = Some(host_id);
        self.current_time = current_time;
        crate::logging::bind_current_time(current_time);
    }

    pub(crate) fn unbind(&mut self) {
        self.host_id = None;
        crate::logging::clear_current_time();
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    pub fn state(&self) -> WorkerState {
        match self.host_id {
            Some(host_id) => WorkerState::Running(host_id),
            None => WorkerState::Idle,
        }
    }

    /// The host this worker is currently delivering events for, or `None` if called from the
    /// engine thread between windows.
    pub fn current_host_id(&self) -> Option<HostId> {
        self.host_id
    }

    /// The worker's notion of the current simulated time: the delivery time of the event it is
    /// presently executing, or the global clock if unbound.
    pub fn current_time(&self) -> SimulationTime {
        self.current_time
    }

    /// Advance this context's notion of current time to `time`.
    ///
    /// A host's `pop_and_deliver` implementation should call this immediately before executing
    /// each event it pops, so that a `push_event` made from inside that event's handler is
    /// checked against the right emit time.
    pub fn advance_to(&mut self, time: SimulationTime) {
        self.current_time = time;
        if self.host_id.is_some() {
            crate::logging::bind_current_time(time);
        }
    }

    /// Push a new event, checking the lookahead invariant against this context's (host, time).
    ///
    /// Routes to the destination host's local queue if `event.dst_host_id()` is set, otherwise to
    /// the engine's master queue. Cross-host events must satisfy
    /// `delivery_time >= current_time + min_time_jump`; same-host events may have any
    /// non-negative offset.
    pub fn push_event(&self, event: Event<H::Payload>) -> Result<(), LookaheadViolation> {
        self.engine
            .route_event(self.host_id, self.current_time, event)
    }

    pub fn generate_node_id(&self) -> u64 {
        self.engine.generate_node_id()
    }
}
