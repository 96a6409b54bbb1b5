//! The host interface the engine drives. A host is a black box from the engine's perspective:
//! it owns its own event storage and simulation state, and only exposes the four operations
//! below.

use sim_time::SimulationTime;

use crate::engine::Engine;
use crate::event::Event;
use crate::ids::HostId;
use crate::worker::WorkerContext;

/// A virtual host that the engine dispatches events to.
///
/// Implementations must tolerate `push_local_event` being called concurrently from any worker
/// thread (a host processed in the current window may emit an event destined for a host that is
/// simultaneously draining its own queue in that same window), which is why it takes `&self`
/// rather than `&mut self`. [`EventQueue`](crate::queue::EventQueue) provides a ready-made,
/// lock-guarded implementation of that half of the contract.
///
/// `pop_and_deliver` is the one method the engine guarantees exclusive access to: it is never
/// called for the same host from two threads at once, nor concurrently with another call for the
/// same host, so implementations are free to mutate their own non-queue state freely from inside
/// it.
pub trait Host: Send + Sync + Sized {
    /// The event payload type this host understands.
    type Payload: Send;

    fn id(&self) -> HostId;

    /// Enqueue an event for later delivery. May be called from any thread.
    fn push_local_event(&self, event: Event<Self::Payload>);

    /// The delivery time of the earliest event still queued, if any.
    fn peek_next_delivery_time(&self) -> Option<SimulationTime>;

    /// Dequeue and deliver every event with `delivery_time < until`. Returns once the queue is
    /// empty or its next event is at or beyond `until`. May call back into `worker` to emit new
    /// events (e.g. [`WorkerContext::push_event`]).
    fn pop_and_deliver(&self, until: SimulationTime, worker: &mut WorkerContext<'_, Self>);

    /// Apply an engine-level event: one pushed with no destination host, drained from the
    /// master queue single-threaded between windows (e.g. to register a newly-created host).
    /// Hosts that don't originate such events can leave this at its default no-op.
    fn deliver_global(_payload: Self::Payload, _engine: &Engine<Self>) {}
}
