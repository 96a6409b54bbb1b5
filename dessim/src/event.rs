//! The opaque, timestamped message the engine schedules and hosts deliver.

use std::cmp::Ordering;

use sim_time::SimulationTime;

use crate::ids::HostId;

/// A timestamped message carrying an arbitrary payload `P`.
///
/// Immutable after construction except for the sequence number, which the engine assigns on
/// ingress (see [`crate::engine::Engine::push_event`]) so that ordering stays deterministic
/// regardless of which thread happened to enqueue the event first.
#[derive(Debug, Clone)]
pub struct Event<P> {
    delivery_time: SimulationTime,
    src_host_id: Option<HostId>,
    dst_host_id: Option<HostId>,
    sequence_number: u64,
    payload: P,
}

impl<P> Event<P> {
    /// Construct a new event. `sequence_number` starts at `0`; the engine overwrites it with the
    /// real tie-breaker when the event is pushed.
    pub fn new(
        delivery_time: SimulationTime,
        src_host_id: Option<HostId>,
        dst_host_id: Option<HostId>,
        payload: P,
    ) -> Self {
        Self {
            delivery_time,
            src_host_id,
            dst_host_id,
            sequence_number: 0,
            payload,
        }
    }

    pub fn delivery_time(&self) -> SimulationTime {
        self.delivery_time
    }

    pub fn src_host_id(&self) -> Option<HostId> {
        self.src_host_id
    }

    pub fn dst_host_id(&self) -> Option<HostId> {
        self.dst_host_id
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn into_payload(self) -> P {
        self.payload
    }

    pub(crate) fn set_sequence_number(&mut self, seq: u64) {
        self.sequence_number = seq;
    }
}

impl<P> PartialEq for Event<P> {
    fn eq(&self, other: &Self) -> bool {
        self.delivery_time == other.delivery_time && self.sequence_number == other.sequence_number
    }
}

impl<P> Eq for Event<P> {}

impl<P> PartialOrd for Event<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<P> Ord for Event<P> {
    /// Orders by `(delivery_time, sequence_number)`, the pair that makes a fixed seed produce a
    /// bit-identical delivery sequence no matter how many worker threads ran it.
    fn cmp(&self, other: &Self) -> Ordering {
        self.delivery_time
            .cmp(&other.delivery_time)
            .then_with(|| self.sequence_number.cmp(&other.sequence_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_time_then_sequence() {
        let mut a = Event::new(SimulationTime::from_nanos(10), None, None, ());
        let mut b = Event::new(SimulationTime::from_nanos(10), None, None, ());
        a.set_sequence_number(5);
        b.set_sequence_number(2);
        assert!(b < a);

        let c = Event::new(SimulationTime::from_nanos(5), None, None, ());
        assert!(c < a);
    }
}
