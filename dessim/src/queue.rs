//! A thread-safe per-host event queue.
//!
//! Host implementations are free to manage their own event storage, but most will want to embed
//! one of these: events may be pushed from any worker thread (a different host's work item might
//! target this host for a future window) while this host's own work item concurrently drains it,
//! so the queue needs its own lock rather than relying on the engine's per-window exclusivity.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Mutex;

use sim_time::SimulationTime;

use crate::event::Event;

/// A min-heap of events ordered by `(delivery_time, sequence_number)`, safe to push to
/// concurrently from any thread.
#[derive(Debug)]
pub struct EventQueue<P> {
    heap: Mutex<BinaryHeap<Reverse<Event<P>>>>,
}

impl<P> Default for EventQueue<P> {
    fn default() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
        }
    }
}

impl<P> EventQueue<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event<P>) {
        self.heap.lock().unwrap().push(Reverse(event));
    }

    /// The delivery time of the earliest event still queued, if any.
    pub fn peek_next_delivery_time(&self) -> Option<SimulationTime> {
        self.heap
            .lock()
            .unwrap()
            .peek()
            .map(|Reverse(event)| event.delivery_time())
    }

    /// Pop the earliest event if its delivery time is strictly before `until`.
    pub fn pop_before(&self, until: SimulationTime) -> Option<Event<P>> {
        let mut heap = self.heap.lock().unwrap();
        match heap.peek() {
            Some(Reverse(event)) if event.delivery_time() < until => {
                heap.pop().map(|Reverse(event)| event)
            }
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.lock().unwrap().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_delivery_order() {
        let queue: EventQueue<u32> = EventQueue::new();
        queue.push(Event::new(SimulationTime::from_nanos(30), None, None, 3));
        queue.push(Event::new(SimulationTime::from_nanos(10), None, None, 1));
        queue.push(Event::new(SimulationTime::from_nanos(20), None, None, 2));

        let until = SimulationTime::from_nanos(1000);
        let mut drained = Vec::new();
        while let Some(event) = queue.pop_before(until) {
            drained.push(*event.payload());
        }
        assert_eq!(drained, vec![1, 2, 3]);
    }

    #[test]
    fn stops_at_window_boundary() {
        let queue: EventQueue<u32> = EventQueue::new();
        queue.push(Event::new(SimulationTime::from_nanos(5), None, None, 1));
        queue.push(Event::new(SimulationTime::from_nanos(50), None, None, 2));

        let drained = queue.pop_before(SimulationTime::from_nanos(10));
        assert_eq!(*drained.unwrap().payload(), 1);
        assert!(queue.pop_before(SimulationTime::from_nanos(10)).is_none());
        assert_eq!(queue.peek_next_delivery_time(), Some(SimulationTime::from_nanos(50)));
    }
}
