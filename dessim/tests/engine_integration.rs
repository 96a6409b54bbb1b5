//! End-to-end exercises of the execution engine against a minimal two-host ping-pong.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use dessim::{Engine, EngineConfig, Event, Host, HostId, SimulationTime, WorkerContext};

/// Records `(host, delivery_time_ns, payload)` for every event a host actually delivers, shared
/// across the pair of hosts in a run so the test can assert on one global ordering.
type DeliveryLog = Arc<Mutex<Vec<(u64, u64, u64)>>>;

struct PingPongHost {
    id: HostId,
    peer: HostId,
    min_time_jump: SimulationTime,
    max_bounces: u64,
    queue: dessim::queue::EventQueue<u64>,
    log: DeliveryLog,
}

impl Host for PingPongHost {
    type Payload = u64;

    fn id(&self) -> HostId {
        self.id
    }

    fn push_local_event(&self, event: Event<u64>) {
        self.queue.push(event);
    }

    fn peek_next_delivery_time(&self) -> Option<SimulationTime> {
        self.queue.peek_next_delivery_time()
    }

    fn pop_and_deliver(&self, until: SimulationTime, worker: &mut WorkerContext<'_, Self>) {
        while let Some(event) = self.queue.pop_before(until) {
            worker.advance_to(event.delivery_time());
            let bounces = *event.payload();
            self.log.lock().unwrap().push((
                self.id.as_u64(),
                event.delivery_time().as_nanos(),
                bounces,
            ));

            if bounces < self.max_bounces {
                let next = Event::new(
                    event.delivery_time().saturating_add(self.min_time_jump),
                    Some(self.id),
                    Some(self.peer),
                    bounces + 1,
                );
                // Ignore the per-call Result: a rejected push still marks the engine killed and
                // surfaces through `Engine::run`'s return value.
                let _ = worker.push_event(next);
            }
        }
    }
}

fn build_engine(n_workers: usize, max_bounces: u64) -> (Engine<PingPongHost>, DeliveryLog) {
    let min_time_jump = SimulationTime::from_millis(1);
    let config = EngineConfig {
        min_time_jump,
        end_time: SimulationTime::from_millis(1000),
        n_workers,
        topology_path: PathBuf::from("unused.gml"),
        seed: 42,
    };

    let log: DeliveryLog = Arc::new(Mutex::new(Vec::new()));
    let a = HostId::new(1);
    let b = HostId::new(2);

    let hosts = vec![
        PingPongHost {
            id: a,
            peer: b,
            min_time_jump,
            max_bounces,
            queue: dessim::queue::EventQueue::new(),
            log: log.clone(),
        },
        PingPongHost {
            id: b,
            peer: a,
            min_time_jump,
            max_bounces,
            queue: dessim::queue::EventQueue::new(),
            log: log.clone(),
        },
    ];

    let mut engine = Engine::new(config, hosts).unwrap();
    engine.setup_workers(n_workers).unwrap();

    engine.seed_event(Event::new(min_time_jump, None, Some(a), 0u64));

    (engine, log)
}

#[test]
fn ring_delivers_every_bounce_in_order() {
    let (engine, log) = build_engine(0, 10);
    let result = engine.run();
    assert!(result.is_ok());

    let entries = log.lock().unwrap();
    assert_eq!(entries.len(), 11); // bounces 0..=10, one delivery each
    let mut times: Vec<u64> = entries.iter().map(|&(_, t, _)| t).collect();
    let sorted = {
        let mut s = times.clone();
        s.sort_unstable();
        s
    };
    assert_eq!(times, sorted, "deliveries must arrive in non-decreasing time order");
    times.dedup();
    assert_eq!(times.len(), entries.len(), "each bounce lands in its own window");
}

#[test]
fn delivered_sequence_is_identical_across_worker_counts() {
    let (engine_inline, log_inline) = build_engine(0, 200);
    engine_inline.run().unwrap();

    let (engine_pooled, log_pooled) = build_engine(4, 200);
    engine_pooled.run().unwrap();

    let inline = log_inline.lock().unwrap().clone();
    let pooled = log_pooled.lock().unwrap().clone();
    assert_eq!(inline, pooled);
}

#[test]
fn lookahead_violation_halts_the_run() {
    let min_time_jump = SimulationTime::from_millis(1);
    let config = EngineConfig {
        min_time_jump,
        end_time: SimulationTime::from_millis(1000),
        n_workers: 0,
        topology_path: PathBuf::from("unused.gml"),
        seed: 7,
    };

    let log: DeliveryLog = Arc::new(Mutex::new(Vec::new()));
    let a = HostId::new(1);
    let b = HostId::new(2);

    // max_bounces = 0 with min_time_jump left intact would never violate; instead seed an event
    // whose handler bounces back at the *same* delivery time (zero offset) to a different host,
    // which the lookahead invariant forbids.
    struct ViolatingHost {
        id: HostId,
        peer: HostId,
        queue: dessim::queue::EventQueue<u64>,
        log: DeliveryLog,
    }

    impl Host for ViolatingHost {
        type Payload = u64;

        fn id(&self) -> HostId {
            self.id
        }

        fn push_local_event(&self, event: Event<u64>) {
            self.queue.push(event);
        }

        fn peek_next_delivery_time(&self) -> Option<SimulationTime> {
            self.queue.peek_next_delivery_time()
        }

        fn pop_and_deliver(&self, until: SimulationTime, worker: &mut WorkerContext<'_, Self>) {
            while let Some(event) = self.queue.pop_before(until) {
                worker.advance_to(event.delivery_time());
                self.log
                    .lock()
                    .unwrap()
                    .push((self.id.as_u64(), event.delivery_time().as_nanos(), 0));
                // Same delivery time as the current event, routed cross-host: violates
                // `deliveryTime >= currentTime + minTimeJump`.
                let bad = Event::new(event.delivery_time(), Some(self.id), Some(self.peer), 0u64);
                let _ = worker.push_event(bad);
            }
        }
    }

    let hosts = vec![
        ViolatingHost {
            id: a,
            peer: b,
            queue: dessim::queue::EventQueue::new(),
            log: log.clone(),
        },
        ViolatingHost {
            id: b,
            peer: a,
            queue: dessim::queue::EventQueue::new(),
            log: log.clone(),
        },
    ];

    let mut engine = Engine::new(config, hosts).unwrap();
    engine.setup_workers(0).unwrap();
    engine.seed_event(Event::new(min_time_jump, None, Some(a), 0u64));

    let result = engine.run();
    assert!(matches!(result, Err(_)));
    assert!(engine.is_killed());
}
