//! The conservative parallel discrete-event scheduler.
//!
//! Time is partitioned into consecutive execution windows of width `min_time_jump`. Within a
//! window every host with due events is dispatched to the worker pool in parallel; a cross-host
//! event emitted during the window can never land inside it again, since the lookahead invariant
//! (enforced in [`Engine::route_event`]) requires its delivery time to be at least one window
//! ahead of the emitting host's current time. That's what lets hosts run lock-step in parallel
//! without racing each other: nothing a worker does this window can be observed by another worker
//! until the window has advanced.
//!
//! Worker threads are spawned with [`std::thread::scope`] for the duration of [`Engine::run`] and
//! joined automatically when it returns, so there is no 'static lifetime requirement on the host
//! set and no unsafe code.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};

use log::{debug, trace};
use sim_time::SimulationTime;

use crate::config::EngineConfig;
use crate::error::{LookaheadViolation, StartupError};
use crate::event::Event;
use crate::host::Host;
use crate::ids::{HostId, IdGenerator, WorkerId};
use crate::registry::{Registry, RegistryKind};
use crate::worker::WorkerContext;

/// The pseudo worker ID used when the engine drives hosts inline on its own thread
/// (`n_workers == 0`), since there is no real pool thread to identify.
const INLINE_WORKER_ID: WorkerId = WorkerId::new(u64::MAX);

struct HostSlot<H: Host> {
    host: H,
    /// Per-host monotonic tie-breaker, bumped for every event this host sources (to either
    /// another host or the master queue).
    sequence_counter: IdGenerator,
}

/// The execution engine: owns the host set, the master event queue, and the worker pool that
/// drives one host at a time through its events each window.
pub struct Engine<H: Host> {
    min_time_jump: SimulationTime,
    end_time: SimulationTime,

    hosts: Vec<HostSlot<H>>,
    host_index: HashMap<HostId, usize>,

    clock: AtomicU64,
    window_start: AtomicU64,
    window_end: AtomicU64,

    master_queue: Mutex<BinaryHeap<Reverse<Event<H::Payload>>>>,
    engine_sequence_counter: IdGenerator,

    killed: AtomicBool,
    fatal_error: Mutex<Option<LookaheadViolation>>,

    worker_ids: IdGenerator,
    node_ids: IdGenerator,

    registry: Mutex<Registry>,

    n_workers: Option<usize>,

    // Per-window dispatch/completion bookkeeping. Reset at the top of every window.
    dispatch_queue: Mutex<VecDeque<usize>>,
    dispatch_cond: Condvar,
    workers_shutdown: AtomicBool,
    remaining: Mutex<usize>,
    remaining_cond: Condvar,
}

impl<H: Host> Engine<H> {
    /// Build a new engine. Fails with [`StartupError::ConfigInvalid`] if the configuration is
    /// malformed. `hosts` is the fixed set of hosts this run will dispatch to; the host set
    /// cannot change once the engine is built (dynamic topology/host-set mutation mid-run is out
    /// of scope).
    pub fn new(config: EngineConfig, hosts: Vec<H>) -> Result<Self, StartupError> {
        config.validate()?;

        let mut host_index = HashMap::with_capacity(hosts.len());
        let mut slots = Vec::with_capacity(hosts.len());
        for host in hosts {
            let id = host.id();
            if host_index.insert(id, slots.len()).is_some() {
                return Err(StartupError::ConfigInvalid(format!(
                    "duplicate host id {id}"
                )));
            }
            slots.push(HostSlot {
                host,
                sequence_counter: IdGenerator::new(),
            });
        }

        Ok(Self {
            min_time_jump: config.min_time_jump,
            end_time: config.end_time,
            hosts: slots,
            host_index,
            clock: AtomicU64::new(0),
            window_start: AtomicU64::new(0),
            window_end: AtomicU64::new(config.min_time_jump.as_nanos()),
            master_queue: Mutex::new(BinaryHeap::new()),
            engine_sequence_counter: IdGenerator::new(),
            killed: AtomicBool::new(false),
            fatal_error: Mutex::new(None),
            worker_ids: IdGenerator::new(),
            node_ids: IdGenerator::new(),
            registry: Mutex::new(Registry::new()),
            n_workers: None,
            dispatch_queue: Mutex::new(VecDeque::new()),
            dispatch_cond: Condvar::new(),
            workers_shutdown: AtomicBool::new(false),
            remaining: Mutex::new(0),
            remaining_cond: Condvar::new(),
        })
    }

    /// Configure the worker pool size. `n = 0` runs every window's host dispatch inline on the
    /// calling thread.
    pub fn setup_workers(&mut self, n: usize) -> Result<(), StartupError> {
        self.n_workers = Some(n);
        Ok(())
    }

    pub fn teardown_workers(&mut self) {
        self.n_workers = None;
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::Acquire)
    }

    /// Halt the engine at the next window boundary. Events already mid-delivery are not
    /// cancelled; there is no per-event timeout.
    pub fn kill(&self) {
        self.killed.store(true, Ordering::Release);
    }

    pub fn clock(&self) -> SimulationTime {
        SimulationTime::from_nanos(self.clock.load(Ordering::Acquire))
    }

    pub fn window_start(&self) -> SimulationTime {
        SimulationTime::from_nanos(self.window_start.load(Ordering::Acquire))
    }

    pub fn window_end(&self) -> SimulationTime {
        SimulationTime::from_nanos(self.window_end.load(Ordering::Acquire))
    }

    pub fn min_time_jump(&self) -> SimulationTime {
        self.min_time_jump
    }

    pub fn generate_worker_id(&self) -> u64 {
        self.worker_ids.next()
    }

    pub fn generate_node_id(&self) -> u64 {
        self.node_ids.next()
    }

    pub fn host(&self, id: HostId) -> Option<&H> {
        self.host_index.get(&id).map(|&idx| &self.hosts[idx].host)
    }

    pub fn put(&self, kind: RegistryKind, id: u64, item: impl std::any::Any + Send + Sync) {
        self.registry.lock().unwrap().put(kind, id, item);
    }

    pub fn get<T: std::any::Any + Send + Sync>(
        &self,
        kind: RegistryKind,
        id: u64,
    ) -> Option<std::sync::Arc<T>> {
        self.registry.lock().unwrap().get(kind, id)
    }

    /// Seed an initial event before the run starts (e.g. a bootstrap task for a host, or a
    /// global event). Bypasses the lookahead check, since there is no "current time" to measure
    /// an emit-time offset from yet.
    pub fn seed_event(&self, mut event: Event<H::Payload>) {
        let seq = self.engine_sequence_counter.next();
        event.set_sequence_number(seq);
        match event.dst_host_id() {
            Some(dst) => {
                let idx = *self
                    .host_index
                    .get(&dst)
                    .expect("seeded event targets an unregistered host");
                self.hosts[idx].host.push_local_event(event);
            }
            None => self.master_queue.lock().unwrap().push(Reverse(event)),
        }
    }

    /// Route an event emitted by `src_host_id` (or `None` if emitted from outside any host's
    /// context) at `current_time`. Used by [`WorkerContext::push_event`].
    pub(crate) fn route_event(
        &self,
        src_host_id: Option<HostId>,
        current_time: SimulationTime,
        mut event: Event<H::Payload>,
    ) -> Result<(), LookaheadViolation> {
        if let Some(dst) = event.dst_host_id() {
            if Some(dst) != src_host_id {
                let min_required = current_time.saturating_add(self.min_time_jump);
                if event.delivery_time() < min_required {
                    let violation = LookaheadViolation {
                        src: src_host_id,
                        dst,
                        emit_time: current_time,
                        delivery_time: event.delivery_time(),
                        min_time_jump: self.min_time_jump,
                    };
                    self.record_fatal_error(violation.clone());
                    return Err(violation);
                }
            }
            let seq = self.sequence_counter(src_host_id);
            event.set_sequence_number(seq);
            let idx = *self
                .host_index
                .get(&dst)
                .expect("event targets an unregistered host");
            self.hosts[idx].host.push_local_event(event);
        } else {
            let seq = self.sequence_counter(src_host_id);
            event.set_sequence_number(seq);
            self.master_queue.lock().unwrap().push(Reverse(event));
        }
        Ok(())
    }

    fn sequence_counter(&self, src_host_id: Option<HostId>) -> u64 {
        match src_host_id {
            Some(host_id) => {
                let idx = self.host_index[&host_id];
                self.hosts[idx].sequence_counter.next()
            }
            None => self.engine_sequence_counter.next(),
        }
    }

    fn record_fatal_error(&self, violation: LookaheadViolation) {
        self.killed.store(true, Ordering::Release);
        let mut slot = self.fatal_error.lock().unwrap();
        if slot.is_none() {
            *slot = Some(violation);
        }
    }

    /// Worker-side signal that one dispatched host's work item has finished draining for this
    /// window.
    pub fn notify_host_processed(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        *remaining -= 1;
        if *remaining == 0 {
            self.remaining_cond.notify_all();
        }
    }

    /// Run the engine to completion, blocking the calling thread. Returns `Ok(0)` on normal
    /// termination; the only runtime failure is a lookahead violation, which halts the run at the
    /// next window boundary.
    pub fn run(&self) -> Result<i32, LookaheadViolation> {
        let n_workers = self.n_workers.unwrap_or(0);
        self.workers_shutdown.store(false, Ordering::Release);

        std::thread::scope(|scope| {
            if n_workers > 0 {
                for _ in 0..n_workers {
                    let worker_id = WorkerId::new(self.generate_worker_id());
                    scope.spawn(move || self.worker_thread_loop(worker_id));
                }
            }

            loop {
                self.drain_master_queue();
                if self.is_killed() {
                    break;
                }

                let window_end = self.window_end();
                let runnable: Vec<usize> = self
                    .hosts
                    .iter()
                    .enumerate()
                    .filter(|(_, slot)| {
                        slot.host
                            .peek_next_delivery_time()
                            .is_some_and(|t| t < window_end)
                    })
                    .map(|(idx, _)| idx)
                    .collect();

                if n_workers == 0 {
                    let mut ctx = WorkerContext::new(self, INLINE_WORKER_ID);
                    for idx in runnable {
                        self.process_host(idx, window_end, &mut ctx);
                    }
                } else if !runnable.is_empty() {
                    *self.remaining.lock().unwrap() = runnable.len();
                    {
                        let mut queue = self.dispatch_queue.lock().unwrap();
                        queue.extend(runnable);
                    }
                    self.dispatch_cond.notify_all();
                    self.wait_for_window_completion();
                }

                if self.is_killed() {
                    break;
                }

                trace!("advancing clock from {:?} to {:?}", self.clock(), window_end);
                self.clock.store(window_end.as_nanos(), Ordering::Release);
                if window_end >= self.end_time {
                    debug!("reached end_time {:?}, stopping", self.end_time);
                    break;
                }
                self.window_start
                    .store(window_end.as_nanos(), Ordering::Release);
                self.window_end.store(
                    window_end.saturating_add(self.min_time_jump).as_nanos(),
                    Ordering::Release,
                );
            }

            self.workers_shutdown.store(true, Ordering::Release);
            self.dispatch_cond.notify_all();
        });

        if let Some(violation) = self.fatal_error.lock().unwrap().take() {
            return Err(violation);
        }
        Ok(0)
    }

    fn wait_for_window_completion(&self) {
        let guard = self.remaining.lock().unwrap();
        let _guard = self
            .remaining_cond
            .wait_while(guard, |remaining| *remaining != 0)
            .unwrap();
    }

    fn worker_thread_loop(&self, worker_id: WorkerId) {
        let mut ctx = WorkerContext::new(self, worker_id);
        loop {
            let idx = {
                let mut queue = self.dispatch_queue.lock().unwrap();
                loop {
                    if let Some(idx) = queue.pop_front() {
                        break Some(idx);
                    }
                    if self.workers_shutdown.load(Ordering::Acquire) {
                        break None;
                    }
                    queue = self.dispatch_cond.wait(queue).unwrap();
                }
            };
            let Some(idx) = idx else { break };
            let window_end = self.window_end();
            self.process_host(idx, window_end, &mut ctx);
            self.notify_host_processed();
        }
    }

    /// Deliver one host's due events for the window. Does not itself touch `remaining`: the
    /// inline (`n_workers == 0`) caller needs no barrier at all, while the pooled caller
    /// (`worker_thread_loop`) only knows a window's total dispatch count once, so it owns the
    /// corresponding `notify_host_processed` call itself.
    fn process_host(&self, idx: usize, window_end: SimulationTime, ctx: &mut WorkerContext<'_, H>) {
        let slot = &self.hosts[idx];
        ctx.bind(slot.host.id(), self.clock());
        slot.host.pop_and_deliver(window_end, ctx);
        ctx.unbind();
    }

    fn drain_master_queue(&self) {
        let window_end = self.window_end();
        loop {
            let event = {
                let mut queue = self.master_queue.lock().unwrap();
                match queue.peek() {
                    Some(Reverse(event)) if event.delivery_time() < window_end => {
                        queue.pop().map(|Reverse(event)| event)
                    }
                    _ => None,
                }
            };
            match event {
                Some(event) => H::deliver_global(event.into_payload(), self),
                None => break,
            }
        }
    }
}
