//! Latency/reliability/routability queries over a static network graph.
//!
//! A [`Topology`] loads a GML graph once at startup and thereafter answers three questions about
//! pairs of attached virtual addresses: how long a message between them takes
//! ([`latency`](Topology::latency)), how likely it is to arrive
//! ([`reliability`](Topology::reliability)), and whether a path exists at all
//! ([`is_routable`](Topology::is_routable)). Results are cached; the underlying shortest-path
//! computation only ever runs once per unordered pair of attached addresses.

mod cache;
mod graph;
mod path;

pub use path::Path;

use std::collections::HashMap;
use std::path::Path as FsPath;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

use petgraph::graph::NodeIndex;
use rand::Rng;

use crate::error::{QueryError, StartupError};
use crate::ids::AddressId;
use cache::PathCache;
use graph::TopologyGraph;

/// The topology service. Cheap to share: every field is internally synchronized, so `&Topology`
/// is enough to drive concurrent `connect`/`latency`/`reliability` calls from multiple worker
/// threads.
pub struct Topology {
    graph: Mutex<TopologyGraph>,
    attachments: RwLock<HashMap<AddressId, NodeIndex>>,
    path_cache: PathCache,
    dijkstra_time_ns: AtomicU64,
}

impl Topology {
    /// Parse and validate a GML topology graph. Fails if the graph isn't directed, a
    /// point-of-interest vertex is missing a required attribute, or the graph is not strongly
    /// connected.
    pub fn new(gml_text: &str) -> Result<Self, StartupError> {
        let graph = TopologyGraph::load(gml_text)?;
        Ok(Self {
            graph: Mutex::new(graph),
            attachments: RwLock::new(HashMap::new()),
            path_cache: PathCache::new(),
            dijkstra_time_ns: AtomicU64::new(0),
        })
    }

    /// Load a topology graph from a file, e.g. `EngineConfig::topology_path`.
    pub fn from_file(path: impl AsRef<FsPath>) -> Result<Self, StartupError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            StartupError::GraphUnloadable(format!("could not read {}: {e}", path.display()))
        })?;
        Self::new(&text)
    }

    /// Attach `address` to a point-of-interest vertex chosen among those matching the given
    /// hints, breaking ties uniformly at random via `rng`. Returns the vertex's
    /// `(bandwidth_up, bandwidth_down)` on success.
    pub fn connect(
        &self,
        address: AddressId,
        rng: &mut impl Rng,
        type_hint: Option<&str>,
        cluster_hint: Option<&str>,
        ip_hint: Option<&str>,
    ) -> Result<(f64, f64), QueryError> {
        let graph = self.graph.lock().unwrap();
        let candidates = graph.poi_indices_matching(type_hint, cluster_hint, ip_hint);
        let &chosen = if candidates.len() <= 1 {
            candidates.first()
        } else {
            let i = rng.gen_range(0..candidates.len());
            candidates.get(i)
        }
        .ok_or_else(|| {
            QueryError::PathComputationFailed(
                "no point-of-interest vertex matches the requested hints".into(),
            )
        })?;

        let bandwidth = graph.bandwidth(chosen);
        drop(graph);

        self.attachments.write().unwrap().insert(address, chosen);
        Ok(bandwidth)
    }

    /// Detach `address`, if attached. Does not evict any paths already cached for it; stale
    /// entries are harmless since an address is never reused for a different vertex without an
    /// intervening process restart.
    pub fn disconnect(&self, address: AddressId) {
        self.attachments.write().unwrap().remove(&address);
    }

    fn resolve(&self, address: AddressId) -> Option<NodeIndex> {
        self.attachments.read().unwrap().get(&address).copied()
    }

    fn path(&self, src: AddressId, dst: AddressId) -> Result<Path, QueryError> {
        if let Some(path) = self.path_cache.get(src, dst) {
            return Ok(path);
        }

        let src_idx = self.resolve(src).ok_or(QueryError::AddressUnattached)?;
        let dst_idx = self.resolve(dst).ok_or(QueryError::AddressUnattached)?;

        let graph = self.graph.lock().unwrap();
        let started = Instant::now();
        let path = graph.compute_path(src_idx, dst_idx)?;
        let elapsed = started.elapsed();
        drop(graph);

        self.dijkstra_time_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
        self.path_cache.insert(src, dst, path);
        Ok(path)
    }

    /// Milliseconds a message from `src` to `dst` takes, or `-1.0` if either address is
    /// unattached or no path exists. Logged at the severity the error warrants: an unattached
    /// address is a caller bug worth a warning, an unreachable destination in an otherwise
    /// connected graph is worth an error.
    pub fn latency(&self, src: AddressId, dst: AddressId) -> f64 {
        match self.path(src, dst) {
            Ok(path) => path.latency_ms(),
            Err(QueryError::AddressUnattached) => {
                log::warn!("latency query for unattached address ({src:?} -> {dst:?})");
                -1.0
            }
            Err(err @ QueryError::PathComputationFailed(_)) => {
                log::error!("latency query failed: {err}");
                -1.0
            }
        }
    }

    /// Probability in `[0, 1]` that a message from `src` to `dst` arrives, or `-1.0` on the same
    /// error conditions as [`latency`](Self::latency).
    pub fn reliability(&self, src: AddressId, dst: AddressId) -> f64 {
        match self.path(src, dst) {
            Ok(path) => path.reliability(),
            Err(QueryError::AddressUnattached) => {
                log::warn!("reliability query for unattached address ({src:?} -> {dst:?})");
                -1.0
            }
            Err(err @ QueryError::PathComputationFailed(_)) => {
                log::error!("reliability query failed: {err}");
                -1.0
            }
        }
    }

    /// Whether a path currently exists between two attached addresses.
    pub fn is_routable(&self, src: AddressId, dst: AddressId) -> bool {
        self.path(src, dst).is_ok()
    }

    pub fn clear_path_cache(&self) {
        self.path_cache.clear();
    }

    /// Total wall-clock time spent inside `dijkstra` across every cache-miss path computation so
    /// far. Exposed for callers that want to report it alongside their own metrics; the topology
    /// service does not log it itself.
    pub fn cumulative_dijkstra_time(&self) -> Duration {
        Duration::from_nanos(self.dijkstra_time_ns.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const RING: &str = r#"
graph [
  directed 1
  node [
    id 0
    label "poi-a"
    type "server"
    ip "10.0.0.1"
    geocode "us"
    bandwidthup 100.0
    bandwidthdown 100.0
    packetloss 0.0
  ]
  node [
    id 1
    label "poi-b"
    type "server"
    ip "10.0.0.2"
    geocode "us"
    bandwidthup 100.0
    bandwidthdown 100.0
    packetloss 0.0
  ]
  edge [
    source 0
    target 1
    latency 50.0
    jitter 0.0
    packetloss 0.0
  ]
  edge [
    source 1
    target 0
    latency 50.0
    jitter 0.0
    packetloss 0.0
  ]
]"#;

    #[test]
    fn connect_then_query_round_trips() {
        let topology = Topology::new(RING).unwrap();
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);
        let a = AddressId::new(1);
        let b = AddressId::new(2);

        topology.connect(a, &mut rng, None, None, None).unwrap();
        topology.connect(b, &mut rng, None, None, None).unwrap();

        assert!(topology.is_routable(a, b));
        assert!(topology.latency(a, b) > 0.0);
        assert!((0.0..=1.0).contains(&topology.reliability(a, b)));
    }

    #[test]
    fn unattached_address_is_reported_as_sentinel() {
        let topology = Topology::new(RING).unwrap();
        let a = AddressId::new(1);
        let b = AddressId::new(2);
        assert_eq!(topology.latency(a, b), -1.0);
        assert!(!topology.is_routable(a, b));
    }

    #[test]
    fn second_query_is_served_from_cache() {
        let topology = Topology::new(RING).unwrap();
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(3);
        let a = AddressId::new(1);
        let b = AddressId::new(2);
        topology.connect(a, &mut rng, None, None, None).unwrap();
        topology.connect(b, &mut rng, None, None, None).unwrap();

        let first = topology.latency(a, b);
        let before = topology.cumulative_dijkstra_time();
        let second = topology.latency(a, b);
        let after = topology.cumulative_dijkstra_time();

        assert_eq!(first, second);
        assert_eq!(before, after);
    }

    #[test]
    fn loads_from_a_file_path() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(RING.as_bytes()).unwrap();
        let topology = Topology::from_file(file.path()).unwrap();
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(1);
        let a = AddressId::new(1);
        topology.connect(a, &mut rng, None, None, None).unwrap();
        assert!(topology.is_routable(a, a));
    }
}
