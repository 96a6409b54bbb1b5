//! Graph loading, validation, and shortest-path computation.
//!
//! The graph is treated as an opaque, non-reentrant resource: every operation here — including
//! attribute reads during attachment — runs under the caller's lock on
//! [`crate::topology::Topology`]'s single graph mutex. [`compute_path`](TopologyGraph::compute_path)
//! itself holds no lock; it's the caller's job to hold one while calling it.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use graph_format::gml::Value;

use crate::error::{QueryError, StartupError};
use crate::topology::path::Path;

/// A self-path (querying a host against itself) has no edges to sum latency over. The source
/// material treats this as a single virtual hop rather than zero-cost; kept here as a named
/// constant rather than a magic number, per the open question in the design notes.
const SELF_PATH_LATENCY_MS: f64 = 1.0;

#[derive(Debug, Clone)]
pub(crate) struct Vertex {
    /// The vertex's semantic `id` attribute (e.g. `"poi-east-1"`), distinct from the GML
    /// structural node id used only to resolve edge endpoints.
    pub label: String,
    pub kind: String,
    pub ip: Option<String>,
    pub geocode: Option<String>,
    pub bandwidth_up: Option<f64>,
    pub bandwidth_down: Option<f64>,
    pub packet_loss: f64,
}

impl Vertex {
    fn is_poi(&self) -> bool {
        self.label.contains("poi")
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct EdgeAttrs {
    pub latency_ms: f64,
    #[allow(dead_code)] // not consumed by the shortest-path metric, kept for completeness
    pub jitter_ms: f64,
    pub packet_loss: f32,
}

pub(crate) struct TopologyGraph {
    graph: DiGraph<Vertex, EdgeAttrs>,
    poi_indices: Vec<NodeIndex>,
}

impl TopologyGraph {
    pub(crate) fn load(gml_text: &str) -> Result<Self, StartupError> {
        let parsed = graph_format::parse(gml_text)
            .map_err(|e| StartupError::GraphUnloadable(format!("parse error: {e}")))?;

        if !parsed.directed {
            return Err(StartupError::GraphUnloadable(
                "topology graph must be declared directed".into(),
            ));
        }
        if parsed.nodes.is_empty() {
            return Err(StartupError::GraphUnloadable(
                "topology graph has no vertices".into(),
            ));
        }

        let mut graph = DiGraph::new();
        let mut id_to_index: HashMap<u32, NodeIndex> = HashMap::with_capacity(parsed.nodes.len());

        for node in &parsed.nodes {
            let gml_id = node.id.ok_or_else(|| {
                StartupError::GraphUnloadable("every node must declare an 'id'".into())
            })?;
            let vertex = Self::vertex_from_gml(node)?;
            let idx = graph.add_node(vertex);
            if id_to_index.insert(gml_id, idx).is_some() {
                return Err(StartupError::GraphUnloadable(format!(
                    "duplicate node id {gml_id}"
                )));
            }
        }

        for edge in &parsed.edges {
            let &source = id_to_index.get(&edge.source).ok_or_else(|| {
                StartupError::GraphUnloadable(format!(
                    "edge references unknown source id {}",
                    edge.source
                ))
            })?;
            let &target = id_to_index.get(&edge.target).ok_or_else(|| {
                StartupError::GraphUnloadable(format!(
                    "edge references unknown target id {}",
                    edge.target
                ))
            })?;
            let attrs = Self::edge_attrs_from_gml(edge)?;
            graph.add_edge(source, target, attrs);
        }

        let sccs = petgraph::algo::kosaraju_scc(&graph);
        if sccs.len() != 1 {
            return Err(StartupError::UnconnectedTopology);
        }

        let poi_indices = graph
            .node_indices()
            .filter(|&idx| graph[idx].is_poi())
            .collect();

        Ok(Self {
            graph,
            poi_indices,
        })
    }

    fn vertex_from_gml(node: &graph_format::gml::Node<'_>) -> Result<Vertex, StartupError> {
        let get_str = |key: &str| -> Option<String> {
            node.other.get(key).and_then(Value::as_str).map(str::to_owned)
        };
        let get_float = |key: &str| -> Option<f64> {
            node.other.get(key).and_then(Value::as_float).map(f64::from)
        };

        let label = get_str("label").ok_or_else(|| {
            StartupError::GraphUnloadable("vertex is missing its 'label' attribute".into())
        })?;
        let kind = get_str("type").ok_or_else(|| {
            StartupError::GraphUnloadable(format!("vertex '{label}' is missing 'type'"))
        })?;

        let is_poi = label.contains("poi");
        let ip = get_str("ip");
        let geocode = get_str("geocode");
        let bandwidth_up = get_float("bandwidthup");
        let bandwidth_down = get_float("bandwidthdown");
        let packet_loss = get_float("packetloss").unwrap_or(0.0);

        if is_poi {
            if ip.is_none()
                || geocode.is_none()
                || bandwidth_up.is_none()
                || bandwidth_down.is_none()
                || get_float("packetloss").is_none()
            {
                return Err(StartupError::GraphUnloadable(format!(
                    "point-of-interest vertex '{label}' must declare ip, geocode, \
                     bandwidthup, bandwidthdown, and packetloss"
                )));
            }
            if !(0.0..=1.0).contains(&packet_loss) {
                return Err(StartupError::GraphUnloadable(format!(
                    "vertex '{label}' packetloss must be in [0, 1]"
                )));
            }
        }

        Ok(Vertex {
            label,
            kind,
            ip,
            geocode,
            bandwidth_up,
            bandwidth_down,
            packet_loss,
        })
    }

    fn edge_attrs_from_gml(edge: &graph_format::gml::Edge<'_>) -> Result<EdgeAttrs, StartupError> {
        let get_float = |key: &str| -> Option<f64> {
            edge.other.get(key).and_then(Value::as_float).map(f64::from)
        };

        let latency_ms = get_float("latency").ok_or_else(|| {
            StartupError::GraphUnloadable("edge is missing 'latency'".into())
        })?;
        let jitter_ms = get_float("jitter").ok_or_else(|| {
            StartupError::GraphUnloadable("edge is missing 'jitter'".into())
        })?;
        let packet_loss = get_float("packetloss").ok_or_else(|| {
            StartupError::GraphUnloadable("edge is missing 'packetloss'".into())
        })? as f32;

        if !(0.0..=1.0).contains(&packet_loss) {
            return Err(StartupError::GraphUnloadable(
                "edge packetloss must be in [0, 1]".into(),
            ));
        }

        Ok(EdgeAttrs {
            latency_ms,
            jitter_ms,
            packet_loss,
        })
    }

    /// Point-of-interest vertices matching the given hints, narrowed in this order: exact `type`
    /// match, exact `geocode` (cluster) match, then longest common prefix of the vertex's `ip`
    /// against `ip_hint` (kept only among vertices tied for the longest match — this degrades to
    /// "no preference" when nothing shares a prefix, rather than rejecting the connect).
    pub(crate) fn poi_indices_matching(
        &self,
        type_hint: Option<&str>,
        cluster_hint: Option<&str>,
        ip_hint: Option<&str>,
    ) -> Vec<NodeIndex> {
        let mut candidates: Vec<NodeIndex> = self
            .poi_indices
            .iter()
            .copied()
            .filter(|&idx| type_hint.is_none_or(|t| self.graph[idx].kind == t))
            .filter(|&idx| {
                cluster_hint.is_none_or(|c| self.graph[idx].geocode.as_deref() == Some(c))
            })
            .collect();

        if let Some(hint) = ip_hint {
            if !candidates.is_empty() {
                let scored: Vec<(NodeIndex, usize)> = candidates
                    .iter()
                    .map(|&idx| {
                        let ip = self.graph[idx].ip.as_deref().unwrap_or("");
                        (idx, common_prefix_len(hint, ip))
                    })
                    .collect();
                let max_len = scored.iter().map(|&(_, len)| len).max().unwrap_or(0);
                candidates = scored
                    .into_iter()
                    .filter(|&(_, len)| len == max_len)
                    .map(|(idx, _)| idx)
                    .collect();
            }
        }

        candidates
    }

    pub(crate) fn bandwidth(&self, idx: NodeIndex) -> (f64, f64) {
        let vertex = &self.graph[idx];
        (
            vertex.bandwidth_up.unwrap_or(0.0),
            vertex.bandwidth_down.unwrap_or(0.0),
        )
    }

    /// Shortest path from `src` to `dst` by latency, with reliability composed multiplicatively
    /// from each endpoint vertex's packet loss and every traversed edge's packet loss.
    pub(crate) fn compute_path(&self, src: NodeIndex, dst: NodeIndex) -> Result<Path, QueryError> {
        let ploss_src = self.graph[src].packet_loss;
        let ploss_dst = self.graph[dst].packet_loss;

        if src == dst {
            let reliability = (1.0 - ploss_src) * (1.0 - ploss_dst);
            return Ok(Path::new(SELF_PATH_LATENCY_MS, reliability));
        }

        let measures = petgraph::algo::dijkstra(&self.graph, src, Some(dst), |edge| PathMeasure {
            latency_ms: edge.weight().latency_ms,
            loss_factor: edge.weight().packet_loss as f64,
        });

        let measure = measures.get(&dst).ok_or_else(|| {
            QueryError::PathComputationFailed(format!(
                "no path from vertex {src:?} to vertex {dst:?}"
            ))
        })?;

        let edge_reliability = 1.0 - measure.loss_factor;
        let reliability = (1.0 - ploss_src) * (1.0 - ploss_dst) * edge_reliability;
        Ok(Path::new(measure.latency_ms, reliability))
    }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}

/// The running (latency, composed-packet-loss) total `dijkstra` accumulates along a path. The
/// packet-loss composition mirrors the reliability-combining rule used everywhere else in the
/// topology service: `1 - (1 - a)(1 - b)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct PathMeasure {
    latency_ms: f64,
    loss_factor: f64,
}

impl std::ops::Add for PathMeasure {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            latency_ms: self.latency_ms + rhs.latency_ms,
            loss_factor: 1.0 - (1.0 - self.loss_factor) * (1.0 - rhs.loss_factor),
        }
    }
}

impl PartialOrd for PathMeasure {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.latency_ms.partial_cmp(&other.latency_ms)
    }
}

impl petgraph::algo::Measure for PathMeasure {}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn loads_and_finds_shortest_path() {
        let graph = TopologyGraph::load(RING).unwrap();
        assert_eq!(graph.poi_indices.len(), 2);
        let a = graph.poi_indices[0];
        let b = graph.poi_indices[1];
        let path = graph.compute_path(a, b).unwrap();
        assert!((path.latency_ms() - 50.0).abs() < 1e-9);
        assert!((path.reliability() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn self_path_is_virtual_hop() {
        let graph = TopologyGraph::load(RING).unwrap();
        let a = graph.poi_indices[0];
        let path = graph.compute_path(a, a).unwrap();
        assert_eq!(path.latency_ms(), SELF_PATH_LATENCY_MS);
    }

    #[test]
    fn rejects_disconnected_graph() {
        let disconnected = r#"
graph [
  directed 1
  node [ id 0 type "server" ]
  node [ id 1 type "server" ]
]"#;
        assert!(matches!(
            TopologyGraph::load(disconnected),
            Err(StartupError::UnconnectedTopology)
        ));
    }
}
