use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::debug;

use crate::error::{OperationError, Result};
use crate::math::Point3;
use crate::session::{CancelToken, ControlVertexId};

use super::graph::ConnectivityGraph;
use super::opening::OpeningId;

/// Heap pops between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 256;

/// Frontier entry ordered so that [`BinaryHeap`] pops the smallest
/// distance first, then the lowest node index.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    dist: f64,
    node: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// A path through the connectivity graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPath {
    /// Vertices from source to target.
    pub vertices: Vec<ControlVertexId>,
    /// Positions of `vertices`.
    pub points: Vec<Point3>,
    /// Sum of edge weights.
    pub length: f64,
}

/// Route from one control vertex to its nearest sink.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    /// Opening whose sink ends the path; `None` when unreachable.
    pub nearest: Option<OpeningId>,
    /// Path length; infinite when unreachable.
    pub length: f64,
    /// Vertices from the source to the sink.
    pub vertices: Vec<ControlVertexId>,
    /// Positions of `vertices`.
    pub points: Vec<Point3>,
}

impl PathResult {
    fn unreachable() -> Self {
        Self {
            nearest: None,
            length: f64::INFINITY,
            vertices: Vec::new(),
            points: Vec::new(),
        }
    }

    /// Returns `true` if a sink was reached.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.nearest.is_some()
    }
}

/// Dijkstra from one source to the nearest of several targets.
///
/// Stops as soon as a target leaves the frontier. A source that is itself
/// a target yields a single-vertex path of length zero.
pub struct ShortestPath {
    source: ControlVertexId,
    targets: Vec<ControlVertexId>,
}

impl ShortestPath {
    /// Creates a new `ShortestPath` query.
    #[must_use]
    pub fn new(source: ControlVertexId, targets: &[ControlVertexId]) -> Self {
        Self {
            source,
            targets: targets.to_vec(),
        }
    }

    /// Runs the search; `None` when no target is reachable.
    #[must_use]
    pub fn execute(&self, graph: &ConnectivityGraph) -> Option<GraphPath> {
        let start = graph.node(self.source)?;
        let mut is_target = vec![false; graph.len()];
        for node in self.targets.iter().filter_map(|&id| graph.node(id)) {
            is_target[node] = true;
        }

        let mut dist = vec![f64::INFINITY; graph.len()];
        let mut prev: Vec<Option<usize>> = vec![None; graph.len()];
        let mut heap = BinaryHeap::new();
        dist[start] = 0.0;
        heap.push(Frontier { dist: 0.0, node: start });

        while let Some(Frontier { dist: d, node }) = heap.pop() {
            if d > dist[node] {
                continue;
            }
            if is_target[node] {
                let chain = walk(&prev, node);
                let mut nodes: Vec<usize> = chain.collect();
                nodes.reverse();
                return Some(graph_path(graph, &nodes, d));
            }
            relax(graph, node, d, &mut dist, &mut prev, &mut heap);
        }
        None
    }
}

/// Distances and routes from every vertex to its nearest sink.
#[derive(Debug, Clone)]
pub struct SinkPaths<'g> {
    graph: &'g ConnectivityGraph,
    dist: Vec<f64>,
    /// Next node toward the sink.
    next: Vec<Option<usize>>,
    /// Sink node each node drains to.
    sink: Vec<Option<usize>>,
    opening: Vec<Option<OpeningId>>,
}

impl SinkPaths<'_> {
    /// Route of `id` to its nearest sink.
    #[must_use]
    pub fn path(&self, id: ControlVertexId) -> PathResult {
        let Some(start) = self.graph.node(id) else {
            return PathResult::unreachable();
        };
        let Some(sink) = self.sink[start] else {
            return PathResult::unreachable();
        };
        let nodes: Vec<usize> = walk(&self.next, start).collect();
        let path = graph_path(self.graph, &nodes, self.dist[start]);
        PathResult {
            nearest: self.opening[sink],
            length: path.length,
            vertices: path.vertices,
            points: path.points,
        }
    }

    /// Distance from `id` to its nearest sink, if reachable.
    #[must_use]
    pub fn distance(&self, id: ControlVertexId) -> Option<f64> {
        let node = self.graph.node(id)?;
        self.sink[node].map(|_| self.dist[node])
    }
}

/// Multi-source Dijkstra seeded from every sink at once.
///
/// Equivalent to running [`ShortestPath`] from each vertex toward the sink
/// set, in a single pass over the graph.
pub struct NearestSink {
    sinks: Vec<(ControlVertexId, OpeningId)>,
    cancel: Option<CancelToken>,
}

impl NearestSink {
    /// Creates a new `NearestSink` search. A vertex listed under several
    /// openings keeps the first.
    #[must_use]
    pub fn new(sinks: Vec<(ControlVertexId, OpeningId)>) -> Self {
        Self { sinks, cancel: None }
    }

    /// Checks `token` while the frontier is processed.
    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Runs the search.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::Cancelled` if the token fires mid-search.
    pub fn execute<'g>(&self, graph: &'g ConnectivityGraph) -> Result<SinkPaths<'g>> {
        let n = graph.len();
        let mut paths = SinkPaths {
            graph,
            dist: vec![f64::INFINITY; n],
            next: vec![None; n],
            sink: vec![None; n],
            opening: vec![None; n],
        };

        let mut heap = BinaryHeap::new();
        for &(id, opening) in &self.sinks {
            let Some(node) = graph.node(id) else {
                debug!(?id, %opening, "sink vertex not in graph");
                continue;
            };
            if paths.sink[node].is_none() {
                paths.dist[node] = 0.0;
                paths.sink[node] = Some(node);
                paths.opening[node] = Some(opening);
                heap.push(Frontier { dist: 0.0, node });
            }
        }

        let mut pops = 0usize;
        while let Some(Frontier { dist: d, node }) = heap.pop() {
            pops += 1;
            if pops % CANCEL_CHECK_INTERVAL == 0 && self.is_cancelled() {
                return Err(OperationError::Cancelled.into());
            }
            if d > paths.dist[node] {
                continue;
            }
            for &(neighbor, weight) in graph.adjacent(node) {
                let candidate = d + weight;
                if candidate < paths.dist[neighbor] {
                    paths.dist[neighbor] = candidate;
                    paths.next[neighbor] = Some(node);
                    paths.sink[neighbor] = paths.sink[node];
                    heap.push(Frontier {
                        dist: candidate,
                        node: neighbor,
                    });
                }
            }
        }
        Ok(paths)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

fn relax(
    graph: &ConnectivityGraph,
    node: usize,
    d: f64,
    dist: &mut [f64],
    prev: &mut [Option<usize>],
    heap: &mut BinaryHeap<Frontier>,
) {
    for &(neighbor, weight) in graph.adjacent(node) {
        let candidate = d + weight;
        if candidate < dist[neighbor] {
            dist[neighbor] = candidate;
            prev[neighbor] = Some(node);
            heap.push(Frontier {
                dist: candidate,
                node: neighbor,
            });
        }
    }
}

/// Follows a link chain starting at (and including) `start`.
fn walk(links: &[Option<usize>], start: usize) -> impl Iterator<Item = usize> + '_ {
    std::iter::successors(Some(start), move |&node| links[node])
}

fn graph_path(graph: &ConnectivityGraph, nodes: &[usize], length: f64) -> GraphPath {
    GraphPath {
        vertices: nodes.iter().map(|&n| graph.id_at(n)).collect(),
        points: nodes.iter().map(|&n| graph.point_at(n)).collect(),
        length,
    }
}
