use std::collections::HashMap;

use tracing::{debug, info, instrument};

use crate::config::DrainageParams;
use crate::error::{OperationError, Result};
use crate::math::intersect_2d::segment_loop_params;
use crate::math::{Point3, TOLERANCE};
use crate::operations::query::SurfaceRegion;
use crate::session::{ControlVertex, ControlVertexId};

/// Undirected graph over the control vertices that lie on the deck.
///
/// Nodes are numbered in the order the vertices were given; neighbor lists
/// are kept in that order so traversals are deterministic. Edge weights are
/// straight-line distances.
#[derive(Debug, Clone, Default)]
pub struct ConnectivityGraph {
    ids: Vec<ControlVertexId>,
    points: Vec<Point3>,
    index: HashMap<ControlVertexId, usize>,
    adjacency: Vec<Vec<(usize, f64)>>,
    excluded: Vec<ControlVertexId>,
}

impl ConnectivityGraph {
    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if no vertex made it into the graph.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns `true` if `id` is a node.
    #[must_use]
    pub fn contains(&self, id: ControlVertexId) -> bool {
        self.index.contains_key(&id)
    }

    /// Vertices left out because they do not project into the region.
    #[must_use]
    pub fn excluded(&self) -> &[ControlVertexId] {
        &self.excluded
    }

    /// Neighbors of `id` with edge weights; empty for unknown ids.
    pub fn neighbors(&self, id: ControlVertexId) -> impl Iterator<Item = (ControlVertexId, f64)> + '_ {
        self.index
            .get(&id)
            .into_iter()
            .flat_map(move |&i| self.adjacency[i].iter().map(move |&(j, w)| (self.ids[j], w)))
    }

    /// Number of undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Returns `true` if every edge is stored in both directions with the
    /// same weight.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        self.adjacency.iter().enumerate().all(|(i, list)| {
            list.iter().all(|&(j, w)| {
                self.adjacency[j]
                    .iter()
                    .any(|&(k, back)| k == i && (back - w).abs() <= f64::EPSILON * w.max(1.0))
            })
        })
    }

    pub(crate) fn node(&self, id: ControlVertexId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub(crate) fn id_at(&self, node: usize) -> ControlVertexId {
        self.ids[node]
    }

    pub(crate) fn point_at(&self, node: usize) -> Point3 {
        self.points[node]
    }

    pub(crate) fn adjacent(&self, node: usize) -> &[(usize, f64)] {
        &self.adjacency[node]
    }

    fn add_node(&mut self, vertex: &ControlVertex) {
        self.index.insert(vertex.id, self.ids.len());
        self.ids.push(vertex.id);
        self.points.push(vertex.position);
        self.adjacency.push(Vec::new());
    }

    fn add_edge(&mut self, a: usize, b: usize, weight: f64) {
        self.adjacency[a].push((b, weight));
        self.adjacency[b].push((a, weight));
    }
}

/// Builds a [`ConnectivityGraph`] whose edges stay on the deck.
///
/// A pair of vertices within `max_connection_distance` is connected when
/// every interior sample along the segment between them lies in the region.
/// The sample count is `max(min_samples, ceil(length / sample_spacing))`.
/// Openings narrower than the sample step are caught by splitting the
/// segment where it meets a boundary loop and testing each piece.
pub struct BuildConnectivity {
    max_distance: f64,
    sample_spacing: f64,
    min_samples: usize,
}

impl BuildConnectivity {
    /// Creates a new `BuildConnectivity` operation.
    #[must_use]
    pub fn new(params: &DrainageParams) -> Self {
        Self {
            max_distance: params.max_connection_distance,
            sample_spacing: params.sample_spacing,
            min_samples: params.min_samples,
        }
    }

    /// Builds the graph over `vertices`.
    ///
    /// A pair that fails validation is simply not connected; the build
    /// itself never aborts on geometry.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` if the distance or spacing is
    /// not positive.
    #[instrument(skip_all, fields(vertices = vertices.len()))]
    pub fn execute(&self, region: &SurfaceRegion, vertices: &[ControlVertex]) -> Result<ConnectivityGraph> {
        if !(self.max_distance > 0.0 && self.sample_spacing > 0.0) {
            return Err(OperationError::InvalidInput(format!(
                "connection distance {} and sample spacing {} must be positive",
                self.max_distance, self.sample_spacing
            ))
            .into());
        }

        let mut graph = ConnectivityGraph::default();
        for vertex in vertices {
            if region.contains_point(&vertex.position) {
                graph.add_node(vertex);
            } else {
                debug!(id = ?vertex.id, position = ?vertex.position, "vertex outside deck region");
                graph.excluded.push(vertex.id);
            }
        }

        let n = graph.len();
        for a in 0..n {
            for b in (a + 1)..n {
                let (pa, pb) = (graph.points[a], graph.points[b]);
                let length = (pb - pa).norm();
                if !length.is_finite() || length > self.max_distance {
                    continue;
                }
                if self.segment_on_deck(region, &pa, &pb, length) {
                    graph.add_edge(a, b, length);
                }
            }
        }

        info!(
            nodes = graph.len(),
            edges = graph.edge_count(),
            excluded = graph.excluded.len(),
            "connectivity graph built"
        );
        Ok(graph)
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn segment_on_deck(&self, region: &SurfaceRegion, a: &Point3, b: &Point3, length: f64) -> bool {
        let samples = ((length / self.sample_spacing).ceil() as usize).max(self.min_samples);
        let sampled = (1..=samples).all(|s| {
            let t = s as f64 / (samples + 1) as f64;
            region.contains_point(&a.lerp(b, t))
        });
        sampled && pieces_on_deck(region, a, b)
    }
}

/// Splits `a`–`b` at every boundary hit. Pieces between consecutive hits
/// lie wholly inside or outside a loop, so their midpoints decide.
fn pieces_on_deck(region: &SurfaceRegion, a: &Point3, b: &Point3) -> bool {
    let (ua, ub) = (region.project(a), region.project(b));
    let mut cuts: Vec<f64> = std::iter::once(region.outer())
        .chain(region.holes().iter().map(Vec::as_slice))
        .flat_map(|points| segment_loop_params(&ua, &ub, points))
        .collect();
    cuts.push(0.0);
    cuts.push(1.0);
    cuts.sort_by(f64::total_cmp);

    cuts.windows(2)
        .filter(|w| w[1] - w[0] > TOLERANCE)
        .all(|w| region.contains(&ua.lerp(&ub, 0.5 * (w[0] + w[1]))))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::surface::Plane;
    use crate::math::Point2;
    use crate::session::{EditSession, MemorySession};
    use crate::topology::TopologyStore;

    fn square_loop(x: f64, y: f64, size: f64) -> Vec<Point2> {
        vec![
            Point2::new(x, y),
            Point2::new(x + size, y),
            Point2::new(x + size, y + size),
            Point2::new(x, y + size),
        ]
    }

    /// 1000×1000 deck with a 200×200 hole in the middle.
    fn holed_deck() -> SurfaceRegion {
        SurfaceRegion::from_loops(
            Plane::horizontal(0.0),
            square_loop(0.0, 0.0, 1000.0),
            vec![square_loop(400.0, 400.0, 200.0)],
        )
        .unwrap()
    }

    fn vertices(points: &[(f64, f64)]) -> (MemorySession, Vec<ControlVertex>) {
        let mut session = MemorySession::new(TopologyStore::new());
        for &(x, y) in points {
            session.add_vertex(Point3::new(x, y, 0.0));
        }
        let list = session.control_vertices().unwrap();
        (session, list)
    }

    #[test]
    fn no_edge_crosses_the_hole() {
        let region = holed_deck();
        let (_, list) = vertices(&[(500.0, 100.0), (500.0, 900.0), (100.0, 500.0), (900.0, 100.0)]);
        let graph = BuildConnectivity::new(&DrainageParams::default())
            .execute(&region, &list)
            .unwrap();

        let across: Vec<_> = graph.neighbors(list[0].id).map(|(id, _)| id).collect();
        assert!(!across.contains(&list[1].id));
        assert!(across.contains(&list[2].id));
        assert!(across.contains(&list[3].id));
    }

    #[test]
    fn graph_is_symmetric_with_distance_weights() {
        let region = holed_deck();
        let mut grid = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                grid.push((f64::from(i) * 250.0, f64::from(j) * 250.0));
            }
        }
        let (_, list) = vertices(&grid);
        let graph = BuildConnectivity::new(&DrainageParams::default())
            .execute(&region, &list)
            .unwrap();

        assert!(graph.is_symmetric());
        // (500, 500) sits inside the hole.
        assert_eq!(graph.excluded().len(), 1);
        for (id, w) in graph.neighbors(list[0].id) {
            let other = list.iter().find(|v| v.id == id).unwrap();
            assert!((w - (other.position - list[0].position).norm()).abs() < 1e-9);
        }
    }

    #[test]
    fn neighbor_lists_follow_vertex_order() {
        let region = holed_deck();
        let (_, list) = vertices(&[(100.0, 100.0), (200.0, 100.0), (50.0, 50.0), (300.0, 200.0)]);
        let graph = BuildConnectivity::new(&DrainageParams::default())
            .execute(&region, &list)
            .unwrap();
        let order: Vec<_> = graph.neighbors(list[3].id).map(|(id, _)| id).collect();
        assert_eq!(order, vec![list[0].id, list[1].id, list[2].id]);
    }

    #[test]
    fn distance_limit_prunes_pairs() {
        let region = holed_deck();
        let (_, list) = vertices(&[(0.0, 0.0), (100.0, 0.0), (1000.0, 0.0)]);
        let params = DrainageParams::default().with_max_connection_distance(150.0);
        let graph = BuildConnectivity::new(&params).execute(&region, &list).unwrap();
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn concave_notch_blocks_shortcut() {
        let region = SurfaceRegion::from_loops(
            Plane::horizontal(0.0),
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(400.0, 0.0),
                Point2::new(400.0, 200.0),
                Point2::new(200.0, 200.0),
                Point2::new(200.0, 400.0),
                Point2::new(0.0, 400.0),
            ],
            vec![],
        )
        .unwrap();
        let (_, list) = vertices(&[(350.0, 150.0), (150.0, 350.0)]);
        let graph = BuildConnectivity::new(&DrainageParams::default())
            .execute(&region, &list)
            .unwrap();
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn narrow_hole_between_samples_blocks_edge() {
        let region = SurfaceRegion::from_loops(
            Plane::horizontal(0.0),
            square_loop(0.0, 0.0, 1000.0),
            vec![square_loop(495.0, 495.0, 10.0)],
        )
        .unwrap();
        let (_, list) = vertices(&[(0.0, 500.0), (1000.0, 500.0), (0.0, 400.0), (1000.0, 400.0)]);
        let graph = BuildConnectivity::new(&DrainageParams::default())
            .execute(&region, &list)
            .unwrap();

        let across: Vec<_> = graph.neighbors(list[0].id).map(|(id, _)| id).collect();
        assert!(!across.contains(&list[1].id));
        let beside: Vec<_> = graph.neighbors(list[2].id).map(|(id, _)| id).collect();
        assert!(beside.contains(&list[3].id));
    }

    #[test]
    fn edge_along_hole_rim_is_kept() {
        let region = holed_deck();
        let (_, list) = vertices(&[(400.0, 400.0), (600.0, 400.0)]);
        let graph = BuildConnectivity::new(&DrainageParams::default())
            .execute(&region, &list)
            .unwrap();
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn rejects_zero_spacing() {
        let region = holed_deck();
        let params = DrainageParams::default().with_sample_spacing(0.0);
        assert!(BuildConnectivity::new(&params).execute(&region, &[]).is_err());
    }
}
