use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use spade::handles::{FixedFaceHandle, InnerTag};
use spade::{
    ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2,
    PositionInTriangulation, Triangulation,
};
use tracing::debug;

use crate::error::{GeometryError, Result};
use crate::geometry::surface::{Plane, Surface};
use crate::math::distance_2d::point_to_loop_dist;
use crate::math::polygon_2d::{perimeter_2d, point_in_polygon_2d, signed_area_2d, Bounds2};
use crate::math::{Point2, Point3};
use crate::tessellation::{TessellateWire, TessellationParams};
use crate::topology::{FaceId, TopologyStore};

/// Distance within which a point counts as lying on a boundary loop.
const BOUNDARY_TOLERANCE: f64 = 1e-6;

type Cdt = ConstrainedDelaunayTriangulation<SpadePoint2<f64>>;

enum Containment {
    /// Constrained triangulation of all loops; odd-depth faces are interior.
    Triangulated { cdt: Cdt, interior: HashSet<usize> },
    /// Winding-number tests against the raw loops.
    Winding,
}

/// The bounded parameter domain of one planar deck face.
///
/// Boundary loops are tessellated and projected into the face's `(u, v)`
/// plane. Containment is boundary-inclusive and handles non-convex
/// outlines and holes.
pub struct SurfaceRegion {
    face: Option<FaceId>,
    surface: Plane,
    outer: Vec<Point2>,
    holes: Vec<Vec<Point2>>,
    bounds: Bounds2,
    containment: Containment,
}

impl SurfaceRegion {
    /// Builds the region of a single face. The outer loop is the one with
    /// the largest perimeter; all others are holes.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::Unavailable` if the face or its loops cannot
    /// be read.
    pub fn from_face(
        store: &TopologyStore,
        face_id: FaceId,
        params: &TessellationParams,
    ) -> Result<Self> {
        let face = store
            .face(face_id)
            .map_err(|e| GeometryError::Unavailable(format!("face lookup failed: {e}")))?;

        let mut loops = Vec::with_capacity(face.loops.len());
        for &wire in &face.loops {
            let poly = TessellateWire::new(wire, *params)
                .execute(store)
                .map_err(|e| GeometryError::Unavailable(format!("boundary loop unreadable: {e}")))?;
            loops.push(
                poly.points
                    .iter()
                    .map(|p| face.surface.project(p))
                    .collect::<Vec<_>>(),
            );
        }

        let outer_index = outer_loop_index(&loops)
            .ok_or_else(|| GeometryError::Unavailable("face has no boundary loops".into()))?;
        let outer = loops.swap_remove(outer_index);
        let mut region = Self::from_loops(face.surface.clone(), outer, loops)?;
        region.face = Some(face_id);
        Ok(region)
    }

    /// Picks the deck face: among faces whose outward normal has a vertical
    /// component of at least `min_normal_z`, the one enclosing the largest
    /// outer area.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::Unavailable` if no face qualifies.
    pub fn select_deck(
        store: &TopologyStore,
        params: &TessellationParams,
        min_normal_z: f64,
    ) -> Result<Self> {
        let mut best: Option<(f64, Self)> = None;
        for (face_id, face) in store.faces() {
            if face.outward_normal().z < min_normal_z {
                continue;
            }
            let region = Self::from_face(store, face_id, params)?;
            let area = signed_area_2d(&region.outer).abs();
            if best.as_ref().is_none_or(|(a, _)| area > *a) {
                best = Some((area, region));
            }
        }
        best.map(|(_, region)| region).ok_or_else(|| {
            GeometryError::Unavailable("no upward-facing face to drain".into()).into()
        })
    }

    /// Builds a region directly from projected loops.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::Unavailable` if the outer loop has fewer than
    /// three points.
    pub fn from_loops(surface: Plane, outer: Vec<Point2>, holes: Vec<Vec<Point2>>) -> Result<Self> {
        let bounds = Bounds2::from_points(&outer)
            .filter(|_| outer.len() >= 3)
            .ok_or_else(|| GeometryError::Unavailable("outer boundary needs 3 points".into()))?;

        let containment = match triangulate(&outer, &holes) {
            Ok((cdt, interior)) => Containment::Triangulated { cdt, interior },
            Err(reason) => {
                debug!(%reason, "falling back to winding-number containment");
                Containment::Winding
            }
        };

        Ok(Self {
            face: None,
            surface,
            outer,
            holes,
            bounds,
            containment,
        })
    }

    /// The face this region was built from, if any.
    #[must_use]
    pub fn face(&self) -> Option<FaceId> {
        self.face
    }

    /// The plane the region lies on.
    #[must_use]
    pub fn surface(&self) -> &Plane {
        &self.surface
    }

    /// Outer boundary in `(u, v)`.
    #[must_use]
    pub fn outer(&self) -> &[Point2] {
        &self.outer
    }

    /// Hole boundaries in `(u, v)`.
    #[must_use]
    pub fn holes(&self) -> &[Vec<Point2>] {
        &self.holes
    }

    /// Bounding box of the outer boundary.
    #[must_use]
    pub fn bounds(&self) -> &Bounds2 {
        &self.bounds
    }

    /// Projects a 3D point into the region's `(u, v)` plane.
    #[must_use]
    pub fn project(&self, point: &Point3) -> Point2 {
        self.surface.project(point)
    }

    /// Returns `true` if `uv` lies inside the region or on its boundary.
    #[must_use]
    pub fn contains(&self, uv: &Point2) -> bool {
        if !uv.x.is_finite() || !uv.y.is_finite() {
            return false;
        }
        if !self.bounds.contains(uv, BOUNDARY_TOLERANCE) {
            return false;
        }
        let inside = match &self.containment {
            Containment::Triangulated { cdt, interior } => locate_interior(cdt, interior, uv),
            Containment::Winding => {
                point_in_polygon_2d(uv, &self.outer)
                    && !self.holes.iter().any(|h| point_in_polygon_2d(uv, h))
            }
        };
        inside || self.on_boundary(uv)
    }

    /// Projects `point` and tests containment.
    #[must_use]
    pub fn contains_point(&self, point: &Point3) -> bool {
        self.contains(&self.project(point))
    }

    fn on_boundary(&self, uv: &Point2) -> bool {
        point_to_loop_dist(uv, &self.outer) <= BOUNDARY_TOLERANCE
            || self
                .holes
                .iter()
                .any(|h| point_to_loop_dist(uv, h) <= BOUNDARY_TOLERANCE)
    }
}

impl fmt::Debug for SurfaceRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceRegion")
            .field("face", &self.face)
            .field("outer_points", &self.outer.len())
            .field("holes", &self.holes.len())
            .field("bounds", &self.bounds)
            .field(
                "triangulated",
                &matches!(self.containment, Containment::Triangulated { .. }),
            )
            .finish_non_exhaustive()
    }
}

/// Index of the loop with the largest perimeter.
#[must_use]
pub fn outer_loop_index(loops: &[Vec<Point2>]) -> Option<usize> {
    loops
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| perimeter_2d(a).total_cmp(&perimeter_2d(b)))
        .map(|(i, _)| i)
}

fn triangulate(
    outer: &[Point2],
    holes: &[Vec<Point2>],
) -> std::result::Result<(Cdt, HashSet<usize>), String> {
    let mut cdt = Cdt::new();
    insert_constraint_loop(&mut cdt, outer)?;
    for hole in holes {
        insert_constraint_loop(&mut cdt, hole)?;
    }
    let interior = classify_interior_faces(&cdt);
    Ok((cdt, interior))
}

/// Inserts a closed polygon as constraint edges into the CDT.
fn insert_constraint_loop(cdt: &mut Cdt, points: &[Point2]) -> std::result::Result<(), String> {
    if points.len() < 3 {
        return Err("constraint loop needs at least 3 points".into());
    }

    let mut handles = Vec::with_capacity(points.len());
    for p in points {
        let h = cdt
            .insert(SpadePoint2::new(p.x, p.y))
            .map_err(|e: InsertionError| format!("CDT insert: {e}"))?;
        handles.push(h);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from == to {
            continue;
        }
        if !cdt.can_add_constraint(from, to) {
            return Err("boundary loops intersect".into());
        }
        cdt.add_constraint(from, to);
    }

    Ok(())
}

/// Classifies which inner faces of the CDT are inside the region using flood-fill.
///
/// Starts from faces adjacent to the outer (infinite) face at depth 0. Each time
/// a constraint edge is crossed, depth increments. Odd depth = interior, so
/// faces inside holes (depth 2) are excluded.
fn classify_interior_faces(cdt: &Cdt) -> HashSet<usize> {
    let mut interior = HashSet::new();
    let mut depth_map: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();

    let outer_fix = cdt.outer_face().fix();

    for edge in cdt.directed_edges() {
        if edge.face().fix() == outer_fix {
            if let Some(inner) = edge.rev().face().as_inner() {
                let idx = inner.fix().index();
                if depth_map.contains_key(&idx) {
                    continue;
                }
                let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
                depth_map.insert(idx, depth);
                if depth % 2 == 1 {
                    interior.insert(idx);
                }
                queue.push_back((inner.fix(), depth));
            }
        }
    }

    while let Some((face_fix, depth)) = queue.pop_front() {
        let face = cdt.face(face_fix);
        for edge in face.adjacent_edges() {
            if let Some(neighbor) = edge.rev().face().as_inner() {
                let n_idx = neighbor.fix().index();
                if depth_map.contains_key(&n_idx) {
                    continue;
                }
                let new_depth = depth + u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
                depth_map.insert(n_idx, new_depth);
                if new_depth % 2 == 1 {
                    interior.insert(n_idx);
                }
                queue.push_back((neighbor.fix(), new_depth));
            }
        }
    }

    interior
}

fn locate_interior(cdt: &Cdt, interior: &HashSet<usize>, uv: &Point2) -> bool {
    let is_interior = |face: Option<FixedFaceHandle<InnerTag>>| {
        face.is_some_and(|f| interior.contains(&f.index()))
    };
    match cdt.locate(SpadePoint2::new(uv.x, uv.y)) {
        PositionInTriangulation::OnFace(face) => interior.contains(&face.index()),
        PositionInTriangulation::OnEdge(edge) => {
            let edge = cdt.directed_edge(edge);
            is_interior(edge.face().as_inner().map(|f| f.fix()))
                || is_interior(edge.rev().face().as_inner().map(|f| f.fix()))
        }
        PositionInTriangulation::OnVertex(vertex) => cdt
            .vertex(vertex)
            .out_edges()
            .any(|e| is_interior(e.face().as_inner().map(|f| f.fix()))),
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::creation::{MakeCircularWire, MakeFace, MakeWire};

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    fn deck_with_square_hole(store: &mut TopologyStore) -> FaceId {
        let outer = MakeWire::new(
            vec![p(0.0, 0.0), p(100.0, 0.0), p(100.0, 100.0), p(0.0, 100.0)],
            true,
        )
        .execute(store)
        .unwrap();
        let hole = MakeWire::new(
            vec![p(40.0, 40.0), p(60.0, 40.0), p(60.0, 60.0), p(40.0, 60.0)],
            true,
        )
        .execute(store)
        .unwrap();
        MakeFace::new(outer, vec![hole]).execute(store).unwrap()
    }

    #[test]
    fn hole_is_excluded_and_boundary_included() {
        let mut store = TopologyStore::new();
        let face = deck_with_square_hole(&mut store);
        let region = SurfaceRegion::from_face(&store, face, &TessellationParams::default()).unwrap();

        assert_eq!(region.holes().len(), 1);
        assert!(region.contains(&Point2::new(10.0, 10.0)));
        assert!(!region.contains(&Point2::new(50.0, 50.0)));
        assert!(region.contains(&Point2::new(40.0, 50.0)));
        assert!(region.contains(&Point2::new(0.0, 50.0)));
        assert!(!region.contains(&Point2::new(-1.0, 50.0)));
        assert!(!region.contains(&Point2::new(150.0, 50.0)));
    }

    #[test]
    fn concave_outline_rejects_notch() {
        let mut store = TopologyStore::new();
        let outer = MakeWire::new(
            vec![
                p(0.0, 0.0),
                p(40.0, 0.0),
                p(40.0, 20.0),
                p(20.0, 20.0),
                p(20.0, 40.0),
                p(0.0, 40.0),
            ],
            true,
        )
        .execute(&mut store)
        .unwrap();
        let face = MakeFace::new(outer, vec![]).execute(&mut store).unwrap();
        let region = SurfaceRegion::from_face(&store, face, &TessellationParams::default()).unwrap();
        assert!(region.contains(&Point2::new(10.0, 30.0)));
        assert!(!region.contains(&Point2::new(30.0, 30.0)));
    }

    #[test]
    fn circular_hole_is_excluded() {
        let mut store = TopologyStore::new();
        let outer = MakeWire::new(
            vec![p(0.0, 0.0), p(400.0, 0.0), p(400.0, 400.0), p(0.0, 400.0)],
            true,
        )
        .execute(&mut store)
        .unwrap();
        let hole = MakeCircularWire::new(p(200.0, 200.0), 50.0, 4)
            .execute(&mut store)
            .unwrap();
        let face = MakeFace::new(outer, vec![hole]).execute(&mut store).unwrap();
        let region = SurfaceRegion::from_face(&store, face, &TessellationParams::default()).unwrap();
        assert!(!region.contains(&Point2::new(200.0, 200.0)));
        assert!(!region.contains(&Point2::new(230.0, 220.0)));
        assert!(region.contains(&Point2::new(200.0, 270.0)));
    }

    #[test]
    fn winding_fallback_matches_triangulation() {
        let outer = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let hole = vec![
            Point2::new(4.0, 4.0),
            Point2::new(6.0, 4.0),
            Point2::new(6.0, 6.0),
            Point2::new(4.0, 6.0),
        ];
        let mut region =
            SurfaceRegion::from_loops(Plane::horizontal(0.0), outer, vec![hole]).unwrap();
        region.containment = Containment::Winding;
        assert!(region.contains(&Point2::new(1.0, 1.0)));
        assert!(!region.contains(&Point2::new(5.0, 5.0)));
        assert!(region.contains(&Point2::new(4.0, 5.0)));
    }

    #[test]
    fn select_deck_skips_downward_faces() {
        let mut store = TopologyStore::new();
        let bottom = MakeWire::new(
            vec![p(0.0, 0.0), p(500.0, 0.0), p(500.0, 500.0), p(0.0, 500.0)],
            true,
        )
        .execute(&mut store)
        .unwrap();
        MakeFace::new(bottom, vec![]).flipped().execute(&mut store).unwrap();
        let top_face = deck_with_square_hole(&mut store);

        let region = SurfaceRegion::select_deck(&store, &TessellationParams::default(), 0.95).unwrap();
        assert_eq!(region.face(), Some(top_face));
    }

    #[test]
    fn select_deck_without_faces_is_unavailable() {
        let store = TopologyStore::new();
        let err = SurfaceRegion::select_deck(&store, &TessellationParams::default(), 0.95).unwrap_err();
        assert!(matches!(
            err,
            crate::error::SlopedrainError::Geometry(GeometryError::Unavailable(_))
        ));
    }
}
