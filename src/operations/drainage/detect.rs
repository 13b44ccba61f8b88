use std::collections::{HashMap, HashSet, VecDeque};

use spade::{DelaunayTriangulation, Point2 as SpadePoint2, Triangulation};
use tracing::{debug, info, instrument, warn};

use crate::config::DrainageParams;
use crate::error::{GeometryError, Result};
use crate::geometry::surface::{Plane, Surface};
use crate::math::polygon_2d::{centroid_2d, perimeter_2d};
use crate::math::Point2;
use crate::operations::query::{outer_loop_index, SurfaceRegion};
use crate::session::ControlVertex;
use crate::tessellation::TessellateWire;
use crate::topology::{EdgeCurve, FaceData, FaceId, TopologyStore, WireId};

use super::classify::{classify_loop, ArcSample, Classification, LoopSample};
use super::opening::{belongs_to_opening, DrainOpening, OpeningIdFactory};

/// A classified hole before deduplication and id assignment.
struct Candidate {
    face: Option<FaceId>,
    surface: Plane,
    boundary: Vec<Point2>,
    found: Classification,
}

/// Result of scanning a deck that has no boundary loops.
#[derive(Debug)]
pub struct FlatScan {
    /// Openings found among the voids of the vertex cloud.
    pub openings: Vec<DrainOpening>,
    /// Region spanned by the vertices: convex hull minus the voids.
    pub region: SurfaceRegion,
}

/// Detects drainage openings on a deck.
///
/// Every hole loop of an upward-facing face is classified by shape, size
/// filtered and deduplicated. The result is sorted by ascending area and
/// numbered from 1, so repeated runs over the same geometry agree.
pub struct DetectOpenings {
    params: DrainageParams,
}

impl DetectOpenings {
    /// Creates a new `DetectOpenings` operation.
    #[must_use]
    pub fn new(params: &DrainageParams) -> Self {
        Self {
            params: params.clone(),
        }
    }

    /// Detects openings from the hole loops of `store`'s faces and
    /// associates `vertices` with them.
    ///
    /// Loops that cannot be read or classified are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` if the parameters are invalid.
    #[instrument(skip_all, fields(faces = store.faces().count()))]
    pub fn execute(
        &self,
        store: &TopologyStore,
        vertices: &[ControlVertex],
    ) -> Result<Vec<DrainOpening>> {
        self.params.validate()?;
        let min_z = self.params.normal_filter.min_normal_z();

        let mut candidates = Vec::new();
        for (face_id, face) in store.faces() {
            let nz = face.outward_normal().z;
            if nz < min_z {
                debug!(?face_id, nz, "face fails normal filter");
                continue;
            }
            self.collect_face_holes(store, face_id, face, &mut candidates);
        }

        let openings = self.finalize(candidates, vertices);
        info!(detected = openings.len(), "opening detection finished");
        Ok(openings)
    }

    /// Detects openings from the control vertices alone, for decks without
    /// boundary loops.
    ///
    /// Vertices are triangulated in the `xy` plane. Triangles much larger
    /// than typical (circumradius above `void_factor` times the median) are
    /// voids; each edge-connected group of voids away from the convex hull
    /// is a hole.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::Unavailable` if fewer than three distinct
    /// vertices span an area, or `OperationError::InvalidInput` if the
    /// parameters are invalid.
    #[instrument(skip_all, fields(vertices = vertices.len()))]
    pub fn execute_flat(&self, vertices: &[ControlVertex]) -> Result<FlatScan> {
        self.params.validate()?;

        let mut dt: DelaunayTriangulation<SpadePoint2<f64>> = DelaunayTriangulation::new();
        for v in vertices {
            if let Err(e) = dt.insert(SpadePoint2::new(v.position.x, v.position.y)) {
                warn!(id = ?v.id, error = %e, "vertex left out of flat scan");
            }
        }
        if dt.num_inner_faces() == 0 {
            return Err(GeometryError::Unavailable(
                "flat scan needs at least three non-collinear control vertices".into(),
            )
            .into());
        }

        let hull: Vec<Point2> = dt
            .convex_hull()
            .map(|edge| {
                let p = edge.from().position();
                Point2::new(p.x, p.y)
            })
            .collect();

        let rings = void_rings(&dt, self.params.void_factor);
        debug!(voids = rings.len(), "void groups found");

        let surface = Plane::horizontal(0.0);
        let mut candidates = Vec::new();
        for ring in &rings {
            let sample = LoopSample::from_points(ring.clone());
            self.push_candidate(None, &surface, sample, &mut candidates);
        }

        let region = SurfaceRegion::from_loops(surface, hull, rings)?;
        let openings = self.finalize(candidates, vertices);
        info!(detected = openings.len(), "flat scan finished");
        Ok(FlatScan { openings, region })
    }

    fn collect_face_holes(
        &self,
        store: &TopologyStore,
        face_id: FaceId,
        face: &FaceData,
        candidates: &mut Vec<Candidate>,
    ) {
        let mut loops: Vec<(WireId, Vec<Point2>)> = Vec::with_capacity(face.loops.len());
        for &wire in &face.loops {
            match TessellateWire::new(wire, self.params.tessellation).execute(store) {
                Ok(poly) => loops.push((
                    wire,
                    poly.points.iter().map(|p| face.surface.project(p)).collect(),
                )),
                Err(error) => warn!(?face_id, ?wire, %error, "skipping unreadable loop"),
            }
        }

        let rings: Vec<Vec<Point2>> = loops.iter().map(|(_, pts)| pts.clone()).collect();
        let Some(outer) = outer_loop_index(&rings) else {
            return;
        };
        debug!(
            ?face_id,
            holes = loops.len() - 1,
            outer_perimeter = perimeter_2d(&rings[outer]),
            "scanning face"
        );

        for (i, (wire, points)) in loops.into_iter().enumerate() {
            if i == outer {
                continue;
            }
            match loop_sample(store, wire, &face.surface, points) {
                Ok(sample) => {
                    self.push_candidate(Some(face_id), &face.surface, sample, candidates);
                }
                Err(error) => warn!(?face_id, ?wire, %error, "skipping unreadable loop"),
            }
        }
    }

    fn push_candidate(
        &self,
        face: Option<FaceId>,
        surface: &Plane,
        sample: LoopSample,
        candidates: &mut Vec<Candidate>,
    ) {
        let Some(found) = classify_loop(&sample, &self.params.classify) else {
            warn!(?face, points = sample.points.len(), "loop has no usable points");
            return;
        };
        let (lo, hi) = (self.params.classify.min_size, self.params.classify.max_size);
        let in_band = |d: f64| (lo..=hi).contains(&d);
        if !in_band(found.width) || !in_band(found.height) {
            debug!(
                ?face,
                shape = %found.shape,
                width = found.width,
                height = found.height,
                "opening outside size band"
            );
            return;
        }
        candidates.push(Candidate {
            face,
            surface: surface.clone(),
            boundary: sample.points,
            found,
        });
    }

    /// Deduplicates, sorts by area, numbers and associates vertices.
    fn finalize(&self, candidates: Vec<Candidate>, vertices: &[ControlVertex]) -> Vec<DrainOpening> {
        let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let center = candidate.surface.evaluate(&candidate.found.center);
            let duplicate = kept.iter().any(|k| {
                (k.surface.evaluate(&k.found.center) - center).norm() <= self.params.dedup_tolerance
            });
            if duplicate {
                debug!(face = ?candidate.face, "dropping duplicate opening");
            } else {
                kept.push(candidate);
            }
        }

        kept.sort_by(|a, b| {
            let area = |c: &Candidate| c.found.width * c.found.height;
            area(a).total_cmp(&area(b))
        });

        let mut ids = OpeningIdFactory::default();
        kept.into_iter()
            .map(|c| {
                let mut opening = DrainOpening {
                    id: ids.next_id(),
                    face: c.face,
                    surface: c.surface,
                    center: c.found.center,
                    width: c.found.width,
                    height: c.found.height,
                    shape: c.found.shape,
                    boundary: c.boundary,
                    vertices: Vec::new(),
                    selected: false,
                };
                opening.vertices = vertices
                    .iter()
                    .filter(|v| {
                        belongs_to_opening(&opening, &v.position, self.params.association_tolerance)
                    })
                    .map(|v| v.id)
                    .collect();
                debug!(
                    id = %opening.id,
                    shape = %opening.shape,
                    width = opening.width,
                    height = opening.height,
                    vertices = opening.vertices.len(),
                    "opening"
                );
                opening
            })
            .collect()
    }
}

/// Builds the classification input of one hole wire from its projected
/// points and its edges' curve data.
fn loop_sample(
    store: &TopologyStore,
    wire: WireId,
    surface: &Plane,
    points: Vec<Point2>,
) -> Result<LoopSample> {
    let mut arcs = Vec::new();
    let mut all_straight = true;
    for oe in &store.wire(wire)?.edges {
        if let EdgeCurve::Arc(arc) = &store.edge(oe.edge)?.curve {
            all_straight = false;
            arcs.push(ArcSample {
                center: surface.project(arc.center()),
                radius: arc.radius(),
            });
            debug!(radius = arc.radius(), sweep = arc.sweep(), "hole arc");
        }
    }
    Ok(LoopSample {
        points,
        arcs,
        all_straight,
    })
}

/// Finds the boundary rings of void triangle groups that stay clear of the
/// convex hull. Ring points are ordered by angle about their centroid.
fn void_rings(dt: &DelaunayTriangulation<SpadePoint2<f64>>, void_factor: f64) -> Vec<Vec<Point2>> {
    let radii: HashMap<usize, f64> = dt
        .inner_faces()
        .map(|face| {
            let [a, b, c] = face.vertices().map(|v| {
                let p = v.position();
                Point2::new(p.x, p.y)
            });
            (face.fix().index(), circumradius(&a, &b, &c))
        })
        .collect();

    let mut finite: Vec<f64> = radii.values().copied().filter(|r| r.is_finite()).collect();
    if finite.is_empty() {
        return Vec::new();
    }
    finite.sort_by(f64::total_cmp);
    let threshold = void_factor * finite[finite.len() / 2];
    let is_void = |index: usize| radii.get(&index).is_some_and(|&r| r > threshold);

    let mut visited: HashSet<usize> = HashSet::new();
    let mut rings = Vec::new();
    for seed in dt.inner_faces() {
        let seed_index = seed.fix().index();
        if !is_void(seed_index) || !visited.insert(seed_index) {
            continue;
        }

        let mut touches_hull = false;
        let mut corners: HashMap<usize, Point2> = HashMap::new();
        let mut queue = VecDeque::from([seed.fix()]);
        while let Some(fixed) = queue.pop_front() {
            let face = dt.face(fixed);
            for v in face.vertices() {
                let p = v.position();
                corners.insert(v.fix().index(), Point2::new(p.x, p.y));
            }
            for edge in face.adjacent_edges() {
                match edge.rev().face().as_inner() {
                    None => touches_hull = true,
                    Some(neighbor) => {
                        let index = neighbor.fix().index();
                        if is_void(index) && visited.insert(index) {
                            queue.push_back(neighbor.fix());
                        }
                    }
                }
            }
        }

        if touches_hull {
            debug!(corners = corners.len(), "void group reaches the hull");
            continue;
        }
        let mut keys: Vec<usize> = corners.keys().copied().collect();
        keys.sort_unstable();
        let ring: Vec<Point2> = keys.iter().filter_map(|k| corners.get(k).copied()).collect();
        rings.push(order_by_angle(ring));
    }
    rings
}

fn circumradius(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    let ab = b - a;
    let ac = c - a;
    let twice_area = (ab.x * ac.y - ab.y * ac.x).abs();
    if twice_area <= f64::EPSILON {
        return f64::INFINITY;
    }
    ab.norm() * ac.norm() * (c - b).norm() / (2.0 * twice_area)
}

fn order_by_angle(mut ring: Vec<Point2>) -> Vec<Point2> {
    if let Some(center) = centroid_2d(&ring) {
        let angle = |p: &Point2| (p.y - center.y).atan2(p.x - center.x);
        ring.sort_by(|a, b| angle(a).total_cmp(&angle(b)));
    }
    ring
}
