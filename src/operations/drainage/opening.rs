use std::fmt;

use serde::Serialize;

use crate::geometry::surface::{Plane, Surface};
use crate::math::distance_2d::point_to_loop_dist;
use crate::math::{Point2, Point3};
use crate::session::ControlVertexId;
use crate::topology::FaceId;

/// Identifier of an opening, unique within one detection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct OpeningId(pub u32);

impl fmt::Display for OpeningId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}", self.0)
    }
}

/// Hands out sequential opening ids for a single detection run.
#[derive(Debug)]
pub struct OpeningIdFactory {
    next: u32,
}

impl Default for OpeningIdFactory {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl OpeningIdFactory {
    /// Returns the next unused id.
    pub fn next_id(&mut self) -> OpeningId {
        let id = OpeningId(self.next);
        self.next += 1;
        id
    }
}

/// Shape classification of a drainage opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OpeningShape {
    Circle,
    Square,
    Rectangle,
    Polygon,
    /// Elliptical or otherwise unrecognized outline.
    Other,
}

impl fmt::Display for OpeningShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Circle => "circle",
            Self::Square => "square",
            Self::Rectangle => "rectangle",
            Self::Polygon => "polygon",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// A hole in the deck interpreted as a drainage point.
#[derive(Debug, Clone)]
pub struct DrainOpening {
    /// Run-scoped identifier.
    pub id: OpeningId,
    /// Face the opening was found on; `None` for openings from a flat scan.
    pub face: Option<FaceId>,
    /// Plane of the source face; boundary and center are expressed in its `(u, v)`.
    pub surface: Plane,
    /// Center in `(u, v)`.
    pub center: Point2,
    /// Extent along the classification frame's first axis.
    pub width: f64,
    /// Extent along the classification frame's second axis.
    pub height: f64,
    /// Shape classification.
    pub shape: OpeningShape,
    /// Boundary polyline in `(u, v)`.
    pub boundary: Vec<Point2>,
    /// Control vertices lying on the boundary.
    pub vertices: Vec<ControlVertexId>,
    /// Whether the selection layer chose this opening as a drain.
    pub selected: bool,
}

impl DrainOpening {
    /// Width times height.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Center in 3D model coordinates.
    #[must_use]
    pub fn center_3d(&self) -> Point3 {
        self.surface.evaluate(&self.center)
    }
}

/// Returns `true` if a control vertex at `position` lies within `tolerance`
/// of the opening boundary, measured in the opening's face plane.
#[must_use]
pub fn belongs_to_opening(opening: &DrainOpening, position: &Point3, tolerance: f64) -> bool {
    let uv = opening.surface.project(position);
    point_to_loop_dist(&uv, &opening.boundary) <= tolerance
}
