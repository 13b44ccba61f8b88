mod plane;

pub use plane::Plane;

use crate::math::{Point2, Point3, Vector3};

/// Trait for parametric surfaces a deck face can lie on.
pub trait Surface {
    /// Evaluates the surface at parameters `(u, v)`.
    fn evaluate(&self, uv: &Point2) -> Point3;

    /// Projects a 3D point onto the surface, returning its `(u, v)` parameters.
    fn project(&self, point: &Point3) -> Point2;

    /// Returns the unit surface normal at `(u, v)`.
    fn normal(&self, uv: &Point2) -> Vector3;
}
