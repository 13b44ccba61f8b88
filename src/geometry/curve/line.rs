use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Curve, CurveDomain};

/// A straight boundary segment parameterized by arc length.
///
/// The parametric form is: `P(t) = origin + t * direction` for
/// `t` in `[0, length]`.
#[derive(Debug, Clone)]
pub struct Line {
    origin: Point3,
    direction: Vector3,
    length: f64,
}

impl Line {
    /// Creates a segment from `start` to `end`.
    ///
    /// # Errors
    ///
    /// Returns an error if the two points coincide.
    pub fn from_points(start: Point3, end: Point3) -> Result<Self> {
        let d = end - start;
        let length = d.norm();
        if length < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(Self {
            origin: start,
            direction: d / length,
            length,
        })
    }

    /// Returns the start point of the segment.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the unit direction vector of the segment.
    #[must_use]
    pub fn direction(&self) -> &Vector3 {
        &self.direction
    }

    /// Returns the segment length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.length
    }
}

impl Curve for Line {
    fn evaluate(&self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }

    fn domain(&self) -> CurveDomain {
        CurveDomain::new(0.0, self.length)
    }

    fn is_closed(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_endpoints() {
        let line = Line::from_points(Point3::new(1.0, 1.0, 0.0), Point3::new(4.0, 5.0, 0.0)).unwrap();
        assert!((line.length() - 5.0).abs() < TOLERANCE);
        let end = line.evaluate(line.domain().t_max);
        assert!((end - Point3::new(4.0, 5.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn coincident_points_rejected() {
        let p = Point3::new(2.0, 2.0, 2.0);
        assert!(Line::from_points(p, p).is_err());
    }
}
