//! Least-squares fits and second-moment statistics for boundary point sets.

use nalgebra::{Matrix3, Vector3 as NVector3};

use super::polygon_2d::centroid_2d;
use super::{Point2, Vector2, TOLERANCE};
use crate::error::GeometryError;

/// A circle recovered from a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleFit {
    /// Fitted center.
    pub center: Point2,
    /// Fitted radius.
    pub radius: f64,
    /// Root-mean-square radial residual.
    pub residual: f64,
}

/// Algebraic (Kåsa) least-squares circle fit.
///
/// Solves `x² + y² + D·x + E·y + F = 0` in the least-squares sense. Points
/// are centered on their centroid first to keep the normal equations well
/// conditioned for large coordinates.
///
/// # Errors
///
/// Returns `GeometryError::DegenerateFit` for fewer than three points,
/// collinear input, or a non-positive radius.
pub fn fit_circle_kasa(points: &[Point2]) -> Result<CircleFit, GeometryError> {
    if points.len() < 3 {
        return Err(GeometryError::DegenerateFit(format!(
            "circle fit needs at least 3 points, got {}",
            points.len()
        )));
    }
    let origin = centroid_2d(points)
        .ok_or_else(|| GeometryError::DegenerateFit("empty point set".into()))?;

    let mut ata = Matrix3::<f64>::zeros();
    let mut atb = NVector3::<f64>::zeros();
    for p in points {
        let x = p.x - origin.x;
        let y = p.y - origin.y;
        let row = NVector3::new(x, y, 1.0);
        let rhs = -(x * x + y * y);
        ata += row * row.transpose();
        atb += row * rhs;
    }

    let solution = ata
        .lu()
        .solve(&atb)
        .ok_or_else(|| GeometryError::DegenerateFit("singular circle normal equations".into()))?;
    let (d, e, f) = (solution[0], solution[1], solution[2]);

    let cx = -d * 0.5;
    let cy = -e * 0.5;
    let r_sq = cx * cx + cy * cy - f;
    if !r_sq.is_finite() || r_sq <= TOLERANCE {
        return Err(GeometryError::DegenerateFit(format!(
            "circle fit produced non-positive squared radius {r_sq}"
        )));
    }
    let radius = r_sq.sqrt();
    let center = Point2::new(origin.x + cx, origin.y + cy);

    #[allow(clippy::cast_precision_loss)]
    let residual = (points
        .iter()
        .map(|p| {
            let dr = (p - center).norm() - radius;
            dr * dr
        })
        .sum::<f64>()
        / points.len() as f64)
        .sqrt();

    Ok(CircleFit {
        center,
        radius,
        residual,
    })
}

/// Second central moments of a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments2 {
    /// Centroid of the points.
    pub centroid: Point2,
    /// Mean of `dx²`.
    pub sxx: f64,
    /// Mean of `dy²`.
    pub syy: f64,
    /// Mean of `dx·dy`.
    pub sxy: f64,
}

impl Moments2 {
    /// Computes the second central moments, or `None` when empty.
    #[must_use]
    pub fn from_points(points: &[Point2]) -> Option<Self> {
        let centroid = centroid_2d(points)?;
        #[allow(clippy::cast_precision_loss)]
        let n = points.len() as f64;
        let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
        for p in points {
            let dx = p.x - centroid.x;
            let dy = p.y - centroid.y;
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }
        Some(Self {
            centroid,
            sxx: sxx / n,
            syy: syy / n,
            sxy: sxy / n,
        })
    }

    /// Principal-axis angle: `½·atan2(2·Sxy, Sxx − Syy)`.
    #[must_use]
    pub fn principal_angle(&self) -> f64 {
        0.5 * (2.0 * self.sxy).atan2(self.sxx - self.syy)
    }

    /// Eigenvalues of the covariance matrix, larger first.
    #[must_use]
    pub fn principal_variances(&self) -> (f64, f64) {
        let mean = (self.sxx + self.syy) * 0.5;
        let diff = (self.sxx - self.syy) * 0.5;
        let root = (diff * diff + self.sxy * self.sxy).sqrt();
        (mean + root, mean - root)
    }

    /// Ratio of major to minor principal variance.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::DegenerateFit` when the minor variance
    /// vanishes (collinear points).
    pub fn spread_ratio(&self) -> Result<f64, GeometryError> {
        let (major, minor) = self.principal_variances();
        if minor <= TOLERANCE {
            return Err(GeometryError::DegenerateFit(
                "point spread collapses onto a line".into(),
            ));
        }
        Ok(major / minor)
    }
}

/// Rotates `p` about `center` by `-angle`, expressing it in a frame whose
/// x-axis points along `angle`.
#[must_use]
pub fn to_rotated_frame(p: &Point2, center: &Point2, angle: f64) -> Point2 {
    let (s, c) = angle.sin_cos();
    let d: Vector2 = p - center;
    Point2::new(d.x * c + d.y * s, -d.x * s + d.y * c)
}

/// Inverse of [`to_rotated_frame`].
#[must_use]
pub fn from_rotated_frame(p: &Point2, center: &Point2, angle: f64) -> Point2 {
    let (s, c) = angle.sin_cos();
    Point2::new(
        center.x + p.x * c - p.y * s,
        center.y + p.x * s + p.y * c,
    )
}
