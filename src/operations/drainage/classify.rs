//! Shape classification of hole boundary loops.
//!
//! Classifiers run in a fixed priority order and the first one that accepts
//! the loop wins:
//!
//! 1. arc cluster (matching boundary arcs → circle)
//! 2. best-fit circle (Kåsa)
//! 3. ellipse spread test (→ other)
//! 4. rotated rectangle (principal axes)
//! 5. soft-angle quadrilateral
//! 6. bounding-box fallback
//!
//! A classifier either declines (`Ok(None)`) or reports a degenerate fit;
//! both move the cascade on.

use tracing::debug;

use crate::config::ClassifyParams;
use crate::error::GeometryError;
use crate::math::fit_2d::{fit_circle_kasa, from_rotated_frame, to_rotated_frame, Moments2};
use crate::math::polygon_2d::{centroid_2d, signed_area_2d, Bounds2};
use crate::math::{Point2, TOLERANCE};

use super::opening::OpeningShape;

/// A boundary arc projected into the face plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSample {
    /// Arc center in `(u, v)`.
    pub center: Point2,
    /// Arc radius.
    pub radius: f64,
}

/// Boundary of one candidate hole, ready for classification.
#[derive(Debug, Clone, Default)]
pub struct LoopSample {
    /// Ordered boundary points in `(u, v)`.
    pub points: Vec<Point2>,
    /// Arcs of the boundary, in loop order.
    pub arcs: Vec<ArcSample>,
    /// `true` if every boundary segment is a straight line.
    pub all_straight: bool,
}

impl LoopSample {
    /// A loop known only by its points (no curve information).
    #[must_use]
    pub fn from_points(points: Vec<Point2>) -> Self {
        Self {
            points,
            arcs: Vec::new(),
            all_straight: false,
        }
    }

    /// Curve fits only make sense for loops that may be curved and are
    /// densely sampled.
    fn fit_eligible(&self, params: &ClassifyParams) -> bool {
        !self.all_straight && self.points.len() >= params.min_fit_points
    }
}

/// Which classifier accepted a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyMethod {
    ArcCluster,
    CircleFit,
    Ellipse,
    RotatedRectangle,
    SoftQuad,
    BoundingBox,
}

/// Outcome of classifying a loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub shape: OpeningShape,
    pub center: Point2,
    pub width: f64,
    pub height: f64,
    pub method: ClassifyMethod,
}

type Classifier = fn(&LoopSample, &ClassifyParams) -> Result<Option<Classification>, GeometryError>;

/// Runs the classification cascade. Returns `None` only for loops with no
/// usable points.
#[must_use]
pub fn classify_loop(sample: &LoopSample, params: &ClassifyParams) -> Option<Classification> {
    let cascade: [(&str, Classifier); 5] = [
        ("arc_cluster", arc_cluster),
        ("circle_fit", circle_fit),
        ("ellipse", ellipse),
        ("rotated_rectangle", rotated_rectangle),
        ("soft_quad", soft_quad),
    ];
    for (stage, classifier) in cascade {
        match classifier(sample, params) {
            Ok(Some(found)) => return Some(found),
            Ok(None) => {}
            Err(error) => debug!(stage, %error, "classifier skipped loop"),
        }
    }
    bounding_box(sample, params)
}

fn box_shape(width: f64, height: f64, params: &ClassifyParams) -> OpeningShape {
    if (width - height).abs() < params.square_tolerance {
        OpeningShape::Square
    } else {
        OpeningShape::Rectangle
    }
}

/// Groups arcs agreeing on center and radius; the largest group of at least
/// two defines a circle.
fn arc_cluster(
    sample: &LoopSample,
    params: &ClassifyParams,
) -> Result<Option<Classification>, GeometryError> {
    let tol = params.arc_cluster_tolerance;
    let mut best: Vec<&ArcSample> = Vec::new();
    for seed in &sample.arcs {
        let members: Vec<&ArcSample> = sample
            .arcs
            .iter()
            .filter(|a| (a.center - seed.center).norm() <= tol && (a.radius - seed.radius).abs() <= tol)
            .collect();
        if members.len() > best.len() {
            best = members;
        }
    }
    if best.len() < 2 {
        return Ok(None);
    }

    #[allow(clippy::cast_precision_loss)]
    let n = best.len() as f64;
    let centers: Vec<Point2> = best.iter().map(|a| a.center).collect();
    let center = centroid_2d(&centers)
        .ok_or_else(|| GeometryError::DegenerateFit("empty arc cluster".into()))?;
    let radius = best.iter().map(|a| a.radius).sum::<f64>() / n;

    Ok(Some(Classification {
        shape: OpeningShape::Circle,
        center,
        width: 2.0 * radius,
        height: 2.0 * radius,
        method: ClassifyMethod::ArcCluster,
    }))
}

fn circle_fit(
    sample: &LoopSample,
    params: &ClassifyParams,
) -> Result<Option<Classification>, GeometryError> {
    if !sample.fit_eligible(params) {
        return Ok(None);
    }
    let fit = fit_circle_kasa(&sample.points)?;
    if fit.residual / fit.radius >= params.circle_residual_ratio {
        return Ok(None);
    }
    Ok(Some(Classification {
        shape: OpeningShape::Circle,
        center: fit.center,
        width: 2.0 * fit.radius,
        height: 2.0 * fit.radius,
        method: ClassifyMethod::CircleFit,
    }))
}

fn ellipse(
    sample: &LoopSample,
    params: &ClassifyParams,
) -> Result<Option<Classification>, GeometryError> {
    if !sample.fit_eligible(params) {
        return Ok(None);
    }
    let moments = Moments2::from_points(&sample.points)
        .ok_or_else(|| GeometryError::DegenerateFit("empty loop".into()))?;
    let ratio = moments.spread_ratio()?;
    if ratio <= params.ellipse_ratio_min || ratio >= params.ellipse_ratio_max {
        return Ok(None);
    }
    let bounds = Bounds2::from_points(&sample.points)
        .ok_or_else(|| GeometryError::DegenerateFit("empty loop".into()))?;
    Ok(Some(Classification {
        shape: OpeningShape::Other,
        center: bounds.center(),
        width: bounds.width(),
        height: bounds.height(),
        method: ClassifyMethod::Ellipse,
    }))
}

/// Measures the loop in its principal-axis frame; accepts when every point
/// sits on the rotated box and the loop fills it.
fn rotated_rectangle(
    sample: &LoopSample,
    params: &ClassifyParams,
) -> Result<Option<Classification>, GeometryError> {
    if sample.points.len() < 4 {
        return Ok(None);
    }
    let moments = Moments2::from_points(&sample.points)
        .ok_or_else(|| GeometryError::DegenerateFit("empty loop".into()))?;
    let scale = moments.sxx + moments.syy;
    if scale <= TOLERANCE
        || ((moments.sxx - moments.syy).abs() <= 1e-9 * scale && moments.sxy.abs() <= 1e-9 * scale)
    {
        return Err(GeometryError::DegenerateFit(
            "isotropic spread has no principal axis".into(),
        ));
    }

    let angle = moments.principal_angle();
    let local: Vec<Point2> = sample
        .points
        .iter()
        .map(|p| to_rotated_frame(p, &moments.centroid, angle))
        .collect();
    let frame = Bounds2::from_points(&local)
        .ok_or_else(|| GeometryError::DegenerateFit("empty loop".into()))?;
    let (width, height) = (frame.width(), frame.height());
    if width <= TOLERANCE || height <= TOLERANCE {
        return Err(GeometryError::DegenerateFit("rotated extents collapse".into()));
    }

    let edge_tol = 0.01 * width.max(height);
    let on_box = local.iter().all(|p| {
        (p.x - frame.min.x).abs() <= edge_tol
            || (p.x - frame.max.x).abs() <= edge_tol
            || (p.y - frame.min.y).abs() <= edge_tol
            || (p.y - frame.max.y).abs() <= edge_tol
    });
    let fill = signed_area_2d(&local).abs() / (width * height);
    if !on_box || fill < params.rectangle_fill_ratio {
        return Ok(None);
    }

    Ok(Some(Classification {
        shape: box_shape(width, height, params),
        center: from_rotated_frame(&frame.center(), &moments.centroid, angle),
        width,
        height,
        method: ClassifyMethod::RotatedRectangle,
    }))
}

/// Four corners whose consecutive edges are near-perpendicular.
fn soft_quad(
    sample: &LoopSample,
    params: &ClassifyParams,
) -> Result<Option<Classification>, GeometryError> {
    let pts = &sample.points;
    if pts.len() != 4 {
        return Ok(None);
    }
    let edges: Vec<_> = (0..4).map(|i| pts[(i + 1) % 4] - pts[i]).collect();
    let lengths: Vec<f64> = edges.iter().map(|e| e.norm()).collect();
    if lengths.iter().any(|&l| l <= TOLERANCE) {
        return Err(GeometryError::DegenerateFit("quadrilateral has a zero-length edge".into()));
    }

    let max_cos = params.soft_angle_tolerance_deg.to_radians().sin();
    let square_corners = (0..4).all(|i| {
        let j = (i + 1) % 4;
        (edges[i].dot(&edges[j]) / (lengths[i] * lengths[j])).abs() <= max_cos
    });
    if !square_corners {
        return Ok(None);
    }

    let width = (lengths[0] + lengths[2]) * 0.5;
    let height = (lengths[1] + lengths[3]) * 0.5;
    let center = centroid_2d(pts)
        .ok_or_else(|| GeometryError::DegenerateFit("empty loop".into()))?;
    Ok(Some(Classification {
        shape: box_shape(width, height, params),
        center,
        width,
        height,
        method: ClassifyMethod::SoftQuad,
    }))
}

fn bounding_box(sample: &LoopSample, params: &ClassifyParams) -> Option<Classification> {
    let bounds = Bounds2::from_points(&sample.points)?;
    let (width, height) = (bounds.width(), bounds.height());
    let shape = if (width - height).abs() < params.square_tolerance {
        OpeningShape::Square
    } else if sample.all_straight {
        OpeningShape::Rectangle
    } else {
        OpeningShape::Polygon
    };
    Some(Classification {
        shape,
        center: bounds.center(),
        width,
        height,
        method: ClassifyMethod::BoundingBox,
    })
}
