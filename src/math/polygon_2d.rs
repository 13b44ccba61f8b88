use super::{Point2, TOLERANCE};

/// Computes the signed area of a polygon (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area_2d(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Perimeter of a closed polygon.
#[must_use]
pub fn perimeter_2d(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    (0..n).map(|i| (points[(i + 1) % n] - points[i]).norm()).sum()
}

/// Arithmetic mean of a point set, or `None` when empty.
#[must_use]
pub fn centroid_2d(points: &[Point2]) -> Option<Point2> {
    if points.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point2::new(sx / n, sy / n))
}

/// An axis-aligned 2D bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds2 {
    /// Minimum corner.
    pub min: Point2,
    /// Maximum corner.
    pub max: Point2,
}

impl Bounds2 {
    /// Computes the bounding box of a point set, or `None` when empty.
    #[must_use]
    pub fn from_points(points: &[Point2]) -> Option<Self> {
        let first = points.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &points[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some(Self { min, max })
    }

    /// Width along x.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height along y.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> Point2 {
        Point2::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
        )
    }

    /// Returns `true` if `p` lies inside the box grown by `margin`.
    #[must_use]
    pub fn contains(&self, p: &Point2, margin: f64) -> bool {
        p.x >= self.min.x - margin
            && p.x <= self.max.x + margin
            && p.y >= self.min.y - margin
            && p.y <= self.max.y + margin
    }
}

/// Point-in-polygon test using the winding number.
///
/// Returns `true` if the point is inside. Points exactly on the boundary
/// may go either way; callers that need boundary inclusion check the
/// distance to the loop separately.
#[must_use]
pub fn point_in_polygon_2d(p: &Point2, polygon: &[Point2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    winding_number_2d(p, polygon) != 0
}

/// Winding number of `p` with respect to polygon `verts`.
///
/// Non-zero => inside, zero => outside.
fn winding_number_2d(p: &Point2, verts: &[Point2]) -> i32 {
    let n = verts.len();
    let mut winding = 0i32;
    for i in 0..n {
        let a = verts[i];
        let b = verts[(i + 1) % n];
        let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);

        if a.y <= p.y {
            if b.y > p.y && cross > TOLERANCE {
                winding += 1;
            }
        } else if b.y <= p.y && cross < -TOLERANCE {
            winding -= 1;
        }
    }
    winding
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn unit_square() -> Vec<Point2> {
        vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)]
    }

    #[test]
    fn signed_area_ccw_square() {
        assert!((signed_area_2d(&unit_square()) - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn signed_area_cw_square() {
        let mut pts = unit_square();
        pts.reverse();
        assert!((signed_area_2d(&pts) + 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn signed_area_degenerate() {
        assert!(signed_area_2d(&[p(0.0, 0.0)]).abs() < TOLERANCE);
        assert!(signed_area_2d(&[]).abs() < TOLERANCE);
    }

    #[test]
    fn perimeter_of_square() {
        assert!((perimeter_2d(&unit_square()) - 4.0).abs() < TOLERANCE);
    }

    #[test]
    fn centroid_of_square() {
        let c = centroid_2d(&unit_square()).unwrap();
        assert!((c - p(0.5, 0.5)).norm() < TOLERANCE);
        assert!(centroid_2d(&[]).is_none());
    }

    #[test]
    fn bounds_dimensions() {
        let b = Bounds2::from_points(&[p(-1.0, 2.0), p(3.0, -2.0), p(0.0, 0.0)]).unwrap();
        assert!((b.width() - 4.0).abs() < TOLERANCE);
        assert!((b.height() - 4.0).abs() < TOLERANCE);
        assert!((b.center() - p(1.0, 0.0)).norm() < TOLERANCE);
        assert!(b.contains(&p(3.05, 0.0), 0.1));
        assert!(!b.contains(&p(3.2, 0.0), 0.1));
    }

    #[test]
    fn point_in_concave_polygon() {
        // L-shape: the notch at (3, 3) is outside.
        let l_shape = vec![
            p(0.0, 0.0),
            p(4.0, 0.0),
            p(4.0, 2.0),
            p(2.0, 2.0),
            p(2.0, 4.0),
            p(0.0, 4.0),
        ];
        assert!(point_in_polygon_2d(&p(1.0, 1.0), &l_shape));
        assert!(point_in_polygon_2d(&p(1.0, 3.0), &l_shape));
        assert!(!point_in_polygon_2d(&p(3.0, 3.0), &l_shape));
        assert!(!point_in_polygon_2d(&p(5.0, 1.0), &l_shape));
    }
}
