use super::Point2;

/// Returns the minimum distance from `p` to the line segment `a`–`b`.
#[must_use]
pub fn point_to_segment_dist(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let d = b - a;
    let len_sq = d.norm_squared();

    if len_sq < 1e-20 {
        // Degenerate segment (zero length).
        return (p - a).norm();
    }

    // Project point onto the infinite line, clamp to [0, 1].
    let t = ((p - a).dot(&d) / len_sq).clamp(0.0, 1.0);
    let closest = a + d * t;

    (p - closest).norm()
}

/// Returns the minimum distance from `p` to a closed polyline.
///
/// The last vertex connects back to the first. Returns `f64::INFINITY`
/// for an empty loop.
#[must_use]
pub fn point_to_loop_dist(p: &Point2, points: &[Point2]) -> f64 {
    match points.len() {
        0 => f64::INFINITY,
        1 => (p - points[0]).norm(),
        n => (0..n)
            .map(|i| point_to_segment_dist(p, &points[i], &points[(i + 1) % n]))
            .fold(f64::INFINITY, f64::min),
    }
}
