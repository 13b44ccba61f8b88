use super::{Point2, TOLERANCE};

/// Bounded segment-segment intersection in 2D.
///
/// Returns `(t, u)`, the parameters of the intersection along `a0`–`a1`
/// and `b0`–`b1`, both in `[0, 1]`. Parallel and collinear segments
/// return `None`.
#[must_use]
pub fn segment_segment_intersect_2d(
    a0: &Point2,
    a1: &Point2,
    b0: &Point2,
    b1: &Point2,
) -> Option<(f64, f64)> {
    let da = a1 - a0;
    let db = b1 - b0;

    let cross = da.x * db.y - da.y * db.x;
    if cross.abs() < TOLERANCE {
        return None;
    }

    let d = b0 - a0;
    let t = (d.x * db.y - d.y * db.x) / cross;
    let u = (d.x * da.y - d.y * da.x) / cross;

    // Endpoints count as hits.
    let eps = TOLERANCE;
    if (-eps..=1.0 + eps).contains(&t) && (-eps..=1.0 + eps).contains(&u) {
        Some((t.clamp(0.0, 1.0), u.clamp(0.0, 1.0)))
    } else {
        None
    }
}

/// Parameters along `a`–`b` where the segment meets the closed loop
/// `points`, sorted ascending with near-duplicates removed.
#[must_use]
pub fn segment_loop_params(a: &Point2, b: &Point2, points: &[Point2]) -> Vec<f64> {
    let n = points.len();
    let mut params: Vec<f64> = (0..n)
        .filter_map(|i| segment_segment_intersect_2d(a, b, &points[i], &points[(i + 1) % n]))
        .map(|(t, _)| t)
        .collect();
    params.sort_by(f64::total_cmp);
    params.dedup_by(|x, y| (*x - *y).abs() <= TOLERANCE);
    params
}
