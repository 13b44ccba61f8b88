mod tessellate_wire;

pub use tessellate_wire::TessellateWire;

use crate::math::Point3;

/// Parameters controlling boundary tessellation quality.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct TessellationParams {
    /// Maximum allowed chord deviation from the true curve.
    pub tolerance: f64,
    /// Minimum number of segments per curved edge.
    pub min_segments: usize,
    /// Maximum number of segments per curved edge.
    pub max_segments: usize,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            tolerance: 0.5,
            min_segments: 4,
            max_segments: 256,
        }
    }
}

/// A closed polyline approximation of a boundary loop.
///
/// The closing segment from the last point back to the first is implicit.
#[derive(Debug, Clone, Default)]
pub struct Polyline {
    /// The ordered vertices of the polyline.
    pub points: Vec<Point3>,
}
