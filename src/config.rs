//! Tunable parameters for the drainage pipeline.
//!
//! Every threshold the detector, graph builder and slope assigner use lives
//! here so a host can load one document (e.g. JSON) and run the same
//! pipeline across deck variants. Missing fields fall back to defaults.

use serde::{Deserialize, Serialize};

use crate::error::{OperationError, Result};
use crate::tessellation::TessellationParams;

/// Which faces count as drainable by the vertical component of their
/// outward normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalFilter {
    /// Any face tilted at least slightly upward (`n.z >= 0.1`).
    #[default]
    Loose,
    /// Only nearly horizontal faces (`n.z >= 0.95`).
    Strict,
}

impl NormalFilter {
    /// Minimum vertical normal component for a face to pass.
    #[must_use]
    pub fn min_normal_z(self) -> f64 {
        match self {
            Self::Loose => 0.1,
            Self::Strict => 0.95,
        }
    }
}

/// Thresholds of the opening shape classification cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyParams {
    /// Max center distance and radius difference for arcs to share a circle.
    pub arc_cluster_tolerance: f64,
    /// Minimum loop points for circle and ellipse fits.
    pub min_fit_points: usize,
    /// Accept a best-fit circle when `residual / radius` is below this.
    pub circle_residual_ratio: f64,
    /// Exclusive lower bound of the ellipse spread ratio band.
    pub ellipse_ratio_min: f64,
    /// Exclusive upper bound of the ellipse spread ratio band.
    pub ellipse_ratio_max: f64,
    /// Minimum loop-area / rotated-box-area for a rotated rectangle.
    pub rectangle_fill_ratio: f64,
    /// Allowed deviation from 90° at quadrilateral corners, in degrees.
    pub soft_angle_tolerance_deg: f64,
    /// Width/height difference below which a box is a square.
    pub square_tolerance: f64,
    /// Smallest accepted opening dimension.
    pub min_size: f64,
    /// Largest accepted opening dimension.
    pub max_size: f64,
}

impl Default for ClassifyParams {
    fn default() -> Self {
        Self {
            arc_cluster_tolerance: 5.0,
            min_fit_points: 6,
            circle_residual_ratio: 0.08,
            ellipse_ratio_min: 1.3,
            ellipse_ratio_max: 7.0,
            rectangle_fill_ratio: 0.95,
            soft_angle_tolerance_deg: 15.0,
            square_tolerance: 5.0,
            min_size: 5.0,
            max_size: 2000.0,
        }
    }
}

/// Parameters of one drainage run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrainageParams {
    /// Face filter for detection and deck selection.
    pub normal_filter: NormalFilter,
    /// Vertex pairs farther apart than this are never connected.
    pub max_connection_distance: f64,
    /// Target spacing between validation samples along a candidate edge.
    pub sample_spacing: f64,
    /// Minimum validation samples per candidate edge.
    pub min_samples: usize,
    /// Openings whose centers are closer than this are duplicates.
    pub dedup_tolerance: f64,
    /// Vertices within this distance of an opening boundary belong to it.
    pub association_tolerance: f64,
    /// Shape classification thresholds.
    pub classify: ClassifyParams,
    /// Flat scan: void triangles exceed this multiple of the median circumradius.
    pub void_factor: f64,
    /// Boundary curve tessellation.
    pub tessellation: TessellationParams,
    /// Factor from model length units to report units (e.g. 304.8 for ft → mm).
    pub report_unit_scale: f64,
}

impl Default for DrainageParams {
    fn default() -> Self {
        Self {
            normal_filter: NormalFilter::default(),
            max_connection_distance: 5000.0,
            sample_spacing: 50.0,
            min_samples: 10,
            dedup_tolerance: 0.01,
            association_tolerance: 5.0,
            classify: ClassifyParams::default(),
            void_factor: 2.5,
            tessellation: TessellationParams::default(),
            report_unit_scale: 1.0,
        }
    }
}

impl DrainageParams {
    /// Sets the maximum connection distance.
    #[must_use]
    pub fn with_max_connection_distance(mut self, distance: f64) -> Self {
        self.max_connection_distance = distance;
        self
    }

    /// Sets the validation sample spacing.
    #[must_use]
    pub fn with_sample_spacing(mut self, spacing: f64) -> Self {
        self.sample_spacing = spacing;
        self
    }

    /// Sets the face normal filter.
    #[must_use]
    pub fn with_normal_filter(mut self, filter: NormalFilter) -> Self {
        self.normal_filter = filter;
        self
    }

    /// Sets the vertex association tolerance.
    #[must_use]
    pub fn with_association_tolerance(mut self, tolerance: f64) -> Self {
        self.association_tolerance = tolerance;
        self
    }

    /// Sets the report unit scale.
    #[must_use]
    pub fn with_report_unit_scale(mut self, scale: f64) -> Self {
        self.report_unit_scale = scale;
        self
    }

    /// Checks that every threshold is usable.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("max_connection_distance", self.max_connection_distance),
            ("sample_spacing", self.sample_spacing),
            ("dedup_tolerance", self.dedup_tolerance),
            ("association_tolerance", self.association_tolerance),
            ("void_factor", self.void_factor),
            ("report_unit_scale", self.report_unit_scale),
            ("tessellation.tolerance", self.tessellation.tolerance),
            ("classify.arc_cluster_tolerance", self.classify.arc_cluster_tolerance),
            ("classify.circle_residual_ratio", self.classify.circle_residual_ratio),
            ("classify.min_size", self.classify.min_size),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(format!("{name} must be positive, got {value}")));
            }
        }
        if self.min_samples == 0 {
            return Err(invalid("min_samples must be at least 1".into()));
        }
        let c = &self.classify;
        if c.max_size <= c.min_size {
            return Err(invalid(format!(
                "classify.max_size ({}) must exceed min_size ({})",
                c.max_size, c.min_size
            )));
        }
        if c.ellipse_ratio_max <= c.ellipse_ratio_min {
            return Err(invalid("ellipse ratio band is empty".into()));
        }
        if self.tessellation.min_segments == 0
            || self.tessellation.max_segments < self.tessellation.min_segments
        {
            return Err(invalid("tessellation segment bounds are inverted".into()));
        }
        Ok(())
    }
}

fn invalid(message: String) -> crate::error::SlopedrainError {
    OperationError::InvalidInput(message).into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        DrainageParams::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let params: DrainageParams = serde_json::from_str(
            r#"{ "normal_filter": "strict", "max_connection_distance": 1200.0,
                 "classify": { "max_size": 900.0 } }"#,
        )
        .unwrap();
        assert_eq!(params.normal_filter, NormalFilter::Strict);
        assert!((params.max_connection_distance - 1200.0).abs() < f64::EPSILON);
        assert!((params.classify.max_size - 900.0).abs() < f64::EPSILON);
        assert!((params.classify.min_size - 5.0).abs() < f64::EPSILON);
        assert_eq!(params.min_samples, 10);
    }

    #[test]
    fn rejects_non_positive_distance() {
        let params = DrainageParams::default().with_max_connection_distance(0.0);
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_inverted_size_band() {
        let mut params = DrainageParams::default();
        params.classify.max_size = 1.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn strict_filter_is_tighter() {
        assert!(NormalFilter::Strict.min_normal_z() > NormalFilter::Loose.min_normal_z());
    }
}
