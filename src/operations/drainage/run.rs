use serde::Serialize;
use tracing::{info, instrument};

use crate::config::DrainageParams;
use crate::error::{OperationError, Result};
use crate::operations::query::SurfaceRegion;
use crate::session::{CancelToken, EditSession};

use super::assign::{AssignSlope, SlopeReport};
use super::detect::DetectOpenings;
use super::opening::{DrainOpening, OpeningId, OpeningShape};

/// Serializable view of a detected opening.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpeningSummary {
    pub id: OpeningId,
    pub shape: OpeningShape,
    /// Center in model coordinates.
    pub center: [f64; 3],
    pub width: f64,
    pub height: f64,
    pub vertices: usize,
    pub selected: bool,
}

impl From<&DrainOpening> for OpeningSummary {
    fn from(opening: &DrainOpening) -> Self {
        let c = opening.center_3d();
        Self {
            id: opening.id,
            shape: opening.shape,
            center: [c.x, c.y, c.z],
            width: opening.width,
            height: opening.height,
            vertices: opening.vertices.len(),
            selected: opening.selected,
        }
    }
}

/// Outcome of a full detect, select and assign run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub openings_detected: usize,
    pub openings_selected: usize,
    pub modified: usize,
    pub skipped: usize,
    pub openings: Vec<OpeningSummary>,
    /// Batch report; `None` when nothing was detected.
    pub report: Option<SlopeReport>,
}

impl RunSummary {
    fn nothing_detected(skipped: usize) -> Self {
        info!(skipped, "no drainage openings detected");
        Self {
            openings_detected: 0,
            openings_selected: 0,
            modified: 0,
            skipped,
            openings: Vec::new(),
            report: None,
        }
    }
}

/// The whole drainage pipeline over one session.
///
/// Decks with boundary loops go through face detection on the largest
/// upward face; decks without them fall back to the flat scan of the
/// control vertices. The caller's predicate plays the selection layer.
pub struct SlopeRun {
    params: DrainageParams,
    slope_percent: f64,
    cancel: Option<CancelToken>,
}

impl SlopeRun {
    /// Creates a new `SlopeRun`.
    #[must_use]
    pub fn new(params: DrainageParams, slope_percent: f64) -> Self {
        Self {
            params,
            slope_percent,
            cancel: None,
        }
    }

    /// Makes the batch observe `token`.
    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Detects openings, marks those accepted by `select` and assigns the
    /// slope.
    ///
    /// Detecting no openings is not an error: every vertex is reported as
    /// skipped and nothing is written.
    ///
    /// # Errors
    ///
    /// - `GeometryError::Unavailable` if the session geometry cannot be read.
    /// - `OperationError::InvalidInput` for a bad slope or parameters, or if
    ///   openings were detected but `select` accepts none.
    /// - Any error of [`AssignSlope::execute`].
    #[instrument(skip_all, fields(slope = self.slope_percent))]
    pub fn execute<S, F>(&self, session: &mut S, select: F) -> Result<RunSummary>
    where
        S: EditSession + ?Sized,
        F: Fn(&DrainOpening) -> bool,
    {
        self.params.validate()?;
        if !(self.slope_percent.is_finite() && self.slope_percent > 0.0) {
            return Err(OperationError::InvalidInput(format!(
                "slope must be a positive percentage, got {}",
                self.slope_percent
            ))
            .into());
        }

        let vertices = session.control_vertices()?;
        let (mut openings, region) = {
            let topology = session.topology()?;
            let detector = DetectOpenings::new(&self.params);
            if topology.is_empty() {
                let scan = detector.execute_flat(&vertices)?;
                (scan.openings, scan.region)
            } else {
                let openings = detector.execute(topology, &vertices)?;
                // No deck face may pass the filter at all; that is not an error.
                if openings.is_empty() {
                    return Ok(RunSummary::nothing_detected(vertices.len()));
                }
                let region = SurfaceRegion::select_deck(
                    topology,
                    &self.params.tessellation,
                    self.params.normal_filter.min_normal_z(),
                )?;
                (openings, region)
            }
        };

        if openings.is_empty() {
            return Ok(RunSummary::nothing_detected(vertices.len()));
        }

        for opening in &mut openings {
            opening.selected = select(opening);
        }
        let openings_selected = openings.iter().filter(|o| o.selected).count();
        info!(
            detected = openings.len(),
            selected = openings_selected,
            "openings ready"
        );

        let mut assign = AssignSlope::new(&self.params, self.slope_percent);
        if let Some(token) = &self.cancel {
            assign = assign.with_cancel(token.clone());
        }
        let report = assign.execute(session, &region, &openings, &vertices)?;

        Ok(RunSummary {
            openings_detected: openings.len(),
            openings_selected,
            modified: report.modified,
            skipped: report.skipped,
            openings: openings.iter().map(OpeningSummary::from).collect(),
            report: Some(report),
        })
    }
}
