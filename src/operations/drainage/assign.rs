use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::DrainageParams;
use crate::error::{OperationError, Result};
use crate::operations::query::SurfaceRegion;
use crate::session::{CancelToken, ControlVertex, ControlVertexId, EditSession};

use super::graph::BuildConnectivity;
use super::opening::{DrainOpening, OpeningId};
use super::path::NearestSink;

/// Vertices routed between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 64;

/// Progress of one slope batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Idle,
    GraphBuilt,
    SinksZeroed,
    PathsComputed,
    ElevationsApplied,
    Committed,
    RolledBack,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What happened to a vertex in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexStatus {
    /// Belongs to a selected opening; pinned at zero.
    Sink,
    /// Raised in proportion to its path length.
    Routed,
    /// No path to any sink; left untouched.
    Unreachable,
}

/// Per-vertex outcome of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VertexDiagnostic {
    /// Position of the vertex in the session's vertex list.
    pub index: usize,
    pub id: ControlVertexId,
    /// Graph path length to the nearest sink, in model units.
    pub path_length: Option<f64>,
    /// Elevation offset written, in model units.
    pub offset: Option<f64>,
    pub nearest_opening: Option<OpeningId>,
    pub status: VertexStatus,
}

/// Summary of a committed slope batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlopeReport {
    pub slope_percent: f64,
    /// Vertices whose elevation was written (sinks included).
    pub modified: usize,
    /// Vertices with no route to a sink.
    pub skipped: usize,
    pub sinks: usize,
    /// Largest offset written, in model units.
    pub max_offset: f64,
    /// Longest graph path to a sink, in model units.
    pub longest_path: f64,
    /// Model-to-report unit factor applied to the `*_report` fields.
    pub report_unit_scale: f64,
    pub max_offset_report: f64,
    pub longest_path_report: f64,
    pub state: BatchState,
    pub diagnostics: Vec<VertexDiagnostic>,
}

/// Raises every reachable control vertex by `slope_percent / 100` times its
/// path length to the nearest selected opening.
///
/// All writes happen in one session transaction. Vertices of selected
/// openings are pinned at zero; vertices with no route keep their
/// elevation. Any failure, including cancellation, rolls the transaction
/// back.
pub struct AssignSlope {
    params: DrainageParams,
    slope_percent: f64,
    cancel: Option<CancelToken>,
}

impl AssignSlope {
    /// Creates a new `AssignSlope` operation.
    #[must_use]
    pub fn new(params: &DrainageParams, slope_percent: f64) -> Self {
        Self {
            params: params.clone(),
            slope_percent,
            cancel: None,
        }
    }

    /// Makes the batch observe `token` between steps.
    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Runs the batch against `session`.
    ///
    /// # Errors
    ///
    /// - `OperationError::InvalidInput` if no opening is selected or the
    ///   slope is not a positive finite number; nothing is touched.
    /// - `OperationError::Cancelled` if the token fires.
    /// - Any session error from a write or the commit.
    ///
    /// Every error after the transaction opened leaves the session rolled
    /// back.
    #[instrument(skip_all, fields(slope = self.slope_percent, vertices = vertices.len()))]
    pub fn execute<S: EditSession + ?Sized>(
        &self,
        session: &mut S,
        region: &SurfaceRegion,
        openings: &[DrainOpening],
        vertices: &[ControlVertex],
    ) -> Result<SlopeReport> {
        self.params.validate()?;
        if !(self.slope_percent.is_finite() && self.slope_percent > 0.0) {
            return Err(OperationError::InvalidInput(format!(
                "slope must be a positive percentage, got {}",
                self.slope_percent
            ))
            .into());
        }
        let selected: Vec<&DrainOpening> = openings.iter().filter(|o| o.selected).collect();
        if selected.is_empty() {
            return Err(OperationError::InvalidInput("no drainage opening selected".into()).into());
        }
        self.check_cancel()?;

        let mut state = BatchState::Idle;
        session.begin()?;
        let outcome = self
            .apply(session, region, &selected, vertices, &mut state)
            .and_then(|report| session.commit().map(|()| report));

        match outcome {
            Ok(mut report) => {
                advance(&mut state, BatchState::Committed);
                report.state = state;
                info!(
                    modified = report.modified,
                    skipped = report.skipped,
                    max_offset = report.max_offset,
                    longest_path = report.longest_path,
                    "slope batch committed"
                );
                Ok(report)
            }
            Err(error) => {
                warn!(%error, at = %state, "slope batch failed, rolling back");
                if let Err(rollback) = session.rollback() {
                    warn!(error = %rollback, "rollback failed");
                }
                advance(&mut state, BatchState::RolledBack);
                Err(error)
            }
        }
    }

    fn apply<S: EditSession + ?Sized>(
        &self,
        session: &mut S,
        region: &SurfaceRegion,
        selected: &[&DrainOpening],
        vertices: &[ControlVertex],
        state: &mut BatchState,
    ) -> Result<SlopeReport> {
        let graph = BuildConnectivity::new(&self.params).execute(region, vertices)?;
        advance(state, BatchState::GraphBuilt);
        self.check_cancel()?;

        let batch: HashSet<ControlVertexId> = vertices.iter().map(|v| v.id).collect();
        let mut sink_of: HashMap<ControlVertexId, OpeningId> = HashMap::new();
        let mut sinks = Vec::new();
        for opening in selected {
            for &id in &opening.vertices {
                if !batch.contains(&id) {
                    debug!(?id, opening = %opening.id, "rim vertex outside the batch");
                    continue;
                }
                if !sink_of.contains_key(&id) {
                    sink_of.insert(id, opening.id);
                    sinks.push((id, opening.id));
                    session.set_elevation(id, 0.0)?;
                }
            }
        }
        if sinks.is_empty() {
            warn!("selected openings have no control vertices on their boundary");
        }
        advance(state, BatchState::SinksZeroed);
        self.check_cancel()?;

        let mut search = NearestSink::new(sinks);
        if let Some(token) = &self.cancel {
            search = search.with_cancel(token.clone());
        }
        let paths = search.execute(&graph)?;
        advance(state, BatchState::PathsComputed);

        let rise = self.slope_percent / 100.0;
        let mut report = SlopeReport {
            slope_percent: self.slope_percent,
            modified: 0,
            skipped: 0,
            sinks: 0,
            max_offset: 0.0,
            longest_path: 0.0,
            report_unit_scale: self.params.report_unit_scale,
            max_offset_report: 0.0,
            longest_path_report: 0.0,
            state: *state,
            diagnostics: Vec::with_capacity(vertices.len()),
        };

        for (index, vertex) in vertices.iter().enumerate() {
            if index % CANCEL_CHECK_INTERVAL == 0 {
                self.check_cancel()?;
            }
            if let Some(&opening) = sink_of.get(&vertex.id) {
                report.sinks += 1;
                report.modified += 1;
                report.diagnostics.push(VertexDiagnostic {
                    index,
                    id: vertex.id,
                    path_length: Some(0.0),
                    offset: Some(0.0),
                    nearest_opening: Some(opening),
                    status: VertexStatus::Sink,
                });
                continue;
            }

            let route = paths.path(vertex.id);
            if !route.is_reachable() {
                debug!(index, id = ?vertex.id, "no route to a drain");
                report.skipped += 1;
                report.diagnostics.push(VertexDiagnostic {
                    index,
                    id: vertex.id,
                    path_length: None,
                    offset: None,
                    nearest_opening: None,
                    status: VertexStatus::Unreachable,
                });
                continue;
            }

            let offset = rise * route.length;
            session.set_elevation(vertex.id, offset)?;
            report.modified += 1;
            report.max_offset = report.max_offset.max(offset);
            report.longest_path = report.longest_path.max(route.length);
            report.diagnostics.push(VertexDiagnostic {
                index,
                id: vertex.id,
                path_length: Some(route.length),
                offset: Some(offset),
                nearest_opening: route.nearest,
                status: VertexStatus::Routed,
            });
        }
        advance(state, BatchState::ElevationsApplied);
        self.check_cancel()?;

        let scale = self.params.report_unit_scale;
        report.max_offset_report = report.max_offset * scale;
        report.longest_path_report = report.longest_path * scale;
        report.state = *state;
        Ok(report)
    }

    fn check_cancel(&self) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(OperationError::Cancelled.into());
        }
        Ok(())
    }
}

fn advance(state: &mut BatchState, next: BatchState) {
    debug!(from = %state, to = %next, "batch state");
    *state = next;
}
