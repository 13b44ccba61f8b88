use crate::error::{Result, TopologyError};
use crate::topology::{EdgeCurve, TopologyStore, WireId};

use super::{Polyline, TessellationParams};

/// Tessellates a closed boundary wire into a polyline.
///
/// Line edges contribute their start point only (avoiding duplicates);
/// arc edges are sampled along the curve excluding their end point.
pub struct TessellateWire {
    wire: WireId,
    params: TessellationParams,
}

impl TessellateWire {
    /// Creates a new `TessellateWire` operation.
    #[must_use]
    pub fn new(wire: WireId, params: TessellationParams) -> Self {
        Self { wire, params }
    }

    /// Executes the tessellation, returning a polyline.
    ///
    /// # Errors
    ///
    /// Returns an error if the wire or one of its edges is missing, or the
    /// wire is open.
    pub fn execute(&self, store: &TopologyStore) -> Result<Polyline> {
        let wire = store.wire(self.wire)?;
        if !wire.is_closed {
            return Err(TopologyError::WireNotClosed.into());
        }

        let mut points = Vec::new();
        for oe in &wire.edges {
            let edge = store.edge(oe.edge)?;
            let (t_start, t_end) = if oe.forward {
                (edge.t_start, edge.t_end)
            } else {
                (edge.t_end, edge.t_start)
            };

            match &edge.curve {
                EdgeCurve::Line(_) => {
                    points.push(edge.curve.evaluate(t_start));
                }
                EdgeCurve::Arc(arc) => {
                    let n = arc_segments(arc.radius(), t_start, t_end, &self.params);
                    for i in 0..n {
                        #[allow(clippy::cast_precision_loss)]
                        let frac = i as f64 / n as f64;
                        points.push(edge.curve.evaluate(t_start + frac * (t_end - t_start)));
                    }
                }
            }
        }

        Ok(Polyline { points })
    }
}

/// Computes the number of chords needed to keep an arc within tolerance.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn arc_segments(radius: f64, t_start: f64, t_end: f64, params: &TessellationParams) -> usize {
    let sweep = (t_end - t_start).abs();
    if radius > params.tolerance {
        let half_angle = (1.0 - params.tolerance / radius).acos();
        let computed = (sweep / (2.0 * half_angle)).ceil() as usize;
        computed.clamp(params.min_segments, params.max_segments)
    } else {
        params.min_segments
    }
}
