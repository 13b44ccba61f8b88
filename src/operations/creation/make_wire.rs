use std::f64::consts::TAU;

use crate::error::{OperationError, Result};
use crate::geometry::curve::{Arc, Curve, Line};
use crate::math::Point3;
use crate::topology::{
    EdgeCurve, EdgeData, OrientedEdge, TopologyStore, VertexData, VertexId, WireData, WireId,
};

/// Creates a wire of straight segments from a sequence of 3D points.
pub struct MakeWire {
    points: Vec<Point3>,
    close: bool,
}

impl MakeWire {
    /// Creates a new `MakeWire` operation.
    #[must_use]
    pub fn new(points: Vec<Point3>, close: bool) -> Self {
        Self { points, close }
    }

    /// Executes the operation, creating the wire in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than two points are given, or if a
    /// segment has zero length.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<WireId> {
        let n = self.points.len();
        if n < 2 || (self.close && n < 3) {
            return Err(OperationError::InvalidInput(format!(
                "wire needs at least {} points, got {n}",
                if self.close { 3 } else { 2 }
            ))
            .into());
        }

        let vertex_ids: Vec<VertexId> = self
            .points
            .iter()
            .map(|p| store.add_vertex(VertexData::new(*p)))
            .collect();

        let segment_count = if self.close { n } else { n - 1 };
        let mut edges = Vec::with_capacity(segment_count);
        for i in 0..segment_count {
            let j = (i + 1) % n;
            let line = Line::from_points(self.points[i], self.points[j])?;
            let t_end = line.length();
            let edge = store.add_edge(EdgeData {
                start: vertex_ids[i],
                end: vertex_ids[j],
                curve: EdgeCurve::Line(line),
                t_start: 0.0,
                t_end,
            });
            edges.push(OrientedEdge::new(edge, true));
        }

        Ok(store.add_wire(WireData {
            edges,
            is_closed: self.close,
        }))
    }
}

/// Creates a closed horizontal circular wire split into equal arcs.
pub struct MakeCircularWire {
    center: Point3,
    radius: f64,
    arc_count: usize,
}

impl MakeCircularWire {
    /// Creates a new `MakeCircularWire` operation.
    #[must_use]
    pub fn new(center: Point3, radius: f64, arc_count: usize) -> Self {
        Self {
            center,
            radius,
            arc_count,
        }
    }

    /// Executes the operation, creating the wire in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if `arc_count` is zero or the radius is non-positive.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<WireId> {
        if self.arc_count == 0 {
            return Err(OperationError::InvalidInput("circular wire needs at least one arc".into()).into());
        }

        #[allow(clippy::cast_precision_loss)]
        let step = TAU / self.arc_count as f64;
        let arcs = (0..self.arc_count)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let a0 = step * i as f64;
                Arc::horizontal(self.center, self.radius, a0, a0 + step)
            })
            .collect::<Result<Vec<_>>>()?;

        let vertex_ids: Vec<VertexId> = arcs
            .iter()
            .map(|arc| {
                let t0 = arc.domain().t_min;
                store.add_vertex(VertexData::new(arc.evaluate(t0)))
            })
            .collect();

        let mut edges = Vec::with_capacity(arcs.len());
        for (i, arc) in arcs.into_iter().enumerate() {
            let domain = arc.domain();
            let edge = store.add_edge(EdgeData {
                start: vertex_ids[i],
                end: vertex_ids[(i + 1) % vertex_ids.len()],
                curve: EdgeCurve::Arc(arc),
                t_start: domain.t_min,
                t_end: domain.t_max,
            });
            edges.push(OrientedEdge::new(edge, true));
        }

        Ok(store.add_wire(WireData {
            edges,
            is_closed: true,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn closed_square_has_four_edges() {
        let mut store = TopologyStore::new();
        let wire = MakeWire::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            true,
        )
        .execute(&mut store)
        .unwrap();
        let data = store.wire(wire).unwrap();
        assert!(data.is_closed);
        assert_eq!(data.edges.len(), 4);
    }

    #[test]
    fn too_few_points_rejected() {
        let mut store = TopologyStore::new();
        let r = MakeWire::new(vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)], true)
            .execute(&mut store);
        assert!(r.is_err());
    }

    #[test]
    fn circular_wire_is_made_of_arcs() {
        let mut store = TopologyStore::new();
        let wire = MakeCircularWire::new(Point3::new(5.0, 5.0, 0.0), 2.0, 8)
            .execute(&mut store)
            .unwrap();
        let data = store.wire(wire).unwrap();
        assert_eq!(data.edges.len(), 8);
        for oe in &data.edges {
            assert!(!store.edge(oe.edge).unwrap().curve.is_straight());
        }
    }
}
