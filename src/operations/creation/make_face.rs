use crate::error::{GeometryError, Result};
use crate::geometry::surface::Plane;
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::tessellation::{TessellateWire, TessellationParams};
use crate::topology::{FaceData, FaceId, TopologyStore, WireId};

/// Creates a planar face from an outer boundary wire and hole wires.
///
/// The plane is recovered from the outer wire (Newell normal). For faces
/// whose normal is not close to `±X` the `u` axis is aligned with `+X` and
/// the plane is anchored above the world origin, so horizontal decks get
/// `(u, v) = (x, y)`. The recovered normal always points up; use
/// [`MakeFace::flipped`] for faces looking down.
pub struct MakeFace {
    outer_wire: WireId,
    inner_wires: Vec<WireId>,
    flipped: bool,
}

impl MakeFace {
    /// Creates a new `MakeFace` operation.
    #[must_use]
    pub fn new(outer_wire: WireId, inner_wires: Vec<WireId>) -> Self {
        Self {
            outer_wire,
            inner_wires,
            flipped: false,
        }
    }

    /// Marks the face as facing against the recovered plane normal.
    #[must_use]
    pub fn flipped(mut self) -> Self {
        self.flipped = true;
        self
    }

    /// Executes the operation, creating the face in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if a wire is missing or the outer wire is degenerate.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<FaceId> {
        let outer = TessellateWire::new(self.outer_wire, TessellationParams::default())
            .execute(store)?;
        for &inner in &self.inner_wires {
            store.wire(inner)?;
        }

        let normal = newell_normal(&outer.points)?;
        let normal = if normal.z < 0.0 { -normal } else { normal };
        let reference = if normal.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let u_dir = reference - normal * reference.dot(&normal);
        let v_dir = normal.cross(&u_dir);
        // Anchor the plane at the projection of the world origin.
        let origin = Point3::from(normal * normal.dot(&outer.points[0].coords));
        let surface = Plane::new(origin, u_dir, v_dir)?;

        let mut loops = Vec::with_capacity(1 + self.inner_wires.len());
        loops.push(self.outer_wire);
        loops.extend_from_slice(&self.inner_wires);

        Ok(store.add_face(FaceData {
            surface,
            loops,
            same_sense: !self.flipped,
        }))
    }
}

/// Computes the unit normal of a closed polygon with Newell's method.
fn newell_normal(points: &[Point3]) -> Result<Vector3> {
    let n = points.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    let len = normal.norm();
    if len < TOLERANCE {
        return Err(GeometryError::Degenerate("face boundary encloses no area".into()).into());
    }
    Ok(normal / len)
}
