use crate::geometry::surface::Plane;
use crate::math::Vector3;

use super::wire::WireId;

slotmap::new_key_type! {
    /// Unique identifier for a face in the topology store.
    pub struct FaceId;
}

/// Data associated with a topological face.
///
/// A face is a bounded region on a plane. Its boundary loops are stored
/// without a designated outer wire: hosts hand over loops in arbitrary
/// order and the outer one is recovered by perimeter.
#[derive(Debug, Clone)]
pub struct FaceData {
    /// The plane on which this face lies.
    pub surface: Plane,
    /// All boundary wires of the face.
    pub loops: Vec<WireId>,
    /// If `true`, the face normal agrees with the plane normal.
    pub same_sense: bool,
}

impl FaceData {
    /// Outward normal of the face.
    #[must_use]
    pub fn outward_normal(&self) -> Vector3 {
        let n = *self.surface.plane_normal();
        if self.same_sense {
            n
        } else {
            -n
        }
    }
}
