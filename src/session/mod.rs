//! Contract with the host editing session that owns the deck.
//!
//! The drainage pipeline only reads geometry and writes elevation offsets
//! through [`EditSession`]; document storage and transaction machinery stay
//! with the host.

mod memory;

pub use memory::MemorySession;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::math::Point3;
use crate::topology::TopologyStore;

slotmap::new_key_type! {
    /// Stable identifier of an editable control vertex within a session.
    pub struct ControlVertexId;
}

/// An editable point of a deformable deck surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlVertex {
    /// Session-stable identity.
    pub id: ControlVertexId,
    /// Position in local surface coordinates.
    pub position: Point3,
    /// Current elevation offset.
    pub elevation: f64,
}

/// Host editing session exposing deck geometry and elevation mutation.
///
/// Mutations happen only between [`EditSession::begin`] and
/// [`EditSession::commit`] / [`EditSession::rollback`]. A rollback restores
/// every elevation changed since `begin`.
pub trait EditSession {
    /// Boundary topology of the deck. An empty store means the host has no
    /// loop geometry.
    ///
    /// # Errors
    ///
    /// Returns an error if the geometry cannot be read.
    fn topology(&self) -> Result<&TopologyStore>;

    /// All control vertices, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns an error if the vertices cannot be read.
    fn control_vertices(&self) -> Result<Vec<ControlVertex>>;

    /// Current elevation offset of one vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the vertex is unknown.
    fn elevation(&self, id: ControlVertexId) -> Result<f64>;

    /// Sets the elevation offset of one vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is open, the vertex is unknown,
    /// or the host rejects the change.
    fn set_elevation(&mut self, id: ControlVertexId, offset: f64) -> Result<()>;

    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if a transaction is already open.
    fn begin(&mut self) -> Result<()>;

    /// Makes all changes since [`EditSession::begin`] permanent.
    ///
    /// # Errors
    ///
    /// Returns an error if the host fails to commit; the transaction then
    /// stays open so the caller can roll back.
    fn commit(&mut self) -> Result<()>;

    /// Discards all changes since [`EditSession::begin`].
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is open.
    fn rollback(&mut self) -> Result<()>;
}

/// Cooperative cancellation flag shared between a caller and a running batch.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
