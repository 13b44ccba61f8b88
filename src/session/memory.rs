use slotmap::{SecondaryMap, SlotMap};
use tracing::debug;

use crate::error::{GeometryError, Result, SessionError};
use crate::math::Point3;
use crate::topology::TopologyStore;

use super::{ControlVertex, ControlVertexId, EditSession};

#[derive(Debug, Clone)]
struct VertexState {
    position: Point3,
    elevation: f64,
}

/// In-memory host session.
///
/// Keeps deck topology and control vertices in arenas and implements
/// transactions by snapshotting elevations on `begin`. Failure hooks let
/// callers exercise the rollback paths of a batch.
#[derive(Debug, Default)]
pub struct MemorySession {
    topology: TopologyStore,
    vertices: SlotMap<ControlVertexId, VertexState>,
    snapshot: Option<SecondaryMap<ControlVertexId, f64>>,
    geometry_fault: Option<String>,
    rejected: Option<ControlVertexId>,
    fail_commit: bool,
    commits: usize,
}

impl MemorySession {
    /// Creates a session over the given deck topology.
    #[must_use]
    pub fn new(topology: TopologyStore) -> Self {
        Self {
            topology,
            ..Self::default()
        }
    }

    /// Adds a control vertex at `position` with zero elevation.
    pub fn add_vertex(&mut self, position: Point3) -> ControlVertexId {
        self.vertices.insert(VertexState {
            position,
            elevation: 0.0,
        })
    }

    /// Overwrites an elevation outside any transaction, as a prior edit would.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::VertexNotFound` for unknown ids.
    pub fn preset_elevation(&mut self, id: ControlVertexId, offset: f64) -> Result<()> {
        let state = self
            .vertices
            .get_mut(id)
            .ok_or_else(|| SessionError::VertexNotFound(format!("{id:?}")))?;
        state.elevation = offset;
        Ok(())
    }

    /// Mutable access to the deck topology.
    pub fn topology_mut(&mut self) -> &mut TopologyStore {
        &mut self.topology
    }

    /// Makes every subsequent geometry read fail with `message`.
    pub fn inject_geometry_fault(&mut self, message: impl Into<String>) {
        self.geometry_fault = Some(message.into());
    }

    /// Makes the host reject elevation changes for `id`.
    pub fn reject_elevation_of(&mut self, id: ControlVertexId) {
        self.rejected = Some(id);
    }

    /// Makes the next commit fail.
    pub fn fail_next_commit(&mut self) {
        self.fail_commit = true;
    }

    /// Number of successful commits.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    /// Returns `true` while a transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }
}

impl EditSession for MemorySession {
    fn topology(&self) -> Result<&TopologyStore> {
        match &self.geometry_fault {
            Some(message) => Err(GeometryError::Unavailable(message.clone()).into()),
            None => Ok(&self.topology),
        }
    }

    fn control_vertices(&self) -> Result<Vec<ControlVertex>> {
        if let Some(message) = &self.geometry_fault {
            return Err(GeometryError::Unavailable(message.clone()).into());
        }
        Ok(self
            .vertices
            .iter()
            .map(|(id, v)| ControlVertex {
                id,
                position: v.position,
                elevation: v.elevation,
            })
            .collect())
    }

    fn elevation(&self, id: ControlVertexId) -> Result<f64> {
        self.vertices
            .get(id)
            .map(|v| v.elevation)
            .ok_or_else(|| SessionError::VertexNotFound(format!("{id:?}")).into())
    }

    fn set_elevation(&mut self, id: ControlVertexId, offset: f64) -> Result<()> {
        if self.snapshot.is_none() {
            return Err(SessionError::NoTransaction.into());
        }
        if self.rejected == Some(id) {
            return Err(SessionError::Rejected(format!("vertex {id:?} is locked")).into());
        }
        let state = self
            .vertices
            .get_mut(id)
            .ok_or_else(|| SessionError::VertexNotFound(format!("{id:?}")))?;
        state.elevation = offset;
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        if self.snapshot.is_some() {
            return Err(SessionError::TransactionOpen.into());
        }
        let snapshot = self
            .vertices
            .iter()
            .map(|(id, v)| (id, v.elevation))
            .collect();
        self.snapshot = Some(snapshot);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.snapshot.is_none() {
            return Err(SessionError::NoTransaction.into());
        }
        if std::mem::take(&mut self.fail_commit) {
            return Err(SessionError::CommitFailed("host refused the transaction".into()).into());
        }
        self.snapshot = None;
        self.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let snapshot = self.snapshot.take().ok_or(SessionError::NoTransaction)?;
        let mut restored = 0usize;
        for (id, elevation) in snapshot {
            if let Some(state) = self.vertices.get_mut(id) {
                state.elevation = elevation;
                restored += 1;
            }
        }
        debug!(restored, "rolled back elevation changes");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rollback_restores_snapshot() {
        let mut session = MemorySession::default();
        let a = session.add_vertex(Point3::new(0.0, 0.0, 0.0));
        session.preset_elevation(a, 7.0).unwrap();

        session.begin().unwrap();
        session.set_elevation(a, 42.0).unwrap();
        assert_eq!(session.elevation(a).unwrap(), 42.0);
        session.rollback().unwrap();

        assert_eq!(session.elevation(a).unwrap(), 7.0);
        assert!(!session.in_transaction());
    }

    #[test]
    fn mutation_requires_transaction() {
        let mut session = MemorySession::default();
        let a = session.add_vertex(Point3::origin());
        assert!(session.set_elevation(a, 1.0).is_err());
    }

    #[test]
    fn failed_commit_keeps_transaction_open() {
        let mut session = MemorySession::default();
        let a = session.add_vertex(Point3::origin());
        session.begin().unwrap();
        session.set_elevation(a, 3.0).unwrap();
        session.fail_next_commit();
        assert!(session.commit().is_err());
        assert!(session.in_transaction());
        session.rollback().unwrap();
        assert_eq!(session.elevation(a).unwrap(), 0.0);
        assert_eq!(session.commit_count(), 0);
    }

    #[test]
    fn geometry_fault_surfaces_as_unavailable() {
        let mut session = MemorySession::default();
        session.inject_geometry_fault("document closed");
        assert!(session.topology().is_err());
        assert!(session.control_vertices().is_err());
    }

    #[test]
    fn nested_begin_rejected() {
        let mut session = MemorySession::default();
        session.begin().unwrap();
        assert!(session.begin().is_err());
    }
}
