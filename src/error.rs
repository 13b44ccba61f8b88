use thiserror::Error;

/// Top-level error type for the slope drainage engine.
#[derive(Debug, Error)]
pub enum SlopedrainError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Errors related to geometric computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("surface geometry unavailable: {0}")]
    Unavailable(String),

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("degenerate fit: {0}")]
    DegenerateFit(String),

    #[error("zero-length vector")]
    ZeroVector,
}

/// Errors related to boundary topology lookups.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("wire is not closed")]
    WireNotClosed,
}

/// Errors related to drainage operations.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("operation cancelled")]
    Cancelled,
}

/// Errors raised by the host editing session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("control vertex not found: {0}")]
    VertexNotFound(String),

    #[error("no transaction is open")]
    NoTransaction,

    #[error("a transaction is already open")]
    TransactionOpen,

    #[error("elevation change rejected: {0}")]
    Rejected(String),

    #[error("commit failed: {0}")]
    CommitFailed(String),
}

/// Convenience type alias for results using [`SlopedrainError`].
pub type Result<T> = std::result::Result<T, SlopedrainError>;
