//! Drainage pipeline: opening detection, connectivity, routing and slope
//! assignment.

mod assign;
mod classify;
mod detect;
mod graph;
mod opening;
mod path;
mod run;

pub use assign::{AssignSlope, BatchState, SlopeReport, VertexDiagnostic, VertexStatus};
pub use classify::{classify_loop, ArcSample, Classification, ClassifyMethod, LoopSample};
pub use detect::{DetectOpenings, FlatScan};
pub use graph::{BuildConnectivity, ConnectivityGraph};
pub use opening::{belongs_to_opening, DrainOpening, OpeningId, OpeningIdFactory, OpeningShape};
pub use path::{GraphPath, NearestSink, PathResult, ShortestPath, SinkPaths};
pub use run::{OpeningSummary, RunSummary, SlopeRun};
