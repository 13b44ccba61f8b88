#![allow(clippy::unwrap_used)]

use approx::assert_relative_eq;
use slopedrain::config::DrainageParams;
use slopedrain::error::{GeometryError, OperationError, SessionError};
use slopedrain::math::Point3;
use slopedrain::operations::creation::{MakeCircularWire, MakeFace, MakeWire};
use slopedrain::operations::drainage::{
    DetectOpenings, OpeningShape, RunSummary, SlopeRun, VertexStatus,
};
use slopedrain::session::{CancelToken, ControlVertexId, EditSession, MemorySession};
use slopedrain::topology::{TopologyStore, WireId};
use slopedrain::SlopedrainError;

fn p(x: f64, y: f64) -> Point3 {
    Point3::new(x, y, 0.0)
}

fn rect(store: &mut TopologyStore, x0: f64, y0: f64, x1: f64, y1: f64) -> WireId {
    MakeWire::new(vec![p(x0, y0), p(x1, y0), p(x1, y1), p(x0, y1)], true)
        .execute(store)
        .unwrap()
}

fn circle(store: &mut TopologyStore, cx: f64, cy: f64, r: f64) -> WireId {
    MakeCircularWire::new(p(cx, cy), r, 8).execute(store).unwrap()
}

fn relative_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * b.abs().max(1.0)
}

/// Scenario A: 4000×4000 deck, centered 200-diameter circular opening,
/// 3×3 vertex grid whose middle vertex sits on the opening rim.
struct ScenarioA {
    session: MemorySession,
    grid: Vec<ControlVertexId>,
}

impl ScenarioA {
    fn new() -> Self {
        let mut store = TopologyStore::new();
        let outer = rect(&mut store, 0.0, 0.0, 4000.0, 4000.0);
        let hole = circle(&mut store, 2000.0, 2000.0, 100.0);
        MakeFace::new(outer, vec![hole]).execute(&mut store).unwrap();

        let mut session = MemorySession::new(store);
        let mut grid = Vec::new();
        for y in [0.0, 2000.0, 4000.0] {
            for x in [0.0, 2000.0, 4000.0] {
                let y = if x == 2000.0 && y == 2000.0 { 1900.0 } else { y };
                grid.push(session.add_vertex(p(x, y)));
            }
        }
        Self { session, grid }
    }

    fn sink(&self) -> ControlVertexId {
        self.grid[4]
    }

    fn corner(&self) -> ControlVertexId {
        self.grid[0]
    }

    fn elevations(&self) -> Vec<f64> {
        self.grid
            .iter()
            .map(|&id| self.session.elevation(id).unwrap())
            .collect()
    }
}

fn params() -> DrainageParams {
    DrainageParams::default().with_max_connection_distance(6000.0)
}

fn run(session: &mut MemorySession, slope: f64) -> RunSummary {
    SlopeRun::new(params(), slope)
        .execute(session, |_| true)
        .unwrap()
}

#[test]
fn scenario_a_corner_gets_slope_times_path() {
    let mut a = ScenarioA::new();
    let summary = run(&mut a.session, 2.0);

    assert_eq!(summary.openings_detected, 1);
    assert_eq!(summary.openings[0].shape, OpeningShape::Circle);
    assert_eq!(a.session.elevation(a.sink()).unwrap(), 0.0);

    let corner = a.session.elevation(a.corner()).unwrap();
    assert_relative_eq!(corner, 0.02 * 2000f64.hypot(1900.0), max_relative = 1e-6);
    assert_eq!(summary.modified, 9);
    assert_eq!(summary.skipped, 0);
}

#[test]
fn elevation_is_slope_times_path_length() {
    let mut a = ScenarioA::new();
    let summary = run(&mut a.session, 3.5);
    let report = summary.report.unwrap();

    let mut longest: f64 = 0.0;
    for diag in &report.diagnostics {
        let elevation = a.session.elevation(diag.id).unwrap();
        match diag.status {
            VertexStatus::Sink => assert_eq!(elevation, 0.0),
            VertexStatus::Routed => {
                let length = diag.path_length.unwrap();
                assert!(relative_eq(elevation, 0.035 * length));
                longest = longest.max(length);
            }
            VertexStatus::Unreachable => panic!("every vertex should reach the drain"),
        }
    }
    assert_relative_eq!(report.longest_path, longest);
    assert_relative_eq!(report.max_offset, 0.035 * longest, max_relative = 1e-9);
}

#[test]
fn path_around_the_opening_is_longer_than_straight_line() {
    let mut a = ScenarioA::new();
    run(&mut a.session, 1.0);
    // The far corner cannot see the rim vertex past the hole.
    let far = a.session.elevation(a.grid[8]).unwrap() * 100.0;
    let straight = 2000f64.hypot(2100.0);
    assert!(far > straight + 1.0);
}

#[test]
fn sinks_are_zero_for_any_slope() {
    for slope in [0.1, 1.0, 2.0, 25.0, 100.0] {
        let mut a = ScenarioA::new();
        a.session.preset_elevation(a.sink(), 12.5).unwrap();
        run(&mut a.session, slope);
        assert_eq!(a.session.elevation(a.sink()).unwrap(), 0.0);
    }
}

/// Scenario B: a small selected opening and a larger unselected one.
fn scenario_b() -> (MemorySession, [ControlVertexId; 3]) {
    let mut store = TopologyStore::new();
    let outer = rect(&mut store, 0.0, 0.0, 4000.0, 4000.0);
    let small = rect(&mut store, 2950.0, 2950.0, 3050.0, 3050.0);
    let big = circle(&mut store, 1000.0, 1000.0, 200.0);
    MakeFace::new(outer, vec![small, big]).execute(&mut store).unwrap();

    let mut session = MemorySession::new(store);
    let sink = session.add_vertex(p(2950.0, 2950.0));
    let rim = session.add_vertex(p(1000.0, 800.0));
    let near_big = session.add_vertex(p(1000.0, 500.0));
    session.preset_elevation(near_big, 7.0).unwrap();
    (session, [sink, rim, near_big])
}

#[test]
fn scenario_b_routes_to_selected_opening_only() {
    let (mut session, [sink, rim, near_big]) = scenario_b();
    let summary = SlopeRun::new(DrainageParams::default(), 2.0)
        .execute(&mut session, |o| o.shape == OpeningShape::Square)
        .unwrap();

    assert_eq!(summary.openings_detected, 2);
    assert_eq!(summary.openings_selected, 1);
    assert_eq!(session.elevation(sink).unwrap(), 0.0);
    assert!(session.elevation(rim).unwrap() > 0.0);

    let expected = 0.02 * 1950f64.hypot(2450.0);
    assert_relative_eq!(session.elevation(near_big).unwrap(), expected, max_relative = 1e-6);

    let report = summary.report.unwrap();
    let small_id = summary
        .openings
        .iter()
        .find(|o| o.selected)
        .map(|o| o.id)
        .unwrap();
    let diag = report.diagnostics.iter().find(|d| d.id == near_big).unwrap();
    assert_eq!(diag.nearest_opening, Some(small_id));
}

#[test]
fn scenario_b_unreachable_vertices_untouched_and_uncounted() {
    let (mut session, [sink, rim, near_big]) = scenario_b();
    let summary = SlopeRun::new(
        DrainageParams::default().with_max_connection_distance(1000.0),
        2.0,
    )
    .execute(&mut session, |o| o.shape == OpeningShape::Square)
    .unwrap();

    assert_eq!(summary.modified, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(session.elevation(sink).unwrap(), 0.0);
    assert_eq!(session.elevation(rim).unwrap(), 0.0);
    assert_eq!(session.elevation(near_big).unwrap(), 7.0);
}

#[test]
fn scenario_c_no_openings_no_error() {
    let mut store = TopologyStore::new();
    let outer = rect(&mut store, 0.0, 0.0, 1000.0, 1000.0);
    MakeFace::new(outer, vec![]).execute(&mut store).unwrap();
    let mut session = MemorySession::new(store);
    for x in [100.0, 500.0, 900.0] {
        session.add_vertex(p(x, 500.0));
    }

    let summary = run(&mut session, 2.0);
    assert_eq!(summary.openings_detected, 0);
    assert_eq!(summary.modified, 0);
    assert_eq!(summary.skipped, 3);
    assert_eq!(session.commit_count(), 0);
}

#[test]
fn scenario_d_arc_ring_and_line_square() {
    let mut store = TopologyStore::new();
    let outer = rect(&mut store, 0.0, 0.0, 3000.0, 3000.0);
    let ring = circle(&mut store, 700.0, 700.0, 100.0);
    let square = rect(&mut store, 2000.0, 2000.0, 2200.0, 2200.0);
    MakeFace::new(outer, vec![ring, square]).execute(&mut store).unwrap();

    let openings = DetectOpenings::new(&DrainageParams::default())
        .execute(&store, &[])
        .unwrap();
    let shapes: Vec<_> = openings.iter().map(|o| o.shape).collect();
    assert_eq!(shapes, vec![OpeningShape::Circle, OpeningShape::Square]);
    assert_relative_eq!(openings[0].width, 200.0, epsilon = 1e-6);
    assert_relative_eq!(openings[1].width, 200.0, epsilon = 1e-6);
    assert_relative_eq!(openings[1].height, 200.0, epsilon = 1e-6);
}

#[test]
fn detector_is_idempotent_on_unchanged_surface() {
    let a = ScenarioA::new();
    let vertices = a.session.control_vertices().unwrap();
    let topology = a.session.topology().unwrap();
    let detector = DetectOpenings::new(&params());
    let first = detector.execute(topology, &vertices).unwrap();
    let second = detector.execute(topology, &vertices).unwrap();

    assert_eq!(first.len(), second.len());
    for (x, y) in first.iter().zip(&second) {
        assert_eq!(x.id, y.id);
        assert_eq!(x.shape, y.shape);
        assert_eq!(x.center, y.center);
        assert_eq!(x.vertices, y.vertices);
    }
}

#[test]
fn rejected_vertex_rolls_back_every_change() {
    let mut a = ScenarioA::new();
    a.session.preset_elevation(a.grid[2], 4.0).unwrap();
    a.session.preset_elevation(a.sink(), 6.0).unwrap();
    let before = a.elevations();
    a.session.reject_elevation_of(a.grid[7]);

    let err = SlopeRun::new(params(), 2.0)
        .execute(&mut a.session, |_| true)
        .unwrap_err();
    assert!(matches!(err, SlopedrainError::Session(SessionError::Rejected(_))));
    assert_eq!(a.elevations(), before);
    assert!(!a.session.in_transaction());
}

#[test]
fn failed_commit_rolls_back() {
    let mut a = ScenarioA::new();
    let before = a.elevations();
    a.session.fail_next_commit();

    let err = SlopeRun::new(params(), 2.0)
        .execute(&mut a.session, |_| true)
        .unwrap_err();
    assert!(matches!(err, SlopedrainError::Session(SessionError::CommitFailed(_))));
    assert_eq!(a.elevations(), before);
    assert!(!a.session.in_transaction());
    assert_eq!(a.session.commit_count(), 0);
}

#[test]
fn cancelled_run_rolls_back() {
    let mut a = ScenarioA::new();
    a.session.preset_elevation(a.corner(), 1.5).unwrap();
    let before = a.elevations();
    let token = CancelToken::new();
    token.cancel();

    let err = SlopeRun::new(params(), 2.0)
        .with_cancel(token)
        .execute(&mut a.session, |_| true)
        .unwrap_err();
    assert!(matches!(err, SlopedrainError::Operation(OperationError::Cancelled)));
    assert_eq!(a.elevations(), before);
}

#[test]
fn empty_selection_is_invalid_input() {
    let mut a = ScenarioA::new();
    let err = SlopeRun::new(params(), 2.0)
        .execute(&mut a.session, |_| false)
        .unwrap_err();
    assert!(matches!(err, SlopedrainError::Operation(OperationError::InvalidInput(_))));
    assert!(a.elevations().iter().all(|&e| e == 0.0));
}

#[test]
fn unreadable_surface_aborts() {
    let mut a = ScenarioA::new();
    a.session.inject_geometry_fault("host document closed");
    let err = SlopeRun::new(params(), 2.0)
        .execute(&mut a.session, |_| true)
        .unwrap_err();
    assert!(matches!(err, SlopedrainError::Geometry(GeometryError::Unavailable(_))));
}

#[test]
fn flat_deck_drains_into_scanned_void() {
    let mut session = MemorySession::default();
    let center = (1000.0, 1000.0);
    for i in 0..=40 {
        for j in 0..=40 {
            let (x, y) = (f64::from(i) * 50.0, f64::from(j) * 50.0);
            if (x - center.0).hypot(y - center.1) >= 335.0 {
                session.add_vertex(p(x, y));
            }
        }
    }
    let rim: Vec<_> = (0..36)
        .map(|k| {
            let t = std::f64::consts::TAU * f64::from(k) / 36.0;
            session.add_vertex(p(center.0 + 300.0 * t.cos(), center.1 + 300.0 * t.sin()))
        })
        .collect();
    let corner = session.control_vertices().unwrap()[0].id;

    let summary = SlopeRun::new(
        DrainageParams::default().with_max_connection_distance(120.0),
        2.0,
    )
    .execute(&mut session, |_| true)
    .unwrap();

    assert_eq!(summary.openings_detected, 1);
    assert_eq!(summary.openings[0].shape, OpeningShape::Circle);
    assert!(rim.iter().all(|&id| session.elevation(id).unwrap() == 0.0));

    let report = summary.report.unwrap();
    let diag = report.diagnostics.iter().find(|d| d.id == corner).unwrap();
    assert_eq!(diag.status, VertexStatus::Routed);
    let length = diag.path_length.unwrap();
    // At least the straight-line distance from (0, 0) to the rim.
    assert!(length >= 1000f64.hypot(1000.0) - 300.0 - 1e-6);
    assert!(relative_eq(session.elevation(corner).unwrap(), 0.02 * length));
}
