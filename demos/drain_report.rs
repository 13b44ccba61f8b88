//! Drainage report for a sample deck.
//!
//! Builds a 6000×4000 deck with one round and one square drain, seeds a
//! vertex grid, runs the slope pipeline and prints the run summary as JSON.
//!
//! Usage:
//! ```text
//! cargo run --example drain_report                 # 2% slope, both drains
//! cargo run --example drain_report -- 1.5 round    # 1.5% slope, round drain only
//! RUST_LOG=slopedrain=debug cargo run --example drain_report
//! ```

use std::error::Error;

use slopedrain::config::DrainageParams;
use slopedrain::math::Point3;
use slopedrain::operations::creation::{MakeCircularWire, MakeFace, MakeWire};
use slopedrain::operations::drainage::{OpeningShape, SlopeRun};
use slopedrain::session::MemorySession;
use slopedrain::topology::TopologyStore;

fn p(x: f64, y: f64) -> Point3 {
    Point3::new(x, y, 0.0)
}

fn build_deck() -> Result<TopologyStore, Box<dyn Error>> {
    let mut store = TopologyStore::new();
    let outer = MakeWire::new(
        vec![p(0.0, 0.0), p(6000.0, 0.0), p(6000.0, 4000.0), p(0.0, 4000.0)],
        true,
    )
    .execute(&mut store)?;
    let round = MakeCircularWire::new(p(1500.0, 2000.0), 75.0, 8).execute(&mut store)?;
    let square = MakeWire::new(
        vec![p(4450.0, 1950.0), p(4550.0, 1950.0), p(4550.0, 2050.0), p(4450.0, 2050.0)],
        true,
    )
    .execute(&mut store)?;
    MakeFace::new(outer, vec![round, square]).execute(&mut store)?;
    Ok(store)
}

fn main() -> Result<(), Box<dyn Error>> {
    // Default: WARN for everything, INFO for slopedrain.
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("slopedrain=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut args = std::env::args().skip(1);
    let slope: f64 = args.next().map_or(Ok(2.0), |s| s.parse())?;
    let only_round = args.next().is_some_and(|s| s == "round");

    let mut session = MemorySession::new(build_deck()?);
    for j in 0..=8 {
        for i in 0..=12 {
            session.add_vertex(p(f64::from(i) * 500.0, f64::from(j) * 500.0));
        }
    }
    // Rim vertices so each drain has sinks.
    session.add_vertex(p(1500.0, 1925.0));
    session.add_vertex(p(4450.0, 1950.0));

    let params = DrainageParams::default().with_max_connection_distance(1200.0);
    let summary = SlopeRun::new(params, slope).execute(&mut session, |opening| {
        !only_round || opening.shape == OpeningShape::Circle
    })?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
