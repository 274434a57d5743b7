//! flowline-runner: headless runner for the flowline glacier model.
//!
//! Usage:
//!   flowline-runner --out out/
//!   flowline-runner --config run.json --iterations 200000 --db run.db --diagnostics
//!   flowline-runner --consolidate out/ --into decades.json

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use flowline_core::{
    config::ModelParams,
    consolidate::consolidate_into,
    engine::FlowEngine,
    snapshot::{JsonDirSink, SnapshotSink},
    store::SnapshotStore,
};
use std::env;
use std::path::Path;
use std::time::Instant;

/// Written next to the snapshots so a run directory describes itself.
#[derive(serde::Serialize)]
struct RunManifest<'a> {
    run_id:      &'a str,
    version:     &'a str,
    started_at:  DateTime<Utc>,
    finished_at: DateTime<Utc>,
    iterations:  u64,
    model_time:  f64,
    snapshots:   usize,
    params:      &'a ModelParams,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if let Some(dir) = string_arg(&args, "--consolidate") {
        let into = string_arg(&args, "--into").unwrap_or("decades.json");
        let count = consolidate_into(Path::new(dir), Path::new(into))
            .with_context(|| format!("consolidating {dir}"))?;
        println!("Consolidated {count} snapshots into {into}");
        return Ok(());
    }

    let mut params = match string_arg(&args, "--config") {
        Some(path) => ModelParams::load(path)?,
        None => ModelParams::default(),
    };
    params.iterations = parse_arg(&args, "--iterations", params.iterations);
    params.diagnostics |= args.iter().any(|a| a == "--diagnostics");
    let out_dir = string_arg(&args, "--out").unwrap_or("./out");
    let db = string_arg(&args, "--db");

    let run_id = uuid::Uuid::new_v4().to_string();
    let version = env!("CARGO_PKG_VERSION");

    println!("flowline-runner");
    println!("  run_id:      {run_id}");
    println!("  grid points: {}", params.grid_points);
    println!("  iterations:  {}", params.iterations);
    println!("  out:         {out_dir}");
    println!("  db:          {}", db.unwrap_or("(none)"));
    println!();

    let mut engine = FlowEngine::build(&params).context("building engine")?;
    log::info!("Afl = {:e}", engine.config.afl());

    let mut sinks: Vec<Box<dyn SnapshotSink>> = vec![Box::new(JsonDirSink::new(out_dir)?)];
    if let Some(db) = db {
        let store = SnapshotStore::open(db, run_id.clone())?;
        store.migrate()?;
        store.insert_run(version, &serde_json::to_string(&params)?)?;
        sinks.push(Box::new(store));
    }

    let started_at = Utc::now();
    let timer = Instant::now();
    let snapshots = engine.run(&mut sinks)?;
    let elapsed = timer.elapsed();

    let manifest = RunManifest {
        run_id:      &run_id,
        version,
        started_at,
        finished_at: Utc::now(),
        iterations:  engine.clock.iteration,
        model_time:  engine.model_time(),
        snapshots,
        params:      &params,
    };
    let manifest_path = Path::new(out_dir).join("run.json");
    std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)
        .with_context(|| format!("writing {}", manifest_path.display()))?;

    print_summary(&engine, snapshots, elapsed.as_secs_f64());
    Ok(())
}

fn print_summary(engine: &FlowEngine, snapshots: usize, seconds: f64) {
    let state = engine.state();
    println!("=== RUN SUMMARY ===");
    println!("  iterations:     {}", engine.clock.iteration);
    println!("  model time:     {:.1} yr", engine.model_time());
    println!("  snapshots:      {snapshots}");
    println!("  max thickness:  {:.2} m", state.max_thickness());
    println!("  ice volume:     {:.3e} m^2", state.ice_volume(&engine.config));
    println!("  stability no.:  {:.4}", engine.stability_number());
    println!(
        "Completed {} iterations in {:.2} minutes",
        engine.clock.iteration,
        seconds / 60.0
    );
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
