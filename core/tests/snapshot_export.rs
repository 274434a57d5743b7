//! Snapshot record layout, diagnostics, file sink and consolidation.

use flowline_core::{
    config::ModelParams,
    consolidate::{consolidate_dir, consolidate_into, snapshot_files},
    engine::FlowEngine,
    error::FlowError,
    snapshot::{JsonDirSink, MemorySink},
    state::ProfileSpec,
};
use serde_json::Value;
use std::path::PathBuf;

fn params(diagnostics: bool) -> ModelParams {
    ModelParams {
        model_length_km: 10.0,
        grid_points:     21,
        iterations:      4_000,
        initial_ice:     ProfileSpec::Linear { start: 150.0, end: 0.0 },
        diagnostics,
        ..ModelParams::default()
    }
}

fn first_record(params: &ModelParams) -> Value {
    let mut engine = FlowEngine::build(params).unwrap();
    let mut sink = MemorySink::default();
    engine.run(&mut sink).unwrap();
    serde_json::from_str(&sink.records[0]).unwrap()
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("flowline-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn record_uses_viewer_field_names() {
    let record = first_record(&params(false));

    assert_eq!(record["iteration"], 2_000);
    assert!(record["modelTime"].as_f64().is_some());

    let elements = record["elements"].as_array().unwrap();
    let midpoints = record["midpoints"].as_array().unwrap();
    assert_eq!(elements.len(), 21);
    assert_eq!(midpoints.len(), 20);

    for key in [
        "iceElevation", "bedElevation", "diffusivity_up", "flux_up", "diffusivity_down",
        "flux_down", "totalFlux", "massBalanceFlux", "iteration", "deltaH",
    ] {
        assert!(elements[0].get(key).is_some(), "element missing {key}");
    }
    for key in ["elementDown", "elementUp", "diffusivity", "slope", "flux"] {
        assert!(midpoints[0].get(key).is_some(), "midpoint missing {key}");
    }
}

/// Without diagnostics only elevations and edge flux are live.
#[test]
fn baseline_diagnostic_fields_are_zero() {
    let record = first_record(&params(false));

    for element in record["elements"].as_array().unwrap() {
        for key in [
            "diffusivity_up", "flux_up", "diffusivity_down", "flux_down",
            "totalFlux", "massBalanceFlux", "iteration", "deltaH",
        ] {
            assert_eq!(element[key].as_f64(), Some(0.0), "{key} should be zero");
        }
    }

    let midpoints = record["midpoints"].as_array().unwrap();
    assert!(midpoints.iter().any(|m| m["flux"].as_f64() != Some(0.0)));
    for midpoint in midpoints {
        assert_eq!(midpoint["elementUp"], 0);
        assert_eq!(midpoint["elementDown"], 0);
        assert_eq!(midpoint["slope"].as_f64(), Some(0.0));
    }
}

#[test]
fn diagnostics_fill_the_breakdown() {
    let record = first_record(&params(true));

    let midpoints = record["midpoints"].as_array().unwrap();
    assert_eq!(midpoints[3]["elementUp"], 3);
    assert_eq!(midpoints[3]["elementDown"], 4);
    assert!(midpoints[3]["slope"].as_f64().unwrap() < 0.0);
    assert!(midpoints[3]["diffusivity"].as_f64().unwrap() > 0.0);

    let elements = record["elements"].as_array().unwrap();
    assert_eq!(elements[0]["massBalanceFlux"].as_f64(), Some(2.0));
    assert_eq!(elements[0]["iteration"], 2_000);
    assert_eq!(elements[0]["flux_up"].as_f64(), Some(0.0));
    assert_eq!(
        elements[1]["diffusivity_up"].as_f64(),
        midpoints[0]["diffusivity"].as_f64()
    );
}

#[test]
fn json_dir_sink_writes_one_file_per_snapshot() {
    let dir = scratch_dir("sink");
    let mut engine = FlowEngine::build(&params(false)).unwrap();
    let mut sink = JsonDirSink::new(&dir).unwrap();

    engine.run(&mut sink).unwrap();

    let files = snapshot_files(&dir).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["data-0010.json", "data-0020.json"]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn consolidation_orders_snapshots_by_model_time() {
    let dir = scratch_dir("consolidate");
    let mut engine = FlowEngine::build(&ModelParams {
        iterations: 6_000,
        ..params(false)
    })
    .unwrap();
    engine.run(&mut JsonDirSink::new(&dir).unwrap()).unwrap();
    std::fs::write(dir.join("notes.txt"), "not a snapshot").unwrap();

    let merged: Value = serde_json::from_str(&consolidate_dir(&dir).unwrap()).unwrap();
    let times: Vec<f64> = merged
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["modelTime"].as_f64().unwrap())
        .collect();
    assert_eq!(times.len(), 3);
    assert!(times.windows(2).all(|w| w[0] < w[1]));

    let out = dir.join("decades.json");
    assert_eq!(consolidate_into(&dir, &out).unwrap(), 3);
    assert!(out.exists());

    let _ = std::fs::remove_dir_all(&dir);
}

/// Half-year snapshots both round to year 1; the second must not replace
/// the first on disk.
#[test]
fn json_dir_sink_refuses_to_overwrite_a_snapshot() {
    let dir = scratch_dir("collision");
    let params = ModelParams {
        grid_points:       5,
        time_step:         0.5,
        snapshot_interval: 0.5,
        iterations:        2,
        ..ModelParams::default()
    };
    let mut engine = FlowEngine::build(&params).unwrap();
    let mut sink = JsonDirSink::new(&dir).unwrap();

    assert_eq!(engine.step(&mut sink).unwrap(), Some(1));
    let err = engine.step(&mut sink).unwrap_err();

    assert!(matches!(
        err,
        FlowError::SnapshotCollision { ref file, iteration: 2 } if file == "data-0001.json"
    ));
    let written: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("data-0001.json")).unwrap())
            .unwrap();
    assert_eq!(written["iteration"], 1);
    let _ = std::fs::remove_dir_all(&dir);
}
