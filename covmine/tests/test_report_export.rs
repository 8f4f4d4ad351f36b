use std::fs;
use std::process::Command;

use covmine::config::MinerConfig;
use covmine::replay::{CoverageMiner, ReplayDriver, Trace};

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/small_trace.json");

#[test]
fn test_export_round_trips_through_file() {
    let trace = Trace::from_file(FIXTURE).expect("fixture should load");
    let mut miner = CoverageMiner::new(&MinerConfig::default());
    let sink = miner.sink();
    ReplayDriver::new(2).run(&trace, &*sink, &mut miner).expect("replay failed");
    let report = miner.into_report();

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("coverage.json");
    let file = fs::File::create(&path).expect("Failed to create report file");
    report.export(std::io::BufWriter::new(file)).expect("Failed to export report");

    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).expect("Invalid JSON");
    assert_eq!(parsed["ranges"].as_array().unwrap().len(), 3);
    assert_eq!(parsed["ranges"][0]["min"], 4096);
    assert_eq!(parsed["ranges"][0]["max"], 4136);
    assert_eq!(parsed["groups"].as_array().unwrap().len(), 3);
    assert_eq!(parsed["stats"]["covered_bytes"], 60);
}

#[test]
fn test_cli_exports_report() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("out.json");

    let output = Command::new(env!("CARGO_BIN_EXE_covmine"))
        .args([FIXTURE, "--quiet", "--kinds", "exec", "--workers", "2", "--export"])
        .arg(&path)
        .output()
        .expect("Failed to run covmine");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).expect("Invalid JSON");
    assert_eq!(parsed["stats"]["covered_bytes"], 48);
    assert_eq!(parsed["stats"]["accesses_filtered"], 3);
}

#[test]
fn test_cli_rejects_malformed_trace() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{"segments":[{"thread":0,"start_position":9,"end_position":1}]}"#)
        .unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_covmine"))
        .arg(&path)
        .arg("--quiet")
        .status()
        .expect("Failed to run covmine");

    assert_eq!(status.code(), Some(2));
}

#[test]
fn test_cli_missing_trace_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let status = Command::new(env!("CARGO_BIN_EXE_covmine"))
        .arg(dir.path().join("does-not-exist.json"))
        .status()
        .expect("Failed to run covmine");

    assert_eq!(status.code(), Some(1));
}
