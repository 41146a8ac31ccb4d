#![cfg(feature = "cli")]

mod common;

use assert_cmd::Command;
use common::{disk_png, write_json};
use predicates::prelude::*;
use serde_json::{json, Value};

fn cli() -> Command {
    Command::cargo_bin("marker-ranging").expect("binary")
}

fn stdout_json(cmd: &mut Command) -> Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).expect("json on stdout")
}

#[test]
fn calc_fov_matches_reference() {
    let v = stdout_json(cli().args([
        "calc",
        "fov",
        "--marker-radius",
        "5",
        "--marker-distance",
        "100",
        "--pixel-radius",
        "50",
        "--frame-width",
        "640",
    ]));
    let fov = v["horizontal_fov"].as_f64().expect("fov");
    assert!((fov - 0.6194).abs() < 1e-4, "{fov}");
    assert!((v["horizontal_fov_deg"].as_f64().expect("deg") - fov.to_degrees()).abs() < 1e-9);
}

#[test]
fn calc_stereo_accepts_negative_offsets() {
    let v = stdout_json(cli().args([
        "calc",
        "stereo",
        "--camera-distance",
        "10",
        "--fov-deg",
        "60",
        "--frame-width",
        "640",
        "--x-right",
        "100",
        "--x-left",
        "-100",
    ]));
    let expected = 10.0 * 640.0 / (2.0 * 30f64.to_radians().tan() * 200.0);
    let distance = v["distance"].as_f64().expect("distance");
    assert!((distance - expected).abs() < 1e-9, "{distance}");
    assert!((v["corrected_distance"].as_f64().expect("corrected") - expected).abs() < 1e-9);
    assert!((v["corrected_xl"].as_f64().expect("xl") + 100.0).abs() < 1e-9);
}

#[test]
fn calc_distance_needs_a_calibrated_profile() {
    let dir = tempfile::tempdir().expect("tempdir");
    let raw = write_json(
        dir.path(),
        "raw.json",
        &json!({ "state": "uncalibrated", "name": "coin", "distance": 100.0, "radius": 1.2 }),
    );
    cli()
        .args(["calc", "distance", "--pixel-radius", "10", "--profile"])
        .arg(&raw)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not calibrated"));

    let calibrated = write_json(
        dir.path(),
        "calibrated.json",
        &json!({
            "state": "calibrated",
            "name": "coin",
            "distance": 100.0,
            "radius": 1.2,
            "pixel_radius": 20.0
        }),
    );
    let v = stdout_json(
        cli()
            .args(["calc", "distance", "--pixel-radius", "10", "--profile"])
            .arg(&calibrated),
    );
    assert_eq!(v["marker"], "coin");
    assert!((v["distance"].as_f64().expect("distance") - 200.0).abs() < 1e-9);
}

#[test]
fn detect_reports_the_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let img = disk_png(dir.path(), "disk.png", 200, 150, 120.0, 60.0, 18.0);
    let v = stdout_json(
        cli()
            .arg("detect")
            .arg(&img)
            .args(["--region", "80,20,80,80", "--filter", "circle-like"]),
    );
    assert_eq!(v["size"], json!([200, 150]));
    let markers = v["markers"].as_array().expect("markers");
    assert!(!markers.is_empty());
    let x = markers[0]["center"][0].as_f64().expect("x");
    let y = markers[0]["center"][1].as_f64().expect("y");
    assert!((x - 120.0).abs() < 1.5 && (y - 60.0).abs() < 1.5, "{x}, {y}");
}

#[test]
fn detect_rejects_a_malformed_region() {
    cli()
        .args(["detect", "frame.png", "--region", "1,2,3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("x,y,width,height"));
}

#[test]
fn replay_prints_the_report_and_writes_the_log() {
    let dir = tempfile::tempdir().expect("tempdir");
    disk_png(dir.path(), "centered.png", 320, 240, 160.0, 120.0, 30.0);
    let script = write_json(
        dir.path(),
        "fov.json",
        &json!({
            "frame_size": { "width": 320, "height": 240 },
            "flow": { "kind": "fov", "marker_radius": 5.0, "marker_distance": 100.0 },
            "sample_size": 3,
            "events": [
                { "event": "touch_up", "x": 0, "y": 0 },
                { "event": "frame", "path": "centered.png", "repeat": 3 }
            ]
        }),
    );
    let logs = dir.path().join("logs");
    let v = stdout_json(
        cli()
            .args(["replay", "--compact", "--log-dir"])
            .arg(&logs)
            .arg(&script),
    );
    assert_eq!(v["finished"], true);
    assert_eq!(v["samples_accepted"], 3);
    assert!(v["output"]["fov"]["horizontal_fov"].as_f64().is_some());

    let entries: Vec<_> = std::fs::read_dir(&logs)
        .expect("log dir")
        .map(|e| e.expect("entry").file_name().into_string().expect("utf8"))
        .collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].starts_with("calib_"), "{entries:?}");
    let csv = std::fs::read_to_string(logs.join(&entries[0])).expect("csv");
    assert_eq!(csv.lines().count(), 4);
}

#[test]
fn replay_of_a_missing_script_fails() {
    cli()
        .args(["replay", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.json"));
}

#[test]
fn verbose_replay_logs_to_stderr_once_per_event() {
    let dir = tempfile::tempdir().expect("tempdir");
    disk_png(dir.path(), "centered.png", 320, 240, 160.0, 120.0, 30.0);
    let script = write_json(
        dir.path(),
        "fov.json",
        &json!({
            "frame_size": { "width": 320, "height": 240 },
            "flow": { "kind": "fov", "marker_radius": 5.0, "marker_distance": 100.0 },
            "sample_size": 2,
            "events": [
                { "event": "touch_up", "x": 0, "y": 0 },
                { "event": "frame", "path": "centered.png", "repeat": 2 }
            ]
        }),
    );
    let out = cli()
        .env_remove("RUST_LOG")
        .args(["-v", "replay", "--compact", "--log-dir"])
        .arg(dir.path().join("logs"))
        .arg(&script)
        .assert()
        .success()
        .get_output()
        .clone();
    let stderr = String::from_utf8(out.stderr).expect("utf8");
    assert!(stderr.contains("replaying 2 events"), "{stderr}");
    assert_eq!(stderr.matches("sample log written").count(), 1, "{stderr}");

    let report: Value = serde_json::from_slice(&out.stdout).expect("stdout stays json");
    assert_eq!(report["finished"], true);
}
