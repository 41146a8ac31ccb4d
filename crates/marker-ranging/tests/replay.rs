#![cfg(feature = "image")]

mod common;

use approx::assert_relative_eq;
use common::{disk_png, write_json};
use marker_ranging::replay::{run_file, FlowOutput, ReplayError, ReplayScript};
use marker_ranging::{MonocularOutput, StereoResult};
use serde_json::json;

fn frame(path: &str, repeat: u32) -> serde_json::Value {
    json!({ "event": "frame", "path": path, "repeat": repeat })
}

fn select(from: (i32, i32), to: (i32, i32)) -> Vec<serde_json::Value> {
    vec![
        json!({ "event": "touch_down", "x": from.0, "y": from.1 }),
        json!({ "event": "touch_move", "x": (from.0 + to.0) / 2, "y": (from.1 + to.1) / 2 }),
        json!({ "event": "touch_up", "x": to.0, "y": to.1 }),
    ]
}

#[test]
fn monocular_calibration_feeds_measurement() {
    let dir = tempfile::tempdir().expect("tempdir");
    disk_png(dir.path(), "near.png", 320, 240, 90.0, 70.0, 20.0);
    disk_png(dir.path(), "far.png", 320, 240, 90.0, 70.0, 10.0);

    let mut events = select((40, 30), (140, 110));
    events.push(frame("near.png", 5));
    let calib = write_json(
        dir.path(),
        "calibrate.json",
        &json!({
            "frame_size": { "width": 320, "height": 240 },
            "flow": {
                "kind": "monocular",
                "mode": "calibrate",
                "marker": { "name": "coin", "distance": 100.0, "radius": 1.2 }
            },
            "sample_size": 5,
            "events": events,
        }),
    );
    let logs = dir.path().join("logs");
    std::fs::create_dir_all(&logs).expect("log dir");
    let report = run_file(&calib, Some(&logs)).expect("calibration replay");
    assert!(report.finished);
    assert_eq!(report.samples_accepted, 5);
    assert_eq!(report.resets, 0);
    let Some(FlowOutput::Monocular(MonocularOutput::Calibrated { profile })) = report.output
    else {
        panic!("expected a calibrated profile");
    };
    assert!((profile.pixel_radius - 20.0).abs() < 1.5, "{}", profile.pixel_radius);
    let log_file = report.log_file.expect("sample log");
    assert!(log_file
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("cao_")));

    let mut events = select((40, 30), (140, 110));
    events.push(frame("far.png", 5));
    let measure = write_json(
        dir.path(),
        "measure.json",
        &json!({
            "frame_size": { "width": 320, "height": 240 },
            "flow": {
                "kind": "monocular",
                "mode": "measure",
                "profile": profile,
                "focal_length_cm": 0.4
            },
            "sample_size": 5,
            "events": events,
        }),
    );
    let report = run_file(&measure, None).expect("measurement replay");
    let Some(FlowOutput::Monocular(MonocularOutput::Distance {
        distance,
        mean_pixel_radius,
    })) = report.output
    else {
        panic!("expected a distance");
    };
    assert_relative_eq!(
        distance,
        100.0 * profile.pixel_radius / mean_pixel_radius,
        max_relative = 1e-9
    );
    assert!((180.0..230.0).contains(&distance), "{distance}");
    assert!(report.log_file.is_none());
}

#[test]
fn stereo_replay_with_rotation_vectors() {
    let dir = tempfile::tempdir().expect("tempdir");
    disk_png(dir.path(), "right.png", 320, 240, 220.0, 120.0, 15.0);
    disk_png(dir.path(), "left.png", 320, 240, 100.0, 120.0, 15.0);

    // Rotation of -0.1 rad about z reads as azimuth 0.1.
    let half = (-0.05f64).sin();
    let rotation = json!({ "event": "rotation_vector", "values": [0.0, 0.0, half] });

    let mut events = select((180, 80), (260, 160));
    for _ in 0..3 {
        events.push(json!({ "event": "orientation", "yaw": 0.1 }));
        events.push(frame("right.png", 1));
    }
    events.push(rotation.clone());
    events.extend(select((60, 80), (140, 160)));
    for _ in 0..3 {
        events.push(rotation.clone());
        events.push(frame("left.png", 1));
    }

    let script = write_json(
        dir.path(),
        "stereo.json",
        &json!({
            "frame_size": { "width": 320, "height": 240 },
            "flow": {
                "kind": "stereo",
                "camera_distance": 10.0,
                "horizontal_fov": 2.0 * 0.32f64.atan()
            },
            "sample_size": 3,
            "events": events,
        }),
    );
    let report = run_file(&script, None).expect("stereo replay");
    assert_eq!(report.flow, "stereo");
    assert!(report.finished);
    assert_eq!(report.phase_completions, 1);
    assert_eq!(report.samples_accepted, 6);
    let Some(FlowOutput::Stereo(StereoResult {
        distance,
        corrected_distance,
        x_right,
        x_left,
        error_angle,
    })) = report.output
    else {
        panic!("expected a stereo result");
    };
    assert!((x_right - 59.5).abs() < 1.0, "{x_right}");
    assert!((x_left + 60.5).abs() < 1.0, "{x_left}");
    assert!(error_angle.abs() < 1e-9);
    assert_relative_eq!(corrected_distance, distance, max_relative = 1e-6);
    assert_eq!(
        report.samples.columns,
        vec!["yaw_right", "x_right", "yaw_left", "x_left"]
    );
}

#[test]
fn fov_replay_counts_resets() {
    let dir = tempfile::tempdir().expect("tempdir");
    disk_png(dir.path(), "centered.png", 320, 240, 160.0, 120.0, 30.0);
    disk_png(dir.path(), "blank.png", 320, 240, -100.0, -100.0, 1.0);

    let script = ReplayScript::from_json(
        &json!({
            "frame_size": { "width": 320, "height": 240 },
            "flow": { "kind": "fov", "marker_radius": 5.0, "marker_distance": 100.0 },
            "sample_size": 2,
            "events": [
                { "event": "touch_up", "x": 0, "y": 0 },
                { "event": "frame", "path": "blank.png" },
                { "event": "frame", "path": "centered.png" },
                { "event": "touch_up", "x": 0, "y": 0 },
                { "event": "frame", "path": "centered.png", "repeat": 2 },
                { "event": "orientation", "yaw": 1.0 }
            ]
        })
        .to_string(),
    )
    .expect("script");
    let report = script.run(dir.path(), None).expect("fov replay");
    assert_eq!(report.resets, 1);
    assert_eq!(
        report.last_reset.as_deref(),
        Some("no marker found in the search region")
    );
    // The frame after the reset arrives while idle.
    assert_eq!(report.frames_processed, 3);
    assert!(report.finished);
    let Some(FlowOutput::Fov(result)) = report.output else {
        panic!("expected a fov result");
    };
    assert!(result.horizontal_fov > 0.0 && result.horizontal_fov < std::f64::consts::PI);
}

#[test]
fn mismatched_frame_size_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    disk_png(dir.path(), "small.png", 64, 48, 32.0, 24.0, 8.0);
    let script = ReplayScript::from_json(
        &json!({
            "frame_size": { "width": 320, "height": 240 },
            "flow": { "kind": "fov", "marker_radius": 5.0, "marker_distance": 100.0 },
            "events": [
                { "event": "touch_up", "x": 0, "y": 0 },
                { "event": "frame", "path": "small.png" }
            ]
        })
        .to_string(),
    )
    .expect("script");
    let err = script.run(dir.path(), None).unwrap_err();
    assert!(
        matches!(err, ReplayError::FrameSize { width: 64, height: 48, .. }),
        "{err}"
    );
}
