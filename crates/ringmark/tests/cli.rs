use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use ringmark::core::synthetic::{render_ring_marker, RingMarkerSpec};
use ringmark::core::RgbFrame;
use ringmark::detect::frame_to_image;

fn ring_frame(cx: f32, cy: f32) -> RgbFrame {
    let spec = RingMarkerSpec::dark_ring([cx, cy].into(), 20.0, 5.0 / 14.0);
    render_ring_marker(120, 90, [225, 225, 225], &spec)
}

fn save_png(frame: &RgbFrame, path: &Path) {
    frame_to_image(frame)
        .expect("frame fits u32")
        .save(path)
        .expect("write png");
}

fn write_config(dir: &Path, images: &[PathBuf], overlay: bool) -> PathBuf {
    let cfg = serde_json::json!({
        "images": images,
        "output_path": dir.join("report.json"),
        "overlay_dir": overlay.then(|| dir.join("overlays")),
        "detector": { "max_failed": 2 }
    });
    let path = dir.join("config.json");
    fs::write(&path, serde_json::to_string_pretty(&cfg).expect("json")).expect("write config");
    path
}

fn read_report(dir: &Path) -> serde_json::Value {
    let raw = fs::read_to_string(dir.join("report.json")).expect("report written");
    serde_json::from_str(&raw).expect("report json")
}

#[test]
fn writes_report_and_overlays_for_sequence() {
    let dir = tempfile::tempdir().expect("tempdir");
    let images: Vec<PathBuf> = (0..3)
        .map(|i| {
            let path = dir.path().join(format!("frame_{i}.png"));
            save_png(&ring_frame(50.0 + i as f32, 45.0), &path);
            path
        })
        .collect();
    let config = write_config(dir.path(), &images, true);

    Command::cargo_bin("ringmark")
        .expect("binary")
        .arg(&config)
        .args(["--log-level", "warn"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote report JSON to"));

    let report = read_report(dir.path());
    assert_eq!(report["detected"], 3);
    let frames = report["frames"].as_array().expect("frames");
    assert_eq!(frames.len(), 3);
    for frame in frames {
        assert_eq!(frame["detection"]["valid"], true);
        assert_eq!(frame["phase"], "tracking");
        let overlay = frame["overlay_path"].as_str().expect("overlay path");
        assert!(Path::new(overlay).exists());
    }
}

#[test]
fn unreadable_frame_is_reported_and_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good = dir.path().join("good.png");
    save_png(&ring_frame(60.0, 45.0), &good);
    let missing = dir.path().join("missing.png");
    let config = write_config(dir.path(), &[good.clone(), missing, good], false);

    Command::cargo_bin("ringmark")
        .expect("binary")
        .arg(&config)
        .args(["--log-level", "off"])
        .assert()
        .success();

    let report = read_report(dir.path());
    assert_eq!(report["detected"], 2);
    let frames = report["frames"].as_array().expect("frames");
    assert_eq!(frames.len(), 3);
    assert!(frames[1]["error"]
        .as_str()
        .is_some_and(|e| e.contains("missing.png")));
    assert!(frames[0]["overlay_path"].is_null());
}

#[test]
fn no_tracking_flag_reaches_report_params() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image = dir.path().join("frame.png");
    save_png(&ring_frame(60.0, 45.0), &image);
    let config = write_config(dir.path(), &[image], false);

    Command::cargo_bin("ringmark")
        .expect("binary")
        .arg(&config)
        .args(["--no-tracking", "--diameter-ratio", "0.357", "--log-level", "off"])
        .assert()
        .success();

    let report = read_report(dir.path());
    assert_eq!(report["params"]["tracking"], false);
    assert_eq!(report["detected"], 1);
}

#[test]
fn missing_config_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    Command::cargo_bin("ringmark")
        .expect("binary")
        .arg(dir.path().join("nope.json"))
        .assert()
        .failure();
}
