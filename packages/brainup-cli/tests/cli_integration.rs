use assert_cmd::Command;
use predicates::prelude::*;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

fn brainup() -> Command {
    let mut cmd = Command::cargo_bin("brainup").unwrap();
    cmd.env_remove("BRAINUP_TABULAR_SAMPLE_RATE");
    cmd
}

/// Four seconds of 256 Hz data, one alpha-range sine per channel.
fn write_recording(dir: &Path, headers: &[&str]) -> PathBuf {
    let mut text = headers.join(",");
    text.push('\n');
    for i in 0..1024 {
        let t = i as f64 / 256.0;
        let row: Vec<String> = (0..headers.len())
            .map(|c| format!("{:.6}", (c as f64 + 1.0) * (2.0 * PI * 10.0 * t).sin()))
            .collect();
        text.push_str(&row.join(","));
        text.push('\n');
    }
    let path = dir.join("recording.csv");
    std::fs::write(&path, text).unwrap();
    path
}

// =============================================================================
// GENERAL
// =============================================================================

#[test]
fn test_no_args_shows_help() {
    brainup()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_help_flag() {
    brainup()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("topography"))
        .stdout(predicate::str::contains("sweep"));
}

// =============================================================================
// LAYOUTS SUBCOMMAND
// =============================================================================

#[test]
fn test_layouts_table() {
    brainup()
        .arg("layouts")
        .assert()
        .success()
        .stdout(predicate::str::contains("10-20-21"))
        .stdout(predicate::str::contains("10-10-68"));
}

#[test]
fn test_layouts_json() {
    let output = brainup().args(["layouts", "--json"]).assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let first = &parsed.as_array().unwrap()[0];
    assert_eq!(
        first["electrodes"].as_u64().unwrap() as usize,
        first["labels"].as_array().unwrap().len()
    );
}

// =============================================================================
// BANDS / EXPORT / TOPOMAP
// =============================================================================

#[test]
fn test_bands_json() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_recording(dir.path(), &["Fz", "Cz"]);

    let output = brainup()
        .args(["bands", file.to_str().unwrap(), "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let rows: Vec<serde_json::Value> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(rows.len(), 10);

    let power = |channel: &str, band: &str| {
        rows.iter()
            .find(|r| r["channel"] == channel && r["band"] == band)
            .and_then(|r| r["mean_power"].as_f64())
            .unwrap()
    };
    assert!(power("Fz", "Alpha") > power("Fz", "Beta"));
    assert!(power("Cz", "Alpha") > power("Fz", "Alpha"));
}

#[test]
fn test_bands_single_channel() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_recording(dir.path(), &["Fz", "Cz"]);

    brainup()
        .args(["bands", file.to_str().unwrap(), "--channel", "Cz"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cz"))
        .stdout(predicate::str::contains("Fz").not());

    brainup()
        .args(["bands", file.to_str().unwrap(), "--channel", "Oz"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Oz"));
}

#[test]
fn test_export_writes_csv() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_recording(dir.path(), &["Fz", "Cz"]);
    let out = dir.path().join("bands.csv");

    brainup()
        .args(["export", file.to_str().unwrap(), "-o", out.to_str().unwrap()])
        .assert()
        .success();

    let text = std::fs::read_to_string(out).unwrap();
    assert!(text.starts_with("Delta_freq,Fz(Delta)_power,Cz(Delta)_power,Theta_freq"));
}

#[test]
fn test_export_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_recording(dir.path(), &["Fz"]);

    let output = brainup().args(["export", file.to_str().unwrap()]).assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    assert!(stdout.starts_with("Delta_freq,Fz(Delta)_power,Theta_freq"));
    assert!(stdout.ends_with('\n'));
    assert!(!stdout.ends_with("\n\n"));
}

#[test]
fn test_topomap_resolution_limit() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_recording(dir.path(), &["Fz", "Cz", "Pz", "C3", "C4"]);
    let out = dir.path().join("map.png");

    brainup()
        .args([
            "topomap",
            file.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--resolution",
            "100000",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("resolution"));
    assert!(!out.exists());
}

#[test]
fn test_topomap_writes_png() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_recording(dir.path(), &["Fz", "Cz", "Pz", "C3", "C4"]);
    let out = dir.path().join("map.png");

    brainup()
        .args([
            "topomap",
            file.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--resolution",
            "32",
        ])
        .assert()
        .success();

    let png = std::fs::read(out).unwrap();
    assert_eq!(&png[1..4], b"PNG");
}

#[test]
fn test_topomap_needs_three_positions() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_recording(dir.path(), &["Fz", "Aux1", "Aux2"]);
    let out = dir.path().join("map.png");

    brainup()
        .args(["topomap", file.to_str().unwrap(), "-o", out.to_str().unwrap()])
        .assert()
        .code(1);
    assert!(!out.exists());
}

#[test]
fn test_unsupported_file_is_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("notes.txt");
    std::fs::write(&file, "1,2,3").unwrap();

    brainup()
        .args(["bands", file.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unsupported file type"));
}

#[test]
fn test_invalid_filter_is_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_recording(dir.path(), &["Fz"]);

    brainup()
        .args(["bands", file.to_str().unwrap(), "--low", "40", "--high", "10"])
        .assert()
        .code(1);
}

// =============================================================================
// SWEEP SUBCOMMAND
// =============================================================================

#[test]
fn test_sweep_empty_store() {
    let dir = tempfile::tempdir().unwrap();

    let output = brainup()
        .args(["sweep", "--json", "--data-dir", dir.path().to_str().unwrap()])
        .assert()
        .success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["files_removed"], 0);
    assert!(dir.path().join("temp_files.json").exists());
}
