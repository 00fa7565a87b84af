//! End-to-end tests against the `birda` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

#[test]
fn config_command_prints_defaults_without_a_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("birda").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("missing.toml"))
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[birdweather]"))
        .stdout(predicate::str::contains("[birdnet]"))
        .stdout(predicate::str::contains("[audio]"));
}

#[test]
fn config_command_reflects_overridden_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("birda.toml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    writeln!(file, "[birdnet]\nthreshold = 0.42\n").unwrap();

    let mut cmd = Command::cargo_bin("birda").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.42"));
}

#[test]
fn run_without_labels_argument_fails_clap_validation() {
    let mut cmd = Command::cargo_bin("birda").unwrap();
    cmd.arg("run").assert().failure();
}

#[test]
fn run_with_missing_labels_file_reports_an_error_not_a_panic() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("birda").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("missing.toml"))
        .arg("run")
        .arg("--labels")
        .arg(dir.path().join("no-such-labels.txt"))
        .arg("--input")
        .arg(dir.path().join("no-such-audio.wav"))
        .assert()
        .failure()
        .stderr(predicate::str::is_empty().not());
}

#[test]
#[serial_test::serial]
fn test_connection_without_a_station_id_reports_invalid_input() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("birda.toml");
    std::fs::write(&config_path, "[birdweather]\nenabled = false\n").unwrap();

    let mut cmd = Command::cargo_bin("birda").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("test-connection")
        .assert()
        .failure();
}
