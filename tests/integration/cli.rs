//! Integration tests for the `flightbox` binary

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

use super::common::fixtures::{self, Workspace};
use flightbox::FlightStore;

fn flightbox(ws: &Workspace) -> Command {
    let mut cmd = Command::cargo_bin("flightbox").unwrap();
    cmd.arg("--data-dir").arg(ws.data_dir());
    cmd
}

#[test]
fn test_list_shows_index_references() {
    let ws = Workspace::new();
    FlightStore::new(ws.recordings_dir())
        .save(&fixtures::two_line_recording(), Some("run"))
        .unwrap();

    flightbox(&ws)
        .arg("list")
        .arg("--dir")
        .arg(ws.recordings_dir())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("~0  "))
        .stdout(predicate::str::contains(
            ws.recordings_dir().join("run.fb").display().to_string(),
        ));
}

#[test]
fn test_list_empty_dir() {
    let ws = Workspace::new();

    flightbox(&ws)
        .arg("list")
        .arg("--dir")
        .arg(ws.recordings_dir())
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No recordings"));
}

#[test]
fn test_replay_latest_prints_narrative() {
    let ws = Workspace::new();
    FlightStore::new(ws.recordings_dir())
        .save(&fixtures::two_line_recording(), Some("run"))
        .unwrap();

    flightbox(&ws)
        .arg("replay")
        .arg("--dir")
        .arg(ws.recordings_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("<module>:2 [line] | x = 1"));
}

#[test]
fn test_replay_raw_prints_events() {
    let ws = Workspace::new();
    FlightStore::new(ws.recordings_dir())
        .save(&fixtures::two_line_recording(), Some("run"))
        .unwrap();

    flightbox(&ws)
        .args(["replay", "~0", "--raw", "--dir"])
        .arg(ws.recordings_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sequence_index\": 1"))
        .stdout(predicate::str::contains("target=demo"));
}

#[test]
fn test_replay_write_creates_log() {
    let ws = Workspace::new();
    FlightStore::new(ws.recordings_dir())
        .save(&fixtures::two_line_recording(), Some("run"))
        .unwrap();

    flightbox(&ws)
        .args(["replay", "--write", "--dir"])
        .arg(ws.recordings_dir())
        .assert()
        .success();

    let log = ws.root.path().join("linebyline").join("run.log");
    assert!(fs::read_to_string(log).unwrap().contains("x = 1"));

    // A second write must not replace the first.
    flightbox(&ws)
        .args(["replay", "--write", "--dir"])
        .arg(ws.recordings_dir())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Refusing to overwrite"));
}

#[test]
fn test_replay_missing_recording_fails() {
    let ws = Workspace::new();

    flightbox(&ws)
        .args(["replay", "nowhere.fb", "--dir"])
        .arg(ws.recordings_dir())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No recording found"));
}

#[test]
fn test_set_dir_updates_config() {
    let ws = Workspace::new();

    flightbox(&ws)
        .arg("set-dir")
        .arg(ws.recordings_dir())
        .assert()
        .success();

    let config = fs::read_to_string(ws.data_dir().join("config.toml")).unwrap();
    assert!(config.contains("[recordings]"));
    assert!(config.contains(&*ws.recordings_dir().to_string_lossy()));
}
