//! Integration tests for recording storage, lookup and narrative logs

use std::fs;

use super::common::fixtures::{self, Workspace};
use flightbox::config::save_recordings_dir_to;
use flightbox::{Config, FlightStore, LineByLineLog, Narrator, StoreError};

#[test]
fn test_store_from_config_uses_configured_dir() {
    let ws = Workspace::new();
    let config_file = ws.data_dir().join("config.toml");
    save_recordings_dir_to(&config_file, &ws.recordings_dir()).unwrap();

    let config = Config::load_from(&config_file);
    let store = FlightStore::from_config(&config);
    assert_eq!(store.dir(), ws.recordings_dir());

    let saved = store.save(&fixtures::two_line_recording(), Some("run")).unwrap();
    assert_eq!(saved.path, ws.recordings_dir().join("run.fb"));
}

#[test]
fn test_name_collision_keeps_original() {
    let ws = Workspace::new();
    let store = FlightStore::new(ws.recordings_dir());
    let original = ws.recordings_dir().join("run.fb");
    fs::write(&original, "not a recording").unwrap();

    let saved = store.save(&fixtures::two_line_recording(), Some("run")).unwrap();

    assert_eq!(saved.collided_with.as_deref(), Some(original.as_path()));
    assert_ne!(saved.path, original);
    assert_eq!(fs::read_to_string(&original).unwrap(), "not a recording");
    assert!(FlightStore::load(&saved.path).is_ok());
}

#[test]
fn test_resolve_latest_and_by_index() {
    let ws = Workspace::new();
    let store = FlightStore::new(ws.recordings_dir());

    assert!(matches!(
        store.resolve(None),
        Err(StoreError::NoRecordings(_))
    ));

    let first = store.save(&fixtures::two_line_recording(), Some("a")).unwrap();
    assert_eq!(store.resolve(None).unwrap(), first.path);
    assert_eq!(store.resolve(Some("~0")).unwrap(), first.path);
    assert!(matches!(
        store.resolve(Some("~1")),
        Err(StoreError::IndexOutOfRange {
            index: 1,
            available: 1
        })
    ));

    let path = first.path.to_string_lossy().into_owned();
    assert_eq!(store.resolve(Some(&path)).unwrap(), first.path);
}

#[test]
fn test_load_rejects_foreign_files() {
    let ws = Workspace::new();
    let bogus = ws.recordings_dir().join("notes.fb");
    fs::write(&bogus, "{\"hello\": \"world\"}\n").unwrap();

    assert!(matches!(
        FlightStore::load(&bogus),
        Err(StoreError::InvalidFormat { .. })
    ));
    assert!(matches!(
        FlightStore::load(&ws.recordings_dir().join("missing.fb")),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn test_narrative_log_written_beside_recordings() {
    let ws = Workspace::new();
    let store = FlightStore::new(ws.recordings_dir());
    let saved = store.save(&fixtures::two_line_recording(), Some("run")).unwrap();

    let recording = FlightStore::load(&saved.path).unwrap();
    let narrative = Narrator::narrate(&recording);
    let log = LineByLineLog::for_recording(&saved.path, "linebyline").unwrap();
    let written = log.write(&narrative).unwrap();

    assert_eq!(written, ws.root.path().join("linebyline").join("run.log"));
    let text = fs::read_to_string(written).unwrap();
    assert!(text.contains("x = 1"));

    assert!(matches!(
        log.write(&narrative),
        Err(StoreError::OutputExists(_))
    ));
}
