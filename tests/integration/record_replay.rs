//! Integration tests for the record → save → load → narrate flow

use super::common::fixtures::{self, Workspace, TARGET};
use flightbox::narrate::render;
use flightbox::trace::mock::{MockFrame, MockProgram};
use flightbox::{Config, EventKind, FlightStore, Narrator, Recorder, Snapshot, Transition};

#[test]
fn test_two_line_module_narrative() {
    let ws = Workspace::new();
    let store = FlightStore::new(ws.recordings_dir());

    let saved = store.save(&fixtures::two_line_recording(), None).unwrap();
    let recording = FlightStore::load(&saved.path).unwrap();

    assert_eq!(recording.events.len(), 2);
    assert!(recording.events[0].locals.is_empty());
    assert_eq!(recording.events[1].locals["x"].to_string(), "1");

    let records = Narrator::narrate(&recording).into_result().unwrap();
    assert_eq!(records.len(), 2);

    let x = &records[1].changed_locals["x"];
    assert_eq!(x.old, Snapshot::Unset);
    assert_eq!(x.new.to_string(), "1");
    assert!(!records[1].jump);
}

#[test]
fn test_call_and_return_resumes_caller() {
    let mut recorder = Recorder::new();
    let recording = fixtures::call_and_return()
        .record(&mut recorder, TARGET)
        .unwrap();
    assert!(!recorder.is_attached());

    let kinds: Vec<_> = recording.events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::Call,
            EventKind::Line,
            EventKind::Line,
            EventKind::Line,
            EventKind::Call,
            EventKind::Line,
            EventKind::Return,
            EventKind::Line,
            EventKind::Return,
        ]
    );

    let records = Narrator::narrate(&recording).into_result().unwrap();

    let entry = &records[4];
    assert_eq!(entry.transition, Transition::Entered("f".to_string()));
    assert_eq!(entry.depth, 1);

    let exit = &records[6];
    assert_eq!(exit.transition, Transition::Returned(Snapshot::none()));
    assert!(exit.changed_locals["y"].is_introduced());

    // Back in the module, compared with the state at the call site.
    let resumed = &records[7];
    assert_eq!(resumed.scope, "<module>");
    assert_eq!(resumed.depth, 0);
    assert!(resumed.changed_locals.is_empty());
    assert!(!resumed.jump);
}

#[test]
fn test_rendered_narrative_survives_storage() {
    let ws = Workspace::new();
    let store = FlightStore::new(ws.recordings_dir());

    let mut recorder = Recorder::new();
    let recording = fixtures::call_and_return()
        .record(&mut recorder, TARGET)
        .unwrap();
    let saved = store.save(&recording, Some("call-and-return")).unwrap();
    let loaded = FlightStore::load(&saved.path).unwrap();
    assert_eq!(loaded, recording);

    let text = render(&Narrator::narrate(&loaded));
    insta::assert_snapshot!(text.trim_end(), @r"
<module>:0 [call]
<module>:1 [line]
<module>:2 [line] | x = 1
<module>:3 [line]
  f:5 [call] -> entered f
  f:6 [line] | &x = 1
  f:6 [return] (jump) <- returned None | y = 2
<module>:4 [line]
<module>:4 [return] (jump) <- returned None
");
}

#[test]
fn test_foreign_call_is_recorded_but_not_stepped() {
    let mut recorder = Recorder::new();
    let recording = fixtures::foreign_call()
        .record(&mut recorder, TARGET)
        .unwrap();

    assert!(recording
        .events
        .iter()
        .all(|e| e.kind == EventKind::Call || e.scope != "sleep"));

    let text = render(&Narrator::narrate(&recording));
    insta::assert_snapshot!(text.trim_end(), @r"
<module>:0 [call]
<module>:1 [line] | n = 0
  sleep:10 [call] -> entered sleep
    tick:8 [call] -> entered tick
    tick:9 [line]
    tick:9 [return] (jump) <- returned None
<module>:2 [line] | n: 0 -> 1
");
}

#[test]
fn test_sequence_indices_are_contiguous() {
    let mut recorder = Recorder::new();
    let recording = fixtures::call_and_return()
        .record(&mut recorder, TARGET)
        .unwrap();

    for (i, event) in recording.events.iter().enumerate() {
        assert_eq!(event.sequence_index, i as u64);
    }
    assert!(recording
        .events
        .windows(2)
        .all(|w| w[0].elapsed_us <= w[1].elapsed_us));
}

#[test]
fn test_second_attach_is_rejected() {
    let mut recorder = Recorder::new();
    let handle = recorder.attach(TARGET).unwrap();

    let err = fixtures::call_and_return()
        .record(&mut recorder, "other")
        .unwrap_err();
    assert_eq!(err.active, TARGET);

    let recording = recorder.detach(handle);
    assert!(recording.is_empty());
}

#[test]
fn test_configured_suffix_selects_traced_unit() {
    let ws = Workspace::new();
    let config_file = ws.data_dir().join("config.toml");
    std::fs::create_dir_all(ws.data_dir()).unwrap();
    std::fs::write(&config_file, "[trace]\nsource_suffix = \".rb\"\n").unwrap();
    let config = Config::load_from(&config_file);

    let script = MockFrame::new("lib/demo.rb", "<main>", 0);
    let helper = MockFrame::new("lib/demo.py", "helper", 3);
    let program = MockProgram::new()
        .call(script.clone())
        .line(script.at(1).local("a", 1i64))
        .call(helper.clone())
        .line(helper.at(4))
        .ret(helper.at(4), Snapshot::none())
        .line(script.at(2).local("a", 1i64));

    let mut recorder = Recorder::new();
    let recording = program
        .record_with(&mut recorder, config.target_filter(TARGET))
        .unwrap();

    let summary: Vec<_> = recording
        .events
        .iter()
        .map(|e| (e.kind, e.scope.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (EventKind::Call, "<main>"),
            (EventKind::Line, "<main>"),
            (EventKind::Call, "helper"),
            (EventKind::Line, "<main>"),
        ]
    );
}
