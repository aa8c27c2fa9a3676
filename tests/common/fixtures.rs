//! Sample programs and on-disk layouts used across integration tests.

use std::path::PathBuf;

use flightbox::trace::mock::{MockFrame, MockProgram};
use flightbox::{Event, EventKind, FlightRecording, Snapshot};
use tempfile::TempDir;

pub const TARGET: &str = "demo";

/// Module frame of `demo.py`, positioned before its first line.
pub fn module() -> MockFrame {
    MockFrame::new("demo.py", "<module>", 0)
}

/// ```text
/// 1  x = 1   (lines 1-2 assign)
/// 3  f()
/// 4  pass
/// 5  def f():
/// 6      y = x + 1
/// ```
pub fn call_and_return() -> MockProgram {
    let module = module();
    let f = MockFrame::new("demo.py", "f", 5);

    MockProgram::new()
        .call(module.clone())
        .line(module.at(1))
        .line(module.at(2).local("x", 1i64))
        .line(module.at(3).local("x", 1i64))
        .call(f.clone())
        .line(f.at(6).reference("x", 1i64))
        .ret(f.at(6).local("y", 2i64).reference("x", 1i64), Snapshot::none())
        .line(module.at(4).local("x", 1i64))
        .ret(module.at(4).local("x", 1i64), Snapshot::none())
}

/// The module calls into a library outside the traced unit, which then
/// calls back into traced code.
pub fn foreign_call() -> MockProgram {
    let module = module();
    let sleep = MockFrame::new("/usr/lib/python3/time.py", "sleep", 10);
    let tick = MockFrame::new("demo.py", "tick", 8);

    MockProgram::new()
        .call(module.clone())
        .line(module.at(1).local("n", 0i64))
        .call(sleep.clone())
        .line(sleep.at(11))
        .call(tick.clone())
        .line(tick.at(9))
        .ret(tick.at(9), Snapshot::none())
        .ret(sleep.at(11), Snapshot::none())
        .line(module.at(2).local("n", 1i64))
}

/// Two plain module lines, the second assigning `x`.
pub fn two_line_recording() -> FlightRecording {
    FlightRecording::new(TARGET).with_events(vec![
        Event::new(0, EventKind::Line, "<module>", 1),
        Event::new(1, EventKind::Line, "<module>", 2).with_local("x", Snapshot::repr("1")),
    ])
}

/// A scratch tree with an empty `flight-recordings` directory inside.
pub struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        std::fs::create_dir_all(root.path().join("flight-recordings"))
            .expect("Failed to create recordings dir");
        Self { root }
    }

    pub fn recordings_dir(&self) -> PathBuf {
        self.root.path().join("flight-recordings")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.path().join("data")
    }
}
