pub mod config;
pub mod narrate;
pub mod store;
pub mod trace;
pub mod util;

pub use config::Config;
pub use narrate::{LineByLineLog, NarrateError, Narrative, NarrativeRecord, Narrator, Transition};
pub use store::{FlightRecording, FlightStore, RecordingRef, SavedRecording, StoreError};
pub use trace::{
    AttachError, Event, EventKind, Frame, HookResponse, HostValue, Recorder, RecorderHandle,
    Snapshot, StepKind, StepObserver, TargetFilter,
};
