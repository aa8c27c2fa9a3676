//! Capturing execution steps from a host runtime.

pub mod event;
pub mod filter;
pub mod frame;
pub mod mock;
pub mod recorder;

pub use event::{Bindings, Event, EventKind, Scalar, Snapshot, UNPRINTABLE, UNSET};
pub use filter::{TargetFilter, DEFAULT_SOURCE_SUFFIX};
pub use frame::{Frame, HostValue, UnprintableValue};
pub use recorder::{AttachError, HookResponse, Recorder, RecorderHandle, StepKind, StepObserver};
