//! Scripted host for driving the recorder without a real runtime.
//!
//! [`MockFrame`] stands in for a host call frame and [`MockProgram`] replays
//! a script of host steps through a [`Recorder`] the way a runtime's step
//! hook would: the outer hook on each call, the inner hook for the steps of
//! observed calls, and no further delivery once the inner hook answers
//! [`HookResponse::Stop`].

use std::collections::BTreeMap;

use super::event::Snapshot;
use super::filter::TargetFilter;
use super::frame::{Frame, HostValue, UnprintableValue};
use super::recorder::{AttachError, HookResponse, Recorder, StepKind, StepObserver};
use crate::store::FlightRecording;

/// A fake call frame with explicit names and values.
#[derive(Debug, Clone, PartialEq)]
pub struct MockFrame {
    location: String,
    scope: String,
    line_no: u32,
    local_names: Vec<String>,
    referenced_names: Vec<String>,
    values: BTreeMap<String, Result<Snapshot, UnprintableValue>>,
}

impl MockFrame {
    pub fn new(location: impl Into<String>, scope: impl Into<String>, line_no: u32) -> Self {
        Self {
            location: location.into(),
            scope: scope.into(),
            line_no,
            local_names: Vec::new(),
            referenced_names: Vec::new(),
            values: BTreeMap::new(),
        }
    }

    /// Same frame, moved to another line.
    pub fn at(&self, line_no: u32) -> Self {
        Self {
            line_no,
            ..self.clone()
        }
    }

    /// Declare a local bound to `value`, or rebind an existing one.
    pub fn local(mut self, name: &str, value: impl Into<Snapshot>) -> Self {
        push_name(&mut self.local_names, name);
        self.values.insert(name.to_string(), Ok(value.into()));
        self
    }

    /// Declare a local that has no value yet.
    pub fn unbound_local(mut self, name: &str) -> Self {
        push_name(&mut self.local_names, name);
        self.values.remove(name);
        self
    }

    /// Declare a local whose value fails to render.
    pub fn unprintable_local(mut self, name: &str, reason: &str) -> Self {
        push_name(&mut self.local_names, name);
        self.values
            .insert(name.to_string(), Err(UnprintableValue::new(reason)));
        self
    }

    /// Declare a referenced name bound to `value`.
    pub fn reference(mut self, name: &str, value: impl Into<Snapshot>) -> Self {
        push_name(&mut self.referenced_names, name);
        self.values.insert(name.to_string(), Ok(value.into()));
        self
    }

    /// Declare a referenced name that is not resolvable yet.
    pub fn unbound_reference(mut self, name: &str) -> Self {
        push_name(&mut self.referenced_names, name);
        self
    }
}

fn push_name(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

impl Frame for MockFrame {
    fn location(&self) -> &str {
        &self.location
    }

    fn scope(&self) -> &str {
        &self.scope
    }

    fn line_no(&self) -> u32 {
        self.line_no
    }

    fn local_names(&self) -> &[String] {
        &self.local_names
    }

    fn referenced_names(&self) -> &[String] {
        &self.referenced_names
    }

    fn lookup(&self, name: &str) -> Option<&dyn HostValue> {
        self.values.get(name).map(|v| v as &dyn HostValue)
    }
}

#[derive(Debug, Clone)]
struct ScriptStep {
    kind: StepKind,
    frame: MockFrame,
    arg: Option<Snapshot>,
}

/// A script of host steps, in execution order.
#[derive(Debug, Clone, Default)]
pub struct MockProgram {
    steps: Vec<ScriptStep>,
}

impl MockProgram {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, kind: StepKind, frame: MockFrame, arg: Option<Snapshot>) -> Self {
        self.steps.push(ScriptStep { kind, frame, arg });
        self
    }

    /// A new call activation starts in `frame`.
    pub fn call(self, frame: MockFrame) -> Self {
        self.push(StepKind::Call, frame, None)
    }

    pub fn call_with(self, frame: MockFrame, arg: impl Into<Snapshot>) -> Self {
        self.push(StepKind::Call, frame, Some(arg.into()))
    }

    pub fn line(self, frame: MockFrame) -> Self {
        self.push(StepKind::Line, frame, None)
    }

    /// The innermost activation returns `value` and ends.
    pub fn ret(self, frame: MockFrame, value: impl Into<Snapshot>) -> Self {
        self.push(StepKind::Return, frame, Some(value.into()))
    }

    pub fn raise(self, frame: MockFrame, value: impl Into<Snapshot>) -> Self {
        self.push(StepKind::Exception, frame, Some(value.into()))
    }

    /// Any other host step kind, such as per-opcode events.
    pub fn step(self, kind: StepKind, frame: MockFrame) -> Self {
        self.push(kind, frame, None)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Deliver every step to `recorder` as a host runtime would.
    pub fn run(&self, recorder: &mut Recorder) {
        // One slot per live activation; `None` once the activation is no
        // longer observed.
        let mut activations: Vec<Option<StepObserver>> = Vec::new();

        for step in &self.steps {
            let arg = step.arg.as_ref().map(|a| a as &dyn HostValue);
            if step.kind == StepKind::Call {
                activations.push(recorder.on_call(&step.frame, arg));
                continue;
            }

            if let Some(slot) = activations.last_mut() {
                if let Some(observer) = *slot {
                    let response = recorder.on_step(observer, step.kind, &step.frame, arg);
                    if response == HookResponse::Stop {
                        *slot = None;
                    }
                }
            }

            if step.kind == StepKind::Return {
                activations.pop();
            }
        }
    }

    /// Attach, run to completion and detach, as an external launcher does.
    pub fn record(
        &self,
        recorder: &mut Recorder,
        target: &str,
    ) -> Result<FlightRecording, AttachError> {
        self.record_with(recorder, TargetFilter::new(target))
    }

    /// Same as [`record`](Self::record) with an explicit filter, usually
    /// [`Config::target_filter`](crate::config::Config::target_filter).
    pub fn record_with(
        &self,
        recorder: &mut Recorder,
        filter: TargetFilter,
    ) -> Result<FlightRecording, AttachError> {
        let handle = recorder.attach_with(filter)?;
        self.run(recorder);
        Ok(recorder.detach(handle))
    }
}
