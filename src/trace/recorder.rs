//! The step-hook recorder.
//!
//! The host owns one [`Recorder`] per traced program and forwards its hook
//! callbacks into it:
//!
//! - [`Recorder::on_call`] is the outer hook, invoked once per new call.
//!   It records a `Call` event for every call in the process and, when the
//!   call belongs to the traced unit, hands back a [`StepObserver`].
//! - [`Recorder::on_step`] is the inner hook. The host keeps invoking it with
//!   the observer for every later step of that call, until it answers
//!   [`HookResponse::Stop`] or the call exits.
//!
//! All state lives in the session attached to the recorder; nothing is
//! process-wide.

use std::time::Instant;

use chrono::Utc;
use thiserror::Error;

use super::event::{Event, EventKind};
use super::filter::TargetFilter;
use super::frame::{Frame, HostValue};
use crate::store::FlightRecording;

/// A session is already attached to this recorder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("recorder already attached to target '{active}'")]
pub struct AttachError {
    pub active: String,
}

/// Step kinds as reported by the host.
///
/// Only the first four are recorded. The rest are low-level sub-events
/// (per-opcode steps, native calls) that the inner hook declines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Call,
    Line,
    Return,
    Exception,
    Opcode,
    NativeCall,
    NativeReturn,
    NativeException,
}

impl StepKind {
    fn event_kind(self) -> Option<EventKind> {
        match self {
            StepKind::Call => Some(EventKind::Call),
            StepKind::Line => Some(EventKind::Line),
            StepKind::Return => Some(EventKind::Return),
            StepKind::Exception => Some(EventKind::Exception),
            StepKind::Opcode
            | StepKind::NativeCall
            | StepKind::NativeReturn
            | StepKind::NativeException => None,
        }
    }
}

/// Answer from the inner hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookResponse {
    /// Keep delivering steps of this call.
    Continue,
    /// Stop observing this call.
    Stop,
}

/// Proof of a live session, returned by [`Recorder::attach`].
#[derive(Debug)]
#[must_use = "a session can only be detached with its handle"]
pub struct RecorderHandle {
    session: u64,
}

/// Capability to observe the steps of one call activation.
///
/// Handed out by the outer hook for calls in the traced unit. Once its
/// session is detached the inner hook answers [`HookResponse::Stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepObserver {
    session: u64,
}

#[derive(Debug)]
struct Session {
    id: u64,
    filter: TargetFilter,
    started: Instant,
    created_at: chrono::DateTime<Utc>,
    log: Vec<Event>,
}

impl Session {
    fn record<F: Frame + ?Sized>(
        &mut self,
        kind: EventKind,
        frame: &F,
        arg: Option<&dyn HostValue>,
    ) {
        let sequence_index = self.log.len() as u64;
        let elapsed_us = self.started.elapsed().as_micros() as u64;
        let event = Event::capture(sequence_index, kind, frame, arg, elapsed_us);
        tracing::trace!(
            seq = sequence_index,
            kind = %kind,
            scope = %event.scope,
            line = event.line_no,
            "captured step"
        );
        self.log.push(event);
    }
}

/// Records steps of a traced program into an ordered event log.
#[derive(Debug, Default)]
pub struct Recorder {
    session: Option<Session>,
    next_session: u64,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_attached(&self) -> bool {
        self.session.is_some()
    }

    /// Number of events captured by the live session so far.
    pub fn captured(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.log.len())
    }

    /// Begin a session tracing `target` with the default source suffix.
    pub fn attach(&mut self, target: &str) -> Result<RecorderHandle, AttachError> {
        self.attach_with(TargetFilter::new(target))
    }

    /// Begin a session with an explicit filter.
    ///
    /// Launchers that honour the user's config attach with
    /// `recorder.attach_with(config.target_filter(module))`.
    pub fn attach_with(&mut self, filter: TargetFilter) -> Result<RecorderHandle, AttachError> {
        if let Some(active) = &self.session {
            return Err(AttachError {
                active: active.filter.target().to_string(),
            });
        }

        let id = self.next_session;
        self.next_session += 1;
        tracing::debug!(session = id, target = %filter.target(), "recorder attached");

        self.session = Some(Session {
            id,
            filter,
            started: Instant::now(),
            created_at: Utc::now(),
            log: Vec::new(),
        });
        Ok(RecorderHandle { session: id })
    }

    /// Outer hook: a new call has started somewhere in the process.
    ///
    /// Every call is recorded so cross-unit boundaries stay visible. Only
    /// calls inside the traced unit get an observer for their later steps.
    pub fn on_call<F: Frame + ?Sized>(
        &mut self,
        frame: &F,
        arg: Option<&dyn HostValue>,
    ) -> Option<StepObserver> {
        let session = self.session.as_mut()?;
        session.record(EventKind::Call, frame, arg);

        session
            .filter
            .is_target(frame.location())
            .then_some(StepObserver { session: session.id })
    }

    /// Inner hook: one step inside an observed call.
    pub fn on_step<F: Frame + ?Sized>(
        &mut self,
        observer: StepObserver,
        kind: StepKind,
        frame: &F,
        arg: Option<&dyn HostValue>,
    ) -> HookResponse {
        let Some(session) = self.session.as_mut() else {
            return HookResponse::Stop;
        };
        if session.id != observer.session || !session.filter.is_target(frame.location()) {
            return HookResponse::Stop;
        }
        let Some(kind) = kind.event_kind() else {
            return HookResponse::Stop;
        };

        session.record(kind, frame, arg);
        HookResponse::Continue
    }

    /// End the session and hand over everything captured so far.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was not issued by this recorder for the live
    /// session. That is a broken caller contract, not a runtime condition.
    pub fn detach(&mut self, handle: RecorderHandle) -> FlightRecording {
        let session = match self.session.take() {
            Some(session) if session.id == handle.session => session,
            Some(session) => {
                let active = session.id;
                self.session = Some(session);
                panic!(
                    "detach called with handle for session {} while session {} is attached",
                    handle.session, active
                );
            }
            None => panic!(
                "detach called with handle for session {} but no session is attached",
                handle.session
            ),
        };

        tracing::debug!(
            session = session.id,
            target = %session.filter.target(),
            events = session.log.len(),
            "recorder detached"
        );

        FlightRecording {
            created_at: session.created_at,
            target: session.filter.target().to_string(),
            events: session.log,
        }
    }
}
