//! Replays a recording into a line-by-line narrative.
//!
//! The narrator walks the events once, front to back, keeping one baseline
//! event per live scope activation. Each event is diffed against the
//! baseline of its own activation, so when a call returns, the caller's next
//! step is compared with where the caller was before the call and not with
//! the callee's last state.

use thiserror::Error;

use super::record::{Change, Changes, NarrativeRecord, Transition};
use crate::store::FlightRecording;
use crate::trace::event::{Bindings, Event, EventKind, Snapshot};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NarrateError {
    #[error("malformed recording at event {sequence_index}: {reason}")]
    MalformedRecording { sequence_index: u64, reason: String },
}

impl NarrateError {
    fn malformed(event: &Event, reason: impl Into<String>) -> Self {
        NarrateError::MalformedRecording {
            sequence_index: event.sequence_index,
            reason: reason.into(),
        }
    }
}

/// A live scope activation and the last event seen in it.
#[derive(Debug, Clone)]
struct Activation {
    baseline: Event,
}

impl Activation {
    fn scope(&self) -> &str {
        &self.baseline.scope
    }
}

/// Stateful diff engine over one pass of events.
#[derive(Debug, Default)]
pub struct Narrator {
    /// `None` before the first event and after the outermost activation
    /// returned.
    current: Option<Activation>,
    /// Suspended callers, innermost last.
    suspended: Vec<Activation>,
    next_index: u64,
    failed: Option<NarrateError>,
}

impl Narrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of suspended callers below the current activation.
    pub fn depth(&self) -> usize {
        self.suspended.len()
    }

    /// Narrate a whole recording.
    pub fn narrate(recording: &FlightRecording) -> Narrative {
        Self::narrate_events(&recording.events)
    }

    pub fn narrate_events<'a, I>(events: I) -> Narrative
    where
        I: IntoIterator<Item = &'a Event>,
    {
        let mut narrator = Narrator::new();
        let mut records = Vec::new();
        for event in events {
            match narrator.step(event) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::debug!(error = %err, records = records.len(), "narrative stopped");
                    return Narrative {
                        records,
                        error: Some(err),
                    };
                }
            }
        }
        Narrative {
            records,
            error: None,
        }
    }

    /// Diff the next event. After the first error every call returns it.
    pub fn step(&mut self, event: &Event) -> Result<NarrativeRecord, NarrateError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        let result = self.advance(event);
        if let Err(err) = &result {
            self.failed = Some(err.clone());
        }
        result
    }

    fn advance(&mut self, event: &Event) -> Result<NarrativeRecord, NarrateError> {
        if event.sequence_index != self.next_index {
            return Err(NarrateError::malformed(
                event,
                format!("expected sequence index {}", self.next_index),
            ));
        }
        self.next_index += 1;

        let Some(current) = self.current.take() else {
            if event.kind == EventKind::Return {
                return Err(NarrateError::malformed(
                    event,
                    format!("return from '{}' with no active call", event.scope),
                ));
            }
            let record = bootstrap(event, Transition::None, self.depth());
            self.current = Some(Activation {
                baseline: event.clone(),
            });
            return Ok(record);
        };

        // Every call opens a new activation, including recursive ones.
        if event.kind == EventKind::Call {
            return Ok(self.enter(current, event));
        }

        if current.scope() == event.scope {
            return Ok(self.continue_in(current, event));
        }

        // Control is back in an enclosing scope without a return for the
        // activations in between: foreign calls that were never observed,
        // or frames unwound by an exception.
        if let Some(pos) = self
            .suspended
            .iter()
            .rposition(|a| a.scope() == event.scope)
        {
            let unwound = self.suspended.len() - pos;
            tracing::trace!(
                seq = event.sequence_index,
                scope = %event.scope,
                unwound,
                "resuming enclosing scope"
            );
            let resumed = self.suspended.remove(pos);
            self.suspended.truncate(pos);
            return Ok(self.continue_in(resumed, event));
        }

        if event.kind == EventKind::Return {
            let active = current.scope().to_string();
            self.current = Some(current);
            return Err(NarrateError::malformed(
                event,
                format!(
                    "return from '{}' does not match active scope '{}'",
                    event.scope, active
                ),
            ));
        }

        Ok(self.enter(current, event))
    }

    fn enter(&mut self, caller: Activation, event: &Event) -> NarrativeRecord {
        self.suspended.push(caller);
        let record = bootstrap(event, Transition::Entered(event.scope.clone()), self.depth());
        self.current = Some(Activation {
            baseline: event.clone(),
        });
        record
    }

    fn continue_in(&mut self, activation: Activation, event: &Event) -> NarrativeRecord {
        let prev = &activation.baseline;
        let record = NarrativeRecord {
            sequence_index: event.sequence_index,
            kind: event.kind,
            scope: event.scope.clone(),
            line_no: event.line_no,
            depth: self.depth(),
            transition: transition_for(event),
            changed_locals: diff(&prev.locals, &event.locals),
            changed_references: diff(&prev.referenced_names, &event.referenced_names),
            jump: prev.line_no.checked_add(1) != Some(event.line_no),
        };

        if event.kind == EventKind::Return {
            // The activation is over; the caller picks up from its own
            // baseline.
            self.current = self.suspended.pop();
        } else {
            self.current = Some(Activation {
                baseline: event.clone(),
            });
        }
        record
    }
}

/// The result of one narration pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Narrative {
    pub records: Vec<NarrativeRecord>,
    /// Why the pass stopped early. `records` then holds everything up to the
    /// offending event.
    pub error: Option<NarrateError>,
}

impl Narrative {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Vec<NarrativeRecord>, NarrateError> {
        match self.error {
            None => Ok(self.records),
            Some(err) => Err(err),
        }
    }
}

fn transition_for(event: &Event) -> Transition {
    let payload = || event.payload.clone().unwrap_or_else(Snapshot::none);
    match event.kind {
        EventKind::Return => Transition::Returned(payload()),
        EventKind::Exception => Transition::Raised(payload()),
        EventKind::Line | EventKind::Call => Transition::None,
    }
}

/// First record of an activation: everything present is new.
fn bootstrap(event: &Event, transition: Transition, depth: usize) -> NarrativeRecord {
    let empty = Bindings::new();
    NarrativeRecord {
        sequence_index: event.sequence_index,
        kind: event.kind,
        scope: event.scope.clone(),
        line_no: event.line_no,
        depth,
        transition,
        changed_locals: diff(&empty, &event.locals),
        changed_references: diff(&empty, &event.referenced_names),
        jump: false,
    }
}

/// Names that are new in `next`, or whose rendering differs from `prev`.
/// Names missing from `next` are not reported.
fn diff(prev: &Bindings, next: &Bindings) -> Changes {
    next.iter()
        .filter_map(|(name, new)| {
            let old = match prev.get(name) {
                Some(old) if old.same_as(new) => return None,
                Some(old) => old.clone(),
                None => Snapshot::Unset,
            };
            Some((
                name.clone(),
                Change {
                    old,
                    new: new.clone(),
                },
            ))
        })
        .collect()
}
