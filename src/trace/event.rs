//! The captured shape of one execution step.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::frame::{Frame, HostValue};

/// Rendered in place of any value whose host representation failed.
pub const UNPRINTABLE: &str = "<unprintable>";

/// Rendered for a name that is known to the scope but not yet assigned.
pub const UNSET: &str = "<unset>";

/// Name to snapshot, ordered by name so recordings serialize deterministically.
pub type Bindings = BTreeMap<String, Snapshot>;

/// Primitive values that survive the traced process unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Scalar {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// A detached copy of a host value taken at capture time.
///
/// Snapshots never reference the traced program's objects, so a recording
/// can be replayed long after the process is gone. Non-finite floats are
/// written as their rendering, since JSON has no form for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "value",
    rename_all = "snake_case",
    into = "StoredSnapshot"
)]
pub enum Snapshot {
    /// Name exists in the scope but has no value yet.
    Unset,
    Scalar(Scalar),
    /// Host-rendered representation of a structured value.
    Repr(String),
}

/// Serialized shape of a [`Snapshot`], after [`Snapshot::canonical`].
#[derive(Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
enum StoredSnapshot {
    Unset,
    Scalar(Scalar),
    Repr(String),
}

impl From<Snapshot> for StoredSnapshot {
    fn from(snapshot: Snapshot) -> Self {
        match snapshot.canonical() {
            Snapshot::Unset => StoredSnapshot::Unset,
            Snapshot::Scalar(scalar) => StoredSnapshot::Scalar(scalar),
            Snapshot::Repr(text) => StoredSnapshot::Repr(text),
        }
    }
}

impl Snapshot {
    pub fn none() -> Self {
        Snapshot::Scalar(Scalar::None)
    }

    pub fn repr(text: impl Into<String>) -> Self {
        Snapshot::Repr(text.into())
    }

    pub fn unprintable() -> Self {
        Snapshot::Repr(UNPRINTABLE.to_string())
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Snapshot::Unset)
    }

    /// Whether two snapshots render to the same text.
    ///
    /// This is the equality the narrator diffs with: an `Int(1)` and a
    /// `Repr("1")` are the same observation.
    pub fn same_as(&self, other: &Snapshot) -> bool {
        self == other || self.to_string() == other.to_string()
    }

    /// The form that survives a save and load: non-finite floats become
    /// their rendering.
    pub fn canonical(self) -> Self {
        match self {
            Snapshot::Scalar(Scalar::Float(x)) if !x.is_finite() => Snapshot::Repr(x.to_string()),
            other => other,
        }
    }

    /// Capture a host value, falling back to the unprintable sentinel.
    pub fn capture(value: &dyn HostValue) -> Self {
        match value.snapshot() {
            Ok(snapshot) => snapshot.canonical(),
            Err(err) => {
                tracing::trace!(error = %err, "substituting unprintable value");
                Snapshot::unprintable()
            }
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Snapshot::Unset => f.write_str(UNSET),
            Snapshot::Scalar(Scalar::None) => f.write_str("None"),
            Snapshot::Scalar(Scalar::Bool(b)) => write!(f, "{b}"),
            Snapshot::Scalar(Scalar::Int(i)) => write!(f, "{i}"),
            Snapshot::Scalar(Scalar::Float(x)) => write!(f, "{x}"),
            Snapshot::Scalar(Scalar::Str(s)) => write!(f, "{s:?}"),
            Snapshot::Repr(text) => f.write_str(text),
        }
    }
}

impl From<bool> for Snapshot {
    fn from(value: bool) -> Self {
        Snapshot::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for Snapshot {
    fn from(value: i64) -> Self {
        Snapshot::Scalar(Scalar::Int(value))
    }
}

impl From<f64> for Snapshot {
    fn from(value: f64) -> Self {
        Snapshot::Scalar(Scalar::Float(value)).canonical()
    }
}

impl From<&str> for Snapshot {
    fn from(value: &str) -> Self {
        Snapshot::Scalar(Scalar::Str(value.to_string()))
    }
}

impl From<String> for Snapshot {
    fn from(value: String) -> Self {
        Snapshot::Scalar(Scalar::Str(value))
    }
}

/// What kind of step an [`Event`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Line,
    Call,
    Return,
    Exception,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Line => "line",
            EventKind::Call => "call",
            EventKind::Return => "return",
            EventKind::Exception => "exception",
        }
    }

    /// Whether events of this kind carry a payload.
    pub fn has_payload(&self) -> bool {
        !matches!(self, EventKind::Line)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured execution step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Position within the recording, contiguous from zero.
    pub sequence_index: u64,
    pub kind: EventKind,
    pub scope: String,
    pub line_no: u32,
    #[serde(default)]
    pub locals: Bindings,
    #[serde(default)]
    pub referenced_names: Bindings,
    /// Call argument, return value or exception value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Snapshot>,
    /// Microseconds since the recorder was attached. Informational only.
    #[serde(default)]
    pub elapsed_us: u64,
}

impl Event {
    pub fn new(sequence_index: u64, kind: EventKind, scope: impl Into<String>, line_no: u32) -> Self {
        Self {
            sequence_index,
            kind,
            scope: scope.into(),
            line_no,
            locals: Bindings::new(),
            referenced_names: Bindings::new(),
            payload: kind.has_payload().then(Snapshot::none),
            elapsed_us: 0,
        }
    }

    pub fn with_local(mut self, name: impl Into<String>, value: impl Into<Snapshot>) -> Self {
        self.locals.insert(name.into(), value.into());
        self
    }

    pub fn with_reference(mut self, name: impl Into<String>, value: impl Into<Snapshot>) -> Self {
        self.referenced_names.insert(name.into(), value.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Snapshot>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Build an event from the host's current frame.
    ///
    /// Total: unassigned names become [`Snapshot::Unset`] and values that
    /// fail to render become [`Snapshot::unprintable`]. `payload` is ignored
    /// for [`EventKind::Line`]; for the other kinds a missing payload is
    /// recorded as `None`.
    pub fn capture<F: Frame + ?Sized>(
        sequence_index: u64,
        kind: EventKind,
        frame: &F,
        payload: Option<&dyn HostValue>,
        elapsed_us: u64,
    ) -> Self {
        let payload = if kind.has_payload() {
            Some(payload.map(Snapshot::capture).unwrap_or_else(Snapshot::none))
        } else {
            None
        };

        Self {
            sequence_index,
            kind,
            scope: frame.scope().to_string(),
            line_no: frame.line_no(),
            locals: capture_bindings(frame, frame.local_names()),
            referenced_names: capture_bindings(frame, frame.referenced_names()),
            payload,
            elapsed_us,
        }
    }
}

fn capture_bindings<F: Frame + ?Sized>(frame: &F, names: &[String]) -> Bindings {
    names
        .iter()
        .map(|name| {
            let value = frame
                .lookup(name)
                .map(Snapshot::capture)
                .unwrap_or(Snapshot::Unset);
            (name.clone(), value)
        })
        .collect()
}
