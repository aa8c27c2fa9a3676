//! The seam between the recorder and the host runtime.
//!
//! A host environment that can attach a step hook to a running program hands
//! the recorder a [`Frame`] for every step. The recorder only ever reads
//! through this trait and never keeps a reference to the host's objects past
//! the callback.

use thiserror::Error;

use super::event::Snapshot;

/// A host value could not be rendered into a [`Snapshot`].
///
/// Never propagated past the capture path: the recorder replaces the value
/// with [`Snapshot::unprintable`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("value cannot be rendered: {reason}")]
pub struct UnprintableValue {
    pub reason: String,
}

impl UnprintableValue {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A live value owned by the traced program.
pub trait HostValue {
    /// Render the value into a detached snapshot.
    fn snapshot(&self) -> Result<Snapshot, UnprintableValue>;
}

impl HostValue for Snapshot {
    fn snapshot(&self) -> Result<Snapshot, UnprintableValue> {
        Ok(self.clone())
    }
}

impl<T: HostValue> HostValue for Result<T, UnprintableValue> {
    fn snapshot(&self) -> Result<Snapshot, UnprintableValue> {
        match self {
            Ok(value) => value.snapshot(),
            Err(err) => Err(err.clone()),
        }
    }
}

/// The host's view of the currently executing call frame.
pub trait Frame {
    /// Opaque identifier of the executing source unit, usually a file path.
    fn location(&self) -> &str;

    /// Name of the executing code unit (function, method or module body).
    fn scope(&self) -> &str;

    /// Current line within the scope.
    fn line_no(&self) -> u32;

    /// Names of the variables owned by this scope.
    fn local_names(&self) -> &[String];

    /// Names referenced from this scope without being owned by it.
    fn referenced_names(&self) -> &[String];

    /// Current value bound to `name`, or `None` while it is unassigned.
    fn lookup(&self, name: &str) -> Option<&dyn HostValue>;
}
