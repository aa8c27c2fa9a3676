//! Decides whether an executing location belongs to the traced unit.

/// Suffix appended to a bare module name when none is configured.
pub const DEFAULT_SOURCE_SUFFIX: &str = ".py";

/// Substring match of `<module><suffix>` against a host location.
///
/// Hosts may report absolute paths while callers pass a bare module name, so
/// matching is containment rather than equality. A location that merely ends
/// with the same file name in another directory (`vendor/demo.py` when
/// tracing `demo`) is therefore also accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFilter {
    target: String,
    needle: String,
}

impl TargetFilter {
    /// Filter for `target` using [`DEFAULT_SOURCE_SUFFIX`].
    pub fn new(target: impl Into<String>) -> Self {
        Self::with_suffix(target, DEFAULT_SOURCE_SUFFIX)
    }

    pub fn with_suffix(target: impl Into<String>, suffix: &str) -> Self {
        let target = target.into();
        let needle = format!("{target}{suffix}");
        Self { target, needle }
    }

    /// The module name this filter was built for.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The identifier searched for in each location.
    pub fn needle(&self) -> &str {
        &self.needle
    }

    /// Runs once per executed step of the whole process; must not allocate.
    #[inline]
    pub fn is_target(&self, location: &str) -> bool {
        location.len() >= self.needle.len() && location.contains(self.needle.as_str())
    }
}
