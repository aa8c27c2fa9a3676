use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::trace::event::{EventKind, Snapshot};

/// How control moved at a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Transition {
    None,
    /// Execution entered the named scope.
    Entered(String),
    Returned(Snapshot),
    Raised(Snapshot),
}

/// Before and after values of one name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub old: Snapshot,
    pub new: Snapshot,
}

impl Change {
    /// The name had no value before this step.
    pub fn is_introduced(&self) -> bool {
        self.old.is_unset()
    }
}

pub type Changes = BTreeMap<String, Change>;

/// One step of the narrative, diffed against the previous step of the same
/// scope activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeRecord {
    /// Index of the event this record was derived from.
    pub sequence_index: u64,
    pub kind: EventKind,
    pub scope: String,
    pub line_no: u32,
    /// Number of enclosing activations below this one.
    pub depth: usize,
    pub transition: Transition,
    pub changed_locals: Changes,
    pub changed_references: Changes,
    /// The line did not directly follow the previous one in this scope.
    pub jump: bool,
}

impl NarrativeRecord {
    pub fn has_changes(&self) -> bool {
        !self.changed_locals.is_empty() || !self.changed_references.is_empty()
    }
}

impl fmt::Display for NarrativeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.depth {
            f.write_str("  ")?;
        }
        write!(f, "{}:{} [{}]", self.scope, self.line_no, self.kind)?;
        if self.jump {
            f.write_str(" (jump)")?;
        }

        match &self.transition {
            Transition::None => {}
            Transition::Entered(scope) => write!(f, " -> entered {scope}")?,
            Transition::Returned(value) => write!(f, " <- returned {value}")?,
            Transition::Raised(value) => write!(f, " !! raised {value}")?,
        }

        for (name, change) in &self.changed_locals {
            write_change(f, "", name, change)?;
        }
        for (name, change) in &self.changed_references {
            write_change(f, "&", name, change)?;
        }
        Ok(())
    }
}

fn write_change(f: &mut fmt::Formatter<'_>, sigil: &str, name: &str, change: &Change) -> fmt::Result {
    if change.is_introduced() {
        write!(f, " | {sigil}{name} = {}", change.new)
    } else {
        write!(f, " | {sigil}{name}: {} -> {}", change.old, change.new)
    }
}
