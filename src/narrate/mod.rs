//! Turning recordings back into a readable, step-by-step account.

pub mod linebyline;
pub mod narrator;
pub mod record;

pub use linebyline::{render, LineByLineLog};
pub use narrator::{NarrateError, Narrative, Narrator};
pub use record::{Change, Changes, NarrativeRecord, Transition};
