use std::io::{self, BufRead, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::trace::event::Event;

pub const RECORDING_SCHEMA_VERSION: u32 = 1;

/// File extension of flight recordings, without the dot.
pub const RECORDING_EXTENSION: &str = "fb";

/// Why a byte stream is not a flight recording.
#[derive(Error, Debug)]
pub enum RecordingFormatError {
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("missing recording header")]
    MissingHeader,
    #[error("line {line}: header must be the first line")]
    MisplacedHeader { line: usize },
    #[error("unsupported schema_version {found} (max supported: {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },
    #[error("event {position} has sequence_index {found}")]
    NonContiguous { position: usize, found: u64 },
}

/// One traced run: an ordered, immutable sequence of events.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightRecording {
    pub created_at: DateTime<Utc>,
    /// Module name the session was attached to.
    pub target: String,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RecordingLine {
    Header {
        schema_version: u32,
        created_at: DateTime<Utc>,
        target: String,
    },
    Event {
        event: Event,
    },
}

impl FlightRecording {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            created_at: Utc::now(),
            target: target.into(),
            events: Vec::new(),
        }
    }

    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events = events;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Serialize as one JSON header line followed by one line per event.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let header = RecordingLine::Header {
            schema_version: RECORDING_SCHEMA_VERSION,
            created_at: self.created_at,
            target: self.target.clone(),
        };
        writeln!(
            writer,
            "{}",
            serde_json::to_string(&header).map_err(io::Error::other)?
        )?;
        for event in &self.events {
            let line = RecordingLine::Event {
                event: event.clone(),
            };
            writeln!(
                writer,
                "{}",
                serde_json::to_string(&line).map_err(io::Error::other)?
            )?;
        }
        writer.flush()
    }

    pub fn read_from<R: BufRead>(reader: R) -> Result<Self, RecordingFormatError> {
        let mut header: Option<(DateTime<Utc>, String)> = None;
        let mut events = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: RecordingLine =
                serde_json::from_str(&line).map_err(|source| RecordingFormatError::Json {
                    line: idx + 1,
                    source,
                })?;
            match parsed {
                RecordingLine::Header {
                    schema_version,
                    created_at,
                    target,
                } => {
                    if header.is_some() || !events.is_empty() {
                        return Err(RecordingFormatError::MisplacedHeader { line: idx + 1 });
                    }
                    if schema_version > RECORDING_SCHEMA_VERSION {
                        return Err(RecordingFormatError::UnsupportedSchema {
                            found: schema_version,
                            supported: RECORDING_SCHEMA_VERSION,
                        });
                    }
                    header = Some((created_at, target));
                }
                RecordingLine::Event { event } => {
                    if header.is_none() {
                        return Err(RecordingFormatError::MissingHeader);
                    }
                    if event.sequence_index != events.len() as u64 {
                        return Err(RecordingFormatError::NonContiguous {
                            position: events.len(),
                            found: event.sequence_index,
                        });
                    }
                    events.push(event);
                }
            }
        }

        let (created_at, target) = header.ok_or(RecordingFormatError::MissingHeader)?;
        Ok(Self {
            created_at,
            target,
            events,
        })
    }
}
