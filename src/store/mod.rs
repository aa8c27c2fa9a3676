//! Durable flight recordings.
//!
//! A [`FlightStore`] manages one directory of `.fb` files. Saving never
//! overwrites an existing file: a taken name falls back to a timestamped one,
//! and the file is linked into place only once it is fully written.

pub mod recording;

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

use chrono::Local;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::Config;

pub use recording::{
    FlightRecording, RecordingFormatError, RECORDING_EXTENSION, RECORDING_SCHEMA_VERSION,
};

/// Second-precision timestamp used for generated recording names.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%y-%m-%dT%H-%M-%S";

/// Marker that starts an index reference such as `~0`.
pub const INDEX_MARKER: char = '~';

/// Upper bound on `-N` suffixes tried when timestamped names are taken.
const MAX_NAME_ATTEMPTS: usize = 1000;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No recording found at {0}")]
    NotFound(PathBuf),
    #[error("Not a flight recording: {path}: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },
    #[error("No recordings in {0}")]
    NoRecordings(PathBuf),
    #[error("Recording index ~{index} out of range ({available} available)")]
    IndexOutOfRange { index: usize, available: usize },
    #[error("Invalid recording reference: {0}")]
    InvalidReference(String),
    #[error("Refusing to overwrite existing file: {0}")]
    OutputExists(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// How a caller names a recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingRef {
    /// Position in the most-recent-first listing, `~0` being the latest.
    Index(usize),
    /// A literal path to a `.fb` file.
    Path(PathBuf),
}

impl FromStr for RecordingRef {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix(INDEX_MARKER) {
            Some(index) => index
                .parse::<usize>()
                .map(RecordingRef::Index)
                .map_err(|_| StoreError::InvalidReference(s.to_string())),
            None if s.is_empty() => Err(StoreError::InvalidReference(s.to_string())),
            None => Ok(RecordingRef::Path(PathBuf::from(s))),
        }
    }
}

/// Where a save landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedRecording {
    pub path: PathBuf,
    /// The requested path, when it was already taken and left untouched.
    pub collided_with: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct FlightStore {
    dir: PathBuf,
    timestamp_format: String,
}

impl FlightStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.recordings_dir.clone()).with_timestamp_format(&config.timestamp_format)
    }

    pub fn with_timestamp_format(mut self, format: &str) -> Self {
        self.timestamp_format = format.to_string();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `recording` in the managed directory.
    ///
    /// Without `name_hint` the file is named after the current time. A hint
    /// gets the `.fb` extension appended unless it already has it. If the
    /// resolved path exists the timestamped name is used instead; should
    /// that be taken too, `-1`, `-2`, … are appended. A hint must be a plain
    /// file name; anything that would leave the directory is rejected with
    /// [`StoreError::InvalidReference`].
    pub fn save(
        &self,
        recording: &FlightRecording,
        name_hint: Option<&str>,
    ) -> Result<SavedRecording, StoreError> {
        if let Some(hint) = name_hint {
            check_name_hint(hint)?;
        }
        fs::create_dir_all(&self.dir)?;

        let stamp = self.timestamp();
        let default_path = self.dir.join(format!("{stamp}.{RECORDING_EXTENSION}"));
        let requested = match name_hint {
            None => default_path.clone(),
            Some(hint) if has_recording_extension(Path::new(hint)) => self.dir.join(hint),
            Some(hint) => self.dir.join(format!("{hint}.{RECORDING_EXTENSION}")),
        };

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            recording.write_to(&mut writer)?;
        }
        tmp.as_file().sync_all()?;

        let fallbacks = std::iter::once(default_path.clone()).chain(
            (1..MAX_NAME_ATTEMPTS)
                .map(|n| self.dir.join(format!("{stamp}-{n}.{RECORDING_EXTENSION}"))),
        );
        let candidates = std::iter::once(requested.clone())
            .chain(fallbacks.filter(|p| *p != requested));

        let mut collided_with: Option<PathBuf> = None;
        for candidate in candidates {
            match tmp.persist_noclobber(&candidate) {
                Ok(_) => {
                    if let Some(taken) = &collided_with {
                        tracing::warn!(
                            requested = %taken.display(),
                            path = %candidate.display(),
                            "recording path already exists, saved under a different name"
                        );
                    }
                    tracing::info!(
                        path = %candidate.display(),
                        events = recording.events.len(),
                        "saved flight recording"
                    );
                    return Ok(SavedRecording {
                        path: candidate,
                        collided_with,
                    });
                }
                Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                    if collided_with.is_none() {
                        collided_with = Some(candidate);
                    }
                    tmp = err.file;
                }
                Err(err) => return Err(StoreError::Io(err.error)),
            }
        }

        Err(StoreError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free recording name for {}", requested.display()),
        )))
    }

    /// Read a recording back.
    pub fn load(path: &Path) -> Result<FlightRecording, StoreError> {
        if !path.is_file() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }
        if !has_recording_extension(path) {
            return Err(StoreError::InvalidFormat {
                path: path.to_path_buf(),
                reason: format!("expected a .{RECORDING_EXTENSION} file"),
            });
        }

        let file = File::open(path)?;
        FlightRecording::read_from(BufReader::new(file)).map_err(|err| match err {
            RecordingFormatError::Io(source) if source.kind() != io::ErrorKind::InvalidData => {
                StoreError::Io(source)
            }
            other => StoreError::InvalidFormat {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })
    }

    /// Recordings in the managed directory, most recently modified first.
    pub fn list(&self) -> Result<Vec<PathBuf>, StoreError> {
        list_recordings(&self.dir)
    }

    /// Turn a caller's reference into a path. `None` means the latest.
    pub fn resolve(&self, reference: Option<&str>) -> Result<PathBuf, StoreError> {
        let Some(reference) = reference else {
            return self
                .list()?
                .into_iter()
                .next()
                .ok_or_else(|| StoreError::NoRecordings(self.dir.clone()));
        };

        match reference.parse::<RecordingRef>()? {
            RecordingRef::Index(index) => {
                let paths = self.list()?;
                let available = paths.len();
                paths
                    .into_iter()
                    .nth(index)
                    .ok_or(StoreError::IndexOutOfRange { index, available })
            }
            RecordingRef::Path(path) => {
                if !path.is_file() {
                    return Err(StoreError::NotFound(path));
                }
                if !has_recording_extension(&path) {
                    return Err(StoreError::InvalidFormat {
                        reason: format!("expected a .{RECORDING_EXTENSION} file"),
                        path,
                    });
                }
                Ok(path)
            }
        }
    }

    fn timestamp(&self) -> String {
        let now = Local::now();
        let mut stamp = String::new();
        if write!(stamp, "{}", now.format(&self.timestamp_format)).is_err() {
            tracing::warn!(
                format = %self.timestamp_format,
                "invalid timestamp format, using default"
            );
            stamp = now.format(DEFAULT_TIMESTAMP_FORMAT).to_string();
        }
        stamp
    }
}

/// `.fb` files in `dir`, most recently modified first.
///
/// Rescans the directory on every call. Only the extension is checked, not
/// the contents.
pub fn list_recordings(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound(dir.to_path_buf()))
        }
        Err(err) => return Err(err.into()),
    };

    let mut found: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !has_recording_extension(&path) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        found.push((modified, path));
    }

    found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    Ok(found.into_iter().map(|(_, path)| path).collect())
}

/// A name hint is a single normal path component.
fn check_name_hint(hint: &str) -> Result<(), StoreError> {
    let mut components = Path::new(hint).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(StoreError::InvalidReference(hint.to_string())),
    }
}

fn has_recording_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == RECORDING_EXTENSION)
}
