//! Human-readable narrative logs written next to the recordings directory.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::narrator::Narrative;
use crate::store::StoreError;
use crate::util::paths::derived_dir;

pub const NARRATIVE_EXTENSION: &str = "log";

/// Render every record on its own line. An incomplete narrative ends with a
/// line naming the error that stopped it.
pub fn render(narrative: &Narrative) -> String {
    let mut out = String::new();
    for record in &narrative.records {
        out.push_str(&record.to_string());
        out.push('\n');
    }
    if let Some(err) = &narrative.error {
        out.push_str(&format!("!! narrative incomplete: {err}\n"));
    }
    out
}

/// Destination of the narrative log for one recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineByLineLog {
    path: PathBuf,
}

impl LineByLineLog {
    /// `runs/flight-recordings/a.fb` maps to `runs/<dir_name>/a.log`.
    pub fn for_recording(recording: &Path, dir_name: &str) -> Result<Self, StoreError> {
        let stem = recording
            .file_stem()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| StoreError::InvalidFormat {
                path: recording.to_path_buf(),
                reason: "recording path has no file name".to_string(),
            })?;
        let recordings_dir = recording.parent().unwrap_or_else(|| Path::new(""));

        let mut path = derived_dir(recordings_dir, dir_name).join(stem);
        path.set_extension(NARRATIVE_EXTENSION);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write the rendered narrative. Never replaces an existing log.
    pub fn write(&self, narrative: &Narrative) -> Result<&Path, StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StoreError::OutputExists(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(render(narrative).as_bytes())?;
        file.sync_all()?;

        tracing::info!(
            path = %self.path.display(),
            records = narrative.records.len(),
            complete = narrative.is_complete(),
            "Wrote narrative log"
        );
        Ok(&self.path)
    }
}
