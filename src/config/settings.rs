use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use toml_edit::{DocumentMut, Item, Table};

use crate::store::DEFAULT_TIMESTAMP_FORMAT;
use crate::trace::{TargetFilter, DEFAULT_SOURCE_SUFFIX};
use crate::util::paths::config_path;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Recordings root, relative to the working directory unless configured
pub const DEFAULT_RECORDINGS_DIR: &str = "flight-recordings";

/// Sibling directory that receives line-by-line logs
pub const DEFAULT_NARRATIVE_DIR: &str = "linebyline";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding `.fb` recordings
    pub recordings_dir: PathBuf,
    /// Name of the directory, next to `recordings_dir`, for narrative logs
    pub narrative_dir_name: String,
    /// Suffix appended to a module name to form the target filter
    pub source_suffix: String,
    /// chrono format used for generated recording names
    pub timestamp_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recordings_dir: PathBuf::from(DEFAULT_RECORDINGS_DIR),
            narrative_dir_name: DEFAULT_NARRATIVE_DIR.to_string(),
            source_suffix: DEFAULT_SOURCE_SUFFIX.to_string(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlRecordingsConfig {
    pub dir: Option<PathBuf>,
    pub timestamp_format: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlTraceConfig {
    pub source_suffix: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlNarrateConfig {
    pub dir_name: Option<String>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub recordings: Option<TomlRecordingsConfig>,
    pub trace: Option<TomlTraceConfig>,
    pub narrate: Option<TomlNarrateConfig>,
}

impl Config {
    /// Load configuration from the data directory, merging with defaults
    pub fn load() -> Self {
        let config_file = config_path();

        // Create example config on first run
        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        Self::load_from(&config_file)
    }

    /// Load configuration from `path` without touching the filesystem
    /// otherwise. Missing or unparseable files yield the defaults.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Config::default();

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return config,
        };

        match toml::from_str::<TomlConfig>(&contents) {
            Ok(toml_config) => config.merge(toml_config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
            }
        }

        config
    }

    /// Overlay every value present in `toml_config`
    pub fn merge(&mut self, toml_config: TomlConfig) {
        if let Some(recordings) = toml_config.recordings {
            if let Some(dir) = recordings.dir {
                self.recordings_dir = dir;
            }
            if let Some(format) = recordings.timestamp_format {
                self.timestamp_format = format;
            }
        }

        if let Some(trace) = toml_config.trace {
            if let Some(suffix) = trace.source_suffix {
                self.source_suffix = suffix;
            }
        }

        if let Some(narrate) = toml_config.narrate {
            if let Some(dir_name) = narrate.dir_name {
                self.narrative_dir_name = dir_name;
            }
        }
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(error = %e, "Failed to create config directory");
                    return;
                }
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            tracing::warn!(error = %e, "Failed to write default config");
        }
    }

    pub fn with_recordings_dir(mut self, dir: PathBuf) -> Self {
        self.recordings_dir = dir;
        self
    }

    /// Target filter for `module` using the configured suffix
    pub fn target_filter(&self, module: &str) -> TargetFilter {
        TargetFilter::with_suffix(module, &self.source_suffix)
    }
}

/// Save the recordings directory to the config file
///
/// Reads the existing config.toml, sets `dir` in the [recordings] section
/// and writes it back while preserving all other content.
pub fn save_recordings_dir(dir: &Path) -> std::io::Result<()> {
    save_recordings_dir_to(&config_path(), dir)
}

pub fn save_recordings_dir_to(config_file: &Path, dir: &Path) -> std::io::Result<()> {
    // Read existing config or start with empty document
    let contents = if config_file.exists() {
        fs::read_to_string(config_file)?
    } else {
        String::new()
    };

    let mut doc: DocumentMut = contents
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    // Ensure [recordings] section exists
    if !doc.contains_key("recordings") {
        doc["recordings"] = Item::Table(Table::new());
    }

    let dir_str = dir.to_string_lossy().to_string();
    doc["recordings"]["dir"] = toml_edit::value(dir_str);

    if let Some(parent) = config_file.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(config_file, doc.to_string())?;

    Ok(())
}
