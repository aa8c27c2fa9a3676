//! Path utilities for the flightbox data directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Global storage for custom data directory path
static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the data directory with an optional custom path.
/// Must be called early in main() before any other path functions are used.
/// If custom_path is None, uses the default ~/.flightbox location.
pub fn init_data_dir(custom_path: Option<PathBuf>) {
    let path = custom_path.unwrap_or_else(default_data_dir);
    // Ignore error if already set (shouldn't happen in normal usage)
    if DATA_DIR.set(path.clone()).is_err() {
        let existing = DATA_DIR
            .get()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        tracing::debug!(
            path = %path.display(),
            existing = %existing,
            "Data directory already initialized"
        );
    }
}

/// Get the default data directory path (~/.flightbox)
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".flightbox"))
        .unwrap_or_else(|| PathBuf::from(".flightbox"))
}

/// Get the base flightbox data directory.
/// Returns the custom path if set via init_data_dir(), otherwise ~/.flightbox
pub fn data_dir() -> PathBuf {
    DATA_DIR.get().cloned().unwrap_or_else(default_data_dir)
}

/// Get the logs directory (~/.flightbox/logs)
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Get the default log file path (~/.flightbox/logs/flightbox.log)
pub fn log_file_path() -> PathBuf {
    logs_dir().join("flightbox.log")
}

/// Get the config file path (~/.flightbox/config.toml)
pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

/// Directory for derived artifacts of the recordings in `recordings_dir`.
///
/// Derived output lives next to the recordings directory, not inside it:
/// `runs/flight-recordings` pairs with `runs/<dir_name>`.
pub fn derived_dir(recordings_dir: &Path, dir_name: &str) -> PathBuf {
    match recordings_dir.parent() {
        Some(parent) => parent.join(dir_name),
        None => PathBuf::from(dir_name),
    }
}
