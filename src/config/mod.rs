mod settings;

pub use settings::{
    save_recordings_dir, save_recordings_dir_to, Config, TomlConfig, DEFAULT_NARRATIVE_DIR,
    DEFAULT_RECORDINGS_DIR, EXAMPLE_CONFIG,
};
