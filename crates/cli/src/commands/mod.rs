pub mod doctor;
pub mod redact;
pub mod serve;
pub mod status;

use std::path::{Path, PathBuf};

use assistline_config::{AppConfig, ConfigError};

/// The config file a command reads: `--config` or the default location.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    AppConfig::load_from(&config_path(explicit))
}
