use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Service configuration, read from a TOML file at startup.
///
/// This is deliberately small: the listening-port set is derived entirely
/// from the telemetry schema, not from here.
#[derive(Deserialize, Debug)]
pub struct ScoriaConfig {
    /// Directory the ring files live in.
    #[serde(default = "defaults::shm_dir")]
    pub shm_dir: PathBuf,
    /// Path of the telemetry schema YAML published over the config channel.
    pub telemetry_config: PathBuf,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    use std::path::PathBuf;

    pub fn shm_dir() -> PathBuf {
        "/dev/shm".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

impl ScoriaConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        let config: ScoriaConfig = toml::from_str(&text)?;
        Ok(config)
    }
}
