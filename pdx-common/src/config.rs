//! Configuration loading and directory resolution
//!
//! Resolution priority for every setting: environment variable, then TOML
//! config file, then OS-dependent compiled default.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Environment variable overriding the models directory.
pub const ENV_MODELS_DIR: &str = "PDX_MODELS_DIR";
/// Environment variable overriding the media (report output) directory.
pub const ENV_MEDIA_DIR: &str = "PDX_MEDIA_DIR";
/// Environment variable overriding the bind port.
pub const ENV_PORT: &str = "PDX_PORT";

/// On-disk TOML configuration (`~/.config/pdx/pdx-predict.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Directory holding the scoring artifacts
    pub models_dir: Option<String>,
    /// Directory where generated reports are written
    pub media_dir: Option<String>,
    /// HTTP bind host
    pub host: Option<String>,
    /// HTTP bind port
    pub port: Option<u16>,
}

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub models_dir: PathBuf,
    pub media_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Resolve the full configuration: ENV over TOML over defaults.
    pub fn resolve() -> Self {
        let toml = load_toml_config().unwrap_or_default();

        let models_dir = std::env::var(ENV_MODELS_DIR)
            .ok()
            .map(PathBuf::from)
            .or_else(|| toml.models_dir.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| default_data_dir().join("models"));

        let media_dir = std::env::var(ENV_MEDIA_DIR)
            .ok()
            .map(PathBuf::from)
            .or_else(|| toml.media_dir.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| default_data_dir().join("media"));

        let port = std::env::var(ENV_PORT)
            .ok()
            .and_then(|p| {
                p.parse::<u16>()
                    .map_err(|_| warn!("Ignoring non-numeric {}={}", ENV_PORT, p))
                    .ok()
            })
            .or(toml.port)
            .unwrap_or(5731);

        let host = toml.host.unwrap_or_else(|| "127.0.0.1".to_string());

        Self {
            models_dir,
            media_dir,
            host,
            port,
        }
    }

    /// Create the media directory if missing.
    ///
    /// The models directory is deliberately not created: its absence is a
    /// legal runtime state (all artifacts report "model not found").
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.media_dir).map_err(|e| {
            Error::Config(format!(
                "Failed to create media directory {}: {}",
                self.media_dir.display(),
                e
            ))
        })
    }
}

/// Load the TOML config file, if one exists for the platform.
fn load_toml_config() -> Option<TomlConfig> {
    let path = config_file_path()?;
    if !path.exists() {
        return None;
    }
    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str::<TomlConfig>(&content) {
            Ok(config) => {
                debug!(path = %path.display(), "Loaded TOML config");
                Some(config)
            }
            Err(e) => {
                warn!(path = %path.display(), "Failed to parse TOML config: {}", e);
                None
            }
        },
        Err(e) => {
            warn!(path = %path.display(), "Failed to read TOML config: {}", e);
            None
        }
    }
}

/// Default configuration file path for the platform
fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pdx").join("pdx-predict.toml"))
}

/// OS-dependent default data directory (models and media live under it)
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("pdx"))
        .unwrap_or_else(|| PathBuf::from("./pdx_data"))
}
