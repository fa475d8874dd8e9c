mod schema;

pub use schema::*;

use crate::error::{ConfigError, Result};
use crate::session::UserInfo;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable overriding `server.base_url`
pub const SERVER_ENV: &str = "VOICE_COLLECT_SERVER";

/// Get the configuration directory path
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voice-collect")
}

/// Get the data directory path
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voice-collect")
}

/// Get the default config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the default socket path
pub fn socket_path() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join("voice-collect.sock")
}

/// Load configuration from a file, falling back to defaults when it does not exist
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let config = if path.exists() {
        info!("Loading configuration from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        toml::from_str::<AppConfig>(&content).map_err(ConfigError::ParseError)?
    } else {
        info!("No configuration file found, using defaults");
        AppConfig::default()
    };

    config.validate()?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(ConfigError::ReadError)?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::ValidationError(e.to_string()))?;
    std::fs::write(path, content).map_err(ConfigError::ReadError)?;

    info!("Configuration saved to {:?}", path);
    Ok(())
}

/// Initialize configuration directories
pub fn init_dirs() -> Result<()> {
    for dir in [config_dir(), data_dir()] {
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(ConfigError::ReadError)?;
            info!("Created directory {:?}", dir);
        }
    }

    Ok(())
}

impl AppConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.audio.sample_rate == 0 {
            return Err(ConfigError::ValidationError(
                "audio.sample_rate must be positive".into(),
            ));
        }
        if self.server.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server.base_url must not be empty".into(),
            ));
        }
        if self.session.prompts_per_session == 0 {
            return Err(ConfigError::ValidationError(
                "session.prompts_per_session must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Get the effective server URL (env or config)
    pub fn server_url(&self) -> String {
        std::env::var(SERVER_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.server.base_url.clone())
    }

    /// Get the effective socket path
    pub fn socket_path(&self) -> PathBuf {
        self.ipc.socket_path.clone().unwrap_or_else(socket_path)
    }

    /// Get the effective archive directory
    pub fn archive_dir(&self) -> PathBuf {
        self.archive
            .dir
            .clone()
            .unwrap_or_else(|| data_dir().join("recordings"))
    }

    /// Registration details from the config, with `overrides` filled in on top
    pub fn participant(&self, overrides: &ParticipantConfig) -> std::result::Result<UserInfo, ConfigError> {
        let pick = |flag: &Option<String>, configured: &Option<String>, name: &str| {
            flag.clone()
                .or_else(|| configured.clone())
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingField(format!("participant.{}", name)))
        };

        Ok(UserInfo {
            age: overrides
                .age
                .or(self.participant.age)
                .ok_or_else(|| ConfigError::MissingField("participant.age".into()))?,
            gender: pick(&overrides.gender, &self.participant.gender, "gender")?,
            location: pick(&overrides.location, &self.participant.location, "location")?,
            state: pick(&overrides.state, &self.participant.state, "state")?,
        })
    }
}
