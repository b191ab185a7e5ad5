//! Configuration for the mSBC SCO bridge
//!
//! Loaded from `config.toml` in the platform configuration directory
//! (or the file named by `MSBC_SCO_BRIDGE_CONFIG`); every field has a
//! default so a missing file or section is not an error.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV: &str = "MSBC_SCO_BRIDGE_CONFIG";

/// Highest volume level (HFP speaker/microphone gain scale)
pub const MAX_VOLUME: u8 = 127;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub sco: ScoConfig,
    pub pcm: PcmConfig,
    pub logging: LoggingConfig,
}

/// SCO link settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoConfig {
    /// Write MTU used until the transport reports the negotiated one
    pub mtu: usize,
    /// Link read timeout in milliseconds (0 blocks indefinitely)
    pub read_timeout_ms: u64,
}

impl Default for ScoConfig {
    fn default() -> Self {
        Self {
            mtu: 60,
            read_timeout_ms: 500,
        }
    }
}

impl ScoConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        match self.read_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// Local PCM endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PcmConfig {
    /// Initial volume, 0 to [`MAX_VOLUME`]
    pub volume: u8,
    pub muted: bool,
    /// Poll interval in milliseconds while no PCM client is attached
    pub idle_poll_ms: u64,
}

impl Default for PcmConfig {
    fn default() -> Self {
        Self {
            volume: MAX_VOLUME,
            muted: false,
            idle_poll_ms: 100,
        }
    }
}

impl PcmConfig {
    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is not set
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
        }
    }
}

impl BridgeConfig {
    /// Load the configuration file, falling back to defaults if absent
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load a specific configuration file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML document
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sco.mtu == 0 {
            return Err(ConfigError::Invalid("sco.mtu must be positive".into()));
        }
        if self.pcm.volume > MAX_VOLUME {
            return Err(ConfigError::Invalid(format!(
                "pcm.volume must be at most {}",
                MAX_VOLUME
            )));
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        ProjectDirs::from("", "", "msbc-sco-bridge")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(ConfigError::DirNotFound)
    }
}
