//! Server configuration
//!
//! Settings come from a JSON file, then environment overrides:
//!
//! - `EVTRIP_CONFIG`: config file path (default `<config dir>/evtrip/config.json`,
//!   skipped silently when absent)
//! - `EVTRIP_ADDR`: bind address, e.g. `127.0.0.1:8051`
//! - `EVTRIP_DATA`: dataset CSV path; the demo store is used when unset
//!
//! ```json
//! {
//!   "bind_addr": "0.0.0.0:8051",
//!   "data_path": "ev_dataset.csv",
//!   "slots": 2,
//!   "engine": {
//!     "tick_period_ms": 1000,
//!     "round_trip": true,
//!     "curve": [
//!       { "distance_km": 0, "probability": 0.0 },
//!       { "distance_km": 60, "probability": 0.0 },
//!       { "distance_km": 100, "probability": 1.0 }
//!     ]
//!   }
//! }
//! ```

use evtrip_core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::net::{AddrParseError, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid bind address '{value}': {source}")]
    Addr {
        value: String,
        source: AddrParseError,
    },

    #[error("at least one playback slot is required")]
    NoSlots,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,

    /// Dataset CSV; `None` serves the demo trips
    pub data_path: Option<PathBuf>,

    /// Number of independent playback slots
    pub slots: usize,

    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8051)),
            data_path: None,
            slots: 2,
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from the config file (if any) and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var_os("EVTRIP_CONFIG").map(PathBuf::from);

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// `<config dir>/evtrip/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("evtrip").join("config.json"))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `EVTRIP_ADDR` / `EVTRIP_DATA` style overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("EVTRIP_ADDR") {
            self.bind_addr = value
                .parse()
                .map_err(|source| ConfigError::Addr { value, source })?;
        }
        if let Some(value) = lookup("EVTRIP_DATA") {
            self.data_path = Some(PathBuf::from(value));
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.slots == 0 {
            return Err(ConfigError::NoSlots);
        }
        Ok(())
    }
}
