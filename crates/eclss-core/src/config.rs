//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.
//! Loaded from JSON at startup; the defaults reproduce the stock game.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eclss_logic::anomaly::AnomalyKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seconds between a successful fix and the next anomaly.
    pub respawn_delay_secs: f64,

    /// Anomaly active at startup; `null` starts quiet until something triggers one.
    pub initial_anomaly: Option<AnomalyKind>,

    /// Fixed RNG seed for reproducible runs. Entropy when absent.
    pub seed: Option<u64>,

    /// How often the background ticker checks the respawn deadline.
    pub ticker_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            respawn_delay_secs: 20.0,
            initial_anomaly: Some(AnomalyKind::Co2),
            seed: None,
            ticker_interval_ms: 250,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.respawn_delay_secs.is_finite() || self.respawn_delay_secs < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "respawn_delay_secs must be a non-negative number, got {}",
                self.respawn_delay_secs
            )));
        }
        if Duration::try_from_secs_f64(self.respawn_delay_secs).is_err() {
            return Err(ConfigError::Invalid(format!(
                "respawn_delay_secs is too large, got {}",
                self.respawn_delay_secs
            )));
        }
        if self.ticker_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "ticker_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Out-of-range values from a config that skipped `validate` clamp to
    /// zero (negative) or `Duration::MAX` (too large or NaN).
    pub fn respawn_delay(&self) -> Duration {
        if self.respawn_delay_secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.respawn_delay_secs).unwrap_or(Duration::MAX)
    }

    pub fn ticker_interval(&self) -> Duration {
        Duration::from_millis(self.ticker_interval_ms)
    }
}
