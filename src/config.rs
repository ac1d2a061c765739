//! Meter configuration and settings file loading

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Environment variable naming an optional settings file
pub const CONFIG_ENV_VAR: &str = "LOUDNESS_METER_CONFIG";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// How the presenter renders snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Single refreshing text meter line
    #[default]
    Text,

    /// One JSON object per refresh
    Json,
}

/// Meter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    /// Capture sample rate in Hz
    pub sample_rate: u32,

    /// Capture channel count
    pub channels: u16,

    /// Short window length in chunks
    pub short_window: usize,

    /// Long window length in chunks
    pub long_window: usize,

    /// Empirical gain applied to the RMS before the dB conversion
    pub calibration: f64,

    /// Loudness reported for digital silence
    pub floor_db: f64,

    /// Presenter refresh interval (milliseconds)
    pub refresh_interval_ms: u64,

    /// Recording device index, default microphone when unset
    pub device: Option<usize>,

    pub output: OutputMode,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            short_window: 10,
            long_window: 200,
            calibration: 1.2,
            floor_db: -100.0,
            refresh_interval_ms: 50,
            device: None,
            output: OutputMode::Text,
        }
    }
}

impl MeterConfig {
    /// Parse a JSON settings document. Missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: MeterConfig = serde_json::from_str(json)?;
        Ok(config.validated())
    }

    /// Load a JSON settings file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        log::info!("Loaded settings from {}", path.display());
        Self::from_json_str(&contents)
    }

    /// Resolve settings from an explicit path, then `LOUDNESS_METER_CONFIG`,
    /// falling back to defaults when neither is given.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let env_path = std::env::var(CONFIG_ENV_VAR).ok();
        match path.or(env_path.as_deref()) {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    /// Replace unusable values with defaults
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();

        if self.sample_rate == 0 {
            log::warn!("sample_rate must be positive, using {}", defaults.sample_rate);
            self.sample_rate = defaults.sample_rate;
        }
        if self.channels == 0 {
            log::warn!("channels must be positive, using {}", defaults.channels);
            self.channels = defaults.channels;
        }
        if self.short_window == 0 {
            log::warn!("short_window must be positive, using {}", defaults.short_window);
            self.short_window = defaults.short_window;
        }
        if self.long_window == 0 {
            log::warn!("long_window must be positive, using {}", defaults.long_window);
            self.long_window = defaults.long_window;
        }
        if !(self.calibration.is_finite() && self.calibration > 0.0) {
            log::warn!("calibration must be positive, using {}", defaults.calibration);
            self.calibration = defaults.calibration;
        }
        if !self.floor_db.is_finite() {
            log::warn!("floor_db must be finite, using {}", defaults.floor_db);
            self.floor_db = defaults.floor_db;
        }
        if self.refresh_interval_ms == 0 {
            self.refresh_interval_ms = defaults.refresh_interval_ms;
        }

        self
    }
}
