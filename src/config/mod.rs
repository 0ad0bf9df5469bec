//! Configuration module for Slicks
//!
//! This module handles engine configuration:
//! - Vehicle constants (gear ratio, wheel radius, accelerometer scale)
//! - Calibration, segmentation and replay tunables
//! - Signal naming
//!
//! # Config Location
//!
//! Without an explicit path, the config is looked up in this order:
//! 1. The file named by the `SLICKS_CONFIG` environment variable
//! 2. `config.toml` in the platform data directory under `dev.slicks.slicks-rs`
//!
//! A missing file is not an error; defaults are used instead.
//!
//! # Formats
//!
//! Files ending in `.json` are read as JSON, everything else as TOML.
//!
//! # Example
//!
//! ```ignore
//! use slicks_rs::config::EngineConfig;
//!
//! let mut config = EngineConfig::load_or_default();
//! config.segmentation.max_gap_seconds = 30.0;
//! config.save("slicks.toml")?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Result, SlicksError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.slicks.slicks-rs";

/// Default config filename inside the app data directory
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SLICKS_CONFIG";

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Path of the config file that [`EngineConfig::load_or_default`] reads
pub fn config_path() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => app_data_dir().map(|p| p.join(CONFIG_FILE)),
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Vehicle geometry and sensor scaling
    pub vehicle: VehicleConfig,

    /// Auto-zero calibration
    pub calibration: CalibrationConfig,

    /// Moving/idle segmentation
    pub segmentation: SegmentationConfig,

    /// Replay clock
    pub replay: ReplayConfig,

    /// Column names
    pub signals: SignalNames,
}

impl EngineConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("vehicle.gear_ratio", self.vehicle.gear_ratio),
            ("vehicle.wheel_radius_m", self.vehicle.wheel_radius_m),
            ("vehicle.scale_lsb_per_g", self.vehicle.scale_lsb_per_g),
            ("vehicle.g_display_limit", self.vehicle.g_display_limit),
            ("replay.speed_multiplier", self.replay.speed_multiplier),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SlicksError::Config(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            (
                "calibration.stationary_speed_threshold",
                self.calibration.stationary_speed_threshold,
            ),
            (
                "calibration.stationary_min_duration_secs",
                self.calibration.stationary_min_duration_secs,
            ),
            (
                "segmentation.movement_threshold",
                self.segmentation.movement_threshold,
            ),
            (
                "segmentation.max_gap_seconds",
                self.segmentation.max_gap_seconds,
            ),
            ("replay.stale_after_secs", self.replay.stale_after_secs),
        ];
        for (name, value) in non_negative {
            if value.is_nan() || value < 0.0 {
                return Err(SlicksError::Config(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }

        if self.segmentation.movement_signal.is_empty() {
            return Err(SlicksError::Config(
                "segmentation.movement_signal must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Load a config file (TOML, or JSON for `.json` files) and validate it
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SlicksError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = if is_json(path) {
            serde_json::from_str(&content).map_err(|e| {
                SlicksError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?
        } else {
            toml::from_str(&content).map_err(|e| {
                SlicksError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?
        };

        config.validate()?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load from [`config_path`], returning defaults if it is missing or invalid
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config (TOML, or JSON for `.json` files)
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_json(path) {
            serde_json::to_string_pretty(self)
                .map_err(|e| SlicksError::Config(format!("Failed to serialize config: {}", e)))?
        } else {
            toml::to_string_pretty(self)
                .map_err(|e| SlicksError::Config(format!("Failed to serialize config: {}", e)))?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SlicksError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        std::fs::write(path, content)
            .map_err(|e| SlicksError::Config(format!("Failed to write config {:?}: {}", path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_gear_ratio() {
        let mut config = EngineConfig::default();
        config.vehicle.gear_ratio = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("gear_ratio"));
    }

    #[test]
    fn test_validate_rejects_negative_gap() {
        let mut config = EngineConfig::default();
        config.segmentation.max_gap_seconds = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slicks.toml");

        let mut config = EngineConfig::default();
        config.vehicle.scale_lsb_per_g = 16384.0;
        config.replay.signals = vec!["Speed_MPS".to_string()];
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("slicks.json");

        let mut config = EngineConfig::default();
        config.segmentation.movement_threshold = 1.0;
        config.segmentation.movement_signal = "Speed_MPS".to_string();
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[vehicle]\nwheel_radius_m = -0.3\n").unwrap();
        assert!(EngineConfig::load(&path).is_err());
    }
}
