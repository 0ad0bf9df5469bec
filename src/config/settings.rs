//! Tunable engine parameters
//!
//! Every threshold states the unit of the signal it is compared against.
//! The two speed thresholds live in different domains on purpose:
//!
//! - [`SegmentationConfig::movement_threshold`] is compared against the raw
//!   [`SegmentationConfig::movement_signal`] (motor RPM by default)
//! - [`CalibrationConfig::stationary_speed_threshold`] is compared against
//!   converted vehicle speed in m/s
//!
//! # Main Types
//!
//! - [`VehicleConfig`] - Drivetrain geometry and accelerometer scale
//! - [`CalibrationConfig`] - Auto-zero stationary detection
//! - [`SegmentationConfig`] - Moving/idle classification and gap bridging
//! - [`ReplayConfig`] - Playback rate and staleness
//! - [`SignalNames`] - Column names for raw and derived signals

use serde::{Deserialize, Serialize};

use crate::analysis::calibration::BiasEstimator;

/// Default final drive ratio (motor revolutions per wheel revolution)
pub const DEFAULT_GEAR_RATIO: f64 = 4.53;

/// Default tire radius in meters (10.2 in)
pub const DEFAULT_WHEEL_RADIUS_M: f64 = 0.259;

/// Default accelerometer scale in LSB per G
pub const DEFAULT_SCALE_LSB_PER_G: f64 = 256.0;

/// Default stationary speed threshold in m/s
pub const DEFAULT_STATIONARY_SPEED_THRESHOLD: f64 = 0.2;

/// Default minimum stationary run length in seconds
pub const DEFAULT_STATIONARY_MIN_DURATION_SECS: f64 = 1.0;

/// Default movement threshold in raw motor RPM
pub const DEFAULT_MOVEMENT_THRESHOLD: f64 = 100.0;

/// Default largest gap (seconds) bridged without a session break
pub const DEFAULT_MAX_GAP_SECONDS: f64 = 60.0;

/// Default age (seconds) after which a held value is reported stale
pub const DEFAULT_STALE_AFTER_SECS: f64 = 3.0;

/// Vehicle geometry and sensor scaling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Final drive ratio, motor RPM / wheel RPM
    pub gear_ratio: f64,

    /// Tire radius in meters
    pub wheel_radius_m: f64,

    /// Accelerometer counts per G
    pub scale_lsb_per_g: f64,

    /// Display clamp in G for the friction circle columns
    pub g_display_limit: f64,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            gear_ratio: DEFAULT_GEAR_RATIO,
            wheel_radius_m: DEFAULT_WHEEL_RADIUS_M,
            scale_lsb_per_g: DEFAULT_SCALE_LSB_PER_G,
            g_display_limit: 2.0,
        }
    }
}

/// Auto-zero calibration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Speed magnitude (m/s, converted speed) below which the car is at rest
    pub stationary_speed_threshold: f64,

    /// Minimum span (seconds) of a stationary run before it is trusted
    pub stationary_min_duration_secs: f64,

    /// How the per-axis bias is estimated over the stationary run
    pub estimator: BiasEstimator,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            stationary_speed_threshold: DEFAULT_STATIONARY_SPEED_THRESHOLD,
            stationary_min_duration_secs: DEFAULT_STATIONARY_MIN_DURATION_SECS,
            estimator: BiasEstimator::default(),
        }
    }
}

/// Movement segmentation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Signal the segmenter classifies
    pub movement_signal: String,

    /// Magnitude above which a sample is Moving, in `movement_signal` units
    pub movement_threshold: f64,

    /// Largest gap in seconds bridged without a session break
    pub max_gap_seconds: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            movement_signal: SignalNames::default().motor_rpm,
            movement_threshold: DEFAULT_MOVEMENT_THRESHOLD,
            max_gap_seconds: DEFAULT_MAX_GAP_SECONDS,
        }
    }
}

/// Replay clock settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Virtual seconds per wall-clock second
    pub speed_multiplier: f64,

    /// Age in seconds after which a held value is flagged stale
    pub stale_after_secs: f64,

    /// Signals reported on each tick (empty = every signal in the table)
    pub signals: Vec<String>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            stale_after_secs: DEFAULT_STALE_AFTER_SECS,
            signals: Vec::new(),
        }
    }
}

/// Column names for raw inputs and derived outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalNames {
    /// Wheel speed sensor, preferred speed source
    pub wheel_rpm: String,
    /// Inverter motor speed, fallback speed source
    pub motor_rpm: String,
    /// Raw longitudinal accelerometer axis
    pub accel_long: String,
    /// Raw lateral accelerometer axis
    pub accel_lat: String,
    /// Derived speed in m/s
    pub speed_mps: String,
    /// Derived speed in km/h
    pub speed_kmh: String,
    /// Derived bias-corrected longitudinal G
    pub g_long: String,
    /// Derived bias-corrected lateral G
    pub g_lat: String,
    /// Derived combined G
    pub g_sum: String,
    /// Longitudinal G clamped to the display limit
    pub g_long_display: String,
    /// Lateral G clamped to the display limit
    pub g_lat_display: String,
}

impl Default for SignalNames {
    fn default() -> Self {
        Self {
            wheel_rpm: "Right_RPM".to_string(),
            motor_rpm: "INV_Motor_Speed".to_string(),
            accel_long: "Accel_X".to_string(),
            accel_lat: "Accel_Y".to_string(),
            speed_mps: "Speed_MPS".to_string(),
            speed_kmh: "Speed_KMH".to_string(),
            g_long: "Accel_Long_G".to_string(),
            g_lat: "Accel_Lat_G".to_string(),
            g_sum: "G_Sum".to_string(),
            g_long_display: "Accel_Long_G_Display".to_string(),
            g_lat_display: "Accel_Lat_G_Display".to_string(),
        }
    }
}

impl SignalNames {
    /// Raw signals the engine reads from a source
    pub fn raw_signals(&self) -> Vec<String> {
        vec![
            self.wheel_rpm.clone(),
            self.motor_rpm.clone(),
            self.accel_long.clone(),
            self.accel_lat.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_vehicle() {
        let vehicle = VehicleConfig::default();
        assert_eq!(vehicle.gear_ratio, 4.53);
        assert_eq!(vehicle.wheel_radius_m, 0.259);
        assert_eq!(vehicle.scale_lsb_per_g, 256.0);
    }

    #[test]
    fn test_segmentation_defaults_use_motor_rpm() {
        let seg = SegmentationConfig::default();
        assert_eq!(seg.movement_signal, "INV_Motor_Speed");
        assert_eq!(seg.movement_threshold, 100.0);
        assert_eq!(seg.max_gap_seconds, 60.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cal: CalibrationConfig = toml::from_str("stationary_speed_threshold = 0.5").unwrap();
        assert_eq!(cal.stationary_speed_threshold, 0.5);
        assert_eq!(cal.stationary_min_duration_secs, 1.0);
        assert_eq!(cal.estimator, BiasEstimator::Mean);
    }
}
