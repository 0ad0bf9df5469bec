//! Auto-zero accelerometer calibration
//!
//! Finds the first stretch where the car is at rest and takes the per-axis
//! G offset over that stretch as the bias. Subtracting it makes the at-rest
//! axes read (0, 0), which removes mounting tilt from the friction circle.
//!
//! A session without any qualifying stretch is not an error: the result has
//! `found == false` and a zero bias.

use serde::{Deserialize, Serialize};

use crate::analysis::units::{speed_column, unbiased_g_column};
use crate::config::{CalibrationConfig, EngineConfig};
use crate::table::SignalTable;
use crate::types::{seconds_between, RunningStats, TimeSpan, Timestamp};

/// How the bias is estimated from the stationary run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiasEstimator {
    /// Arithmetic mean per axis
    #[default]
    Mean,
    /// Median per axis (robust to single spikes)
    Median,
}

/// A longitudinal/lateral pair
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GVector {
    /// Longitudinal axis (forward positive)
    pub long: f64,
    /// Lateral axis
    pub lat: f64,
}

impl GVector {
    /// Both axes zero
    pub const ZERO: GVector = GVector {
        long: 0.0,
        lat: 0.0,
    };

    /// Scale both axes
    pub fn scaled(self, factor: f64) -> GVector {
        GVector {
            long: self.long * factor,
            lat: self.lat * factor,
        }
    }
}

/// Result of auto-zero calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Per-axis offset in G, subtracted from unbiased readings
    pub bias: GVector,
    /// Accelerometer scale in LSB per G the bias was computed with
    pub scale: f64,
    /// Whether a stationary run was found
    pub found: bool,
    /// First and last sample of the stationary run
    pub source_window: Option<TimeSpan>,
    /// Number of rows in the stationary run
    pub sample_count: usize,
}

impl Calibration {
    /// Neutral calibration: zero bias, nothing found
    pub fn not_found(scale: f64) -> Self {
        Self {
            bias: GVector::ZERO,
            scale,
            found: false,
            source_window: None,
            sample_count: 0,
        }
    }

    /// Calibration derived from a stationary run
    pub fn found(bias: GVector, scale: f64, source_window: TimeSpan, sample_count: usize) -> Self {
        Self {
            bias,
            scale,
            found: true,
            source_window: Some(source_window),
            sample_count,
        }
    }

    /// Bias expressed in raw accelerometer counts
    pub fn raw_bias(&self) -> GVector {
        self.bias.scaled(self.scale)
    }

    /// Remove the bias from an unbiased G reading
    pub fn correct(&self, unbiased: GVector) -> GVector {
        GVector {
            long: unbiased.long - self.bias.long,
            lat: unbiased.lat - self.bias.lat,
        }
    }
}

/// Locate the first maximal at-rest run lasting at least `min_duration_secs`
///
/// A row is at rest when `|speed| < threshold`. Rows without a speed reading
/// neither extend nor end a run; only a present speed at or above the
/// threshold ends it. Returns inclusive row bounds, both on speed rows.
pub fn find_stationary_run(
    timestamps: &[Timestamp],
    speed: &[Option<f64>],
    threshold: f64,
    min_duration_secs: f64,
) -> Option<(usize, usize)> {
    let qualifies = |first: usize, last: usize| {
        seconds_between(timestamps[first], timestamps[last]) >= min_duration_secs
    };

    let mut run: Option<(usize, usize)> = None;
    for (i, value) in speed.iter().enumerate().take(timestamps.len()) {
        let Some(value) = value else {
            continue;
        };
        if value.abs() < threshold {
            run = Some(match run {
                Some((first, _)) => (first, i),
                None => (i, i),
            });
        } else if let Some((first, last)) = run.take() {
            if qualifies(first, last) {
                return Some((first, last));
            }
        }
    }

    run.filter(|&(first, last)| qualifies(first, last))
}

fn estimate(values: impl Iterator<Item = f64>, estimator: BiasEstimator) -> Option<f64> {
    match estimator {
        BiasEstimator::Mean => {
            let mut stats = RunningStats::new();
            values.for_each(|v| stats.push(v));
            (!stats.is_empty()).then(|| stats.mean())
        }
        BiasEstimator::Median => {
            let mut sorted: Vec<f64> = values.collect();
            if sorted.is_empty() {
                return None;
            }
            sorted.sort_by(f64::total_cmp);
            let mid = sorted.len() / 2;
            Some(if sorted.len() % 2 == 0 {
                (sorted[mid - 1] + sorted[mid]) / 2.0
            } else {
                sorted[mid]
            })
        }
    }
}

/// Calibrate from aligned columns of speed (m/s) and unbiased G
///
/// All slices are indexed by row. If any has a different length than
/// `timestamps` the result is not found.
pub fn calibrate_axes(
    timestamps: &[Timestamp],
    speed: &[Option<f64>],
    long_g: &[Option<f64>],
    lat_g: &[Option<f64>],
    config: &CalibrationConfig,
    scale: f64,
) -> Calibration {
    let rows = timestamps.len();
    if speed.len() != rows || long_g.len() != rows || lat_g.len() != rows {
        tracing::warn!(
            "Calibration columns misaligned ({} timestamps, {} speed, {} long, {} lat); calibration not found",
            rows,
            speed.len(),
            long_g.len(),
            lat_g.len()
        );
        return Calibration::not_found(scale);
    }

    let Some((first, last)) = find_stationary_run(
        timestamps,
        speed,
        config.stationary_speed_threshold,
        config.stationary_min_duration_secs,
    ) else {
        tracing::info!(
            "No stationary run (|speed| < {} m/s for {} s); calibration not found",
            config.stationary_speed_threshold,
            config.stationary_min_duration_secs
        );
        return Calibration::not_found(scale);
    };

    let axis = |column: &[Option<f64>], name: &str| {
        let values = column[first..=last].iter().filter_map(|v| *v);
        estimate(values, config.estimator).unwrap_or_else(|| {
            tracing::warn!("No {} readings in stationary run; using zero bias", name);
            0.0
        })
    };
    let bias = GVector {
        long: axis(long_g, "longitudinal"),
        lat: axis(lat_g, "lateral"),
    };

    let span = TimeSpan::new(timestamps[first], timestamps[last]);
    tracing::info!(
        "Calibrated bias long={:.4} G lat={:.4} G from {} rows ({} .. {})",
        bias.long,
        bias.lat,
        last - first + 1,
        span.start.to_rfc3339(),
        span.end.to_rfc3339()
    );

    Calibration::found(bias, scale, span, last - first + 1)
}

/// Compute the session calibration from a raw signal table
///
/// Speed is derived from the configured RPM signals and the accelerometer
/// axes are scaled with `config.vehicle.scale_lsb_per_g` before the stationary
/// run is averaged.
pub fn compute_calibration(table: &SignalTable, config: &EngineConfig) -> Calibration {
    let scale = config.vehicle.scale_lsb_per_g;
    if table.is_empty() {
        tracing::debug!("Calibration requested over an empty table");
        return Calibration::not_found(scale);
    }

    let names = &config.signals;
    let (speed, _) = speed_column(table, &config.vehicle, names);
    let long_g = unbiased_g_column(table, &names.accel_long, scale);
    let lat_g = unbiased_g_column(table, &names.accel_lat, scale);

    calibrate_axes(
        table.timestamps(),
        &speed,
        &long_g,
        &lat_g,
        &config.calibration,
        scale,
    )
}
