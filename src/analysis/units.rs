//! Raw sensor units to physical units
//!
//! Pure functions with no shared state. NaN inputs propagate as NaN; the
//! table-level [`convert`] maps absent readings to absent outputs and never
//! substitutes zero.

use std::f64::consts::PI;

use crate::analysis::calibration::Calibration;
use crate::config::{SignalNames, VehicleConfig};
use crate::error::Result;
use crate::table::SignalTable;

/// Meters per second to kilometers per hour
pub const MPS_TO_KMH: f64 = 3.6;

/// Vehicle speed in m/s from motor RPM
///
/// `wheel_rpm = motor_rpm / gear_ratio`, then
/// `speed = wheel_rpm * 2π * wheel_radius / 60`. Reverse rotation keeps its
/// sign.
#[inline]
pub fn speed_from_rpm(motor_rpm: f64, gear_ratio: f64, wheel_radius: f64) -> f64 {
    let wheel_rpm = motor_rpm / gear_ratio;
    wheel_rpm * 2.0 * PI * wheel_radius / 60.0
}

/// Acceleration in G from a raw accelerometer count
///
/// `bias` is in raw counts; see [`Calibration::raw_bias`].
#[inline]
pub fn g_from_raw(raw_count: f64, scale_lsb_per_g: f64, bias: f64) -> f64 {
    (raw_count - bias) / scale_lsb_per_g
}

/// m/s to km/h
#[inline]
pub fn mps_to_kmh(speed_mps: f64) -> f64 {
    speed_mps * MPS_TO_KMH
}

/// Combined G (friction circle usage)
#[inline]
pub fn g_sum(long_g: f64, lat_g: f64) -> f64 {
    long_g.hypot(lat_g)
}

/// Clamp a G reading to `±limit` for display; NaN stays NaN
#[inline]
pub fn clamp_g(g: f64, limit: f64) -> f64 {
    if g.is_nan() {
        g
    } else {
        g.clamp(-limit, limit)
    }
}

/// Which column a speed estimate was derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeedSource {
    /// Converted from an RPM column
    Rpm(String),
    /// An existing speed column was kept as is
    Existing(String),
    /// No usable column; speed is absent
    Missing,
}

/// Per-row speed in m/s with the column it came from
///
/// Prefers the wheel RPM signal, falls back to motor RPM, then to an existing
/// speed column.
pub fn speed_column(
    table: &SignalTable,
    vehicle: &VehicleConfig,
    names: &SignalNames,
) -> (Vec<Option<f64>>, SpeedSource) {
    for rpm in [&names.wheel_rpm, &names.motor_rpm] {
        if let Some(column) = table.column(rpm) {
            let speed = column
                .iter()
                .map(|v| v.map(|rpm| speed_from_rpm(rpm, vehicle.gear_ratio, vehicle.wheel_radius_m)))
                .collect();
            return (speed, SpeedSource::Rpm(rpm.clone()));
        }
    }

    if let Some(column) = table.column(&names.speed_mps) {
        return (column.to_vec(), SpeedSource::Existing(names.speed_mps.clone()));
    }

    (vec![None; table.len()], SpeedSource::Missing)
}

/// Per-row G for one raw accelerometer column, without bias correction
pub fn unbiased_g_column(table: &SignalTable, signal: &str, scale_lsb_per_g: f64) -> Vec<Option<f64>> {
    match table.column(signal) {
        Some(column) => column
            .iter()
            .map(|v| v.map(|raw| g_from_raw(raw, scale_lsb_per_g, 0.0)))
            .collect(),
        None => vec![None; table.len()],
    }
}

/// Add derived physical columns to a copy of `table`
///
/// Adds or overwrites speed (m/s and km/h), bias-corrected longitudinal and
/// lateral G, and combined G. The corrected axes are also written clamped to
/// `vehicle.g_display_limit` for the friction circle; combined G is computed
/// from the unclamped axes. The accelerometer scale comes from the
/// calibration so bias and scale always agree.
pub fn convert(
    table: &SignalTable,
    calibration: &Calibration,
    vehicle: &VehicleConfig,
    names: &SignalNames,
) -> Result<SignalTable> {
    let (speed, source) = speed_column(table, vehicle, names);
    if source == SpeedSource::Missing {
        tracing::warn!(
            "Neither '{}' nor '{}' found; speed will be absent",
            names.wheel_rpm,
            names.motor_rpm
        );
    } else {
        tracing::debug!("Speed derived from {:?}", source);
    }

    let scale = calibration.scale;
    let raw_bias = calibration.raw_bias();
    let corrected = |signal: &str, bias: f64| -> Vec<Option<f64>> {
        match table.column(signal) {
            Some(column) => column
                .iter()
                .map(|v| v.map(|raw| g_from_raw(raw, scale, bias)))
                .collect(),
            None => vec![None; table.len()],
        }
    };
    let long_g = corrected(&names.accel_long, raw_bias.long);
    let lat_g = corrected(&names.accel_lat, raw_bias.lat);

    let combined = long_g
        .iter()
        .zip(&lat_g)
        .map(|(long, lat)| match (long, lat) {
            (Some(long), Some(lat)) => Some(g_sum(*long, *lat)),
            _ => None,
        })
        .collect();
    let kmh = speed.iter().map(|v| v.map(mps_to_kmh)).collect();

    let limit = vehicle.g_display_limit;
    let display = |column: &[Option<f64>]| -> Vec<Option<f64>> {
        column.iter().map(|v| v.map(|g| clamp_g(g, limit))).collect()
    };
    let long_display = display(&long_g);
    let lat_display = display(&lat_g);

    table
        .with_column(names.speed_mps.clone(), speed)?
        .with_column(names.speed_kmh.clone(), kmh)?
        .with_column(names.g_long.clone(), long_g)?
        .with_column(names.g_lat.clone(), lat_g)?
        .with_column(names.g_sum.clone(), combined)?
        .with_column(names.g_long_display.clone(), long_display)?
        .with_column(names.g_lat_display.clone(), lat_display)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::calibration::GVector;
    use crate::types::{Sample, Timestamp};
    use chrono::{TimeZone, Utc};

    fn ts(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_speed_from_rpm_exact() {
        let speed = speed_from_rpm(4530.0, 4.53, 0.259);
        let expected = 1000.0 * 2.0 * PI * 0.259 / 60.0;
        assert!((speed - expected).abs() < 1e-9);
        assert!((speed - 27.12).abs() < 0.01);
    }

    #[test]
    fn test_speed_preserves_reverse_sign() {
        assert!(speed_from_rpm(-4530.0, 4.53, 0.259) < 0.0);
        assert_eq!(speed_from_rpm(0.0, 4.53, 0.259), 0.0);
    }

    #[test]
    fn test_g_from_raw() {
        assert_eq!(g_from_raw(512.0, 256.0, 0.0), 2.0);
        assert_eq!(g_from_raw(512.0, 256.0, 256.0), 1.0);
        assert!(g_from_raw(f64::NAN, 256.0, 0.0).is_nan());
    }

    #[test]
    fn test_helpers() {
        assert!((mps_to_kmh(10.0) - 36.0).abs() < 1e-12);
        assert_eq!(g_sum(3.0, 4.0), 5.0);
        assert_eq!(clamp_g(3.5, 2.0), 2.0);
        assert_eq!(clamp_g(-3.5, 2.0), -2.0);
        assert!(clamp_g(f64::NAN, 2.0).is_nan());
    }

    #[test]
    fn test_speed_column_falls_back_to_motor_rpm() {
        let names = SignalNames::default();
        let table = SignalTable::from_samples(vec![
            Sample::new(ts(0)).with("INV_Motor_Speed", 4530.0),
            Sample::new(ts(1)).with_absent("INV_Motor_Speed"),
        ])
        .unwrap();

        let (speed, source) = speed_column(&table, &VehicleConfig::default(), &names);
        assert_eq!(source, SpeedSource::Rpm("INV_Motor_Speed".to_string()));
        assert!((speed[0].unwrap() - 27.12).abs() < 0.01);
        assert_eq!(speed[1], None);
    }

    #[test]
    fn test_speed_column_missing() {
        let table = SignalTable::from_samples(vec![Sample::new(ts(0)).with("Accel_X", 1.0)]).unwrap();
        let (speed, source) = speed_column(&table, &VehicleConfig::default(), &SignalNames::default());
        assert_eq!(source, SpeedSource::Missing);
        assert_eq!(speed, vec![None]);
    }

    #[test]
    fn test_convert_applies_bias_and_propagates_absent() {
        let names = SignalNames::default();
        let table = SignalTable::from_samples(vec![
            Sample::new(ts(0))
                .with("Accel_X", 281.6)
                .with("Accel_Y", 25.6)
                .with("Right_RPM", 0.0),
            Sample::new(ts(1)).with_absent("Accel_X").with("Accel_Y", 25.6),
        ])
        .unwrap();

        let calibration = Calibration::found(
            GVector { long: 0.1, lat: 0.1 },
            256.0,
            crate::types::TimeSpan::new(ts(0), ts(0)),
            1,
        );
        let converted = convert(&table, &calibration, &VehicleConfig::default(), &names).unwrap();

        let long = converted.value("Accel_Long_G", 0).unwrap();
        let lat = converted.value("Accel_Lat_G", 0).unwrap();
        assert!((long - 1.0).abs() < 1e-9);
        assert!(lat.abs() < 1e-9);
        assert_eq!(converted.value("Accel_Long_G", 1), None);
        assert_eq!(converted.value("G_Sum", 1), None);
        assert_eq!(converted.value("Speed_MPS", 0), Some(0.0));
        assert_eq!(converted.value("Speed_KMH", 1), None);
        // Source table untouched
        assert!(!table.has_signal("Speed_MPS"));
    }

    #[test]
    fn test_convert_clamps_display_columns() {
        let names = SignalNames::default();
        let table = SignalTable::from_samples(vec![
            Sample::new(ts(0)).with("Accel_X", 768.0).with("Accel_Y", -640.0),
            Sample::new(ts(1)).with("Accel_X", 128.0).with_absent("Accel_Y"),
        ])
        .unwrap();
        let vehicle = VehicleConfig {
            g_display_limit: 1.5,
            ..Default::default()
        };

        let converted = convert(&table, &Calibration::not_found(256.0), &vehicle, &names).unwrap();
        assert_eq!(converted.value("Accel_Long_G", 0), Some(3.0));
        assert_eq!(converted.value("Accel_Long_G_Display", 0), Some(1.5));
        assert_eq!(converted.value("Accel_Lat_G_Display", 0), Some(-1.5));
        assert_eq!(converted.value("Accel_Long_G_Display", 1), Some(0.5));
        assert_eq!(converted.value("Accel_Lat_G_Display", 1), None);
        // Combined G uses the unclamped axes
        let sum = converted.value("G_Sum", 0).unwrap();
        assert!((sum - 3.0f64.hypot(2.5)).abs() < 1e-9);
    }
}
