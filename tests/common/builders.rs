//! Test data builders for creating test tables

use slicks_rs::{Sample, SignalTable, Timestamp};

use super::ts;

/// Builder for drive logs sampled once per second
///
/// Each phase appends rows with a constant motor RPM and raw accelerometer
/// counts. Gaps skip time without adding rows.
pub struct DriveLogBuilder {
    samples: Vec<Sample>,
    next_secs: i64,
    accel_long: f64,
    accel_lat: f64,
}

impl Default for DriveLogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveLogBuilder {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            next_secs: 0,
            accel_long: 0.0,
            accel_lat: 0.0,
        }
    }

    /// Raw accelerometer counts used for the following rows
    pub fn accel(mut self, long_raw: f64, lat_raw: f64) -> Self {
        self.accel_long = long_raw;
        self.accel_lat = lat_raw;
        self
    }

    /// `seconds` rows with the motor stopped
    pub fn parked(self, seconds: i64) -> Self {
        self.driving(seconds, 0.0)
    }

    /// `seconds` rows at a constant motor RPM
    pub fn driving(mut self, seconds: i64, motor_rpm: f64) -> Self {
        for _ in 0..seconds {
            let sample = Sample::new(ts(self.next_secs))
                .with("INV_Motor_Speed", motor_rpm)
                .with("Accel_X", self.accel_long)
                .with("Accel_Y", self.accel_lat);
            self.samples.push(sample);
            self.next_secs += 1;
        }
        self
    }

    /// Skip `seconds` without data
    pub fn gap(mut self, seconds: i64) -> Self {
        self.next_secs += seconds;
        self
    }

    /// Timestamp the next row would get
    pub fn cursor(&self) -> Timestamp {
        ts(self.next_secs)
    }

    pub fn build(self) -> SignalTable {
        SignalTable::from_samples(self.samples).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_log_builder() {
        let table = DriveLogBuilder::new().parked(2).gap(5).driving(3, 4530.0).build();
        assert_eq!(table.len(), 5);
        assert_eq!(table.timestamps()[2], ts(7));
        assert_eq!(table.value("INV_Motor_Speed", 4), Some(4530.0));
    }
}
