//! Core data types for Slicks
//!
//! This module contains the fundamental value types shared by the analysis
//! components and the replay clock.
//!
//! # Main Types
//!
//! - [`Timestamp`] - A UTC instant (`chrono::DateTime<Utc>`)
//! - [`SessionWindow`] - Validated half-open time range a computation runs over
//! - [`TimeSpan`] - Unvalidated closed span, possibly zero-length
//! - [`Sample`] - One table row: a timestamp and per-signal readings
//! - [`RunningStats`] - O(1) accumulator for count/mean/min/max
//!
//! # Absent Values
//!
//! Readings are `Option<f64>`. `None` is a genuine gap in the data and is
//! never treated as zero.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, SlicksError};

/// Instant type used for every sample and cursor
pub type Timestamp = DateTime<Utc>;

/// Seconds between two instants (`later - earlier`), negative if reversed
pub fn seconds_between(earlier: Timestamp, later: Timestamp) -> f64 {
    delta_seconds(later - earlier)
}

/// Convert a chrono delta to fractional seconds
pub fn delta_seconds(delta: TimeDelta) -> f64 {
    match delta.num_nanoseconds() {
        Some(nanos) => nanos as f64 / 1e9,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

/// Convert fractional seconds to a chrono delta (nanosecond resolution)
pub fn delta_from_seconds(seconds: f64) -> TimeDelta {
    if !seconds.is_finite() {
        return if seconds > 0.0 {
            TimeDelta::MAX
        } else {
            TimeDelta::zero()
        };
    }
    let nanos = (seconds * 1e9).round();
    if nanos >= i64::MAX as f64 {
        TimeDelta::MAX
    } else if nanos <= i64::MIN as f64 {
        TimeDelta::MIN
    } else {
        TimeDelta::nanoseconds(nanos as i64)
    }
}

/// Half-open time range `[start, end)` that bounds a computation
///
/// Construction (including deserialization) enforces `end > start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct SessionWindow {
    start: Timestamp,
    end: Timestamp,
}

#[derive(Deserialize)]
struct RawWindow {
    start: Timestamp,
    end: Timestamp,
}

impl TryFrom<RawWindow> for SessionWindow {
    type Error = SlicksError;

    fn try_from(raw: RawWindow) -> Result<Self> {
        SessionWindow::new(raw.start, raw.end)
    }
}

impl SessionWindow {
    /// Create a window, rejecting empty or reversed ranges
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self> {
        if end <= start {
            return Err(SlicksError::Range(format!(
                "session window end {} must be after start {}",
                end.to_rfc3339(),
                start.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// Smallest window holding every row of a closed `span`
    ///
    /// The end sits one nanosecond past `span.end`, so the last row stays
    /// inside and a single-row span still yields a valid window.
    pub fn covering(span: TimeSpan) -> Result<Self> {
        let end = span
            .end
            .checked_add_signed(TimeDelta::nanoseconds(1))
            .ok_or_else(|| {
                SlicksError::Range(format!("span end {} is out of range", span.end.to_rfc3339()))
            })?;
        Self::new(span.start, end)
    }

    /// Window start (inclusive)
    pub fn start(&self) -> Timestamp {
        self.start
    }

    /// Window end (exclusive for sample membership)
    pub fn end(&self) -> Timestamp {
        self.end
    }

    /// Window length
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Window length in seconds
    pub fn duration_secs(&self) -> f64 {
        delta_seconds(self.duration())
    }

    /// Whether a sample timestamp falls inside `[start, end)`
    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Clamp an instant into `[start, end]`
    pub fn clamp(&self, ts: Timestamp) -> Timestamp {
        ts.clamp(self.start, self.end)
    }
}

/// Closed span `[start, end]` with `end >= start`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeSpan {
    /// Create a span; the bounds are swapped if given in reverse
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// Span length in seconds
    pub fn duration_secs(&self) -> f64 {
        seconds_between(self.start, self.end)
    }

    /// Whether `ts` lies inside the closed span
    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// One row of a signal table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the row was sampled
    pub timestamp: Timestamp,
    /// Signal name to reading; `None` marks an absent value
    pub values: BTreeMap<String, Option<f64>>,
}

impl Sample {
    /// Create an empty sample at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    /// Add a reading (builder style)
    pub fn with(mut self, signal: impl Into<String>, value: f64) -> Self {
        self.values.insert(signal.into(), Some(value));
        self
    }

    /// Add an explicitly absent reading (builder style)
    pub fn with_absent(mut self, signal: impl Into<String>) -> Self {
        self.values.insert(signal.into(), None);
        self
    }

    /// Reading for `signal`, if present and numeric
    pub fn get(&self, signal: &str) -> Option<f64> {
        self.values
            .get(signal)
            .copied()
            .flatten()
            .filter(|v| !v.is_nan())
    }
}

/// Running statistics accumulator
///
/// O(1) updates for count, sum, min and max; used to derive segment and
/// calibration means without buffering samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningStats {
    /// Number of values pushed
    pub count: u64,
    /// Sum of values pushed
    pub sum: f64,
    /// Smallest value seen
    pub min: f64,
    /// Largest value seen
    pub max: f64,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningStats {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::MAX,
            max: f64::MIN,
        }
    }

    /// Add a value
    #[inline]
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Arithmetic mean, 0.0 when empty
    #[inline]
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Whether nothing has been pushed
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_window_rejects_reversed_range() {
        assert!(SessionWindow::new(ts(10), ts(0)).unwrap_err().is_range());
        assert!(SessionWindow::new(ts(5), ts(5)).unwrap_err().is_range());
        assert!(SessionWindow::new(ts(0), ts(1)).is_ok());
    }

    #[test]
    fn test_window_is_half_open() {
        let window = SessionWindow::new(ts(0), ts(10)).unwrap();
        assert!(window.contains(ts(0)));
        assert!(window.contains(ts(9)));
        assert!(!window.contains(ts(10)));
        assert_eq!(window.duration_secs(), 10.0);
        assert_eq!(window.clamp(ts(-5)), ts(0));
        assert_eq!(window.clamp(ts(50)), ts(10));
    }

    #[test]
    fn test_window_covering_span_keeps_last_row() {
        let window = SessionWindow::covering(TimeSpan::new(ts(0), ts(9))).unwrap();
        assert_eq!(window.start(), ts(0));
        assert!(window.contains(ts(9)));
        assert!(!window.contains(ts(9) + TimeDelta::nanoseconds(1)));

        let single = SessionWindow::covering(TimeSpan::new(ts(5), ts(5))).unwrap();
        assert!(single.contains(ts(5)));
        assert!(!single.contains(ts(4)));
    }

    #[test]
    fn test_delta_conversions() {
        assert_eq!(seconds_between(ts(0), ts(61)), 61.0);
        assert_eq!(delta_from_seconds(1.5), TimeDelta::milliseconds(1500));
        assert_eq!(delta_from_seconds(f64::INFINITY), TimeDelta::MAX);
    }

    #[test]
    fn test_sample_get_skips_absent_and_nan() {
        let sample = Sample::new(ts(0))
            .with("a", 1.0)
            .with("nan", f64::NAN)
            .with_absent("gone");
        assert_eq!(sample.get("a"), Some(1.0));
        assert_eq!(sample.get("nan"), None);
        assert_eq!(sample.get("gone"), None);
        assert_eq!(sample.get("missing"), None);
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::new();
        assert_eq!(stats.mean(), 0.0);
        for v in [1.0, 2.0, 3.0, 6.0] {
            stats.push(v);
        }
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean(), 3.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 6.0);
    }
}
