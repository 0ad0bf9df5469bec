//! Analysis module for vehicle telemetry
//!
//! This module provides the session-level computations:
//! - Unit conversion (RPM to speed, raw accelerometer counts to G)
//! - Auto-zero calibration from the first stationary window
//! - Moving/idle segmentation with gap bridging

pub mod calibration;
pub mod segmentation;
pub mod units;

pub use calibration::{compute_calibration, BiasEstimator, Calibration, GVector};
pub use segmentation::{
    compute_segments, compute_segments_in, filter_moving, movement_ratio, Segment, SegmentState,
};
pub use units::{convert, g_from_raw, mps_to_kmh, speed_from_rpm};
