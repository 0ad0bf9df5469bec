//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use chrono::{TimeDelta, TimeZone, Utc};
use slicks_rs::analysis::segmentation::{Segment, SegmentState};
use slicks_rs::Timestamp;

/// Instant `secs` seconds after a fixed test epoch
pub fn ts(secs: i64) -> Timestamp {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// Instant `millis` milliseconds after the test epoch
pub fn ts_millis(millis: i64) -> Timestamp {
    ts(0) + TimeDelta::milliseconds(millis)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Assert segments tile `[first, last]` with no holes or overlaps and that
/// equal neighbours only meet at a session break
pub fn assert_partition(segments: &[Segment], first: Timestamp, last: Timestamp) {
    assert!(!segments.is_empty(), "expected at least one segment");
    assert_eq!(segments[0].start, first, "first segment must start at {}", first);
    assert_eq!(segments[segments.len() - 1].end, last, "last segment must end at {}", last);

    for seg in segments {
        assert!(seg.end >= seg.start, "segment ends before it starts: {:?}", seg);
        assert!(seg.duration >= 0.0);
    }
    for pair in segments.windows(2) {
        assert_eq!(pair[0].end, pair[1].start, "segments must be contiguous");
        if pair[0].state == pair[1].state {
            assert!(
                pair[1].session_break,
                "adjacent {:?} segments without a session break",
                pair[0].state
            );
            assert_eq!(pair[0].state, SegmentState::Idle);
        }
    }
}
