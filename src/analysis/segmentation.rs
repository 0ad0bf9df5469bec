//! Moving/idle segmentation of a speed signal
//!
//! Turns a per-sample speed signal into a short ordered list of
//! [`Segment`]s that partition the covered time span.
//!
//! # Algorithm
//!
//! 1. **Classify**: a sample is Moving when `|value| > threshold`.
//! 2. **Group**: consecutive samples with the same class form a candidate.
//!    A timestamp gap longer than `max_gap_seconds` also starts a new one.
//! 3. **Bridge**: a gap up to `max_gap_seconds` between candidates is
//!    absorbed by the earlier candidate. A longer gap is a session break:
//!    - an Idle candidate before the gap extends across it
//!    - otherwise an Idle candidate after the gap extends back across it
//!    - between two Moving candidates a gap-only Idle segment is inserted
//!
//!    The segment that follows the silence is flagged `session_break`.
//! 4. **Finalize**: duration and mean of the constituent samples
//!    (0.0 for gap-only segments).
//!
//! Consecutive segments therefore alternate state, except that two Idle
//! segments may meet at a session break.
//!
//! Absent and NaN readings are skipped; they are gaps, not zero speed.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::table::SignalTable;
use crate::types::{delta_from_seconds, seconds_between, RunningStats, SessionWindow, Timestamp};

/// Movement classification of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentState {
    /// Signal magnitude above the threshold
    Moving,
    /// Signal magnitude at or below the threshold, or no data
    Idle,
}

impl SegmentState {
    /// Classify one reading
    #[inline]
    pub fn classify(value: f64, threshold: f64) -> Self {
        if value.abs() > threshold {
            SegmentState::Moving
        } else {
            SegmentState::Idle
        }
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            SegmentState::Moving => "Moving",
            SegmentState::Idle => "Idle",
        }
    }
}

/// A maximal interval classified as Moving or Idle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start of the interval (inclusive)
    pub start: Timestamp,
    /// End of the interval; equals the next segment's start
    pub end: Timestamp,
    /// Classification
    pub state: SegmentState,
    /// Mean signal value over constituent samples (0.0 when there are none)
    pub mean_value: f64,
    /// `end - start` in seconds
    pub duration: f64,
    /// Number of samples inside the segment
    pub sample_count: usize,
    /// The segment starts after a silence longer than the bridging limit
    /// (gap-only segments are always flagged)
    pub session_break: bool,
}

impl Segment {
    /// Whether the segment was created purely from missing data
    pub fn is_gap_only(&self) -> bool {
        self.sample_count == 0
    }
}

#[derive(Debug)]
struct Candidate {
    start: Timestamp,
    end: Timestamp,
    state: SegmentState,
    stats: RunningStats,
    session_break: bool,
}

impl Candidate {
    fn from_sample(ts: Timestamp, value: f64, state: SegmentState) -> Self {
        let mut stats = RunningStats::new();
        stats.push(value);
        Self {
            start: ts,
            end: ts,
            state,
            stats,
            session_break: false,
        }
    }

    fn gap(start: Timestamp, end: Timestamp) -> Self {
        Self {
            start,
            end,
            state: SegmentState::Idle,
            stats: RunningStats::new(),
            session_break: true,
        }
    }

    fn finish(self) -> Segment {
        Segment {
            start: self.start,
            end: self.end,
            state: self.state,
            mean_value: self.stats.mean(),
            duration: seconds_between(self.start, self.end),
            sample_count: self.stats.count as usize,
            session_break: self.session_break,
        }
    }
}

fn group(points: &[(Timestamp, f64)], threshold: f64, max_gap: TimeDelta) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::new();
    for &(ts, value) in points {
        let state = SegmentState::classify(value, threshold);
        match candidates.last_mut() {
            Some(current) if current.state == state && ts - current.end <= max_gap => {
                current.end = ts;
                current.stats.push(value);
            }
            _ => candidates.push(Candidate::from_sample(ts, value, state)),
        }
    }
    candidates
}

fn bridge(candidates: Vec<Candidate>, max_gap: TimeDelta) -> Vec<Candidate> {
    let mut merged: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for mut next in candidates {
        let Some(prev) = merged.last_mut() else {
            merged.push(next);
            continue;
        };

        if next.start - prev.end <= max_gap {
            prev.end = next.start;
            merged.push(next);
            continue;
        }

        match (prev.state, next.state) {
            (SegmentState::Idle, _) => {
                prev.end = next.start;
                next.session_break = true;
            }
            (SegmentState::Moving, SegmentState::Idle) => {
                next.start = prev.end;
                next.session_break = true;
            }
            (SegmentState::Moving, SegmentState::Moving) => {
                let silence = Candidate::gap(prev.end, next.start);
                merged.push(silence);
            }
        }
        merged.push(next);
    }
    merged
}

fn stretch_to_window(segments: &mut Vec<Candidate>, window: &SessionWindow, max_gap: TimeDelta) {
    let Some(first) = segments.first_mut() else {
        return;
    };
    if first.start > window.start() {
        if first.start - window.start() <= max_gap || first.state == SegmentState::Idle {
            first.start = window.start();
        } else {
            let silence = Candidate::gap(window.start(), first.start);
            segments.insert(0, silence);
        }
    }

    let Some(last) = segments.last_mut() else {
        return;
    };
    if last.end < window.end() {
        if window.end() - last.end <= max_gap || last.state == SegmentState::Idle {
            last.end = window.end();
        } else {
            let silence = Candidate::gap(last.end, window.end());
            segments.push(silence);
        }
    }
}

/// Segment time-ordered `(timestamp, value)` points
///
/// `points` must be sorted by timestamp; NaN values are skipped. With a
/// `window`, points outside `[start, end)` are ignored and the result covers
/// the window exactly; otherwise it covers first to last point.
pub fn segment_points(
    points: &[(Timestamp, f64)],
    threshold: f64,
    max_gap_seconds: f64,
    window: Option<&SessionWindow>,
) -> Vec<Segment> {
    let max_gap = delta_from_seconds(max_gap_seconds.max(0.0));
    let points: Vec<(Timestamp, f64)> = points
        .iter()
        .copied()
        .filter(|(ts, v)| !v.is_nan() && window.map_or(true, |w| w.contains(*ts)))
        .collect();

    if points.is_empty() {
        return Vec::new();
    }

    let mut segments = bridge(group(&points, threshold, max_gap), max_gap);
    if let Some(window) = window {
        stretch_to_window(&mut segments, window, max_gap);
    }

    segments.into_iter().map(Candidate::finish).collect()
}

/// Segment one signal of a table over the span of its present samples
///
/// `threshold` is in the units of `signal`.
pub fn compute_segments(
    table: &SignalTable,
    signal: &str,
    threshold: f64,
    max_gap_seconds: f64,
) -> Vec<Segment> {
    let points: Vec<(Timestamp, f64)> = table.present(signal).collect();
    if points.is_empty() {
        tracing::debug!("No '{}' samples to segment", signal);
        return Vec::new();
    }
    let segments = segment_points(&points, threshold, max_gap_seconds, None);
    log_summary(signal, &segments);
    segments
}

/// Segment one signal of a table, covering `window` exactly
pub fn compute_segments_in(
    table: &SignalTable,
    signal: &str,
    window: &SessionWindow,
    threshold: f64,
    max_gap_seconds: f64,
) -> Vec<Segment> {
    let points: Vec<(Timestamp, f64)> = table.present(signal).collect();
    let segments = segment_points(&points, threshold, max_gap_seconds, Some(window));
    log_summary(signal, &segments);
    segments
}

fn log_summary(signal: &str, segments: &[Segment]) {
    let moving = segments
        .iter()
        .filter(|s| s.state == SegmentState::Moving)
        .count();
    tracing::debug!(
        "Segmented '{}': {} segments ({} moving, {} breaks)",
        signal,
        segments.len(),
        moving,
        segments.iter().filter(|s| s.session_break).count()
    );
}

/// Fraction of covered time spent Moving
///
/// Falls back to the fraction of Moving samples when the segments have zero
/// total duration. Empty input yields 0.0.
pub fn movement_ratio(segments: &[Segment]) -> f64 {
    let total: f64 = segments.iter().map(|s| s.duration).sum();
    if total > 0.0 {
        let moving: f64 = segments
            .iter()
            .filter(|s| s.state == SegmentState::Moving)
            .map(|s| s.duration)
            .sum();
        return moving / total;
    }

    let samples: usize = segments.iter().map(|s| s.sample_count).sum();
    if samples == 0 {
        return 0.0;
    }
    let moving: usize = segments
        .iter()
        .filter(|s| s.state == SegmentState::Moving)
        .map(|s| s.sample_count)
        .sum();
    moving as f64 / samples as f64
}

/// Segment that owns the row at `ts`
///
/// Segments own `[start, end)`, so a row on a shared boundary belongs to the
/// segment starting there. Two exceptions: a Moving segment followed by a
/// session break keeps its closing row, and the last segment owns its end.
pub fn segment_owning(segments: &[Segment], ts: Timestamp) -> Option<&Segment> {
    let idx = segments.partition_point(|s| s.end < ts);
    let seg = segments.get(idx)?;
    if ts < seg.start {
        return None;
    }
    if ts < seg.end {
        return Some(seg);
    }

    match segments.get(idx + 1) {
        Some(next)
            if next.start == ts
                && !(next.session_break && seg.state == SegmentState::Moving) =>
        {
            Some(next)
        }
        _ => Some(seg),
    }
}

/// Keep only the rows of `table` owned by a Moving segment
pub fn filter_moving(table: &SignalTable, segments: &[Segment]) -> SignalTable {
    table.filter_rows(|ts| {
        segment_owning(segments, ts).is_some_and(|s| s.state == SegmentState::Moving)
    })
}
