//! Replay clock for stepping a virtual cursor through a recorded window
//!
//! The host calls [`ReplayClock::tick`] once per frame. Each tick advances the
//! cursor from wall-clock time scaled by the speed multiplier and looks up the
//! latest sample of every tracked signal at or before the cursor.
//!
//! The cursor is derived from an anchor instant and the virtual offset held at
//! that anchor: `cursor = window.start + offset + (now - anchor) * speed`.
//! Pausing, seeking and rate changes fold the elapsed time into the offset and
//! re-anchor, so time tracking stays continuous across control calls.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, TimeDelta};

use crate::config::ReplayConfig;
use crate::error::{Result, SlicksError};
use crate::table::SignalTable;
use crate::types::{delta_from_seconds, delta_seconds, SessionWindow, Timestamp};

use super::clock::{Clock, SystemClock};
use super::types::{ReplayFrame, ReplayState, SignalReading};

/// Slowest accepted playback rate
pub const MIN_SPEED_MULTIPLIER: f64 = 0.1;

/// Fastest accepted playback rate
pub const MAX_SPEED_MULTIPLIER: f64 = 100.0;

/// Replay clock over one session window
#[derive(Debug)]
pub struct ReplayClock<C: Clock = SystemClock> {
    clock: C,
    table: Arc<SignalTable>,
    window: SessionWindow,
    signals: Vec<String>,
    state: ReplayState,
    /// Virtual time of the last update
    cursor: Timestamp,
    /// Virtual time per wall-clock time
    speed_multiplier: f64,
    /// Wall-clock instant the current playing stretch began
    playback_start: Option<Instant>,
    /// Virtual offset from the window start at `playback_start`
    playback_offset: TimeDelta,
    stale_after: TimeDelta,
}

impl ReplayClock<SystemClock> {
    /// Create a clock driven by the system clock
    pub fn with_system_clock(
        table: Arc<SignalTable>,
        window: SessionWindow,
        config: &ReplayConfig,
    ) -> Result<Self> {
        Self::new(table, window, config, SystemClock)
    }
}

impl<C: Clock> ReplayClock<C> {
    /// Create a stopped clock with the cursor at the window start
    ///
    /// Tracks `config.signals`, or every table signal when that list is empty.
    pub fn new(
        table: Arc<SignalTable>,
        window: SessionWindow,
        config: &ReplayConfig,
        clock: C,
    ) -> Result<Self> {
        let speed_multiplier = checked_speed(config.speed_multiplier)?;
        let signals = if config.signals.is_empty() {
            table.signal_names().map(String::from).collect()
        } else {
            config.signals.clone()
        };

        Ok(Self {
            clock,
            table,
            cursor: window.start(),
            window,
            signals,
            state: ReplayState::Stopped,
            speed_multiplier,
            playback_start: None,
            playback_offset: TimeDelta::zero(),
            stale_after: delta_from_seconds(config.stale_after_secs.max(0.0)),
        })
    }

    /// Get current state
    pub fn state(&self) -> ReplayState {
        self.state
    }

    /// Check if playing
    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    /// Virtual time as of the last update
    pub fn cursor(&self) -> Timestamp {
        self.cursor
    }

    pub fn window(&self) -> &SessionWindow {
        &self.window
    }

    pub fn table(&self) -> &Arc<SignalTable> {
        &self.table
    }

    /// Signals reported by [`tick`](Self::tick)
    pub fn signals(&self) -> &[String] {
        &self.signals
    }

    /// Get playback speed
    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    /// Fraction of the window played (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        let total = self.window.duration_secs();
        if total <= 0.0 {
            return 0.0;
        }
        (delta_seconds(self.cursor - self.window.start()) / total).clamp(0.0, 1.0)
    }

    /// Start playback from the window start
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            ReplayState::Stopped | ReplayState::Finished => {
                self.cursor = self.window.start();
                self.playback_offset = TimeDelta::zero();
                self.playback_start = Some(self.clock.now());
                self.transition(ReplayState::Playing);
                Ok(())
            }
            state => Err(self.state_error("start", state)),
        }
    }

    /// Freeze the cursor
    pub fn pause(&mut self) -> Result<()> {
        match self.state {
            ReplayState::Playing => {
                self.update_cursor();
                self.playback_offset = self.cursor - self.window.start();
                self.playback_start = None;
                self.transition(ReplayState::Paused);
                Ok(())
            }
            ReplayState::Paused => Ok(()),
            state => Err(self.state_error("pause", state)),
        }
    }

    /// Continue from the frozen cursor
    pub fn resume(&mut self) -> Result<()> {
        match self.state {
            ReplayState::Paused => {
                self.playback_start = Some(self.clock.now());
                self.transition(ReplayState::Playing);
                Ok(())
            }
            ReplayState::Playing => Ok(()),
            state => Err(self.state_error("resume", state)),
        }
    }

    /// Jump to `target` (clamped into the window) and play from there
    ///
    /// Seeking to the window end finishes playback.
    pub fn seek(&mut self, target: Timestamp) {
        let target = target.clamp(self.window.start(), self.window.end());
        self.cursor = target;
        self.playback_offset = target - self.window.start();

        if target >= self.window.end() {
            self.playback_start = None;
            self.transition(ReplayState::Finished);
        } else {
            self.playback_start = Some(self.clock.now());
            self.transition(ReplayState::Playing);
        }
    }

    /// Seek to a Unix epoch instant in milliseconds
    pub fn seek_epoch_millis(&mut self, millis: i64) -> Result<()> {
        let target = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
            SlicksError::Range(format!("epoch millis {} is not a representable instant", millis))
        })?;
        self.seek(target);
        Ok(())
    }

    /// Seek by progress (0.0 to 1.0)
    pub fn seek_progress(&mut self, progress: f64) {
        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        let offset = delta_from_seconds(self.window.duration_secs() * progress);
        let target = self
            .window
            .start()
            .checked_add_signed(offset)
            .unwrap_or(self.window.end());
        self.seek(target);
    }

    /// Stop playback and reset to the window start
    pub fn stop(&mut self) {
        self.cursor = self.window.start();
        self.playback_offset = TimeDelta::zero();
        self.playback_start = None;
        if self.state != ReplayState::Stopped {
            self.transition(ReplayState::Stopped);
        }
    }

    /// Step to the next sample timestamp and hold there
    ///
    /// Returns `false` when there is no later sample inside the window.
    pub fn step_forward(&mut self) -> bool {
        self.update_cursor();
        match self.table.next_timestamp_after(self.cursor) {
            Some(next) if next <= self.window.end() => {
                self.hold_at(next);
                true
            }
            _ => false,
        }
    }

    /// Step to the previous sample timestamp and hold there
    ///
    /// Returns `false` when there is no earlier sample inside the window.
    pub fn step_backward(&mut self) -> bool {
        self.update_cursor();
        match self.table.prev_timestamp_before(self.cursor) {
            Some(prev) if prev >= self.window.start() => {
                self.hold_at(prev);
                true
            }
            _ => false,
        }
    }

    /// Change the playback rate without jumping the cursor
    ///
    /// Rates are clamped to `[0.1, 100]`; zero, negative and NaN rates are
    /// rejected.
    pub fn set_speed_multiplier(&mut self, speed: f64) -> Result<()> {
        let speed = checked_speed(speed)?;
        if self.is_playing() {
            self.update_cursor();
            self.playback_offset = self.cursor - self.window.start();
            self.playback_start = Some(self.clock.now());
        }
        self.speed_multiplier = speed;
        Ok(())
    }

    /// Advance the cursor and collect the current readings
    pub fn tick(&mut self) -> ReplayFrame {
        if self.is_playing() {
            self.update_cursor();
            if self.cursor >= self.window.end() {
                self.playback_start = None;
                self.playback_offset = self.window.duration();
                self.transition(ReplayState::Finished);
            }
        }

        let values = self
            .signals
            .iter()
            .map(|signal| (signal.clone(), self.reading(signal)))
            .collect::<BTreeMap<_, _>>();

        ReplayFrame {
            cursor: self.cursor,
            state: self.state,
            progress: self.progress(),
            values,
        }
    }

    /// Latest reading of `signal` at the current cursor
    pub fn reading(&self, signal: &str) -> SignalReading {
        match self.table.last_at_or_before(signal, self.cursor) {
            Some((timestamp, value)) => {
                let age = self.cursor - timestamp;
                if age > self.stale_after {
                    SignalReading::Stale {
                        timestamp,
                        value,
                        age_secs: delta_seconds(age),
                    }
                } else {
                    SignalReading::Fresh { timestamp, value }
                }
            }
            None => SignalReading::NoData,
        }
    }

    fn update_cursor(&mut self) {
        let Some(anchor) = self.playback_start else {
            return;
        };
        let real_elapsed = self.clock.now().saturating_duration_since(anchor);
        let virtual_elapsed = delta_from_seconds(real_elapsed.as_secs_f64() * self.speed_multiplier);
        let cursor = self
            .window
            .start()
            .checked_add_signed(self.playback_offset)
            .and_then(|t| t.checked_add_signed(virtual_elapsed))
            .unwrap_or(self.window.end());
        self.cursor = cursor.min(self.window.end());
    }

    fn hold_at(&mut self, target: Timestamp) {
        self.cursor = target;
        self.playback_offset = target - self.window.start();
        self.playback_start = None;
        if target >= self.window.end() {
            self.transition(ReplayState::Finished);
        } else if self.state != ReplayState::Paused {
            self.transition(ReplayState::Paused);
        }
    }

    fn transition(&mut self, next: ReplayState) {
        if self.state != next {
            tracing::debug!(
                "Replay {} -> {} at {}",
                self.state.display_name(),
                next.display_name(),
                self.cursor
            );
        }
        self.state = next;
    }

    fn state_error(&self, operation: &'static str, state: ReplayState) -> SlicksError {
        tracing::warn!("Rejected replay {} while {}", operation, state.display_name());
        SlicksError::State {
            operation,
            state: state.display_name(),
        }
    }
}

fn checked_speed(speed: f64) -> Result<f64> {
    if speed.is_nan() || speed <= 0.0 {
        return Err(SlicksError::Range(format!(
            "speed multiplier must be positive, got {}",
            speed
        )));
    }
    Ok(speed.clamp(MIN_SPEED_MULTIPLIER, MAX_SPEED_MULTIPLIER))
}
