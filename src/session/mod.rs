//! Session context and replay
//!
//! A [`Session`] owns everything one analysis run needs: the engine config,
//! the shared signal table, an optional window, and caches for results that
//! are expensive to derive. Nothing here is global; two sessions never share
//! state.
//!
//! # Features
//!
//! - Calibration, converted table and segments computed once on demand
//! - Changing the window drops every cached result
//! - Replay clocks over the converted table with an injectable [`Clock`]
//! - Telemetry sources: in-memory tables and JSON recordings
//!
//! # Example
//!
//! ```ignore
//! use slicks_rs::session::{RecordingSource, Session, SystemClock};
//!
//! let source = RecordingSource::open("run.json")?;
//! let window = source.recording().window().unwrap();
//! let session = Session::load(&source, window, EngineConfig::load_or_default())?;
//!
//! println!("{} segments", session.segments().len());
//! let mut replay = session.replay(SystemClock)?;
//! replay.start()?;
//! ```

pub mod clock;
pub mod replay;
pub mod source;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use replay::ReplayClock;
pub use source::{MemorySource, RecordingSource, TelemetrySource};
pub use types::{
    RecordingMetadata, ReplayFrame, ReplayState, SignalReading, TableRecording,
};

use std::cell::OnceCell;
use std::sync::Arc;

use crate::analysis::calibration::{compute_calibration, Calibration};
use crate::analysis::segmentation::{
    compute_segments, compute_segments_in, filter_moving, movement_ratio, Segment,
};
use crate::analysis::units::convert;
use crate::config::EngineConfig;
use crate::error::{Result, SlicksError};
use crate::table::SignalTable;
use crate::types::SessionWindow;

/// One analysis run over one table
#[derive(Debug)]
pub struct Session {
    config: EngineConfig,
    table: Arc<SignalTable>,
    window: Option<SessionWindow>,
    scoped: OnceCell<Arc<SignalTable>>,
    calibration: OnceCell<Calibration>,
    converted: OnceCell<Arc<SignalTable>>,
    segments: OnceCell<Vec<Segment>>,
}

impl Session {
    /// Create a session over a whole table
    pub fn new(table: impl Into<Arc<SignalTable>>, config: EngineConfig) -> Self {
        Self {
            config,
            table: table.into(),
            window: None,
            scoped: OnceCell::new(),
            calibration: OnceCell::new(),
            converted: OnceCell::new(),
            segments: OnceCell::new(),
        }
    }

    /// Fetch the configured signals for `window` and open a session over them
    pub fn load(
        source: &dyn TelemetrySource,
        window: SessionWindow,
        config: EngineConfig,
    ) -> Result<Self> {
        let mut signals = config.signals.raw_signals();
        if !signals.contains(&config.segmentation.movement_signal) {
            signals.push(config.segmentation.movement_signal.clone());
        }
        for extra in &config.replay.signals {
            if !signals.contains(extra) {
                signals.push(extra.clone());
            }
        }

        let table = source.get_table(&window, &signals)?;
        tracing::info!(
            "Loaded {} rows of {} signals for {} .. {}",
            table.len(),
            table.signal_names().count(),
            window.start(),
            window.end()
        );

        let mut session = Self::new(table, config);
        session.window = Some(window);
        Ok(session)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The full table, ignoring the window
    pub fn table(&self) -> &Arc<SignalTable> {
        &self.table
    }

    pub fn window(&self) -> Option<&SessionWindow> {
        self.window.as_ref()
    }

    /// Restrict (or un-restrict) the session and drop cached results
    pub fn set_window(&mut self, window: Option<SessionWindow>) {
        if self.window != window {
            tracing::debug!("Session window changed, clearing caches");
        }
        self.window = window;
        self.scoped = OnceCell::new();
        self.calibration = OnceCell::new();
        self.converted = OnceCell::new();
        self.segments = OnceCell::new();
    }

    /// Rows inside the window (the whole table without one)
    pub fn scoped_table(&self) -> &Arc<SignalTable> {
        self.scoped.get_or_init(|| match &self.window {
            Some(window) => Arc::new(self.table.slice(window)),
            None => Arc::clone(&self.table),
        })
    }

    /// Auto-zero calibration of the scoped rows
    pub fn calibration(&self) -> &Calibration {
        self.calibration
            .get_or_init(|| compute_calibration(self.scoped_table(), &self.config))
    }

    /// Scoped rows with derived physical columns
    pub fn converted(&self) -> Result<Arc<SignalTable>> {
        if let Some(table) = self.converted.get() {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(convert(
            self.scoped_table(),
            self.calibration(),
            &self.config.vehicle,
            &self.config.signals,
        )?);
        Ok(Arc::clone(self.converted.get_or_init(|| table)))
    }

    /// Moving/idle segments of the configured movement signal
    pub fn segments(&self) -> &[Segment] {
        self.segments.get_or_init(|| {
            let seg = &self.config.segmentation;
            match &self.window {
                Some(window) => compute_segments_in(
                    &self.table,
                    &seg.movement_signal,
                    window,
                    seg.movement_threshold,
                    seg.max_gap_seconds,
                ),
                None => compute_segments(
                    &self.table,
                    &seg.movement_signal,
                    seg.movement_threshold,
                    seg.max_gap_seconds,
                ),
            }
        })
    }

    /// Fraction of covered time spent moving
    pub fn movement_ratio(&self) -> f64 {
        movement_ratio(self.segments())
    }

    /// Converted rows that fall inside Moving segments
    pub fn moving_table(&self) -> Result<SignalTable> {
        let converted = self.converted()?;
        Ok(filter_moving(&converted, self.segments()))
    }

    /// Window a replay runs over: the session window, or the table span
    pub fn replay_window(&self) -> Result<SessionWindow> {
        if let Some(window) = &self.window {
            return Ok(*window);
        }
        let span = self
            .table
            .span()
            .ok_or_else(|| SlicksError::Range("cannot replay an empty table".to_string()))?;
        SessionWindow::new(span.start, span.end)
    }

    /// Replay clock over the converted table
    pub fn replay<C: Clock>(&self, clock: C) -> Result<ReplayClock<C>> {
        ReplayClock::new(
            self.converted()?,
            self.replay_window()?,
            &self.config.replay,
            clock,
        )
    }

    /// Replay clock over only the rows inside Moving segments
    pub fn replay_moving<C: Clock>(&self, clock: C) -> Result<ReplayClock<C>> {
        ReplayClock::new(
            Arc::new(self.moving_table()?),
            self.replay_window()?,
            &self.config.replay,
            clock,
        )
    }
}
