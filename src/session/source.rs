//! Telemetry sources
//!
//! A [`TelemetrySource`] hands the engine a [`SignalTable`] for a window and a
//! list of signals. Querying, pivoting and resampling happen behind this
//! trait; the engine only sees the finished table.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::table::SignalTable;
use crate::types::SessionWindow;

use super::types::TableRecording;

/// Anything that can produce a signal table for a window
#[cfg_attr(test, mockall::automock)]
pub trait TelemetrySource {
    /// Rows inside `window` for the requested signals
    ///
    /// An empty `signals` list requests every available signal. Signals the
    /// source does not know are omitted rather than reported as errors.
    fn get_table(&self, window: &SessionWindow, signals: &[String]) -> Result<SignalTable>;
}

fn extract(table: &SignalTable, window: &SessionWindow, signals: &[String]) -> SignalTable {
    let sliced = table.slice(window);
    if signals.is_empty() {
        return sliced;
    }

    for missing in signals.iter().filter(|s| !table.has_signal(s)) {
        tracing::debug!("Source has no signal '{}'", missing);
    }
    sliced.select(signals)
}

/// Source backed by a table already in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    table: Arc<SignalTable>,
}

impl MemorySource {
    pub fn new(table: impl Into<Arc<SignalTable>>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &Arc<SignalTable> {
        &self.table
    }
}

impl TelemetrySource for MemorySource {
    fn get_table(&self, window: &SessionWindow, signals: &[String]) -> Result<SignalTable> {
        Ok(extract(&self.table, window, signals))
    }
}

/// Source backed by a JSON recording on disk
#[derive(Debug, Clone)]
pub struct RecordingSource {
    path: PathBuf,
    recording: TableRecording,
}

impl RecordingSource {
    /// Load the recording at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let recording = TableRecording::load_from_file(&path)?;
        tracing::info!(
            "Opened recording '{}' from {:?}",
            recording.metadata.name,
            path
        );
        Ok(Self { path, recording })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn recording(&self) -> &TableRecording {
        &self.recording
    }
}

impl TelemetrySource for RecordingSource {
    fn get_table(&self, window: &SessionWindow, signals: &[String]) -> Result<SignalTable> {
        Ok(extract(&self.recording.table, window, signals))
    }
}
