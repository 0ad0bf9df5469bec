//! Session data types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Result, ResultExt, SlicksError};
use crate::table::SignalTable;
use crate::types::{SessionWindow, Timestamp};

/// State of the replay clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReplayState {
    /// Cursor parked at the window start
    #[default]
    Stopped,
    /// Cursor follows wall-clock time
    Playing,
    /// Cursor frozen
    Paused,
    /// Cursor reached the window end
    Finished,
}

impl ReplayState {
    /// Check if currently playing
    pub fn is_playing(&self) -> bool {
        matches!(self, ReplayState::Playing)
    }

    /// Check if paused
    pub fn is_paused(&self) -> bool {
        matches!(self, ReplayState::Paused)
    }

    /// Check if playback has run to the end
    pub fn is_finished(&self) -> bool {
        matches!(self, ReplayState::Finished)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            ReplayState::Stopped => "Stopped",
            ReplayState::Playing => "Playing",
            ReplayState::Paused => "Paused",
            ReplayState::Finished => "Finished",
        }
    }
}

/// Value of one signal at the replay cursor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SignalReading {
    /// Latest sample is within the freshness limit
    Fresh { timestamp: Timestamp, value: f64 },
    /// Latest sample is older than the freshness limit; value still held
    Stale {
        timestamp: Timestamp,
        value: f64,
        age_secs: f64,
    },
    /// No sample at or before the cursor
    NoData,
}

impl SignalReading {
    /// The held value, stale or not
    pub fn value(&self) -> Option<f64> {
        match self {
            SignalReading::Fresh { value, .. } | SignalReading::Stale { value, .. } => Some(*value),
            SignalReading::NoData => None,
        }
    }

    /// Timestamp of the held sample
    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            SignalReading::Fresh { timestamp, .. } | SignalReading::Stale { timestamp, .. } => {
                Some(*timestamp)
            }
            SignalReading::NoData => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, SignalReading::Stale { .. })
    }

    pub fn has_data(&self) -> bool {
        !matches!(self, SignalReading::NoData)
    }
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    /// Virtual time of the frame
    pub cursor: Timestamp,
    /// Clock state after the tick
    pub state: ReplayState,
    /// Fraction of the window played, 0.0 to 1.0
    pub progress: f64,
    /// Reading per tracked signal
    pub values: BTreeMap<String, SignalReading>,
}

impl ReplayFrame {
    /// Held value of a signal, if any
    pub fn value(&self, signal: &str) -> Option<f64> {
        self.values.get(signal).and_then(SignalReading::value)
    }
}

/// Metadata for a recorded table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    /// Name/title of the recording
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// When the recording was written
    pub recorded_at: chrono::DateTime<chrono::Utc>,
    /// Signals present in the table
    pub signals: Vec<String>,
    /// Number of rows
    pub row_count: usize,
}

impl Default for RecordingMetadata {
    fn default() -> Self {
        Self {
            name: String::from("Untitled Recording"),
            description: None,
            recorded_at: chrono::Utc::now(),
            signals: Vec::new(),
            row_count: 0,
        }
    }
}

impl RecordingMetadata {
    /// Create new metadata with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A signal table persisted with its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecording {
    /// Recording metadata
    pub metadata: RecordingMetadata,
    /// Recorded signals
    pub table: SignalTable,
}

impl TableRecording {
    /// Wrap a table, filling in the signal list and row count
    pub fn new(metadata: RecordingMetadata, table: SignalTable) -> Self {
        let mut recording = Self { metadata, table };
        recording.finalize();
        recording
    }

    /// Window holding every row, the last one included
    ///
    /// `None` for an empty recording.
    pub fn window(&self) -> Option<SessionWindow> {
        SessionWindow::covering(self.table.span()?).ok()
    }

    /// Save recording to a file (JSON format)
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))
    }

    /// Load recording from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let recording: Self = serde_json::from_str(&json)
            .map_err(SlicksError::from)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        tracing::debug!(
            "Loaded recording '{}' ({} rows, {} signals)",
            recording.metadata.name,
            recording.table.len(),
            recording.metadata.signals.len()
        );
        Ok(recording)
    }

    /// Refresh metadata from the table contents
    pub fn finalize(&mut self) {
        self.metadata.signals = self.table.signal_names().map(String::from).collect();
        self.metadata.row_count = self.table.len();
    }
}
