//! # Slicks-RS: Vehicle Telemetry Segmentation and Replay
//!
//! Turns time-stamped vehicle telemetry (motor speed, accelerometer axes) into
//! cleaned signal tables with derived physical quantities, splits a run into
//! moving and idle segments, and replays it against wall-clock time.
//!
//! ## Architecture
//!
//! - **Table**: immutable, validated, column-oriented signal storage
//! - **Analysis**: pure unit conversion, auto-zero calibration and segmentation
//! - **Session**: per-run context with cached results, telemetry sources and
//!   the `tick()`-driven replay clock
//! - **Config**: TOML/JSON engine configuration
//!
//! ## Configuration
//!
//! Without an explicit path the engine config is read from `SLICKS_CONFIG`, or
//! from the platform data directory under `dev.slicks.slicks-rs`:
//!
//! - **Linux**: `~/.local/share/dev.slicks.slicks-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.slicks.slicks-rs/config.toml`
//! - **Windows**: `%APPDATA%\dev.slicks.slicks-rs\config.toml`
//!
//! ## Example
//!
//! ```ignore
//! use slicks_rs::{
//!     config::EngineConfig,
//!     session::{ManualClock, Session},
//!     table::SignalTable,
//! };
//!
//! let session = Session::new(table, EngineConfig::load_or_default());
//! for segment in session.segments() {
//!     println!("{:?} for {:.1}s", segment.state, segment.duration);
//! }
//!
//! let clock = ManualClock::new();
//! let mut replay = session.replay(clock.clone())?;
//! replay.start()?;
//! clock.advance_secs(1.0);
//! let frame = replay.tick();
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod session;
pub mod table;
pub mod types;

// Re-export commonly used types
pub use analysis::{Calibration, Segment, SegmentState};
pub use config::EngineConfig;
pub use error::{Result, SlicksError};
pub use session::{ReplayClock, ReplayFrame, ReplayState, Session, TelemetrySource};
pub use table::SignalTable;
pub use types::{Sample, SessionWindow, Timestamp};
