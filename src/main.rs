//! Slicks replay - headless entry point
//!
//! Segments, calibrates and replays a recorded telemetry table from the
//! command line. Replay frames are produced on the main thread and printed by
//! a separate thread fed over a bounded channel.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser, Subcommand, ValueHint};
use crossbeam_channel::{bounded, Receiver};
use slicks_rs::{
    analysis::segmentation::SegmentState,
    config::EngineConfig,
    session::{RecordingSource, ReplayFrame, ReplayState, Session, SignalReading, SystemClock},
    types::SessionWindow,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Vehicle telemetry segmentation and replay", long_about = None)]
struct Cli {
    /// Engine config file (TOML, or JSON by extension)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List moving/idle segments of a recording
    Segments(InputArgs),
    /// Find the stationary window and report accelerometer bias
    Calibrate(InputArgs),
    /// Replay a recording in real time
    Replay(ReplayArgs),
}

#[derive(Parser, Debug)]
struct InputArgs {
    /// Recording file (JSON)
    #[arg(value_hint = ValueHint::FilePath)]
    recording: PathBuf,

    /// Window start (RFC 3339), defaults to the first row
    #[arg(long)]
    start: Option<DateTime<Utc>>,

    /// Window end (RFC 3339, exclusive), defaults to just past the last row
    #[arg(long)]
    end: Option<DateTime<Utc>>,

    /// Print JSON instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Playback speed multiplier (overrides the config)
    #[arg(long)]
    speed: Option<f64>,

    /// Frames per second
    #[arg(long, default_value_t = 10)]
    fps: u32,

    /// Only replay rows inside Moving segments
    #[arg(long, action = ArgAction::SetTrue)]
    moving_only: bool,

    /// Signals to print (comma separated, overrides the config)
    #[arg(long, value_delimiter = ',')]
    signals: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,slicks_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::load_or_default(),
    };

    match cli.command {
        Command::Segments(args) => handle_segments(args, config),
        Command::Calibrate(args) => handle_calibrate(args, config),
        Command::Replay(args) => handle_replay(args, config),
    }
}

fn open_session(args: &InputArgs, config: EngineConfig) -> Result<Session> {
    let source = RecordingSource::open(&args.recording)
        .with_context(|| format!("opening recording {}", args.recording.display()))?;

    if args.start.is_none() && args.end.is_none() {
        return Ok(Session::new(source.recording().table.clone(), config));
    }

    let span = source
        .recording()
        .table
        .span()
        .ok_or_else(|| anyhow!("recording {} has no rows", args.recording.display()))?;
    let covering = SessionWindow::covering(span)?;
    let window = SessionWindow::new(
        args.start.unwrap_or(covering.start()),
        args.end.unwrap_or(covering.end()),
    )?;
    Ok(Session::load(&source, window, config)?)
}

fn handle_segments(args: InputArgs, config: EngineConfig) -> Result<()> {
    let session = open_session(&args, config)?;
    let segments = session.segments();

    if args.json {
        println!("{}", serde_json::to_string_pretty(segments)?);
        return Ok(());
    }

    println!(
        "{:<5} {:<7} {:<32} {:>10} {:>12} {:>8}",
        "#", "state", "start", "duration", "mean", "samples"
    );
    for (i, seg) in segments.iter().enumerate() {
        let marker = if seg.session_break { "*" } else { "" };
        println!(
            "{:<5} {:<7} {:<32} {:>9.1}s {:>12.2} {:>8}{}",
            i,
            seg.state.display_name(),
            seg.start.to_rfc3339(),
            seg.duration,
            seg.mean_value,
            seg.sample_count,
            marker
        );
    }

    let moving = segments
        .iter()
        .filter(|s| s.state == SegmentState::Moving)
        .count();
    println!(
        "{} segments, {} moving, {:.1}% of time moving",
        segments.len(),
        moving,
        session.movement_ratio() * 100.0
    );
    Ok(())
}

fn handle_calibrate(args: InputArgs, config: EngineConfig) -> Result<()> {
    let session = open_session(&args, config)?;
    let calibration = session.calibration();

    if args.json {
        println!("{}", serde_json::to_string_pretty(calibration)?);
        return Ok(());
    }

    if !calibration.found {
        println!("No stationary window found; bias left at zero");
        return Ok(());
    }

    let raw = calibration.raw_bias();
    println!(
        "Bias: long {:+.4} G ({:+.1} LSB), lat {:+.4} G ({:+.1} LSB)",
        calibration.bias.long, raw.long, calibration.bias.lat, raw.lat
    );
    if let Some(window) = &calibration.source_window {
        println!(
            "From {} samples between {} and {}",
            calibration.sample_count,
            window.start.to_rfc3339(),
            window.end.to_rfc3339()
        );
    }
    Ok(())
}

fn handle_replay(args: ReplayArgs, mut config: EngineConfig) -> Result<()> {
    if let Some(speed) = args.speed {
        config.replay.speed_multiplier = speed;
    }
    if !args.signals.is_empty() {
        config.replay.signals = args.signals.clone();
    }
    if args.fps == 0 {
        return Err(anyhow!("--fps must be at least 1"));
    }

    let session = open_session(&args.input, config)?;
    let mut replay = if args.moving_only {
        session.replay_moving(SystemClock)?
    } else {
        session.replay(SystemClock)?
    };

    let (frame_tx, frame_rx) = bounded::<ReplayFrame>(64);
    let json = args.input.json;
    let printer = thread::spawn(move || print_frames(frame_rx, json));

    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(args.fps));
    replay.start()?;
    loop {
        let frame = replay.tick();
        let finished = frame.state == ReplayState::Finished;
        if frame_tx.send(frame).is_err() {
            tracing::warn!("Printer thread exited early");
            break;
        }
        if finished {
            break;
        }
        thread::sleep(frame_interval);
    }
    drop(frame_tx);

    printer
        .join()
        .map_err(|_| anyhow!("printer thread panicked"))?
}

fn print_frames(frames: Receiver<ReplayFrame>, json: bool) -> Result<()> {
    for frame in frames {
        if json {
            println!("{}", serde_json::to_string(&frame)?);
            continue;
        }

        let values: Vec<String> = frame
            .values
            .iter()
            .map(|(name, reading)| match reading {
                SignalReading::Fresh { value, .. } => format!("{}={:.2}", name, value),
                SignalReading::Stale { value, .. } => format!("{}={:.2}?", name, value),
                SignalReading::NoData => format!("{}=-", name),
            })
            .collect();
        println!(
            "{} {:>5.1}% {:<8} {}",
            frame.cursor.format("%H:%M:%S%.3f"),
            frame.progress * 100.0,
            frame.state.display_name(),
            values.join(" ")
        );
    }
    Ok(())
}
