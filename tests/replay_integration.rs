//! Replay clock driven by a manual clock over recorded data

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::builders::DriveLogBuilder;
use common::{assert_float_eq, ts};
use proptest::prelude::*;
use slicks_rs::config::ReplayConfig;
use slicks_rs::session::{
    ManualClock, MemorySource, RecordingMetadata, RecordingSource, ReplayClock, ReplayState,
    SignalReading, TableRecording,
};
use slicks_rs::{EngineConfig, Session, SessionWindow, SignalTable};

fn drive_table() -> Arc<SignalTable> {
    Arc::new(
        DriveLogBuilder::new()
            .parked(5)
            .driving(10, 3000.0)
            .gap(20)
            .parked(5)
            .build(),
    )
}

fn replay_over(table: Arc<SignalTable>, clock: &ManualClock) -> ReplayClock<ManualClock> {
    let span = table.span().unwrap();
    let window = SessionWindow::new(span.start, span.end).unwrap();
    ReplayClock::new(table, window, &ReplayConfig::default(), clock.clone()).unwrap()
}

#[test]
fn test_plays_through_to_finished() {
    let clock = ManualClock::new();
    let mut replay = replay_over(drive_table(), &clock);
    replay.start().unwrap();

    let mut frames = 0;
    loop {
        let frame = replay.tick();
        frames += 1;
        if frame.state == ReplayState::Finished {
            assert_eq!(frame.cursor, ts(39));
            assert_float_eq(frame.progress, 1.0, 1e-12);
            break;
        }
        clock.advance(Duration::from_millis(500));
        assert!(frames < 1000, "replay never finished");
    }
    assert_eq!(frames, 79);

    // Wall time keeps running after the end; the cursor does not
    let end = replay.window().end();
    for _ in 0..10 {
        clock.advance(Duration::from_secs(5));
        let frame = replay.tick();
        assert_eq!(frame.cursor, end);
        assert_eq!(frame.state, ReplayState::Finished);
    }
}

#[test]
fn test_silent_stretch_reports_stale() {
    let clock = ManualClock::new();
    let mut replay = replay_over(drive_table(), &clock);
    // Last driving row is t=14, data resumes at t=35
    replay.seek(ts(20));

    let frame = replay.tick();
    match frame.values["INV_Motor_Speed"] {
        SignalReading::Stale { value, age_secs, .. } => {
            assert_eq!(value, 3000.0);
            assert_float_eq(age_secs, 6.0, 1e-9);
        }
        other => panic!("expected a stale reading, got {:?}", other),
    }

    replay.seek(ts(35));
    assert!(!replay.tick().values["INV_Motor_Speed"].is_stale());
}

#[test]
fn test_high_speed_replay() {
    let clock = ManualClock::new();
    let mut replay = replay_over(drive_table(), &clock);
    replay.set_speed_multiplier(10.0).unwrap();
    replay.start().unwrap();

    clock.advance(Duration::from_secs(1));
    assert_eq!(replay.tick().cursor, ts(10));
    clock.advance(Duration::from_secs(10));
    assert_eq!(replay.tick().state, ReplayState::Finished);
}

#[test]
fn test_replay_from_recording_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drive.json");
    let table = (*drive_table()).clone();
    TableRecording::new(RecordingMetadata::new("Drive"), table)
        .save_to_file(&path)
        .unwrap();

    let source = RecordingSource::open(&path).unwrap();
    let window = source.recording().window().unwrap();
    let session = Session::load(&source, window, EngineConfig::default()).unwrap();

    let clock = ManualClock::new();
    let mut replay = session.replay(clock.clone()).unwrap();
    replay.start().unwrap();
    clock.advance(Duration::from_secs(7));

    let frame = replay.tick();
    assert_float_eq(frame.value("Speed_MPS").unwrap(), 17.96, 0.01);
    assert!(frame.values.contains_key("G_Sum"));
}

#[test]
fn test_moving_only_replay_skips_parked_rows() {
    let source = MemorySource::new(drive_table());
    let window = SessionWindow::new(ts(0), ts(40)).unwrap();
    let session = Session::load(&source, window, EngineConfig::default()).unwrap();

    let clock = ManualClock::new();
    let mut replay = session.replay_moving(clock.clone()).unwrap();
    replay.seek(ts(2));
    assert_eq!(
        replay.tick().values["INV_Motor_Speed"],
        SignalReading::NoData
    );
}

#[derive(Debug, Clone)]
enum Action {
    Advance(u64),
    Pause,
    Resume,
    Speed(f64),
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => (0u64..5_000).prop_map(Action::Advance),
        1 => Just(Action::Pause),
        1 => Just(Action::Resume),
        1 => (0.1f64..20.0).prop_map(Action::Speed),
    ]
}

proptest! {
    #[test]
    fn cursor_never_moves_backwards(actions in prop::collection::vec(action_strategy(), 1..60)) {
        let clock = ManualClock::new();
        let mut replay = replay_over(drive_table(), &clock);
        replay.start().unwrap();

        let mut previous = replay.tick().cursor;
        for action in actions {
            match action {
                Action::Advance(ms) => clock.advance(Duration::from_millis(ms)),
                Action::Pause => { let _ = replay.pause(); }
                Action::Resume => { let _ = replay.resume(); }
                Action::Speed(s) => replay.set_speed_multiplier(s).unwrap(),
            }
            let frame = replay.tick();
            prop_assert!(frame.cursor >= previous);
            prop_assert!(replay.window().start() <= frame.cursor);
            prop_assert!(frame.cursor <= replay.window().end());
            previous = frame.cursor;
        }
    }
}
