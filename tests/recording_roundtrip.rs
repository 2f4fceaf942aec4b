//! Recording and sequence exchange integration tests
//!
//! Covers arming, capture timing, the JSON round-trip of a recorded
//! take, and playing a take back through the scheduler.

use live_looper::engine::LooperEngine;
use live_looper::instrument::{InstrumentCall, NoteLog};
use live_looper::messaging::{Notification, NotificationConsumer};
use live_looper::{ManualClock, RecordingState, Sequence};
use ringbuf::traits::Consumer;

fn engine_at(bpm: f64) -> (LooperEngine<ManualClock, NoteLog>, NotificationConsumer) {
    LooperEngine::with_channel(ManualClock::with_bpm(bpm), NoteLog::new(), 512)
}

fn drain(rx: &mut NotificationConsumer) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Some(n) = rx.try_pop() {
        out.push(n);
    }
    out
}

/// Arming, waiting, then playing: the first note starts the take at
/// time zero with no leading silence
#[test]
fn test_armed_take_starts_at_first_note() {
    let (mut engine, _rx) = engine_at(100.0);

    engine.toggle_recording();
    assert_eq!(engine.recording_state(), RecordingState::Armed);

    engine.clock_mut().advance(2.0);
    engine.play_note("C4", 0.8);
    assert_eq!(engine.recording_state(), RecordingState::Recording);

    engine.clock_mut().advance(0.5);
    engine.release_note("C4");
    engine.toggle_recording();

    let sequence = engine.get_sequence();
    assert_eq!(sequence.events.len(), 1);
    assert_eq!(sequence.events[0].note, "C4");
    assert_eq!(sequence.events[0].start, 0.0);
    assert!((sequence.events[0].dur - 0.5).abs() < 1e-9);
    assert_eq!(sequence.events[0].vel, 0.8);
    assert_eq!(sequence.meta.record_bpm, 100.0);
}

/// Capture times are relative to the recording epoch, not the audio clock
#[test]
fn test_capture_times_relative_to_take_start() {
    let (mut engine, _rx) = engine_at(120.0);

    engine.clock_mut().advance(50.0);
    engine.start_recording(None, 0.8);

    engine.clock_mut().advance(0.5);
    engine.play_note("C4", 0.8);
    engine.clock_mut().advance(0.25);
    engine.release_note("C4");

    engine.clock_mut().advance(0.25);
    engine.play_note("E4", 0.6);
    engine.clock_mut().advance(0.5);
    engine.release_note("E4");

    engine.toggle_recording();

    let sequence = engine.get_sequence();
    assert_eq!(sequence.events.len(), 2);
    assert!((sequence.events[0].start - 0.5).abs() < 1e-9);
    assert!((sequence.events[0].dur - 0.25).abs() < 1e-9);
    assert!((sequence.events[1].start - 1.0).abs() < 1e-9);
    assert!((sequence.events[1].dur - 0.5).abs() < 1e-9);
}

/// A recorded take survives the JSON round-trip and a transfer into a
/// fresh engine, metadata included
#[test]
fn test_sequence_json_roundtrip_between_engines() {
    let (mut source, _rx) = engine_at(132.0);
    source.start_recording(Some("C4"), 0.7);
    source.clock_mut().advance(0.4);
    source.release_note("C4");
    source.clock_mut().advance(0.1);
    source.play_note("E4", 0.9);
    source.clock_mut().advance(0.3);
    source.release_note("E4");
    source.toggle_recording();

    let exported = source.get_sequence();
    let json = exported.to_json().unwrap();
    assert!(json.contains("\"recordBpm\":132.0"));

    let restored = Sequence::from_json(&json).unwrap();
    assert_eq!(restored, exported);

    let (mut target, _rx) = engine_at(120.0);
    target.set_sequence(restored, None);
    assert_eq!(target.get_sequence(), exported);
}

/// Clearing drops the events and re-freezes the tempo reference
#[test]
fn test_clear_sequence_resets_everything() {
    let (mut engine, mut rx) = engine_at(120.0);
    engine.start_recording(Some("C4"), 0.8);
    engine.release_note("C4");
    engine.toggle_recording();
    assert!(!engine.get_sequence().events.is_empty());

    engine.clock_mut().set_bpm(Some(90.0));
    drain(&mut rx);
    engine.clear_sequence();

    let sequence = engine.get_sequence();
    assert!(sequence.events.is_empty());
    assert_eq!(sequence.meta.record_bpm, 90.0);
    assert!(drain(&mut rx).contains(&Notification::StatusUpdate {
        message: "Status: Inactive".to_string()
    }));
}

/// Full circle: record a take, stop, play it back through the scheduler
#[test]
fn test_recorded_take_plays_back() {
    let (mut engine, _rx) = engine_at(120.0);

    engine.start_recording(None, 0.8);
    engine.clock_mut().advance(0.5);
    engine.play_note("C4", 0.8);
    engine.clock_mut().advance(0.25);
    engine.release_note("C4");
    engine.toggle_recording();

    engine.start_playback(None);
    engine.clock_mut().advance(1.0);
    engine.process_due_tasks();

    let triggers: Vec<(&str, f64, f64)> = engine
        .instrument()
        .calls()
        .iter()
        .filter_map(|c| match c {
            InstrumentCall::Trigger {
                note, duration, at, ..
            } => Some((note.as_str(), *at, *duration)),
            _ => None,
        })
        .collect();

    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].0, "C4");
    assert!((triggers[0].1 - 0.5).abs() < 1e-9);
    assert!((triggers[0].2 - 0.25).abs() < 1e-9);
}

/// Note visuals fire on press and release, recording or not
#[test]
fn test_note_visual_notifications() {
    let (mut engine, mut rx) = engine_at(120.0);
    drain(&mut rx);

    engine.play_note("C4", 0.8);
    engine.release_note("C4");

    let notifications = drain(&mut rx);
    assert!(notifications.contains(&Notification::NoteVisualChange {
        note: "C4".to_string(),
        active: true
    }));
    assert!(notifications.contains(&Notification::NoteVisualChange {
        note: "C4".to_string(),
        active: false
    }));
}
