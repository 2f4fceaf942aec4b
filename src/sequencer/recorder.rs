// Recording session - Captures live note-on/note-off pairs
// Tracks held keys and the open events awaiting their note-off

use crate::sequencer::note::NoteEvent;
use std::collections::{HashMap, HashSet};

/// Recorder arm/record state
///
/// `Armed` means the next note-on begins recording retroactively at time
/// zero, so a performer can arm before playing the first note without a
/// silent gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    Armed,
    Recording,
}

impl RecordingState {
    pub fn is_recording(&self) -> bool {
        matches!(self, RecordingState::Recording)
    }

    pub fn is_armed(&self) -> bool {
        matches!(self, RecordingState::Armed)
    }
}

/// Live capture state for one take
#[derive(Debug, Clone, Default)]
pub struct RecordingSession {
    state: RecordingState,
    /// Audio-clock time at which recording began
    rec_epoch: f64,
    /// Currently held keys, recording or not
    sounding: HashSet<String>,
    /// note -> id of the open event awaiting note-off
    open_notes: HashMap<String, String>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }

    pub fn is_armed(&self) -> bool {
        self.state.is_armed()
    }

    pub fn arm(&mut self) {
        if self.state == RecordingState::Idle {
            self.state = RecordingState::Armed;
        }
    }

    pub fn disarm(&mut self) {
        if self.state == RecordingState::Armed {
            self.state = RecordingState::Idle;
        }
    }

    /// Begin a take at the given audio-clock time
    pub fn begin(&mut self, now: f64) {
        self.state = RecordingState::Recording;
        self.rec_epoch = now;
        self.open_notes.clear();
    }

    /// Leave `Recording` (or `Armed`) without touching held keys
    pub fn stop(&mut self) {
        self.state = RecordingState::Idle;
        self.open_notes.clear();
    }

    /// Whether the key is currently held
    pub fn is_sounding(&self, note: &str) -> bool {
        self.sounding.contains(note)
    }

    /// Register a key press; false if the key was already held
    /// (idempotent attack)
    pub fn press(&mut self, note: &str) -> bool {
        self.sounding.insert(note.to_string())
    }

    /// Register a key release; false if the key was not held
    pub fn release(&mut self, note: &str) -> bool {
        self.sounding.remove(note)
    }

    /// Time on the sequence timeline for an event captured now
    pub fn capture_time(&self, now: f64) -> f64 {
        (now - self.rec_epoch).max(0.0)
    }

    /// Capture a note-on at an explicit sequence time, returning the open
    /// event to append to the store
    pub fn capture_note_on(&mut self, note: &str, velocity: f32, time: f64) -> NoteEvent {
        let event = NoteEvent::open(note, time, velocity);
        self.open_notes.insert(note.to_string(), event.id.clone());
        event
    }

    /// Capture a note-off; returns the open event id and the end time on
    /// the sequence timeline, or None if the note was not being recorded
    pub fn capture_note_off(&mut self, note: &str, now: f64) -> Option<(String, f64)> {
        let id = self.open_notes.remove(note)?;
        Some((id, self.capture_time(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine_transitions() {
        let mut session = RecordingSession::new();
        assert_eq!(session.state(), RecordingState::Idle);

        session.arm();
        assert!(session.is_armed());

        session.begin(10.0);
        assert!(session.is_recording());
        assert!(!session.is_armed());

        session.stop();
        assert_eq!(session.state(), RecordingState::Idle);
    }

    #[test]
    fn test_disarm_only_leaves_armed() {
        let mut session = RecordingSession::new();
        session.begin(0.0);
        session.disarm();
        assert!(session.is_recording());

        let mut session = RecordingSession::new();
        session.arm();
        session.disarm();
        assert_eq!(session.state(), RecordingState::Idle);
    }

    #[test]
    fn test_press_is_idempotent() {
        let mut session = RecordingSession::new();

        assert!(session.press("C4"));
        assert!(!session.press("C4"));
        assert!(session.is_sounding("C4"));

        assert!(session.release("C4"));
        assert!(!session.release("C4"));
    }

    #[test]
    fn test_capture_pair() {
        let mut session = RecordingSession::new();
        session.begin(100.0);

        let time = session.capture_time(100.5);
        let event = session.capture_note_on("C4", 0.8, time);
        assert_eq!(event.start, 0.5);
        assert_eq!(event.dur, 0.0);

        let (id, end) = session.capture_note_off("C4", 101.25).unwrap();
        assert_eq!(id, event.id);
        assert_eq!(end, 1.25);

        // Second note-off for the same key finds nothing
        assert!(session.capture_note_off("C4", 102.0).is_none());
    }

    #[test]
    fn test_stop_clears_open_notes() {
        let mut session = RecordingSession::new();
        session.begin(0.0);
        session.press("C4");
        session.capture_note_on("C4", 0.8, 0.0);

        session.stop();

        assert!(session.capture_note_off("C4", 1.0).is_none());
        // Held keys survive the take ending
        assert!(session.is_sounding("C4"));
    }
}
