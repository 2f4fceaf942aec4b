// Note event representation for the recorder
// A note event is a named pitch with a start, duration, and velocity
// relative to the sequence's own timeline origin

use serde::{Deserialize, Serialize};

/// A recorded or edited note event
///
/// `start` and `dur` are seconds on the sequence timeline (time 0 is the
/// first possible event). An open event (note-on captured, note-off not
/// yet seen) carries `dur = 0` until it is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Unique identifier, `{note}_{start:.4}` for recorded events
    pub id: String,
    /// Note name, e.g. "C4" or "A#5"
    pub note: String,
    /// Start time in seconds, >= 0
    pub start: f64,
    /// Duration in seconds
    pub dur: f64,
    /// Velocity in [0, 1]
    pub vel: f32,
}

impl NoteEvent {
    /// Smallest schedulable duration in seconds
    pub const MIN_DURATION: f64 = 0.001;

    /// Create an open event at `start` with zero duration
    pub fn open(note: &str, start: f64, vel: f32) -> Self {
        Self {
            id: format!("{}_{:.4}", note, start),
            note: note.to_string(),
            start,
            dur: 0.0,
            vel: vel.clamp(0.0, 1.0),
        }
    }

    /// End of the event on the sequence timeline
    pub fn end(&self) -> f64 {
        self.start + self.dur.max(0.0)
    }

    /// Clamp fields back into their invariants
    ///
    /// Non-finite values fall back rather than propagate; musical input
    /// must never crash a live performance.
    pub fn normalize(&mut self) {
        if !self.start.is_finite() {
            self.start = 0.0;
        }
        self.start = self.start.max(0.0);
        if !self.dur.is_finite() {
            self.dur = Self::MIN_DURATION;
        }
        self.dur = self.dur.max(Self::MIN_DURATION);
        if !self.vel.is_finite() {
            self.vel = 0.0;
        }
        self.vel = self.vel.clamp(0.0, 1.0);
    }
}

/// Partial update merged into an event by `edit_note`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotePatch {
    pub note: Option<String>,
    pub start: Option<f64>,
    pub dur: Option<f64>,
    pub vel: Option<f32>,
}

impl NotePatch {
    /// Merge into `event`, then re-normalize
    pub fn apply(&self, event: &mut NoteEvent) {
        if let Some(note) = &self.note {
            event.note = note.clone();
        }
        if let Some(start) = self.start {
            event.start = start;
        }
        if let Some(dur) = self.dur {
            event.dur = dur;
        }
        if let Some(vel) = self.vel {
            event.vel = vel;
        }
        event.normalize();
    }
}
