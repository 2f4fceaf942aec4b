// Instrument boundary - The synthesis collaborator the engine drives
// Voice generation itself lives outside this crate

/// Sound-producing collaborator
///
/// `note_on`/`note_off` are the live-performance path; `trigger` is the
/// scheduled-playback path, sounding a note for a fixed duration at the
/// given audio time.
pub trait Instrument {
    fn note_on(&mut self, note: &str, velocity: f32);

    fn note_off(&mut self, note: &str);

    /// Attack + timed release at an absolute audio time
    fn trigger(&mut self, note: &str, velocity: f32, duration: f64, at: f64);

    /// Silence every sounding voice
    fn release_all(&mut self);
}

/// A call observed by [`NoteLog`]
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentCall {
    NoteOn { note: String, velocity: f32 },
    NoteOff { note: String },
    Trigger {
        note: String,
        velocity: f32,
        duration: f64,
        at: f64,
    },
    ReleaseAll,
}

/// Instrument that records every call it receives
///
/// Used by the crate's own tests and handy for offline drivers that want
/// to inspect what would have sounded.
#[derive(Debug, Clone, Default)]
pub struct NoteLog {
    calls: Vec<InstrumentCall>,
}

impl NoteLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[InstrumentCall] {
        &self.calls
    }

    /// Only the scheduled-playback triggers, in call order
    pub fn triggers(&self) -> Vec<&InstrumentCall> {
        self.calls
            .iter()
            .filter(|c| matches!(c, InstrumentCall::Trigger { .. }))
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Instrument for NoteLog {
    fn note_on(&mut self, note: &str, velocity: f32) {
        self.calls.push(InstrumentCall::NoteOn {
            note: note.to_string(),
            velocity,
        });
    }

    fn note_off(&mut self, note: &str) {
        self.calls.push(InstrumentCall::NoteOff {
            note: note.to_string(),
        });
    }

    fn trigger(&mut self, note: &str, velocity: f32, duration: f64, at: f64) {
        self.calls.push(InstrumentCall::Trigger {
            note: note.to_string(),
            velocity,
            duration,
            at,
        });
    }

    fn release_all(&mut self) {
        self.calls.push(InstrumentCall::ReleaseAll);
    }
}
