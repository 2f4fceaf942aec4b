// Sequence store - Ordered note events plus recording metadata
// Single writer (recording session or direct edit); scheduling passes
// read value snapshots so a mid-pass edit cannot corrupt them

use crate::sequencer::note::{NoteEvent, NotePatch};
use crate::sequencer::timeline::Tempo;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fallback sequence length: a 64-step sixteenth-note grid at the
/// recorded tempo
pub const DEFAULT_SEQUENCE_STEPS: u32 = 64;
pub const STEP_FRACTION_OF_BEAT: f64 = 0.25;

/// Sequence error types
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Recording metadata frozen with the sequence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceMeta {
    /// BPM the clock reported when recording stopped; reference tempo for
    /// all future tempo rescaling
    pub record_bpm: f64,
}

impl SequenceMeta {
    pub fn new(record_bpm: f64) -> Self {
        Self { record_bpm }
    }
}

impl Default for SequenceMeta {
    fn default() -> Self {
        Self {
            record_bpm: Tempo::DEFAULT_BPM,
        }
    }
}

/// A recorded performance: events plus metadata
///
/// This is the exact shape exchanged by `get_sequence`/`set_sequence`
/// and it round-trips through JSON verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub events: Vec<NoteEvent>,
    pub meta: SequenceMeta,
}

impl Sequence {
    pub fn to_json(&self) -> Result<String, SequenceError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SequenceError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Accepted shapes for `set_sequence`: a bare event list or a full
/// sequence with metadata
#[derive(Debug, Clone, PartialEq)]
pub enum SequencePayload {
    Events(Vec<NoteEvent>),
    Full(Sequence),
}

impl From<Vec<NoteEvent>> for SequencePayload {
    fn from(events: Vec<NoteEvent>) -> Self {
        SequencePayload::Events(events)
    }
}

impl From<Sequence> for SequencePayload {
    fn from(sequence: Sequence) -> Self {
        SequencePayload::Full(sequence)
    }
}

/// Owner of the sequence data
#[derive(Debug, Clone)]
pub struct SequenceStore {
    events: Vec<NoteEvent>,
    meta: SequenceMeta,
}

impl SequenceStore {
    pub fn new(record_bpm: f64) -> Self {
        Self {
            events: Vec::new(),
            meta: SequenceMeta::new(record_bpm),
        }
    }

    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn record_bpm(&self) -> f64 {
        self.meta.record_bpm
    }

    pub fn set_record_bpm(&mut self, bpm: f64) {
        self.meta.record_bpm = Tempo::from_bpm(bpm).bpm();
    }

    /// Append an event (typically an open one created by the recorder)
    pub fn push(&mut self, event: NoteEvent) {
        self.events.push(event);
    }

    /// Close an open event: set its duration from the end time relative
    /// to the recording epoch
    pub fn close(&mut self, id: &str, end_time: f64) {
        if let Some(event) = self.events.iter_mut().find(|e| e.id == id) {
            event.dur = (end_time - event.start).max(0.0);
        }
    }

    /// Merge a patch into `events[index]` and re-normalize
    ///
    /// Out-of-range indices are ignored, not an error. Returns whether an
    /// event was touched (the caller uses this to queue a live reschedule).
    pub fn edit(&mut self, index: usize, patch: &NotePatch) -> bool {
        match self.events.get_mut(index) {
            Some(event) => {
                patch.apply(event);
                true
            }
            None => false,
        }
    }

    /// Drop all events and start a fresh take
    pub fn reset_events(&mut self) {
        self.events.clear();
    }

    /// Clear everything and re-freeze the reference tempo
    pub fn clear(&mut self, record_bpm: f64) {
        self.events.clear();
        self.set_record_bpm(record_bpm);
    }

    /// Value snapshot read by one scheduling pass
    pub fn snapshot(&self) -> Sequence {
        Sequence {
            events: self.events.clone(),
            meta: self.meta,
        }
    }

    /// Replace contents from an external payload
    ///
    /// Missing metadata falls back to `fallback_bpm`.
    pub fn replace(
        &mut self,
        events: Vec<NoteEvent>,
        meta: Option<SequenceMeta>,
        fallback_bpm: f64,
    ) {
        self.events = events;
        self.meta = meta.unwrap_or_else(|| SequenceMeta::new(Tempo::from_bpm(fallback_bpm).bpm()));
    }

    /// Sequence duration in seconds after tempo rescaling
    ///
    /// Floors at the default 64-step grid length so a short take still
    /// leaves room for overdubs and a sane loop region.
    pub fn duration_seconds(&self, time_scale: f64) -> f64 {
        let base = self
            .events
            .iter()
            .map(NoteEvent::end)
            .fold(0.0_f64, f64::max);

        let reference_bpm = Tempo::from_bpm(self.meta.record_bpm).bpm();
        let seconds_per_beat = 60.0 / reference_bpm.max(1e-6);
        let default_duration =
            seconds_per_beat * STEP_FRACTION_OF_BEAT * DEFAULT_SEQUENCE_STEPS as f64;

        base.max(default_duration) * time_scale
    }
}

impl Default for SequenceStore {
    fn default() -> Self {
        Self::new(Tempo::DEFAULT_BPM)
    }
}
