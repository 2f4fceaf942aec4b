// Playback scheduling - Turns a sequence snapshot into timed note triggers
// Handles tempo rescale, loop wraparound, and resume-from-playhead; the
// engine submits the resulting plan to the clock adapter

use crate::clock::{ClockOwnership, ScheduleHandle};
use crate::sequencer::looper::LoopWindow;
use crate::sequencer::note::NoteEvent;

/// Slack past the last event before the terminal stop fires, seconds
pub const STOP_TAIL_SECONDS: f64 = 0.1;

/// Tolerance when deciding whether an event lies behind the playhead
const PLAYHEAD_EPSILON: f64 = 1e-6;

/// Synchronization reference supplied to `start_playback`
///
/// A host may hand over an absolute transport time, an absolute
/// audio-clock time, or both. With neither, the engine drives its own
/// transport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SyncDetail {
    /// Absolute host transport time to align the sequence origin with
    pub transport_time: Option<f64>,
    /// Absolute host audio-clock time; converted to a transport time via
    /// the observed offset between the two clocks at call time
    pub audio_time: Option<f64>,
    /// Where in the (scaled) timeline playback begins; non-zero when
    /// resuming during a live reschedule
    pub live_start_offset: f64,
    /// Resume mode: keep already-sounding notes alive across the restart
    pub resume: bool,
}

impl SyncDetail {
    pub fn transport(transport_time: f64) -> Self {
        Self {
            transport_time: Some(transport_time),
            ..Default::default()
        }
    }

    pub fn audio(audio_time: f64) -> Self {
        Self {
            audio_time: Some(audio_time),
            ..Default::default()
        }
    }

    /// Whether this reference puts the shared clock under host control
    pub fn is_host_sync(&self) -> bool {
        self.transport_time.is_some() || self.audio_time.is_some()
    }
}

/// One note trigger in a playback plan, offset seconds after the
/// reference point
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTrigger {
    pub note: String,
    pub velocity: f32,
    pub offset: f64,
    pub duration: f64,
}

/// Result of one planning pass over a sequence snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackPlan {
    /// Triggers in ascending offset order
    pub triggers: Vec<PlannedTrigger>,
    /// Terminal stop offset; None when looping (playback never ends on
    /// its own)
    pub stop_offset: Option<f64>,
    /// Playhead position relative to the window start
    pub playhead_relative: f64,
}

/// Bookkeeping for one live playback session
///
/// `scheduled` is the exhaustive set of clock handles that must be
/// cancelled to guarantee no stray callback fires. `generation`
/// increments per scheduling pass so a stale pass can never cancel
/// handles belonging to a newer one.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub ownership: ClockOwnership,
    /// Transport time of the sequence origin (reference minus playhead)
    pub playback_start_transport: f64,
    pub generation: u64,
    pub scheduled: Vec<ScheduleHandle>,
}

impl PlaybackSession {
    /// Take every outstanding handle, leaving the set empty
    pub fn take_handles(&mut self) -> Vec<ScheduleHandle> {
        std::mem::take(&mut self.scheduled)
    }
}

/// Compute the note triggers for one scheduling pass
///
/// Events are rescaled by `time_scale`, intersected with the active
/// window, and offset from the playhead. In loop mode an event behind the
/// playhead gains whole loop durations until its offset is non-negative
/// (it plays on the next lap); in linear mode it is dropped.
pub fn plan_playback(
    events: &[NoteEvent],
    time_scale: f64,
    window: &LoopWindow,
    live_start_offset: f64,
    scaled_duration: f64,
) -> PlaybackPlan {
    let live_start_offset = if live_start_offset.is_finite() {
        live_start_offset.max(0.0)
    } else {
        0.0
    };

    let playhead_relative = if window.active {
        ((live_start_offset - window.start).max(0.0) % window.duration).min(window.duration)
    } else {
        live_start_offset.min(scaled_duration)
    };

    let mut triggers = Vec::new();

    for event in events {
        if !event.start.is_finite() {
            continue;
        }
        let scaled_dur = (event.dur.max(0.0) * time_scale).max(NoteEvent::MIN_DURATION);
        if !scaled_dur.is_finite() || scaled_dur <= 0.0 {
            continue;
        }
        let scaled_start = event.start * time_scale;

        // Outside the loop window entirely
        if window.active
            && (scaled_start >= window.end || scaled_start + scaled_dur <= window.start)
        {
            continue;
        }

        let effective_start = if window.active {
            scaled_start.max(window.start)
        } else {
            scaled_start
        };
        let loop_relative = if window.active {
            (effective_start - window.start).max(0.0)
        } else {
            effective_start
        };

        let mut from_playhead = loop_relative - playhead_relative;
        if window.active {
            // Wraparound: behind the playhead means "on the next lap"
            while from_playhead < -PLAYHEAD_EPSILON {
                from_playhead += window.duration;
            }
        } else if from_playhead < -PLAYHEAD_EPSILON {
            continue;
        }

        triggers.push(PlannedTrigger {
            note: event.note.clone(),
            velocity: event.vel,
            offset: from_playhead.max(0.0),
            duration: scaled_dur,
        });
    }

    triggers.sort_by(|a, b| {
        a.offset
            .partial_cmp(&b.offset)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let stop_offset = if window.active {
        None
    } else {
        Some((scaled_duration + STOP_TAIL_SECONDS).max(0.0))
    };

    PlaybackPlan {
        triggers,
        stop_offset,
        playhead_relative,
    }
}
