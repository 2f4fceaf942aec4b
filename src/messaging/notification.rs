// Typed notifications emitted to external collaborators (UI, app state)
// A closed set of named messages replaces an untyped event bus

use crate::sequencer::looper::LoopSettings;

/// Notification payloads emitted by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The stored sequence was replaced or cleared
    SequenceChanged,
    /// Record/arm/play flags changed
    RecordingStateChanged {
        is_recording: bool,
        is_armed: bool,
        is_playing: bool,
        has_sequence: bool,
    },
    /// A playback session began
    PlaybackStarted {
        transport_start: f64,
        transport_reference: f64,
        loop_settings: LoopSettings,
    },
    /// A playback session ended (user stop or natural end)
    PlaybackStopped { transport_stop: f64 },
    /// A key should light up or go dark
    NoteVisualChange { note: String, active: bool },
    /// Every held key should be released visually
    ReleaseAllKeys,
    /// Human-readable status line
    StatusUpdate { message: String },
}

/// Status line for the current record/arm/play flags
pub fn status_message(
    is_recording: bool,
    is_armed: bool,
    is_playing: bool,
    has_sequence: bool,
) -> String {
    let text = if is_recording {
        "Recording..."
    } else if is_playing {
        "Playing..."
    } else if is_armed {
        "Armed for Recording"
    } else if has_sequence {
        "Sequence Ready"
    } else {
        "Inactive"
    };
    format!("Status: {}", text)
}
