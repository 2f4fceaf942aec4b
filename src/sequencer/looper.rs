// Loop controller - Maps elapsed time onto the active loop window
// Pure computation, no side effects

use serde::{Deserialize, Serialize};

/// Floor for the loop duration, guards downstream modulo and division
pub const MIN_LOOP_DURATION: f64 = 1e-4;

/// User-facing loop region configuration
///
/// Valid only when `enabled && end > start`; otherwise the whole sequence
/// plays as a single non-repeating window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoopSettings {
    pub enabled: bool,
    pub start: f64,
    pub end: f64,
}

impl LoopSettings {
    pub fn region(start: f64, end: f64) -> Self {
        Self {
            enabled: true,
            start,
            end,
        }
    }
}

/// Resolved playback window for one scheduling pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopWindow {
    /// Whether playback wraps at `end`
    pub active: bool,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

/// Resolve the active window from loop settings and the scaled sequence
/// duration
pub fn loop_window(sequence_duration: f64, settings: &LoopSettings) -> LoopWindow {
    let active = settings.enabled
        && settings.start.is_finite()
        && settings.end.is_finite()
        && settings.end > settings.start;

    if active {
        LoopWindow {
            active: true,
            start: settings.start,
            end: settings.end,
            duration: (settings.end - settings.start).max(MIN_LOOP_DURATION),
        }
    } else {
        LoopWindow {
            active: false,
            start: 0.0,
            end: sequence_duration,
            duration: sequence_duration.max(MIN_LOOP_DURATION),
        }
    }
}
