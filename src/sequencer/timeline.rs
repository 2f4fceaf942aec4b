// Timeline - Tempo representation and tempo rescaling
// Converts between recorded time and playback time across tempo changes

use std::fmt;

/// Tempo in BPM (Beats Per Minute)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    pub const DEFAULT_BPM: f64 = 120.0;

    /// Creates a new tempo
    /// BPM must be in range [20.0, 999.0]
    pub fn new(bpm: f64) -> Self {
        assert!(
            (20.0..=999.0).contains(&bpm),
            "BPM must be between 20 and 999"
        );
        Self { bpm }
    }

    /// Lenient constructor for live input: non-finite or non-positive
    /// values fall back to the default tempo instead of panicking
    pub fn from_bpm(bpm: f64) -> Self {
        if bpm.is_finite() && bpm > 0.0 {
            Self { bpm }
        } else {
            Self {
                bpm: Self::DEFAULT_BPM,
            }
        }
    }

    /// Get BPM value
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self {
            bpm: Self::DEFAULT_BPM,
        }
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.bpm)
    }
}

/// Proportional time scale applied to every recorded offset and duration
///
/// `record_bpm / current_bpm`: a sequence recorded at 120 BPM and played
/// at 60 BPM stretches by 2x. Never zero or non-finite; degenerate input
/// yields the identity scale.
pub fn playback_time_scale(record_bpm: f64, current_bpm: f64) -> f64 {
    if !record_bpm.is_finite()
        || !current_bpm.is_finite()
        || record_bpm <= 0.0
        || current_bpm <= 0.0
    {
        return 1.0;
    }
    record_bpm / current_bpm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo_beat_duration() {
        let tempo = Tempo::new(120.0);
        assert_eq!(tempo.beat_duration_seconds(), 0.5);

        let tempo = Tempo::new(60.0);
        assert_eq!(tempo.beat_duration_seconds(), 1.0);
    }

    #[test]
    fn test_tempo_lenient_fallback() {
        assert_eq!(Tempo::from_bpm(f64::NAN).bpm(), Tempo::DEFAULT_BPM);
        assert_eq!(Tempo::from_bpm(0.0).bpm(), Tempo::DEFAULT_BPM);
        assert_eq!(Tempo::from_bpm(-30.0).bpm(), Tempo::DEFAULT_BPM);
        assert_eq!(Tempo::from_bpm(140.0).bpm(), 140.0);
    }

    #[test]
    #[should_panic(expected = "BPM must be between 20 and 999")]
    fn test_tempo_out_of_range() {
        Tempo::new(5000.0);
    }

    #[test]
    fn test_time_scale_identity() {
        assert_eq!(playback_time_scale(120.0, 120.0), 1.0);
    }

    #[test]
    fn test_time_scale_proportional() {
        // Recorded at 120, played at 60: everything takes twice as long
        assert_eq!(playback_time_scale(120.0, 60.0), 2.0);
        // Recorded at 60, played at 120: everything halves
        assert_eq!(playback_time_scale(60.0, 120.0), 0.5);
    }

    #[test]
    fn test_time_scale_degenerate_input() {
        assert_eq!(playback_time_scale(0.0, 120.0), 1.0);
        assert_eq!(playback_time_scale(120.0, 0.0), 1.0);
        assert_eq!(playback_time_scale(f64::NAN, 120.0), 1.0);
        assert_eq!(playback_time_scale(120.0, f64::INFINITY), 1.0);
        assert_eq!(playback_time_scale(-120.0, 60.0), 1.0);
    }
}
