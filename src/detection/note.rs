//! The canonical detection record.

use std::path::PathBuf;

/// Canonical detection record. Immutable once emitted: created by
/// [`super::router::DetectionRouter`] when a prediction exceeds the
/// configured threshold, consumed read-only by every sink, persisted by
/// the DB sink, never mutated downstream. Sinks each receive an owned
/// clone, which is how this crate renders "copies per sink if mutation
/// would otherwise be needed" for an otherwise-shared-reference record.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Local-timezone date, `YYYY-MM-DD`.
    pub date: String,
    /// Local-timezone time, `HH:MM:SS`.
    pub time: String,
    /// Common name of the detected species.
    pub common_name: String,
    /// Scientific (binomial) name of the detected species.
    pub scientific_name: String,
    /// Top prediction's confidence, in `(0, 1]`.
    pub confidence: f32,
    /// Station latitude at detection time (unfuzzed; sinks fuzz as needed).
    pub latitude: f64,
    /// Station longitude at detection time (unfuzzed; sinks fuzz as needed).
    pub longitude: f64,
    /// Path to the saved WAV clip.
    pub clip_name: PathBuf,
    /// Window start time, seconds since Unix epoch.
    pub begin_time: f64,
    /// Window end time, seconds since Unix epoch.
    pub end_time: f64,
}

impl Note {
    /// `true` if `date` matches `^\d{4}-\d{2}-\d{2}$`.
    #[must_use]
    pub fn date_is_well_formed(&self) -> bool {
        let bytes = self.date.as_bytes();
        bytes.len() == 10
            && bytes[4] == b'-'
            && bytes[7] == b'-'
            && bytes[..4].iter().all(u8::is_ascii_digit)
            && bytes[5..7].iter().all(u8::is_ascii_digit)
            && bytes[8..10].iter().all(u8::is_ascii_digit)
    }

    /// `true` if `time` matches `^\d{2}:\d{2}:\d{2}$`.
    #[must_use]
    pub fn time_is_well_formed(&self) -> bool {
        let bytes = self.time.as_bytes();
        bytes.len() == 8
            && bytes[2] == b':'
            && bytes[5] == b':'
            && bytes[..2].iter().all(u8::is_ascii_digit)
            && bytes[3..5].iter().all(u8::is_ascii_digit)
            && bytes[6..8].iter().all(u8::is_ascii_digit)
    }

    /// Capture time as a Unix timestamp. `begin_time` already carries this;
    /// exposed under its own name so callers don't need to know which field
    /// backs it.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn capture_unix_time(&self) -> i64 {
        self.begin_time as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_note() -> Note {
        Note {
            date: "2024-01-15".into(),
            time: "14:30:45".into(),
            common_name: "Great Tit".into(),
            scientific_name: "Parus major".into(),
            confidence: 0.85,
            latitude: 52.0,
            longitude: 4.3,
            clip_name: PathBuf::from("clips/1705330245.wav"),
            begin_time: 1_705_330_245.0,
            end_time: 1_705_330_248.0,
        }
    }

    #[test]
    fn well_formed_note_passes_both_checks() {
        let note = sample_note();
        assert!(note.date_is_well_formed());
        assert!(note.time_is_well_formed());
    }

    #[test]
    fn malformed_date_is_rejected() {
        let mut note = sample_note();
        note.date = "2024-1-15".into();
        assert!(!note.date_is_well_formed());
    }

    #[test]
    fn malformed_time_is_rejected() {
        let mut note = sample_note();
        note.time = "14:30".into();
        assert!(!note.time_is_well_formed());
    }
}
