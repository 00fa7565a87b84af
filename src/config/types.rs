//! Configuration type definitions.
//!
//! The pipeline consumes a single [`Settings`] bundle, read once at start and
//! treated as immutable thereafter (shared behind an `Arc`). It has exactly
//! three sections: `birdweather`, `birdnet`, `audio`.

use crate::constants::{DEFAULT_OVERLAP, DEFAULT_SENSITIVITY, DEFAULT_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `BirdWeather` publishing settings.
    pub birdweather: BirdWeatherConfig,

    /// Classifier and detection-threshold settings.
    pub birdnet: BirdNetConfig,

    /// Audio capture and clip-storage settings.
    pub audio: AudioConfig,
}

/// `BirdWeather` publishing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BirdWeatherConfig {
    /// Whether the `BirdWeather` sink is enabled.
    pub enabled: bool,

    /// Station ID (secret token); never logged verbatim.
    pub id: String,

    /// Minimum confidence required to publish a detection to `BirdWeather`.
    pub threshold: f32,

    /// Radius in meters used to fuzz the station's coordinates before posting.
    pub location_accuracy: f64,

    /// Enable debug artefact dumps (raw PCM + FLAC sidecars).
    pub debug: bool,
}

/// Classifier and detection-threshold settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BirdNetConfig {
    /// Station latitude.
    pub latitude: f64,

    /// Station longitude.
    pub longitude: f64,

    /// Sensitivity scalar applied before the sigmoid (`[0, 1.5]`).
    pub sensitivity: f64,

    /// Minimum confidence required for the router to publish a detection.
    pub threshold: f32,

    /// Window overlap in seconds (`[0.0, 2.9]`).
    pub overlap: f32,
}

impl Default for BirdNetConfig {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            sensitivity: DEFAULT_SENSITIVITY,
            threshold: DEFAULT_THRESHOLD,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Audio capture and clip-storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Path to the `ffmpeg` binary used for `BirdWeather` FLAC encoding.
    pub ffmpeg_path: PathBuf,

    /// Directory WAV clips are written to.
    pub capture_path: PathBuf,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            capture_path: PathBuf::from("clips"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let settings = Settings::default();
        assert!((settings.birdnet.threshold - DEFAULT_THRESHOLD).abs() < f32::EPSILON);
        assert!((settings.birdnet.overlap - DEFAULT_OVERLAP).abs() < f32::EPSILON);
        assert!((settings.birdnet.sensitivity - DEFAULT_SENSITIVITY).abs() < f64::EPSILON);
    }

    #[test]
    fn audio_defaults_are_relative_paths() {
        let audio = AudioConfig::default();
        assert_eq!(audio.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(audio.capture_path, PathBuf::from("clips"));
    }
}
