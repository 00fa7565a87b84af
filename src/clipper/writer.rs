//! WAV file writing.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Writes audio data to WAV files, `{capturePath}/{unixSeconds}.wav`,
/// 48 kHz/16-bit/mono with hound's standard 44-byte header.
pub struct WavWriter {
    /// Output directory for clips.
    output_dir: PathBuf,
}

impl WavWriter {
    /// Create a new WAV writer with the given output directory.
    #[must_use]
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// Write audio samples to a WAV file named after the clip's start
    /// time (Unix seconds). `species` and `confidence` are accepted for
    /// symmetry with the router's call site but are not embedded in the
    /// clip; only `DetectionRouter` needs them, for the `Note` it builds
    /// alongside the clip.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClipWrite`] if the file cannot be written, or an
    /// I/O error if the output directory cannot be created.
    pub fn write_clip(
        &self,
        samples: &[f32],
        sample_rate: u32,
        _species: &str,
        _confidence: f32,
        start_time: f64,
        _end_time: f64,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| Error::Io {
            path: self.output_dir.clone(),
            source: e,
        })?;

        #[allow(clippy::cast_possible_truncation)]
        let unix_seconds = start_time.floor() as i64;
        let path = self.output_dir.join(format!("{unix_seconds}.wav"));

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer =
            hound::WavWriter::create(&path, spec).map_err(|e| Error::ClipWrite {
                path: path.clone(),
                source: e,
            })?;

        for &sample in samples {
            let clamped = sample.clamp(-1.0, 1.0);
            #[allow(clippy::cast_possible_truncation)]
            let quantized = (clamped * 32_767.0) as i16;
            writer
                .write_sample(quantized)
                .map_err(|e| Error::ClipWrite {
                    path: path.clone(),
                    source: e,
                })?;
        }

        writer.finalize().map_err(|e| Error::ClipWrite {
            path: path.clone(),
            source: e,
        })?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_clip_named_by_unix_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let writer = WavWriter::new(dir.path().to_path_buf());
        let samples = vec![0.0f32; 48_000 * 3];
        let path = writer
            .write_clip(&samples, 48_000, "Parus major_Great Tit", 0.85, 1_705_330_245.0, 1_705_330_248.0)
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "1705330245.wav");
        assert!(path.exists());
    }

    #[test]
    fn pcm_round_trips_through_wav_header() {
        let dir = tempfile::tempdir().unwrap();
        let writer = WavWriter::new(dir.path().to_path_buf());
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0) - 0.5).collect();
        let path = writer
            .write_clip(&samples, 48_000, "x", 0.5, 0.0, 3.0)
            .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        // Standard 44-byte canonical WAV header.
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        let pcm_bytes = &bytes[44..];
        assert_eq!(pcm_bytes.len(), samples.len() * 2);
        for (i, &sample) in samples.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let expected = (sample.clamp(-1.0, 1.0) * 32_767.0) as i16;
            let got = i16::from_le_bytes([pcm_bytes[i * 2], pcm_bytes[i * 2 + 1]]);
            assert_eq!(got, expected);
        }
    }
}
