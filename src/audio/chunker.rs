//! Overlapping fixed-length windowing over a continuous PCM stream.

use super::pcm::PcmFrame;
use crate::constants::{SAMPLE_RATE, WINDOW_SECONDS};
use crate::error::{Error, Result};

/// A normalised float32 window of exactly `3 * sample_rate` samples in
/// `[-1, 1]`, ready for the classifier.
#[derive(Debug, Clone)]
pub struct FloatWindow {
    samples: Vec<f32>,
}

impl FloatWindow {
    fn new(samples: Vec<f32>, expected_len: usize) -> Self {
        debug_assert_eq!(samples.len(), expected_len);
        Self { samples }
    }

    /// The window's samples.
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of samples in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the window is empty (never true for a window this type built).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Converts raw PCM frames into overlapping [`FloatWindow`]s.
///
/// `overlap` is the number of seconds successive windows overlap by, in
/// `[0.0, 2.9]`. Windows advance by `step = (3 - overlap) * sample_rate`
/// samples each time the internal buffer reaches a full window.
pub struct Chunker {
    sample_rate: u32,
    window_len: usize,
    step: usize,
    tail_threshold: usize,
    buffer: Vec<f32>,
}

impl Chunker {
    /// Create a chunker for the given sample rate and overlap.
    ///
    /// # Errors
    /// Returns [`Error::InvalidSampleRate`] if `sample_rate != 48_000`.
    pub fn new(sample_rate: u32, overlap: f32) -> Result<Self> {
        if sample_rate != SAMPLE_RATE {
            return Err(Error::InvalidSampleRate { sample_rate });
        }
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let window_len = (WINDOW_SECONDS * sample_rate as f32) as usize;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let step = ((WINDOW_SECONDS - overlap) * sample_rate as f32).round() as usize;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let tail_threshold = (1.5 * sample_rate as f32) as usize;
        Ok(Self {
            sample_rate,
            window_len,
            step: step.max(1),
            tail_threshold,
            buffer: Vec::new(),
        })
    }

    /// Push a PCM frame, returning every window completed by the new data.
    ///
    /// # Errors
    /// Returns an error if the frame's sample rate does not match the one
    /// this chunker was constructed with.
    pub fn push(&mut self, frame: &PcmFrame) -> Result<Vec<FloatWindow>> {
        if frame.sample_rate() != self.sample_rate {
            return Err(Error::InvalidSampleRate {
                sample_rate: frame.sample_rate(),
            });
        }
        self.buffer.extend(frame.to_floats());
        Ok(self.drain_windows())
    }

    fn drain_windows(&mut self) -> Vec<FloatWindow> {
        let mut windows = Vec::new();
        while self.buffer.len() >= self.window_len {
            let window = self.buffer[..self.window_len].to_vec();
            windows.push(FloatWindow::new(window, self.window_len));
            let drop = self.step.min(self.buffer.len());
            self.buffer.drain(..drop);
        }
        windows
    }

    /// Flush the chunker at end-of-stream. If the remaining tail is at
    /// least `1.5 * sample_rate` samples, it is zero-padded to a full
    /// window and emitted; otherwise it is discarded.
    pub fn finish(mut self) -> Option<FloatWindow> {
        if self.buffer.len() >= self.tail_threshold {
            self.buffer.resize(self.window_len, 0.0);
            Some(FloatWindow::new(self.buffer, self.window_len))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::pcm::BitDepth;

    fn silent_frame(samples: usize) -> PcmFrame {
        PcmFrame::new(vec![0u8; samples * 2], 48_000, BitDepth::Sixteen).unwrap()
    }

    #[test]
    fn rejects_non_48k_sample_rate() {
        assert!(Chunker::new(44_100, 0.0).is_err());
    }

    #[test]
    fn emits_exact_length_windows() {
        let mut chunker = Chunker::new(48_000, 0.0).unwrap();
        let windows = chunker.push(&silent_frame(48_000 * 3)).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].len(), 48_000 * 3);
    }

    #[test]
    fn overlap_advances_by_step() {
        let mut chunker = Chunker::new(48_000, 1.0).unwrap();
        // step = (3 - 1) * 48000 = 96000
        let windows = chunker.push(&silent_frame(48_000 * 3 + 96_000)).unwrap();
        assert_eq!(windows.len(), 2);
    }

    #[test]
    fn overlap_2_9_yields_step_of_one_tenth_second() {
        let chunker = Chunker::new(48_000, 2.9).unwrap();
        assert_eq!(chunker.step, 4_800);
    }

    #[test]
    fn tail_below_threshold_is_discarded() {
        let mut chunker = Chunker::new(48_000, 0.0).unwrap();
        // 1.5 * 48000 - 1 samples left in the tail.
        let tail = 72_000 - 1;
        chunker.push(&silent_frame(tail)).unwrap();
        assert!(chunker.finish().is_none());
    }

    #[test]
    fn tail_at_threshold_is_padded_and_emitted() {
        let mut chunker = Chunker::new(48_000, 0.0).unwrap();
        let tail = 72_000;
        chunker.push(&silent_frame(tail)).unwrap();
        let window = chunker.finish().expect("tail at threshold must emit");
        assert_eq!(window.len(), 144_000);
    }

    #[test]
    fn empty_stream_finishes_to_none() {
        let chunker = Chunker::new(48_000, 0.0).unwrap();
        assert!(chunker.finish().is_none());
    }
}
