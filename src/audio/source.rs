//! Audio capture abstraction.
//!
//! The pipeline is agnostic to where PCM comes from. Two sources are
//! built: decoding a file end-to-end ([`FileAudioSource`]) and reading
//! raw PCM bytes from any `AsyncRead` ([`StdinAudioSource`], used for
//! piping `arecord`/`ffmpeg -f s16le` style capture). Live microphone
//! capture itself is out of scope; this trait boundary is the documented
//! interface a real capture backend would implement.

use super::decode::decode_audio_file;
use super::pcm::{BitDepth, PcmFrame};
use super::resample::resample;
use crate::constants::SAMPLE_RATE;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Number of samples delivered per [`AudioSource::next_frame`] call from a
/// streaming source.
const FRAME_SAMPLES: usize = 4_096;

/// Delivers a continuous stream of PCM frames with a known sample rate,
/// bit depth, and channel count (always mono).
pub trait AudioSource: Send {
    /// Yield the next frame, or `None` at end-of-stream.
    async fn next_frame(&mut self) -> Result<Option<PcmFrame>>;
}

/// Decodes an entire audio file up front, resamples to 48 kHz if needed,
/// re-quantizes to 16-bit, and streams it out frame by frame.
pub struct FileAudioSource {
    samples: std::vec::IntoIter<i16>,
    exhausted: bool,
}

impl FileAudioSource {
    /// Open and fully decode `path`, resampling to 48 kHz if necessary.
    pub fn open(path: &Path) -> Result<Self> {
        let decoded = decode_audio_file(path)?;
        let floats = if decoded.sample_rate == SAMPLE_RATE {
            decoded.samples
        } else {
            resample(decoded.samples, decoded.sample_rate, SAMPLE_RATE)?
        };
        let samples: Vec<i16> = floats
            .into_iter()
            .map(|s| {
                let clamped = s.clamp(-1.0, 1.0);
                #[allow(clippy::cast_possible_truncation)]
                {
                    (clamped * 32_767.0) as i16
                }
            })
            .collect();
        Ok(Self {
            samples: samples.into_iter(),
            exhausted: false,
        })
    }
}

impl AudioSource for FileAudioSource {
    async fn next_frame(&mut self) -> Result<Option<PcmFrame>> {
        if self.exhausted {
            return Ok(None);
        }
        let mut bytes = Vec::with_capacity(FRAME_SAMPLES * 2);
        let mut count = 0;
        for sample in self.samples.by_ref() {
            bytes.extend_from_slice(&sample.to_le_bytes());
            count += 1;
            if count >= FRAME_SAMPLES {
                break;
            }
        }
        if bytes.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }
        if count < FRAME_SAMPLES {
            self.exhausted = true;
        }
        Ok(Some(PcmFrame::new(bytes, SAMPLE_RATE, BitDepth::Sixteen)?))
    }
}

/// Reads raw interleaved PCM bytes from any `AsyncRead`, e.g. stdin piped
/// from an external capture tool.
pub struct StdinAudioSource<R> {
    reader: R,
    sample_rate: u32,
    bit_depth: BitDepth,
}

impl<R: AsyncRead + Unpin + Send> StdinAudioSource<R> {
    /// Wrap a reader as a PCM source at the given sample rate / bit depth.
    pub fn new(reader: R, sample_rate: u32, bit_depth: BitDepth) -> Self {
        Self {
            reader,
            sample_rate,
            bit_depth,
        }
    }
}

impl<R: AsyncRead + Unpin + Send> AudioSource for StdinAudioSource<R> {
    async fn next_frame(&mut self) -> Result<Option<PcmFrame>> {
        let frame_bytes = FRAME_SAMPLES * self.bit_depth.bytes_per_sample();
        let mut buf = vec![0u8; frame_bytes];
        let mut filled = 0;
        while filled < frame_bytes {
            let n = self
                .reader
                .read(&mut buf[filled..])
                .await
                .map_err(|e| Error::Io {
                    path: PathBuf::from("<stdin>"),
                    source: e,
                })?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled - filled % self.bit_depth.bytes_per_sample());
        if buf.is_empty() {
            return Ok(None);
        }
        Ok(Some(PcmFrame::new(buf, self.sample_rate, self.bit_depth)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stdin_source_reads_whole_frames() {
        let data = vec![0u8; FRAME_SAMPLES * 2 + 3];
        let cursor = std::io::Cursor::new(data);
        let mut source = StdinAudioSource::new(cursor, 48_000, BitDepth::Sixteen);
        let first = source.next_frame().await.unwrap().unwrap();
        assert_eq!(first.bytes().len(), FRAME_SAMPLES * 2);
        let second = source.next_frame().await.unwrap();
        assert!(second.is_none() || second.unwrap().bytes().len() < FRAME_SAMPLES * 2);
    }

    #[tokio::test]
    async fn stdin_source_ends_on_empty_read() {
        let cursor = std::io::Cursor::new(Vec::<u8>::new());
        let mut source = StdinAudioSource::new(cursor, 48_000, BitDepth::Sixteen);
        assert!(source.next_frame().await.unwrap().is_none());
    }
}
