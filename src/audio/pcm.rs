//! PCM frame representation and bit-depth handling.

use crate::error::{Error, Result};

/// Supported PCM bit depths. Restricting the type to these three values
/// makes invalid depths unrepresentable once a frame is constructed; the
/// fallible constructor is still the place that rejects bytes arriving from
/// outside the type system (a config value, a WAV header, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    /// 16-bit signed PCM.
    Sixteen,
    /// 24-bit signed PCM, packed as 3 little-endian bytes per sample.
    TwentyFour,
    /// 32-bit signed PCM.
    ThirtyTwo,
}

impl BitDepth {
    /// Construct from a raw bit count, rejecting anything but 16/24/32.
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            16 => Ok(Self::Sixteen),
            24 => Ok(Self::TwentyFour),
            32 => Ok(Self::ThirtyTwo),
            other => Err(Error::UnsupportedBitDepth { bit_depth: other }),
        }
    }

    /// Number of bytes per sample at this depth.
    #[must_use]
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::Sixteen => 2,
            Self::TwentyFour => 3,
            Self::ThirtyTwo => 4,
        }
    }

    /// The divisor used to convert an integer sample to `[-1, 1]` float.
    #[must_use]
    pub fn divisor(self) -> f32 {
        match self {
            Self::Sixteen => 32_768.0,
            Self::TwentyFour => 8_388_608.0,
            Self::ThirtyTwo => 2_147_483_648.0,
        }
    }

    /// Bit count, for error messages and metadata.
    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            Self::Sixteen => 16,
            Self::TwentyFour => 24,
            Self::ThirtyTwo => 32,
        }
    }
}

/// An immutable slice of signed, little-endian, interleaved PCM at a known
/// sample rate, bit depth, and channel count (always mono in this crate).
#[derive(Debug, Clone)]
pub struct PcmFrame {
    bytes: Vec<u8>,
    sample_rate: u32,
    bit_depth: BitDepth,
}

impl PcmFrame {
    /// Construct a frame, validating the sample rate and that the byte
    /// length is a whole number of samples for the given bit depth.
    pub fn new(bytes: Vec<u8>, sample_rate: u32, bit_depth: BitDepth) -> Result<Self> {
        if sample_rate != crate::constants::SAMPLE_RATE {
            return Err(Error::InvalidSampleRate { sample_rate });
        }
        if bytes.len() % bit_depth.bytes_per_sample() != 0 {
            return Err(Error::Internal {
                message: format!(
                    "PCM byte length {} is not a multiple of {} bytes per sample",
                    bytes.len(),
                    bit_depth.bytes_per_sample()
                ),
            });
        }
        Ok(Self {
            bytes,
            sample_rate,
            bit_depth,
        })
    }

    /// Sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Bit depth of the packed samples.
    #[must_use]
    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    /// Raw interleaved bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode the packed integer samples to normalised `[-1, 1]` float32.
    #[must_use]
    pub fn to_floats(&self) -> Vec<f32> {
        let divisor = self.bit_depth.divisor();
        match self.bit_depth {
            BitDepth::Sixteen => self
                .bytes
                .chunks_exact(2)
                .map(|c| f32::from(i16::from_le_bytes([c[0], c[1]])) / divisor)
                .collect(),
            BitDepth::TwentyFour => self
                .bytes
                .chunks_exact(3)
                .map(|c| {
                    let unsigned = i32::from(c[0]) | (i32::from(c[1]) << 8) | (i32::from(c[2]) << 16);
                    // Sign-extend bit 23 by shifting into the top of an i32
                    // and arithmetic-shifting back down.
                    let signed = (unsigned << 8) >> 8;
                    #[allow(clippy::cast_precision_loss)]
                    {
                        signed as f32 / divisor
                    }
                })
                .collect(),
            BitDepth::ThirtyTwo => self
                .bytes
                .chunks_exact(4)
                .map(|c| {
                    let sample = i32::from_le_bytes([c[0], c[1], c[2], c[3]]);
                    #[allow(clippy::cast_precision_loss)]
                    {
                        sample as f32 / divisor
                    }
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_bit_depth() {
        assert!(BitDepth::from_bits(8).is_err());
        assert!(BitDepth::from_bits(16).is_ok());
        assert!(BitDepth::from_bits(24).is_ok());
        assert!(BitDepth::from_bits(32).is_ok());
    }

    #[test]
    fn rejects_non_48k_sample_rate() {
        let err = PcmFrame::new(vec![0; 4], 44_100, BitDepth::Sixteen).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn decodes_16_bit_full_scale() {
        // i16::MAX little-endian
        let bytes = i16::MAX.to_le_bytes().to_vec();
        let frame = PcmFrame::new(bytes, 48_000, BitDepth::Sixteen).unwrap();
        let floats = frame.to_floats();
        assert!((floats[0] - 0.999_969_5).abs() < 1e-5);
    }

    #[test]
    fn decodes_24_bit_negative_with_sign_extension() {
        // -1 in 24-bit two's complement is 0xFFFFFF.
        let bytes = vec![0xFF, 0xFF, 0xFF];
        let frame = PcmFrame::new(bytes, 48_000, BitDepth::TwentyFour).unwrap();
        let floats = frame.to_floats();
        assert!((floats[0] - (-1.0 / 8_388_608.0)).abs() < 1e-9);
    }

    #[test]
    fn decodes_32_bit_zero() {
        let bytes = 0i32.to_le_bytes().to_vec();
        let frame = PcmFrame::new(bytes, 48_000, BitDepth::ThirtyTwo).unwrap();
        assert_eq!(frame.to_floats(), vec![0.0]);
    }
}
