//! Audio capture and segmentation.

mod chunker;
mod decode;
mod pcm;
mod resample;
mod source;

pub use chunker::{Chunker, FloatWindow};
pub use decode::{DecodedAudio, RawSegment, StreamingDecoder, decode_audio_file};
pub use pcm::{BitDepth, PcmFrame};
pub use resample::resample;
pub use source::{AudioSource, FileAudioSource, StdinAudioSource};
