//! WAV clip writing for published detections.

pub mod writer;

pub use writer::WavWriter;
