//! Detection thresholding, clip writing, and sink fan-out.

mod note;
mod router;

pub use note::Note;
pub use router::{DetectionRouter, Sink};
