//! Inference and post-processing.

mod classifier;

pub use classifier::{Classifier, Interpreter, Prediction};
