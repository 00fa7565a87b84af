//! Tensor invocation and sigmoid-calibrated ranking.

use crate::audio::FloatWindow;
use crate::error::{Error, Result};

/// A single ranked label/confidence pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Label text, taken verbatim from the labels file.
    pub species: String,
    /// Confidence in `[0, 1]`, post-sigmoid.
    pub confidence: f32,
}

/// The raw tensor-invocation step, behind a trait so the calibration and
/// ranking logic here is testable without a real model runtime. A real
/// interpreter binds to whichever tensor runtime the host process already
/// depends on; swapping runtimes never changes the calibration or ranking
/// contract implemented in [`Classifier::predict`].
///
/// One interpreter is never shared across threads; callers pool
/// interpreters (one per worker) for parallelism.
pub trait Interpreter: Send {
    /// Run one inference over `window`, returning raw logits (pre-sigmoid).
    ///
    /// # Errors
    /// Returns [`Error::InvokeFailed`] if the runtime invocation fails.
    fn invoke(&mut self, window: &[f32]) -> Result<Vec<f32>>;

    /// Number of labels / output tensor length this interpreter produces.
    fn label_count(&self) -> usize;
}

/// Runs one inference per window, applies a sensitivity-scaled sigmoid,
/// pairs the result with labels, and ranks the top K.
pub struct Classifier<I> {
    interpreter: I,
    labels: Vec<String>,
    top_k: usize,
}

impl<I: Interpreter> Classifier<I> {
    /// Construct a classifier, checking `labels.len() == interpreter.label_count()`.
    ///
    /// # Errors
    /// Returns [`Error::LabelCountMismatch`] if the label list does not
    /// match the interpreter's output tensor length. This is a fatal
    /// construction-time check, never a per-call one.
    pub fn new(interpreter: I, labels: Vec<String>, top_k: usize) -> Result<Self> {
        let outputs = interpreter.label_count();
        if labels.len() != outputs {
            return Err(Error::LabelCountMismatch {
                labels: labels.len(),
                outputs,
            });
        }
        Ok(Self {
            interpreter,
            labels,
            top_k,
        })
    }

    /// Predict ranked labels for `window` at the given `sensitivity`.
    ///
    /// `sensitivity` is expected in `[0, 1.5]`; out-of-range values are
    /// still applied verbatim (the sigmoid is well-defined for any real
    /// scalar) since validating the operator's sensitivity setting is a
    /// configuration-time concern, not a per-call one.
    ///
    /// # Errors
    /// Returns [`Error::InvokeFailed`] if the underlying interpreter fails.
    pub fn predict(&mut self, window: &FloatWindow, sensitivity: f64) -> Result<Vec<Prediction>> {
        let logits = self.interpreter.invoke(window.samples())?;

        let mut ranked: Vec<Prediction> = logits
            .into_iter()
            .enumerate()
            .map(|(idx, logit)| {
                let calibrated = sigmoid(f64::from(logit), sensitivity);
                Prediction {
                    species: self.labels[idx].clone(),
                    confidence: calibrated,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(self.top_k);
        Ok(ranked)
    }
}

/// `σ(x) = 1 / (1 + exp(-sensitivity * x))`, clamped to `[0, 1]` and with
/// NaN treated as 0.
fn sigmoid(x: f64, sensitivity: f64) -> f32 {
    let value = 1.0 / (1.0 + (-sensitivity * x).exp());
    #[allow(clippy::cast_possible_truncation)]
    let value = value as f32;
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeInterpreter {
        logits: Vec<f32>,
    }

    impl Interpreter for FakeInterpreter {
        fn invoke(&mut self, _window: &[f32]) -> Result<Vec<f32>> {
            Ok(self.logits.clone())
        }

        fn label_count(&self) -> usize {
            self.logits.len()
        }
    }

    fn window() -> FloatWindow {
        // A fake interpreter ignores the samples, so any correctly sized
        // window will do.
        let mut chunker = crate::audio::Chunker::new(48_000, 0.0).unwrap();
        let frame = crate::audio::PcmFrame::new(
            vec![0u8; 48_000 * 3 * 2],
            48_000,
            crate::audio::BitDepth::Sixteen,
        )
        .unwrap();
        chunker.push(&frame).unwrap().remove(0)
    }

    #[test]
    fn rejects_label_count_mismatch() {
        let interp = FakeInterpreter {
            logits: vec![0.0, 1.0],
        };
        let result = Classifier::new(interp, vec!["only-one".into()], 1);
        assert_eq!(result.unwrap_err().kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn ranks_confidence_descending_with_index_tiebreak() {
        let interp = FakeInterpreter {
            logits: vec![0.0, 0.0, 5.0],
        };
        let labels = vec!["a".into(), "b".into(), "c".into()];
        let mut classifier = Classifier::new(interp, labels, 3).unwrap();
        let ranked = classifier.predict(&window(), 1.0).unwrap();
        assert_eq!(ranked[0].species, "c");
        // a and b tie at logit 0.0 -> sigmoid 0.5; index-ascending tiebreak.
        assert_eq!(ranked[1].species, "a");
        assert_eq!(ranked[2].species, "b");
    }

    #[test]
    fn sensitivity_zero_collapses_to_one_half() {
        let interp = FakeInterpreter {
            logits: vec![100.0, -100.0],
        };
        let labels = vec!["a".into(), "b".into()];
        let mut classifier = Classifier::new(interp, labels, 2).unwrap();
        let ranked = classifier.predict(&window(), 0.0).unwrap();
        for p in &ranked {
            assert!((p.confidence - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn nan_logit_is_treated_as_zero() {
        assert_eq!(sigmoid(f64::NAN, 1.0), 0.0);
    }

    #[test]
    fn confidence_is_always_clamped() {
        let interp = FakeInterpreter {
            logits: vec![1000.0, -1000.0],
        };
        let labels = vec!["a".into(), "b".into()];
        let mut classifier = Classifier::new(interp, labels, 2).unwrap();
        let ranked = classifier.predict(&window(), 1.0).unwrap();
        for p in &ranked {
            assert!(p.confidence >= 0.0 && p.confidence <= 1.0);
        }
    }

    #[test]
    fn top_k_truncates_results() {
        let interp = FakeInterpreter {
            logits: vec![3.0, 2.0, 1.0, 0.0],
        };
        let labels = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        let mut classifier = Classifier::new(interp, labels, 2).unwrap();
        let ranked = classifier.predict(&window(), 1.0).unwrap();
        assert_eq!(ranked.len(), 2);
    }
}
