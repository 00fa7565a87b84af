//! Thresholding, clip writing, and per-sink fan-out.

use super::note::Note;
use crate::clipper::writer::WavWriter;
use crate::error::Result;
use crate::inference::Prediction;
use crate::utils::queue::BoundedDropQueue;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::Ordering;

/// A downstream consumer of detections. Sinks are read-only: `publish`
/// takes an owned [`Note`] and must not attempt to correlate or mutate it
/// beyond its own bookkeeping.
///
/// The router holds a heterogeneous `Vec<Arc<dyn Sink>>`, so `publish`
/// returns a boxed future rather than using `async fn` directly — native
/// async-fn-in-trait methods aren't dyn-compatible. Implementors still
/// write an ordinary `async move` body; see any sink in `crate::sinks`.
pub trait Sink: Send + Sync {
    /// Human-readable name used in log fields and the overflow counter.
    fn name(&self) -> &str;

    /// Publish one detection. Failures are logged by the router and
    /// counted; they never abort sibling sinks or the pipeline.
    fn publish(&self, note: Note) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

struct SinkHandle {
    queue: Arc<BoundedDropQueue<Note>>,
    name: String,
}

/// Thresholds classifier output, constructs a [`Note`], writes the raw PCM
/// as a WAV clip, then fans it out to every configured sink. Sinks are
/// published to concurrently with no cross-sink ordering guarantee; each
/// sink sees its own notes in capture order because its queue is
/// single-producer (the router) and single-consumer (its own drain task).
pub struct DetectionRouter {
    threshold: f32,
    latitude: f64,
    longitude: f64,
    writer: WavWriter,
    handles: Vec<SinkHandle>,
}

impl DetectionRouter {
    /// Construct a router with the given threshold, station coordinates,
    /// clip writer, and sinks. `latitude`/`longitude` are the station's
    /// unfuzzed location, stamped onto every `Note` verbatim (sinks that
    /// need a fuzzed copy, like `BirdWeather`, apply their own fuzz on top).
    /// Each sink gets its own drain task spawned immediately.
    pub fn new(
        threshold: f32,
        latitude: f64,
        longitude: f64,
        writer: WavWriter,
        sinks: Vec<Arc<dyn Sink>>,
        queue_capacity: usize,
    ) -> Self {
        let mut handles = Vec::with_capacity(sinks.len());
        for sink in sinks {
            let queue = Arc::new(BoundedDropQueue::new(queue_capacity));
            let name = sink.name().to_string();
            let drain_queue = Arc::clone(&queue);
            let drain_sink = Arc::clone(&sink);
            tokio::spawn(async move {
                loop {
                    let note = drain_queue.pop().await;
                    if let Err(err) = drain_sink.publish(note).await {
                        tracing::warn!(
                            category = %err.kind(),
                            sink = drain_sink.name(),
                            error = %err,
                            "sink publish failed"
                        );
                    }
                }
            });
            handles.push(SinkHandle { queue, name });
        }
        Self {
            threshold,
            latitude,
            longitude,
            writer,
            handles,
        }
    }

    /// Route a window's predictions. If the top prediction's confidence is
    /// at or above the configured threshold, builds a `Note`, writes the
    /// clip, and enqueues it onto every sink.
    ///
    /// # Errors
    /// Returns an error only if writing the WAV clip fails; individual
    /// sink failures never propagate here.
    pub async fn route(
        &self,
        predictions: &[Prediction],
        pcm_samples: &[f32],
        sample_rate: u32,
        captured_at_unix: f64,
    ) -> Result<Option<Note>> {
        let Some(top) = predictions.first() else {
            return Ok(None);
        };
        if top.confidence < self.threshold {
            return Ok(None);
        }

        let (common_name, scientific_name) = split_label(&top.species);
        let clip_path = self.writer.write_clip(
            pcm_samples,
            sample_rate,
            &top.species,
            top.confidence,
            captured_at_unix,
            captured_at_unix + 3.0,
        )?;

        let (date, time) = format_local_date_time(captured_at_unix);
        let note = Note {
            date,
            time,
            common_name,
            scientific_name,
            confidence: top.confidence,
            latitude: self.latitude,
            longitude: self.longitude,
            clip_name: clip_path,
            begin_time: captured_at_unix,
            end_time: captured_at_unix + 3.0,
        };

        for handle in &self.handles {
            handle.queue.push(note.clone()).await;
        }

        Ok(Some(note))
    }

    /// Number of notes dropped due to overflow for the named sink, if any.
    #[must_use]
    pub fn dropped_for(&self, sink_name: &str) -> Option<u64> {
        self.handles
            .iter()
            .find(|h| h.name == sink_name)
            .map(|h| h.queue.dropped_count())
    }
}

/// Splits a label of the form `"Scientific name_Common Name"` (the
/// `BirdNET` labels-file convention) into `(common, scientific)`. Falls
/// back to using the whole label as both fields if no separator is found.
fn split_label(label: &str) -> (String, String) {
    label.split_once('_').map_or_else(
        || (label.to_string(), label.to_string()),
        |(scientific, common)| (common.to_string(), scientific.to_string()),
    )
}

/// Formats a Unix timestamp as local-timezone `(YYYY-MM-DD, HH:MM:SS)`.
fn format_local_date_time(unix_seconds: f64) -> (String, String) {
    #[allow(clippy::cast_possible_truncation)]
    let dt = chrono::DateTime::from_timestamp(unix_seconds as i64, 0)
        .unwrap_or_default()
        .with_timezone(&chrono::Local);
    (
        dt.format("%Y-%m-%d").to_string(),
        dt.format("%H:%M:%S").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingSink {
        name: String,
        calls: Arc<AtomicUsize>,
    }

    impl Sink for CountingSink {
        fn name(&self) -> &str {
            &self.name
        }

        fn publish(&self, _note: Note) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    #[test]
    fn split_label_handles_underscore_convention() {
        let (common, scientific) = split_label("Parus major_Great Tit");
        assert_eq!(common, "Great Tit");
        assert_eq!(scientific, "Parus major");
    }

    #[test]
    fn split_label_without_separator_duplicates() {
        let (common, scientific) = split_label("Unknown");
        assert_eq!(common, "Unknown");
        assert_eq!(scientific, "Unknown");
    }

    #[tokio::test]
    async fn below_threshold_routes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let writer = WavWriter::new(dir.path().to_path_buf());
        let calls = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(CountingSink {
            name: "counting".into(),
            calls: Arc::clone(&calls),
        });
        let router = DetectionRouter::new(0.5, 52.0, 4.0, writer, vec![sink], 4);
        let predictions = vec![Prediction {
            species: "Parus major_Great Tit".into(),
            confidence: 0.1,
        }];
        let result = router
            .route(&predictions, &[0.0; 144_000], 48_000, 1_705_330_245.0)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn at_or_above_threshold_routes_and_fans_out() {
        let dir = tempfile::tempdir().unwrap();
        let writer = WavWriter::new(dir.path().to_path_buf());
        let calls = Arc::new(AtomicUsize::new(0));
        let sink = Arc::new(CountingSink {
            name: "counting".into(),
            calls: Arc::clone(&calls),
        });
        let router = DetectionRouter::new(0.1, 52.0, 4.0, writer, vec![sink], 4);
        let predictions = vec![Prediction {
            species: "Parus major_Great Tit".into(),
            confidence: 0.85,
        }];
        let note = router
            .route(&predictions, &[0.0; 144_000], 48_000, 1_705_330_245.0)
            .await
            .unwrap()
            .expect("should route");
        assert_eq!(note.common_name, "Great Tit");
        assert!(note.date_is_well_formed());
        assert!(note.time_is_well_formed());
        assert!((note.latitude - 52.0).abs() < f64::EPSILON);
        assert!((note.longitude - 4.0).abs() < f64::EPSILON);

        // The drain task runs asynchronously; yield until it has run.
        for _ in 0..100 {
            if calls.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn overflow_drops_oldest_and_counts() {
        let queue = BoundedDropQueue::new(2);
        for i in 0..5 {
            queue
                .push(Note {
                    date: "2024-01-15".into(),
                    time: "14:30:45".into(),
                    common_name: format!("n{i}"),
                    scientific_name: "s".into(),
                    confidence: 0.5,
                    latitude: 0.0,
                    longitude: 0.0,
                    clip_name: std::path::PathBuf::new(),
                    begin_time: 0.0,
                    end_time: 3.0,
                })
                .await;
        }
        assert_eq!(queue.dropped_count(), 3);
        assert_eq!(queue.pop().await.common_name, "n2");
        assert_eq!(queue.pop().await.common_name, "n3");
    }
}
