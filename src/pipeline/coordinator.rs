//! Task topology wiring the audio source through to the configured sinks.
//!
//! One producer task reads [`PcmFrame`]s from the [`AudioSource`] into a
//! bounded drop-oldest channel; a chunker task turns those into
//! [`FloatWindow`]s on a second bounded channel; a pool of classifier
//! tasks (one per available CPU, each owning its own interpreter, since
//! invocation is synchronous and CPU-bound) drains that channel and hands
//! every prediction set to the shared [`DetectionRouter`], which
//! thresholds, writes the clip, and fans out to sinks. A root
//! [`CancellationToken`] stops every stage.

use crate::audio::{AudioSource, Chunker, FloatWindow, PcmFrame};
use crate::config::BirdNetConfig;
use crate::detection::DetectionRouter;
use crate::error::{Error, Result};
use crate::inference::{Classifier, Interpreter};
use crate::utils::queue::BoundedDropQueue;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Runs the realtime pipeline until the audio source runs dry or `cancel`
/// fires. `make_interpreter` is called once per worker task so each
/// classifier owns an interpreter that is never shared across tasks;
/// `labels` is shared read-only by every worker.
///
/// # Errors
/// Returns an error if constructing any worker's classifier fails, or if
/// the producer or chunker task panics. A single worker's classifier
/// invocation error or a sink failure is logged and never aborts the
/// pipeline.
pub async fn run_pipeline<S, F, I>(
    mut source: S,
    birdnet: BirdNetConfig,
    labels: Arc<Vec<String>>,
    router: Arc<DetectionRouter>,
    make_interpreter: F,
    cancel: CancellationToken,
) -> Result<()>
where
    S: AudioSource + Send + 'static,
    F: Fn() -> Result<I> + Send + Sync + 'static,
    I: Interpreter + Send + 'static,
{
    let pcm_queue = Arc::new(BoundedDropQueue::<PcmFrame>::new(crate::constants::PCM_CHANNEL_CAPACITY));
    let window_queue = Arc::new(BoundedDropQueue::<(FloatWindow, f64)>::new(
        crate::constants::WINDOW_CHANNEL_CAPACITY,
    ));

    let producer = {
        let pcm_queue = Arc::clone(&pcm_queue);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    frame = source.next_frame() => {
                        match frame {
                            Ok(Some(frame)) => pcm_queue.push(frame).await,
                            Ok(None) => break,
                            Err(e) => {
                                error!(error = %e, "audio source failed, stopping producer");
                                break;
                            }
                        }
                    }
                }
            }
        })
    };

    let chunker_task = {
        let pcm_queue = Arc::clone(&pcm_queue);
        let window_queue = Arc::clone(&window_queue);
        let overlap = birdnet.overlap;
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut chunker = match Chunker::new(crate::constants::SAMPLE_RATE, overlap) {
                Ok(c) => c,
                Err(e) => {
                    error!(error = %e, "failed to construct chunker");
                    return;
                }
            };
            let mut captured_at = unix_now_f64();
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    frame = pcm_queue.pop() => {
                        match chunker.push(&frame) {
                            Ok(windows) => {
                                for window in windows {
                                    window_queue.push((window, captured_at)).await;
                                    captured_at += f64::from(crate::constants::WINDOW_SECONDS);
                                }
                            }
                            Err(e) => warn!(error = %e, "dropping frame that failed chunking"),
                        }
                    }
                }
            }
            if let Some(window) = chunker.finish() {
                window_queue.push((window, captured_at)).await;
            }
        })
    };

    let worker_count = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    info!(worker_count, "starting classifier worker pool");
    let mut workers = Vec::with_capacity(worker_count);
    for worker_id in 0..worker_count {
        let window_queue = Arc::clone(&window_queue);
        let router = Arc::clone(&router);
        let interpreter = make_interpreter()?;
        let sensitivity = birdnet.sensitivity;
        let cancel = cancel.clone();
        let classifier = Classifier::new(interpreter, labels.as_ref().clone(), crate::constants::DEFAULT_TOP_K)?;
        workers.push(tokio::spawn(async move {
            // The interpreter invocation is synchronous and CPU-bound; run it on
            // a blocking-pool thread so one slow inference never starves other
            // async I/O sharing this runtime. The classifier is handed to the
            // blocking closure and handed back alongside its result each round.
            let mut classifier = classifier;
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    item = window_queue.pop() => {
                        let (window, captured_at) = item;
                        let outcome = tokio::task::spawn_blocking(move || {
                            let result = classifier.predict(&window, sensitivity);
                            (classifier, window, result)
                        })
                        .await;
                        let (returned, window, predictions) = match outcome {
                            Ok(outcome) => outcome,
                            Err(e) => {
                                error!(worker_id, error = %e, "classifier task panicked, stopping worker");
                                break;
                            }
                        };
                        classifier = returned;
                        let predictions = match predictions {
                            Ok(p) => p,
                            Err(e) => {
                                warn!(worker_id, error = %e, "classifier invocation failed");
                                continue;
                            }
                        };
                        if let Err(e) = router
                            .route(&predictions, window.samples(), crate::constants::SAMPLE_RATE, captured_at)
                            .await
                        {
                            warn!(worker_id, error = %e, "failed to route detection");
                        }
                    }
                }
            }
        }));
    }

    producer.await.map_err(|e| Error::Internal {
        message: format!("producer task panicked: {e}"),
    })?;
    cancel.cancel();
    chunker_task.await.map_err(|e| Error::Internal {
        message: format!("chunker task panicked: {e}"),
    })?;
    for worker in workers {
        let _ = worker.await;
    }
    debug!("pipeline shut down cleanly");
    Ok(())
}

fn unix_now_f64() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
