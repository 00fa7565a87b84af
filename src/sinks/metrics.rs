//! Prometheus-style counters for published detections.
//!
//! The actual exporter (HTTP `/metrics` endpoint and registry wiring) is
//! out of scope; this sink is the interface contract — it counts
//! publishes and exposes the tally for whatever exporter is wired in.

use crate::detection::{Note, Sink};
use crate::error::Result;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counts every detection routed to it. Intended to sit behind a real
/// Prometheus registry in a full deployment.
#[derive(Default)]
pub struct MetricsSink {
    published: AtomicU64,
}

impl MetricsSink {
    /// Construct an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total detections counted so far.
    #[must_use]
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Sink for MetricsSink {
    fn name(&self) -> &str {
        "metrics"
    }

    fn publish(&self, _note: Note) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.published.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
    }
}
