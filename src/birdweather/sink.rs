//! Adapts [`BirdWeatherClient`] to the generic [`Sink`] contract.
//!
//! The router only threads a [`Note`] through to sinks, but `publish`
//! needs the clip's raw PCM; this sink reads it back from the WAV file
//! the router already wrote (`note.clip_name`) rather than widening the
//! `Sink` trait for one consumer.

use crate::birdweather::client::BirdWeatherClient;
use crate::detection::{Note, Sink};
use crate::error::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Publishes each routed detection to `BirdWeather`, re-reading the PCM
/// from the clip the router already wrote to disk.
pub struct BirdWeatherSink {
    client: BirdWeatherClient,
    cancel: CancellationToken,
}

impl BirdWeatherSink {
    /// Wrap `client`, cancelling any in-flight upload when `cancel` fires.
    #[must_use]
    pub fn new(client: BirdWeatherClient, cancel: CancellationToken) -> Self {
        Self { client, cancel }
    }
}

impl Sink for BirdWeatherSink {
    fn name(&self) -> &str {
        "birdweather"
    }

    fn publish(&self, note: Note) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let path = note.clip_name.clone();
            let (pcm_bytes, sample_rate) =
                tokio::task::spawn_blocking(move || read_clip_pcm(&path))
                    .await
                    .map_err(|e| Error::Internal {
                        message: format!("clip read task panicked: {e}"),
                    })??;
            self.client.publish(&note, &pcm_bytes, sample_rate, &self.cancel).await
        })
    }
}

fn read_clip_pcm(path: &std::path::Path) -> Result<(Vec<u8>, u32)> {
    let mut reader = hound::WavReader::open(path).map_err(|e| Error::ClipWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    let sample_rate = reader.spec().sample_rate;
    let mut bytes = Vec::with_capacity(reader.len() as usize * 2);
    for sample in reader.samples::<i16>() {
        let sample = sample.map_err(|e| Error::ClipWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    Ok((bytes, sample_rate))
}
