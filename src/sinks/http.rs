//! Generic HTTP webhook sink: POSTs each `Note` as JSON to a configured URL.

use crate::detection::{Note, Sink};
use crate::error::{Error, Result};
use std::future::Future;
use std::pin::Pin;

/// Posts each published detection as a JSON body to a configured
/// endpoint. Interface contract only; payload shape is this crate's own
/// (the wire format any particular consumer expects is out of scope).
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSink {
    /// Construct a sink posting to `endpoint`.
    #[must_use]
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

impl Sink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    fn publish(&self, note: Note) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let body = serde_json::json!({
                "date": note.date,
                "time": note.time,
                "commonName": note.common_name,
                "scientificName": note.scientific_name,
                "confidence": note.confidence,
                "latitude": note.latitude,
                "longitude": note.longitude,
                "beginTime": note.begin_time,
                "endTime": note.end_time,
            });

            let response = self
                .client
                .post(&self.endpoint)
                .json(&body)
                .send()
                .await
                .map_err(|e| Error::Http {
                    url: self.endpoint.clone(),
                    source: e,
                })?;

            if !response.status().is_success() {
                return Err(Error::UnexpectedStatus {
                    url: self.endpoint.clone(),
                    status: response.status().as_u16(),
                    message: "http sink rejected detection".into(),
                });
            }
            Ok(())
        })
    }
}
