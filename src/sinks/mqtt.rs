//! MQTT sink: publishes each detection as a retained JSON message.

use crate::detection::{Note, Sink};
use crate::error::{Error, Result};
use mqtt_async_client::client::{Client, Publish, QoS};
use std::future::Future;
use std::pin::Pin;
use tokio::sync::Mutex;

/// Publishes each detection to a fixed MQTT topic. Interface contract
/// only (the broker's retained-message/QoS policy is a deployment
/// concern); payload is this crate's own JSON shape.
pub struct MqttSink {
    client: Mutex<Client>,
    topic: String,
}

impl MqttSink {
    /// Connect to `host:port` and construct a sink publishing to `topic`.
    ///
    /// # Errors
    /// Returns [`Error::Network`]-kind error if the broker connection fails.
    pub async fn connect(host: &str, port: u16, topic: String) -> Result<Self> {
        let mut client = Client::builder()
            .set_host(host.to_string())
            .set_port(port)
            .build()
            .map_err(|e| Error::Internal {
                message: format!("failed to build mqtt client: {e}"),
            })?;
        client.connect().await.map_err(|e| Error::Internal {
            message: format!("failed to connect to mqtt broker {host}:{port}: {e}"),
        })?;
        Ok(Self {
            client: Mutex::new(client),
            topic,
        })
    }
}

impl Sink for MqttSink {
    fn name(&self) -> &str {
        "mqtt"
    }

    fn publish(&self, note: Note) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let body = serde_json::json!({
                "date": note.date,
                "time": note.time,
                "commonName": note.common_name,
                "scientificName": note.scientific_name,
                "confidence": note.confidence,
            });
            let payload = serde_json::to_vec(&body).map_err(|e| Error::Internal {
                message: format!("failed to serialize mqtt payload: {e}"),
            })?;

            let mut publish = Publish::new(self.topic.clone(), payload);
            publish.set_qos(QoS::AtLeastOnce);
            publish.set_retain(true);

            let mut client = self.client.lock().await;
            client.publish(&publish).await.map_err(|e| Error::Internal {
                message: format!("mqtt publish failed: {e}"),
            })
        })
    }
}
