//! Local detection database sink.
//!
//! The on-disk schema is out of scope; this persists each `Note` as one
//! line of JSON, which is enough to prove the `Sink` contract without
//! committing to a schema the spec explicitly leaves to the consumer.

use crate::detection::{Note, Sink};
use crate::error::{Error, Result};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Appends each published `Note` as a line of JSON to a local file.
pub struct DbSink {
    path: PathBuf,
    file: Mutex<Option<tokio::fs::File>>,
}

impl DbSink {
    /// Create a sink writing newline-delimited JSON to `path`.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: Mutex::new(None),
        }
    }

    async fn open(&self) -> Result<()> {
        let mut guard = self.file.lock().await;
        if guard.is_none() {
            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await
                .map_err(|e| Error::Io {
                    path: self.path.clone(),
                    source: e,
                })?;
            *guard = Some(file);
        }
        Ok(())
    }
}

impl Sink for DbSink {
    fn name(&self) -> &str {
        "db"
    }

    fn publish(&self, note: Note) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.open().await?;
            let line = serde_json::json!({
                "date": note.date,
                "time": note.time,
                "commonName": note.common_name,
                "scientificName": note.scientific_name,
                "confidence": note.confidence,
                "latitude": note.latitude,
                "longitude": note.longitude,
                "clipName": note.clip_name,
                "beginTime": note.begin_time,
                "endTime": note.end_time,
            })
            .to_string();

            let mut guard = self.file.lock().await;
            let file = guard.as_mut().ok_or_else(|| Error::Internal {
                message: "db sink file not open".into(),
            })?;
            file.write_all(line.as_bytes())
                .await
                .map_err(|e| Error::Io {
                    path: self.path.clone(),
                    source: e,
                })?;
            file.write_all(b"\n").await.map_err(|e| Error::Io {
                path: self.path.clone(),
                source: e,
            })?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf as Pb;

    #[tokio::test]
    async fn publish_appends_one_json_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.ndjson");
        let sink = DbSink::new(path.clone());

        let note = Note {
            date: "2024-01-15".into(),
            time: "14:30:45".into(),
            common_name: "Great Tit".into(),
            scientific_name: "Parus major".into(),
            confidence: 0.85,
            latitude: 0.0,
            longitude: 0.0,
            clip_name: Pb::from("clips/1.wav"),
            begin_time: 0.0,
            end_time: 3.0,
        };
        sink.publish(note).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("Great Tit"));
    }
}
