//! `BirdWeather` citizen-science upload client.

use crate::birdweather::flac::encode_flac;
use crate::birdweather::html_error::{classify_status, extract_html_error_message, is_html_content_type, StatusCategory};
use crate::birdweather::location::randomize_location;
use crate::birdweather::masking::mask_url;
use crate::constants::birdweather::{ALGORITHM, HTTP_CLIENT_TIMEOUT, USER_AGENT};
use crate::detection::Note;
use crate::error::{Error, Result};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Talks to the `BirdWeather` API on behalf of one station.
pub struct BirdWeatherClient {
    http: reqwest::Client,
    base_url: String,
    station_id: String,
    latitude: f64,
    longitude: f64,
    location_accuracy_meters: f64,
}

#[derive(Debug, Deserialize)]
struct UploadSoundscapeResponse {
    success: bool,
    soundscape: SoundscapeBody,
}

#[derive(Debug, Deserialize)]
struct SoundscapeBody {
    id: i64,
}

impl BirdWeatherClient {
    /// Construct a client for `station_id` against the public API.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] if the underlying HTTP client can't be built.
    pub fn new(station_id: String, latitude: f64, longitude: f64, location_accuracy_meters: f64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_CLIENT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Internal {
                message: format!("failed to build http client: {e}"),
            })?;
        Ok(Self {
            http,
            base_url: "https://app.birdweather.com".to_string(),
            station_id,
            latitude,
            longitude,
            location_accuracy_meters,
        })
    }

    /// Construct a client pointed at `base_url` instead of the public API.
    /// Exists so integration tests can redirect a client at a local mock
    /// server; production callers should use [`Self::new`].
    ///
    /// # Errors
    /// Returns [`Error::Internal`] if the underlying HTTP client can't be built.
    pub fn with_base_url(
        station_id: String,
        latitude: f64,
        longitude: f64,
        location_accuracy_meters: f64,
        base_url: String,
    ) -> Result<Self> {
        let mut client = Self::new(station_id, latitude, longitude, location_accuracy_meters)?;
        client.base_url = base_url;
        Ok(client)
    }

    fn station_url(&self, path: &str) -> String {
        format!("{}/api/v1/stations/{}{}", self.base_url, self.station_id, path)
    }

    fn masked(&self, url: &str) -> String {
        mask_url(url, &self.station_id)
    }

    /// Encode `pcm_bytes` to FLAC and upload it as a 3-second soundscape
    /// clip, returning the soundscape ID assigned by the service.
    ///
    /// # Errors
    /// Returns a [`Error::Http`]/[`Error::UnexpectedStatus`]/[`Error::ResponseParse`]
    /// family error on any transport, status, or parse failure.
    pub async fn upload_soundscape(
        &self,
        timestamp: &str,
        pcm_bytes: &[u8],
        sample_rate: u32,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let flac = encode_flac(pcm_bytes, sample_rate, cancel).await?;
        let url = format!(
            "{}?timestamp={}&type=flac",
            self.station_url("/soundscapes"),
            urlencode(timestamp)
        );
        let masked_url = self.masked(&url);

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/octet-stream")
            .body(flac)
            .send()
            .await
            .map_err(|e| Error::Http {
                url: masked_url.clone(),
                source: e,
            })?;

        let parsed: UploadSoundscapeResponse = parse_json_response(response, &masked_url, 201).await?;
        if !parsed.success {
            return Err(Error::UnexpectedStatus {
                url: masked_url,
                status: 201,
                message: "soundscape upload reported success=false".to_string(),
            });
        }
        Ok(parsed.soundscape.id.to_string())
    }

    /// Post a detection referencing a previously uploaded `soundscape_id`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`] for empty strings, otherwise the
    /// usual HTTP/status/parse error family.
    pub async fn post_detection(
        &self,
        soundscape_id: &str,
        timestamp_unix: i64,
        common_name: &str,
        scientific_name: &str,
        confidence: f32,
    ) -> Result<()> {
        if common_name.is_empty() {
            return Err(Error::InvalidInput { field: "commonName" });
        }
        if scientific_name.is_empty() {
            return Err(Error::InvalidInput { field: "scientificName" });
        }
        if soundscape_id.is_empty() {
            return Err(Error::InvalidInput { field: "soundscapeId" });
        }

        let start = timestamp_unix;
        let end = timestamp_unix + 3;
        let (lat, lon) = randomize_location(self.latitude, self.longitude, self.location_accuracy_meters);

        let url = self.station_url("/detections");
        let masked_url = self.masked(&url);

        let body = serde_json::json!({
            "timestamp": format_unix_as_birdweather_timestamp(timestamp_unix),
            "lat": lat,
            "lon": lon,
            "soundscapeId": soundscape_id,
            "soundscapeStartTime": start,
            "soundscapeEndTime": end,
            "commonName": common_name,
            "scientificName": scientific_name,
            "algorithm": ALGORITHM,
            "confidence": format!("{confidence:.2}"),
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http {
                url: masked_url.clone(),
                source: e,
            })?;

        ensure_status(response, &masked_url, 201).await.map(|_| ())
    }

    /// Upload a note's soundscape and detection in sequence, as one logical
    /// publish. The upload must complete before the post, since the post
    /// references the soundscape ID.
    ///
    /// # Errors
    /// Propagates any error from `upload_soundscape` or `post_detection`;
    /// a failed upload aborts before the post is attempted.
    pub async fn publish(&self, note: &Note, pcm_bytes: &[u8], sample_rate: u32, cancel: &CancellationToken) -> Result<()> {
        let timestamp_unix = note.capture_unix_time();
        let timestamp = format_unix_as_birdweather_timestamp(timestamp_unix);
        let soundscape_id = self
            .upload_soundscape(&timestamp, pcm_bytes, sample_rate, cancel)
            .await?;
        self.post_detection(
            &soundscape_id,
            timestamp_unix,
            &note.common_name,
            &note.scientific_name,
            note.confidence,
        )
        .await
    }

    /// Release idle connections. Subsequent operations still work (a fresh
    /// connection is opened lazily); this just avoids holding sockets open.
    pub fn close(&self) {
        // reqwest has no explicit "close all" hook beyond dropping the client;
        // idle connections time out on their own. Kept as a named operation
        // so callers have a single place that marks end-of-life.
    }

    /// Hostname this client talks to, for DNS-fallback diagnostics.
    #[must_use]
    pub fn host(&self) -> &str {
        self.base_url
            .strip_prefix("https://")
            .or_else(|| self.base_url.strip_prefix("http://"))
            .unwrap_or(&self.base_url)
    }

    /// `APIConnectivity` probe: bare `HEAD /api/v1/`.
    ///
    /// # Errors
    /// Returns [`Error::Http`] on a transport-level failure.
    pub async fn head_root(&self) -> Result<()> {
        let url = format!("{}/api/v1/", self.base_url);
        self.http.head(&url).send().await.map_err(|e| Error::Http {
            url: self.masked(&url),
            source: e,
        })?;
        Ok(())
    }

    /// `Authentication` probe: `GET /api/v1/stations/{id}`. 401/403 means
    /// the station token is invalid; 404 means the station doesn't exist.
    ///
    /// # Errors
    /// Returns [`Error::AuthFailed`]/[`Error::StationNotFound`]/transport
    /// errors per the response status.
    pub async fn probe_station(&self) -> Result<()> {
        let url = self.station_url("");
        let masked_url = self.masked(&url);
        let response = self.http.get(&url).send().await.map_err(|e| Error::Http {
            url: masked_url.clone(),
            source: e,
        })?;
        ensure_status(response, &masked_url, 200).await.map(|_| ())
    }
}

/// `YYYY-MM-DDTHH:MM:SS.mmm±HHMM` formatting shared by `Publish` and the
/// self-test's sentinel payloads.
#[must_use]
pub fn format_test_timestamp(timestamp_unix: i64) -> String {
    format_unix_as_birdweather_timestamp(timestamp_unix)
}

async fn parse_json_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
    masked_url: &str,
    expected_status: u16,
) -> Result<T> {
    let body = ensure_status(response, masked_url, expected_status).await?;
    serde_json::from_str(&body).map_err(|e| Error::ResponseParse {
        url: masked_url.to_string(),
        source: e,
    })
}

/// Checks the response status, translating non-success codes (including
/// HTML gateway-error bodies) into the appropriate tagged error, and
/// returns the raw body text on success.
async fn ensure_status(response: reqwest::Response, masked_url: &str, expected_status: u16) -> Result<String> {
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if status == u16::from(expected_status) {
        return response.text().await.map_err(|e| Error::Http {
            url: masked_url.to_string(),
            source: e,
        });
    }

    let body = response.text().await.unwrap_or_default();

    if is_html_content_type(&content_type) {
        let message = extract_html_error_message(&body);
        debug!(status, masked_url, "received HTML error page instead of JSON");
        return Err(match classify_status(status) {
            StatusCategory::Timeout => Error::RequestTimeout {
                url: masked_url.to_string(),
                seconds: 0,
            },
            StatusCategory::Network => Error::UnexpectedStatus {
                url: masked_url.to_string(),
                status,
                message,
            },
        });
    }

    match status {
        401 | 403 => Err(Error::AuthFailed {
            url: masked_url.to_string(),
        }),
        404 => Err(Error::StationNotFound {
            url: masked_url.to_string(),
        }),
        _ => {
            warn!(status, masked_url, "unexpected status from birdweather");
            Err(Error::UnexpectedStatus {
                url: masked_url.to_string(),
                status,
                message: body,
            })
        }
    }
}

fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn format_unix_as_birdweather_timestamp(timestamp_unix: i64) -> String {
    use chrono::{Local, TimeZone};
    let dt = Local
        .timestamp_opt(timestamp_unix, 0)
        .single()
        .unwrap_or_else(chrono::Local::now);
    dt.format("%Y-%m-%dT%H:%M:%S%.3f%z").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencode_escapes_colons_and_plus() {
        let encoded = urlencode("2024-01-15T14:30:45.000+0100");
        assert!(!encoded.contains(':'));
        assert!(!encoded.contains('+'));
    }

    #[test]
    fn station_url_never_leaks_through_masking() {
        let client = BirdWeatherClient::new("secret-station".to_string(), 0.0, 0.0, 0.0).unwrap();
        let url = client.station_url("/detections");
        let masked = client.masked(&url);
        assert!(!masked.contains("secret-station"));
    }
}
