//! Staged self-test: `APIConnectivity` → `Authentication` → `SoundscapeUpload` → `DetectionPost`.

use crate::birdweather::client::BirdWeatherClient;
use crate::birdweather::dns::{looks_like_dns_failure, resolve_with_fallback};
use crate::birdweather::rate_limiter::{Clock, RateLimiter};
use crate::constants::birdweather::{
    STAGE_TIMEOUTS, TEST_COMMON_NAME, TEST_CONFIDENCE, TEST_SCIENTIFIC_NAME, TEST_SOUNDSCAPE_SECONDS,
};
use crate::constants::SAMPLE_RATE;
use crate::error::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Lifecycle state of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Running,
    Completed,
    Failed,
    Timeout,
}

/// One streamed result from [`run_test`].
#[derive(Debug, Clone)]
pub struct StageResult {
    pub success: bool,
    pub stage: String,
    pub message: String,
    pub error: Option<String>,
    pub is_progress: bool,
    pub state: StageState,
    pub timestamp: i64,
    pub result_id: Option<String>,
    pub rate_limit_expiry: Option<i64>,
}

impl StageResult {
    fn running(stage: &str, timestamp: i64) -> Self {
        Self {
            success: true,
            stage: stage.to_string(),
            message: format!("{stage}: running"),
            error: None,
            is_progress: true,
            state: StageState::Running,
            timestamp,
            result_id: None,
            rate_limit_expiry: None,
        }
    }

    fn completed(stage: &str, timestamp: i64, message: String, result_id: Option<String>) -> Self {
        Self {
            success: true,
            stage: stage.to_string(),
            message,
            error: None,
            is_progress: false,
            state: StageState::Completed,
            timestamp,
            result_id,
            rate_limit_expiry: None,
        }
    }

    fn failed(stage: &str, timestamp: i64, error: &Error, timed_out: bool) -> Self {
        Self {
            success: false,
            stage: stage.to_string(),
            message: error.to_string(),
            error: Some(error.to_string()),
            is_progress: false,
            state: if timed_out { StageState::Timeout } else { StageState::Failed },
            timestamp,
            result_id: None,
            rate_limit_expiry: None,
        }
    }

    fn rate_limited(timestamp: i64, retry_at_unix: i64) -> Self {
        Self {
            success: false,
            stage: "Starting Test".to_string(),
            message: format!("rate limited until {retry_at_unix}"),
            error: Some("rate limited".to_string()),
            is_progress: false,
            state: StageState::Failed,
            timestamp,
            result_id: None,
            rate_limit_expiry: Some(retry_at_unix),
        }
    }
}

/// Run the four-stage connection test, streaming a [`StageResult`] per
/// stage transition into `sender`. Gated by `limiter` (at most one run per
/// minute process-wide).
pub async fn run_test<C: Clock>(
    client: &BirdWeatherClient,
    limiter: &RateLimiter<C>,
    now_unix: i64,
    sender: &mpsc::Sender<StageResult>,
) {
    if let Err(retry_at) = limiter.try_start() {
        let _ = sender.send(StageResult::rate_limited(now_unix, retry_at)).await;
        return;
    }

    let cancel = CancellationToken::new();

    if !run_stage(sender, "APIConnectivity", STAGE_TIMEOUTS[0], now_unix, || {
        probe_connectivity(client)
    })
    .await
    {
        return;
    }

    if !run_stage(sender, "Authentication", STAGE_TIMEOUTS[1], now_unix, || {
        probe_authentication(client)
    })
    .await
    {
        return;
    }

    let soundscape_id = match run_stage_with_result(sender, "SoundscapeUpload", STAGE_TIMEOUTS[2], now_unix, || {
        upload_test_soundscape(client, now_unix, &cancel)
    })
    .await
    {
        Some(id) => id,
        None => return,
    };

    let _ = run_stage(sender, "DetectionPost", STAGE_TIMEOUTS[3], now_unix, || {
        post_test_detection(client, &soundscape_id, now_unix)
    })
    .await;
}

async fn run_stage<F, Fut>(
    sender: &mpsc::Sender<StageResult>,
    stage: &str,
    timeout: std::time::Duration,
    now_unix: i64,
    op: F,
) -> bool
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<String, Error>>,
{
    let _ = sender.send(StageResult::running(stage, now_unix)).await;
    match tokio::time::timeout(timeout, op()).await {
        Ok(Ok(message)) => {
            let _ = sender.send(StageResult::completed(stage, now_unix, message, None)).await;
            true
        }
        Ok(Err(e)) => {
            maybe_log_dns_diagnostic(&e);
            let _ = sender.send(StageResult::failed(stage, now_unix, &e, false)).await;
            false
        }
        Err(_) => {
            let timeout_err = Error::RequestTimeout {
                url: stage.to_string(),
                seconds: timeout.as_secs(),
            };
            let _ = sender.send(StageResult::failed(stage, now_unix, &timeout_err, true)).await;
            false
        }
    }
}

async fn run_stage_with_result<F, Fut>(
    sender: &mpsc::Sender<StageResult>,
    stage: &str,
    timeout: std::time::Duration,
    now_unix: i64,
    op: F,
) -> Option<String>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<String, Error>>,
{
    let _ = sender.send(StageResult::running(stage, now_unix)).await;
    match tokio::time::timeout(timeout, op()).await {
        Ok(Ok(id)) => {
            let _ = sender
                .send(StageResult::completed(stage, now_unix, "upload succeeded".to_string(), Some(id.clone())))
                .await;
            Some(id)
        }
        Ok(Err(e)) => {
            maybe_log_dns_diagnostic(&e);
            let _ = sender.send(StageResult::failed(stage, now_unix, &e, false)).await;
            None
        }
        Err(_) => {
            let timeout_err = Error::RequestTimeout {
                url: stage.to_string(),
                seconds: timeout.as_secs(),
            };
            let _ = sender.send(StageResult::failed(stage, now_unix, &timeout_err, true)).await;
            None
        }
    }
}

fn maybe_log_dns_diagnostic(error: &Error) {
    if matches!(error.kind(), crate::error::ErrorKind::Network) {
        warn!(error = %error, "stage failed with a network error; if this recurs, check whether it is DNS related");
    }
}

async fn probe_connectivity(client: &BirdWeatherClient) -> Result<String, Error> {
    match client.head_root().await {
        Ok(()) => Ok("connectivity OK".to_string()),
        Err(e) => {
            if let Some(reqwest_err) = e.as_reqwest() {
                if looks_like_dns_failure(reqwest_err) {
                    if let Err(dns_err) = resolve_with_fallback(client.host()).await {
                        return Err(dns_err);
                    }
                    warn!(host = client.host(), "system DNS resolver appears misconfigured for this host");
                }
            }
            Err(e)
        }
    }
}

async fn probe_authentication(client: &BirdWeatherClient) -> Result<String, Error> {
    client.probe_station().await.map(|()| "authenticated".to_string())
}

async fn upload_test_soundscape(
    client: &BirdWeatherClient,
    now_unix: i64,
    cancel: &CancellationToken,
) -> Result<String, Error> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let sample_count = (f64::from(SAMPLE_RATE) * TEST_SOUNDSCAPE_SECONDS) as usize;
    let pcm = vec![0u8; sample_count * 2];
    let timestamp = crate::birdweather::client::format_test_timestamp(now_unix);
    client.upload_soundscape(&timestamp, &pcm, SAMPLE_RATE, cancel).await
}

async fn post_test_detection(client: &BirdWeatherClient, soundscape_id: &str, now_unix: i64) -> Result<String, Error> {
    client
        .post_detection(soundscape_id, now_unix, TEST_COMMON_NAME, TEST_SCIENTIFIC_NAME, TEST_CONFIDENCE)
        .await
        .map(|()| "detection post OK".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_result_running_is_progress() {
        let result = StageResult::running("APIConnectivity", 1_000);
        assert!(result.is_progress);
        assert_eq!(result.state, StageState::Running);
    }

    #[test]
    fn rate_limited_result_carries_expiry_and_no_success() {
        let result = StageResult::rate_limited(1_000, 1_060);
        assert!(!result.success);
        assert_eq!(result.rate_limit_expiry, Some(1_060));
        assert_eq!(result.stage, "Starting Test");
    }
}
