//! FLAC encoding of soundscape clips via an external `ffmpeg` process.
//!
//! Uses two-pass `loudnorm` gain analysis/application. If pass 1 (analysis)
//! fails or times out, we fall back to a single pass at a fixed gain rather
//! than failing the upload outright.

use crate::constants::birdweather::{ENCODE_TIMEOUT, FALLBACK_GAIN_DB, GAIN_CLAMP_DB, TARGET_LUFS};
use crate::error::{Error, Result};
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const FLAC_MAGIC: &[u8; 4] = b"fLaC";

/// Encode raw little-endian 16-bit mono PCM at `sample_rate` into a FLAC
/// byte buffer, applying two-pass loudness normalization toward
/// [`TARGET_LUFS`]. `cancel` aborts the running subprocess promptly.
///
/// # Errors
/// Returns [`Error::EncoderNotFound`] if `ffmpeg` isn't on `PATH`,
/// [`Error::EncodeTimeout`] if the two passes combined exceed
/// [`ENCODE_TIMEOUT`], or [`Error::EncodeFailed`] for any other subprocess
/// or output failure.
pub async fn encode_flac(
    pcm: &[u8],
    sample_rate: u32,
    cancel: &CancellationToken,
) -> Result<Vec<u8>> {
    tokio::time::timeout(ENCODE_TIMEOUT, encode_flac_within_deadline(pcm, sample_rate, cancel))
        .await
        .unwrap_or(Err(Error::EncodeTimeout {
            seconds: ENCODE_TIMEOUT.as_secs(),
        }))
}

async fn encode_flac_within_deadline(
    pcm: &[u8],
    sample_rate: u32,
    cancel: &CancellationToken,
) -> Result<Vec<u8>> {
    let gain_db = match analyze_gain(pcm, sample_rate, cancel).await {
        Ok(gain) => gain,
        Err(e) => {
            warn!(error = %e, "loudness analysis pass failed, falling back to fixed gain");
            FALLBACK_GAIN_DB
        }
    };
    let clamped = gain_db.clamp(GAIN_CLAMP_DB.0, GAIN_CLAMP_DB.1);
    debug!(gain_db = clamped, "encoding FLAC with applied gain");
    apply_gain_and_encode(pcm, sample_rate, clamped, cancel).await
}

async fn analyze_gain(pcm: &[u8], sample_rate: u32, cancel: &CancellationToken) -> Result<f64> {
    let args = [
        "-hide_banner",
        "-nostats",
        "-loglevel",
        "error",
        "-f",
        "s16le",
        "-ar",
        &sample_rate.to_string(),
        "-ac",
        "1",
        "-i",
        "pipe:0",
        "-af",
        &format!("loudnorm=I={TARGET_LUFS}:print_format=summary"),
        "-f",
        "null",
        "-",
    ];
    let output = run_ffmpeg(&args, pcm, cancel).await?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    parse_input_i(&stderr)
}

fn parse_input_i(stderr: &str) -> Result<f64> {
    for line in stderr.lines() {
        if let Some(rest) = line.trim().strip_prefix("Input Integrated:") {
            let value = rest.trim().split_whitespace().next().ok_or_else(|| {
                Error::EncodeFailed {
                    message: "could not parse loudnorm summary".to_string(),
                }
            })?;
            let measured: f64 = value.parse().map_err(|_| Error::EncodeFailed {
                message: format!("non-numeric loudness measurement: {value}"),
            })?;
            return Ok(TARGET_LUFS - measured);
        }
    }
    Err(Error::EncodeFailed {
        message: "loudnorm summary missing Input Integrated line".to_string(),
    })
}

async fn apply_gain_and_encode(
    pcm: &[u8],
    sample_rate: u32,
    gain_db: f64,
    cancel: &CancellationToken,
) -> Result<Vec<u8>> {
    let args = [
        "-hide_banner",
        "-nostats",
        "-loglevel",
        "error",
        "-f",
        "s16le",
        "-ar",
        &sample_rate.to_string(),
        "-ac",
        "1",
        "-i",
        "pipe:0",
        "-af",
        &format!("volume={gain_db}dB"),
        "-f",
        "flac",
        "pipe:1",
    ];
    let output = run_ffmpeg(&args, pcm, cancel).await?;
    if output.stdout.len() < 4 || &output.stdout[..4] != FLAC_MAGIC {
        return Err(Error::EncodeFailed {
            message: "ffmpeg output did not start with the FLAC magic bytes".to_string(),
        });
    }
    Ok(output.stdout)
}

struct FfmpegOutput {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

async fn run_ffmpeg(args: &[&str], stdin_data: &[u8], cancel: &CancellationToken) -> Result<FfmpegOutput> {
    let mut child = Command::new("ffmpeg")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::EncoderNotFound {
                    path: "ffmpeg".into(),
                }
            } else {
                Error::EncodeFailed {
                    message: format!("failed to spawn ffmpeg: {e}"),
                }
            }
        })?;

    let mut stdin = child.stdin.take().ok_or_else(|| Error::EncodeFailed {
        message: "ffmpeg child has no stdin handle".to_string(),
    })?;
    let mut stdout = child.stdout.take().ok_or_else(|| Error::EncodeFailed {
        message: "ffmpeg child has no stdout handle".to_string(),
    })?;
    let mut stderr = child.stderr.take().ok_or_else(|| Error::EncodeFailed {
        message: "ffmpeg child has no stderr handle".to_string(),
    })?;

    let stdin_data = stdin_data.to_vec();
    let write_task = tokio::spawn(async move {
        let _ = stdin.write_all(&stdin_data).await;
        drop(stdin);
    });

    let read_stdout = async {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).await.map(|_| buf)
    };
    let read_stderr = async {
        let mut buf = Vec::new();
        stderr.read_to_end(&mut buf).await.map(|_| buf)
    };

    let run = async {
        let (stdout_buf, stderr_buf) = tokio::try_join!(read_stdout, read_stderr).map_err(|e| {
            Error::EncodeFailed {
                message: format!("failed to read ffmpeg output: {e}"),
            }
        })?;
        let status = child.wait().await.map_err(|e| Error::EncodeFailed {
            message: format!("failed to wait on ffmpeg: {e}"),
        })?;
        let _ = write_task.await;
        if !status.success() {
            return Err(Error::EncodeFailed {
                message: format!(
                    "ffmpeg exited with {status}: {}",
                    String::from_utf8_lossy(&stderr_buf)
                ),
            });
        }
        Ok(FfmpegOutput {
            stdout: stdout_buf,
            stderr: stderr_buf,
        })
    };

    tokio::select! {
        result = run => result,
        () = cancel.cancelled() => {
            let _ = child.start_kill();
            Err(Error::EncodeFailed { message: "encoding cancelled".to_string() })
        }
    }
}
