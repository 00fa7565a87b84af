//! Birda - realtime bird-sound detection and publication pipeline.
//!
//! Wires a PCM [`audio::AudioSource`] through windowing and classification
//! to a [`detection::DetectionRouter`] that fans detections out to the
//! `BirdWeather` citizen-science service and any other configured sinks.
//! The tensor-runtime binding itself ([`inference::Interpreter`]) is a
//! pure extension point; no concrete model backend ships in this crate.

#![warn(missing_docs)]

pub mod audio;
pub mod birdweather;
pub mod cli;
pub mod clipper;
pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod inference;
pub mod pipeline;
pub mod sinks;
pub mod utils;

use audio::{AudioSource, BitDepth, FileAudioSource, StdinAudioSource};
use clap::Parser;
use cli::{Cli, Command, RunArgs};
use detection::DetectionRouter;
use inference::Interpreter;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use error::{Error, Result};

/// Parses CLI arguments, initialises logging, and dispatches to the
/// requested subcommand. This is the process's sole entry point.
///
/// # Errors
/// Propagates any error from config loading, pipeline construction, or
/// the dispatched subcommand itself.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let settings = cli.config.as_ref().map_or_else(
        config::load_default_config,
        |path| config::load_config_file(path),
    )?;

    match cli.command {
        Command::Run(args) => run_tokio(run_detection(args, settings)),
        Command::TestConnection => run_tokio(run_test_connection(settings)),
        Command::Config => {
            print_config(&settings);
            Ok(())
        }
    }
}

fn run_tokio<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal {
            message: format!("failed to start async runtime: {e}"),
        })?;
    runtime.block_on(future)
}

/// Initialises `tracing_subscriber` once at process start. `level` is the
/// default filter directive; `RUST_LOG` overrides it when set.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_config(settings: &config::Settings) {
    match toml::to_string_pretty(settings) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("failed to render config: {e}"),
    }
}

async fn run_detection(args: RunArgs, settings: config::Settings) -> Result<()> {
    let labels = Arc::new(load_labels(&args.labels)?);
    let cancel = CancellationToken::new();
    install_interrupt_handler(cancel.clone());

    let router = Arc::new(build_router(&settings, cancel.clone())?);
    let label_count = labels.len();

    match args.input {
        Some(path) => {
            let source = FileAudioSource::open(&path)?;
            run_with_source(source, settings, labels, router, label_count, cancel).await
        }
        None => {
            let stdin = tokio::io::stdin();
            let source = StdinAudioSource::new(stdin, args.stdin_sample_rate, BitDepth::Sixteen);
            run_with_source(source, settings, labels, router, label_count, cancel).await
        }
    }
}

async fn run_with_source<S: AudioSource + Send + 'static>(
    source: S,
    settings: config::Settings,
    labels: Arc<Vec<String>>,
    router: Arc<DetectionRouter>,
    label_count: usize,
    cancel: CancellationToken,
) -> Result<()> {
    info!(labels = label_count, "starting pipeline");
    pipeline::run_pipeline(
        source,
        settings.birdnet,
        labels,
        router,
        move || Ok(NullInterpreter { label_count }),
        cancel,
    )
    .await
}

fn load_labels(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(contents.lines().map(str::to_string).filter(|l| !l.is_empty()).collect())
}

fn build_router(settings: &config::Settings, cancel: CancellationToken) -> Result<DetectionRouter> {
    let writer = clipper::WavWriter::new(settings.audio.capture_path.clone());
    let mut sinks: Vec<Arc<dyn detection::Sink>> = vec![
        Arc::new(sinks::DbSink::new(settings.audio.capture_path.join("notes.ndjson"))),
        Arc::new(sinks::MetricsSink::new()),
    ];

    if settings.birdweather.enabled {
        let client = birdweather::BirdWeatherClient::new(
            settings.birdweather.id.clone(),
            settings.birdnet.latitude,
            settings.birdnet.longitude,
            settings.birdweather.location_accuracy,
        )?;
        sinks.push(Arc::new(birdweather::BirdWeatherSink::new(client, cancel)));
    }

    Ok(DetectionRouter::new(
        settings.birdnet.threshold,
        settings.birdnet.latitude,
        settings.birdnet.longitude,
        writer,
        sinks,
        constants::SINK_QUEUE_CAPACITY,
    ))
}

async fn run_test_connection(settings: config::Settings) -> Result<()> {
    if settings.birdweather.id.is_empty() {
        return Err(Error::InvalidInput { field: "birdweather.id" });
    }
    let client = birdweather::BirdWeatherClient::new(
        settings.birdweather.id.clone(),
        settings.birdnet.latitude,
        settings.birdnet.longitude,
        settings.birdweather.location_accuracy,
    )?;
    let limiter = birdweather::RateLimiter::new(birdweather::SystemClock);
    let (sender, mut receiver) = tokio::sync::mpsc::channel(8);
    let now = chrono::Utc::now().timestamp();

    let driver = async {
        birdweather::run_test(&client, &limiter, now, &sender).await;
        drop(sender);
    };
    let printer = async {
        while let Some(stage) = receiver.recv().await {
            info!(
                stage = stage.stage,
                success = stage.success,
                message = stage.message,
                "connection test stage"
            );
        }
    };
    tokio::join!(driver, printer);
    Ok(())
}

fn install_interrupt_handler(cancel: CancellationToken) {
    let result = ctrlc::set_handler(move || {
        warn!("interrupt received, shutting down");
        cancel.cancel();
    });
    if let Err(e) = result {
        warn!(error = %e, "failed to install interrupt handler");
    }
}

/// Stand-in [`Interpreter`] used by the `run` subcommand so the full
/// pipeline (audio, chunking, thresholding, sinks) can be exercised
/// manually without a real tensor runtime, which this crate does not
/// bind. Always emits zero logits, which sigmoid-calibrates to `0.5` for
/// every label.
struct NullInterpreter {
    label_count: usize,
}

impl Interpreter for NullInterpreter {
    fn invoke(&mut self, _window: &[f32]) -> Result<Vec<f32>> {
        Ok(vec![0.0; self.label_count])
    }

    fn label_count(&self) -> usize {
        self.label_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_interpreter_emits_one_logit_per_label() {
        let mut interp = NullInterpreter { label_count: 3 };
        let logits = interp.invoke(&[]).unwrap();
        assert_eq!(logits.len(), 3);
        assert_eq!(interp.label_count(), 3);
    }

    #[test]
    fn load_labels_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, "a\n\nb\nc\n").unwrap();
        let labels = load_labels(&path).unwrap();
        assert_eq!(labels, vec!["a", "b", "c"]);
    }
}
