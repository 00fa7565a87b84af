//! CLI argument parsing.
//!
//! A single `run` entry point wires the pipeline together for manual
//! exercise; `test-connection` exercises the `BirdWeather` self-test end
//! to end; `config` mirrors the teacher's own config-inspection command.
//! Anything beyond that (a web UI, interactive controls) is out of scope.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Realtime bird-sound detection and publication pipeline.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the TOML config file. Defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level passed to `tracing_subscriber`'s `EnvFilter` (overridden by `RUST_LOG`).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the detection pipeline against a file or stdin PCM stream.
    Run(RunArgs),
    /// Exercise the `BirdWeather` connection self-test.
    TestConnection,
    /// Print the effective configuration.
    Config,
}

/// Arguments for the `run` subcommand.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Audio file to decode and process. If omitted, reads raw 16-bit PCM from stdin.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Path to a newline-delimited labels file (one label per output index).
    #[arg(long)]
    pub labels: PathBuf,

    /// Sample rate of the raw PCM read from stdin. Ignored when `--input` is set.
    #[arg(long, default_value_t = crate::constants::SAMPLE_RATE)]
    pub stdin_sample_rate: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_requires_labels() {
        let result = Cli::try_parse_from(["birda", "run"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_connection_parses_with_no_extra_args() {
        let cli = Cli::try_parse_from(["birda", "test-connection"]).unwrap();
        assert!(matches!(cli.command, Command::TestConnection));
    }
}
