//! Crate-wide error type.
//!
//! Every variant maps to one of the category tags carried through the
//! pipeline (see [`ErrorKind`]); tests and sink-failure logging branch on
//! [`Error::kind`], never on the message text.

use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Category tag carried alongside every error so callers can branch on it
/// without inspecting the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input that the caller controls (bad config, bad argument).
    Validation,
    /// PCM/audio decoding or encoding failure.
    Audio,
    /// Network transport failure (connection refused, DNS, TLS, etc.).
    Network,
    /// A deadline was exceeded.
    Timeout,
    /// Local filesystem I/O failure.
    FileIo,
    /// A requested resource does not exist.
    NotFound,
    /// Authentication or authorization failure.
    Auth,
    /// Anything not covered by the above.
    Generic,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Audio => "audio",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::FileIo => "fileIO",
            Self::NotFound => "notFound",
            Self::Auth => "auth",
            Self::Generic => "generic",
        };
        f.write_str(s)
    }
}

/// Crate-wide error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bit depth outside `{16, 24, 32}` was pushed into the chunker.
    #[error("unsupported bit depth: {bit_depth} bits (expected 16, 24, or 32)")]
    UnsupportedBitDepth {
        /// The offending bit depth.
        bit_depth: u32,
    },

    /// Sample rate other than 48 kHz was pushed into the chunker.
    #[error("invalid sample rate: {sample_rate} Hz (expected 48000 Hz)")]
    InvalidSampleRate {
        /// The offending sample rate.
        sample_rate: u32,
    },

    /// The classifier's input tensor could not be allocated during init.
    #[error("failed to allocate classifier tensor: {message}")]
    TensorAllocation {
        /// Underlying runtime message.
        message: String,
    },

    /// A classifier invocation failed at runtime.
    #[error("classifier invocation failed: {message}")]
    InvokeFailed {
        /// Underlying runtime message.
        message: String,
    },

    /// Label file length does not match the output tensor length.
    #[error("label count {labels} does not match output tensor length {outputs}")]
    LabelCountMismatch {
        /// Number of labels loaded.
        labels: usize,
        /// Length of the model's output tensor.
        outputs: usize,
    },

    /// A string field required to be non-empty was empty.
    #[error("invalid input: {field} must not be empty")]
    InvalidInput {
        /// Name of the offending field.
        field: &'static str,
    },

    /// Failed to open an audio file.
    #[error("failed to open audio file {path}: {source}")]
    AudioOpen {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to decode an audio file.
    #[error("failed to decode audio file {path}: {source}")]
    AudioDecode {
        /// Path that failed to decode.
        path: PathBuf,
        /// Underlying codec error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No audio tracks were found in the container.
    #[error("no audio tracks found in {path}")]
    NoAudioTracks {
        /// Path that contained no audio tracks.
        path: PathBuf,
    },

    /// Resampling to the target rate failed.
    #[error("resample failed: {reason}")]
    Resample {
        /// Diagnostic message from the resampler.
        reason: String,
    },

    /// Failed to write a WAV clip.
    #[error("failed to write clip {path}: {source}")]
    ClipWrite {
        /// Destination path.
        path: PathBuf,
        /// Underlying hound error.
        #[source]
        source: hound::Error,
    },

    /// The external encoder binary was not found on the host.
    #[error("encoder not found at {path}")]
    EncoderNotFound {
        /// Configured encoder path.
        path: PathBuf,
    },

    /// The external encoder process failed or was killed.
    #[error("encoder process failed: {message}")]
    EncodeFailed {
        /// Diagnostic message.
        message: String,
    },

    /// The encoder did not finish within its timeout and was killed.
    #[error("encoder timed out after {seconds}s")]
    EncodeTimeout {
        /// Configured timeout in seconds.
        seconds: u64,
    },

    /// An HTTP request failed at the transport level.
    #[error("request to {url} failed: {source}")]
    Http {
        /// Masked URL (never contains the station ID).
        url: String,
        /// Underlying `reqwest` error.
        #[source]
        source: reqwest::Error,
    },

    /// A network operation exceeded its deadline.
    #[error("request to {url} timed out after {seconds}s")]
    RequestTimeout {
        /// Masked URL (never contains the station ID).
        url: String,
        /// Configured timeout in seconds.
        seconds: u64,
    },

    /// The server responded with an unexpected status code.
    #[error("request to {url} returned unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// Masked URL (never contains the station ID).
        url: String,
        /// HTTP status code.
        status: u16,
        /// Extracted error message (never raw HTML).
        message: String,
    },

    /// The server response body could not be parsed as the expected JSON shape.
    #[error("failed to parse response from {url}: {source}")]
    ResponseParse {
        /// Masked URL (never contains the station ID).
        url: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Authentication failed (401/403).
    #[error("authentication failed for {url}")]
    AuthFailed {
        /// Masked URL (never contains the station ID).
        url: String,
    },

    /// The requested station does not exist (404).
    #[error("station not found at {url}")]
    StationNotFound {
        /// Masked URL (never contains the station ID).
        url: String,
    },

    /// The connection test was attempted before the rate-limit window elapsed.
    #[error("rate limited, next attempt allowed at {retry_at_unix}")]
    RateLimited {
        /// Unix timestamp (seconds) of the next allowed attempt.
        retry_at_unix: i64,
    },

    /// DNS resolution failed for a hostname, including after fallback resolvers.
    #[error("DNS resolution failed for {host}: {message}")]
    DnsResolution {
        /// Hostname that failed to resolve.
        host: String,
        /// Diagnostic message.
        message: String,
    },

    /// Failed to read the config file.
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the config file.
    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// No platform configuration directory could be determined.
    #[error("could not determine configuration directory")]
    ConfigDirNotFound,

    /// A generic filesystem I/O failure not covered by a more specific variant.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Catch-all for invariants that should be unreachable in correct code.
    #[error("internal error: {message}")]
    Internal {
        /// Diagnostic message.
        message: String,
    },
}

impl Error {
    /// The underlying `reqwest` error, if this variant wraps one. Used to
    /// sniff DNS-shaped transport failures before falling back to
    /// alternate resolvers.
    #[must_use]
    pub fn as_reqwest(&self) -> Option<&reqwest::Error> {
        match self {
            Self::Http { source, .. } => Some(source),
            _ => None,
        }
    }

    /// The category tag this error carries through the pipeline.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedBitDepth { .. }
            | Self::InvalidSampleRate { .. }
            | Self::InvalidInput { .. }
            | Self::LabelCountMismatch { .. } => ErrorKind::Validation,

            Self::TensorAllocation { .. }
            | Self::InvokeFailed { .. }
            | Self::AudioOpen { .. }
            | Self::AudioDecode { .. }
            | Self::NoAudioTracks { .. }
            | Self::Resample { .. }
            | Self::EncodeFailed { .. }
            | Self::EncoderNotFound { .. } => ErrorKind::Audio,

            Self::Http { .. }
            | Self::UnexpectedStatus { .. }
            | Self::ResponseParse { .. }
            | Self::DnsResolution { .. } => ErrorKind::Network,

            Self::RequestTimeout { .. } | Self::EncodeTimeout { .. } => ErrorKind::Timeout,

            Self::ClipWrite { .. } | Self::ConfigRead { .. } | Self::Io { .. } => {
                ErrorKind::FileIo
            }

            Self::StationNotFound { .. } => ErrorKind::NotFound,

            Self::AuthFailed { .. } => ErrorKind::Auth,

            Self::ConfigParse { .. }
            | Self::ConfigDirNotFound
            | Self::RateLimited { .. }
            | Self::Internal { .. } => ErrorKind::Generic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_bit_depth_is_validation() {
        let err = Error::UnsupportedBitDepth { bit_depth: 8 };
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn http_errors_are_network() {
        let err = Error::DnsResolution {
            host: "example.com".into(),
            message: "no such host".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[test]
    fn kind_display_matches_spec_tags() {
        assert_eq!(ErrorKind::FileIo.to_string(), "fileIO");
        assert_eq!(ErrorKind::NotFound.to_string(), "notFound");
    }
}
