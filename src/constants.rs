//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "birda";

/// Model sample rate in Hz. The classifier was trained at this rate; the
/// chunker rejects any other rate.
pub const SAMPLE_RATE: u32 = 48_000;

/// Window length in seconds.
pub const WINDOW_SECONDS: f32 = 3.0;

/// Default minimum confidence threshold for detections.
pub const DEFAULT_THRESHOLD: f32 = 0.1;

/// Default segment overlap in seconds.
pub const DEFAULT_OVERLAP: f32 = 0.0;

/// Default sensitivity applied before the sigmoid.
pub const DEFAULT_SENSITIVITY: f64 = 1.0;

/// Default number of top predictions to return per window.
pub const DEFAULT_TOP_K: usize = 1;

/// Capacity of the bounded PCM channel between the audio source and the chunker.
pub const PCM_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the bounded window channel between the chunker and the classifier pool.
pub const WINDOW_CHANNEL_CAPACITY: usize = 32;

/// Capacity of each per-sink detection queue.
pub const SINK_QUEUE_CAPACITY: usize = 16;

/// BirdWeather-related constants.
pub mod birdweather {
    use std::time::Duration;

    /// `BirdNET`-Go's historical `User-Agent` string, preserved for compatibility.
    pub const USER_AGENT: &str = "BirdNET-Go";

    /// Target integrated loudness for pass 2 gain computation, in LUFS.
    pub const TARGET_LUFS: f64 = -23.0;

    /// Gain clamp bounds in dB.
    pub const GAIN_CLAMP_DB: (f64, f64) = (-30.0, 30.0);

    /// Fallback gain applied when loudness analysis fails or times out.
    pub const FALLBACK_GAIN_DB: f64 = 15.0;

    /// Total encode timeout covering both loudness-analysis and
    /// gain-application passes combined, not each pass individually.
    pub const ENCODE_TIMEOUT: Duration = Duration::from_secs(30);

    /// HTTP client-wide timeout.
    pub const HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(45);

    /// Meters per degree of latitude/longitude, used by location fuzzing.
    pub const METERS_PER_DEGREE: f64 = 111_000.0;

    /// Decimal places the fuzzed coordinate is truncated to.
    pub const FUZZ_DECIMAL_PLACES: f64 = 10_000.0;

    /// Algorithm identifier sent with every detection post.
    pub const ALGORITHM: &str = "2p4";

    /// Minimum interval between successive connection-test runs.
    pub const TEST_RATE_LIMIT: Duration = Duration::from_secs(60);

    /// Per-stage timeouts for the staged connection test: connectivity, auth, upload, detection.
    pub const STAGE_TIMEOUTS: [Duration; 4] = [
        Duration::from_secs(15),
        Duration::from_secs(15),
        Duration::from_secs(30),
        Duration::from_secs(15),
    ];

    /// Fallback DNS resolvers tried in order when the system resolver fails.
    pub const FALLBACK_DNS_SERVERS: [&str; 3] = ["1.1.1.1:53", "8.8.8.8:53", "9.9.9.9:53"];

    /// Per-server timeout while probing a fallback resolver.
    pub const FALLBACK_DNS_SERVER_TIMEOUT: Duration = Duration::from_secs(5);

    /// Total time budget for the whole fallback-resolution attempt.
    pub const FALLBACK_DNS_TOTAL_BUDGET: Duration = Duration::from_secs(10);

    /// Placeholder substituted for the station ID in logged URLs.
    pub const MASKED_ID: &str = "[BIRDWEATHER_ID]";

    /// Sentinel species used by the self-test's `DetectionPost` stage.
    pub const TEST_COMMON_NAME: &str = "Whooper Swan";
    /// Sentinel scientific name used by the self-test's `DetectionPost` stage.
    pub const TEST_SCIENTIFIC_NAME: &str = "Cygnus cygnus";
    /// Confidence reported by the self-test's `DetectionPost` stage.
    pub const TEST_CONFIDENCE: f32 = 0.3;
    /// Duration, in seconds, of the silent clip used by the self-test's upload stage.
    pub const TEST_SOUNDSCAPE_SECONDS: f64 = 0.5;

    /// HTML error-page keywords searched for, in priority order, when extracting a snippet.
    pub const HTML_ERROR_KEYWORDS: [&str; 6] =
        ["error", "not found", "unauthorized", "forbidden", "bad gateway", "timeout"];

    /// Width, in characters, of the snippet extracted around a matched HTML error keyword.
    pub const HTML_SNIPPET_WINDOW: usize = 150;
}
