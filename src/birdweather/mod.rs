//! `BirdWeather` citizen-science upload integration.

mod client;
mod dns;
mod flac;
mod html_error;
mod location;
mod masking;
mod rate_limiter;
mod sink;
mod test_connection;

pub use client::BirdWeatherClient;
pub use dns::{looks_like_dns_failure, resolve_with_fallback};
pub use flac::encode_flac;
pub use html_error::{classify_status, extract_html_error_message, is_html_content_type, StatusCategory};
pub use location::randomize_location;
pub use masking::mask_url;
pub use rate_limiter::{Clock, RateLimiter, SystemClock};
pub use sink::BirdWeatherSink;
pub use test_connection::{run_test, StageResult, StageState};
