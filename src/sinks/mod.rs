//! Detection sink implementations (interface contracts per the spec; only
//! `BirdWeather` is specified in depth — see [`crate::birdweather`]).

mod db;
mod http;
mod metrics;
#[cfg(feature = "mqtt")]
mod mqtt;

pub use db::DbSink;
pub use http::HttpSink;
pub use metrics::MetricsSink;
#[cfg(feature = "mqtt")]
pub use mqtt::MqttSink;
