//! Task topology for the realtime detection pipeline.

mod coordinator;

pub use coordinator::run_pipeline;
