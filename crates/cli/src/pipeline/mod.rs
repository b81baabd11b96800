//! Pipeline orchestration module.

mod orchestrator;
mod sampler;
mod stats;

pub use orchestrator::{Pipeline, PipelineConfig};
pub use sampler::MetricsSampler;
pub use stats::{PipelineStats, PoolReport};
