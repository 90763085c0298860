//! Replay pipeline module.

mod interactive;
mod orchestrator;
mod stats;

pub use orchestrator::{ReplayOptions, ReplayPipeline};
pub use stats::ReplayStats;
