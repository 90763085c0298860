//! # Contracts
//!
//! Frozen interface contracts shared by every crate: the analysis result
//! model, resolved scenes, configuration, and the service/sink traits.
//! Business crates depend only on this crate, never on each other's internals.
//!
//! ## Time Model
//! - Timeline time is seconds (f64) as reported by the analysis service
//! - The obstacle series defines the playback range

mod artifact;
mod error;
mod model;
mod playback_config;
mod replayer_config;
mod scene;
mod service;
mod sink;

pub use artifact::*;
pub use error::*;
pub use model::*;
pub use playback_config::*;
pub use replayer_config::*;
pub use scene::*;
pub use service::{AnalysisService, LocalAnalysisService};
pub use sink::*;
