//! # Viewer
//!
//! Operator-facing playback session: upload a log, load the analysis
//! result, and scrub or play through it while scenes are published to the
//! dispatcher.
//!
//! - `ViewerSession`: loaded result, report, error and loading flag
//! - `PlaybackDriver`: tick task plus scene publishing
//! - `Command`: line-oriented operator grammar

mod commands;
mod driver;
mod error;
mod session;

#[cfg(test)]
mod test_support;

pub use commands::{Command, Response, HELP};
pub use driver::PlaybackDriver;
pub use error::ViewerError;
pub use session::{Applied, ViewerSession};
