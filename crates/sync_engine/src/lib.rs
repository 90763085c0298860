//! # Sync Engine
//!
//! Timeline synchronization and playback for replayed analysis results.
//!
//! Responsible for:
//! - Nearest-sample lookup per derived series (`SeriesIndex`)
//! - The cursor and play/pause state machine (`PlaybackClock`)
//! - Resolving a consistent `Scene` for the cursor (`SyncController`)
//!
//! ## Example
//!
//! ```ignore
//! use sync_engine::{SyncController, TickOutcome};
//!
//! let mut controller = SyncController::new(result, 0.05)?;
//! controller.toggle_play();
//!
//! while controller.tick(0.1) == TickOutcome::Advanced {
//!     render(controller.current_scene());
//! }
//! ```

mod clock;
mod controller;
mod series_index;

pub use clock::{PlaybackClock, PlaybackState, TickOutcome};
pub use controller::SyncController;
pub use series_index::SeriesIndex;

// Re-export contracts types
pub use contracts::{PlaybackConfig, PlaybackMode, ResultModel, Scene};
