//! Playback engine configuration contracts that can be shared across crates.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Maximum `|t - sample.t|` for a sample to be active (seconds)
pub const DEFAULT_TOLERANCE: f64 = 0.05;

/// Cursor advance per scheduling tick (seconds)
pub const DEFAULT_STEP: f64 = 0.1;

/// Scheduling tick period, roughly one display frame
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 16;

/// Playback engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Snap distance for series resolution
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Fixed cursor increment per tick
    #[serde(default = "default_step")]
    pub step: f64,

    /// Tick period in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// How the per-tick step is derived
    #[serde(default)]
    pub mode: PlaybackMode,

    /// Timeline seconds per wall-clock second (`wall_clock` mode only)
    #[serde(default = "default_playback_rate")]
    pub playback_rate: f64,
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_step() -> f64 {
    DEFAULT_STEP
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_playback_rate() -> f64 {
    1.0
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            step: DEFAULT_STEP,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            mode: PlaybackMode::default(),
            playback_rate: 1.0,
        }
    }
}

impl PlaybackConfig {
    /// Tick period as a `Duration`
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Step to apply for a tick that arrived `elapsed` after the previous one
    pub fn step_for(&self, elapsed: Duration) -> f64 {
        match self.mode {
            PlaybackMode::FixedStep => self.step,
            PlaybackMode::WallClock => elapsed.as_secs_f64() * self.playback_rate,
        }
    }
}

/// Cursor advance policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Constant step per tick; speed follows the host tick rate
    #[default]
    FixedStep,
    /// Step scaled by real elapsed time between ticks
    WallClock,
}
