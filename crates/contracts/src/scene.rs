//! Scene - Sync Engine output
//!
//! Read-only view of every series resolved at the current cursor.

use serde::{Deserialize, Serialize};

use crate::{CurvatureSample, LatencySample, ObstacleFrame, SpeedSample};

/// Resolved scene at one cursor value
///
/// Each series is independently present or absent: a series has no active
/// sample when its nearest sample lies further than the tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Playback cursor (seconds)
    pub cursor: f64,

    /// Playback range start
    pub t_min: f64,

    /// Playback range end
    pub t_max: f64,

    pub is_playing: bool,

    /// Active position + obstacle set
    pub frame: Option<ObstacleFrame>,

    /// Active latency chart point
    pub latency: Option<LatencySample>,

    /// Active speed chart point
    pub speed: Option<SpeedSample>,

    /// Active curvature chart point
    pub curvature: Option<CurvatureSample>,
}

impl Scene {
    /// Obstacle count at the cursor (0 when no frame is active)
    pub fn obstacle_count(&self) -> usize {
        self.frame.as_ref().map_or(0, |f| f.obstacles.len())
    }

    pub fn latency_ms(&self) -> Option<f64> {
        self.latency.map(|s| s.latency)
    }

    pub fn speed_value(&self) -> Option<f64> {
        self.speed.map(|s| s.speed)
    }

    pub fn curvature_value(&self) -> Option<f64> {
        self.curvature.map(|s| s.curvature)
    }

    /// Fraction of the range covered by the cursor, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        let span = self.t_max - self.t_min;
        if span <= 0.0 {
            1.0
        } else {
            ((self.cursor - self.t_min) / span).clamp(0.0, 1.0)
        }
    }
}

/// What moved the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneCause {
    /// New analysis result loaded
    Load,
    /// Manual scrub / seek
    Seek,
    /// Click on a timed issue
    IssueJump,
    /// Play/pause toggle
    Toggle,
    /// Scheduled playback tick
    Tick,
    /// Playback reached the end of range
    Finished,
}

/// Scene published to consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneUpdate {
    /// Monotonic update number within the process
    pub sequence: u64,

    /// Session generation the scene belongs to
    pub session: u64,

    pub cause: SceneCause,

    pub scene: Scene,
}
