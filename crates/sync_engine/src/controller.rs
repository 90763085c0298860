//! Sync controller: one clock plus one index per derived series.
//!
//! Every cursor mutation goes through here so the resolved scene is always
//! consistent with the clock.

use contracts::{
    ContractError, CurvatureSample, Issue, LatencySample, ObstacleFrame, PlaybackConfig,
    ResultModel, Scene, SpeedSample, CURVATURE_SERIES, LATENCY_SERIES, OBSTACLES_SERIES,
    SPEED_SERIES,
};
use tracing::{debug, info, instrument};

use crate::clock::{PlaybackClock, PlaybackState, TickOutcome};
use crate::series_index::SeriesIndex;

/// Playback façade over a loaded analysis result
#[derive(Debug)]
pub struct SyncController {
    result: ResultModel,
    obstacles: SeriesIndex<ObstacleFrame>,
    latency: SeriesIndex<LatencySample>,
    speed: SeriesIndex<SpeedSample>,
    curvature: SeriesIndex<CurvatureSample>,
    clock: PlaybackClock,
    tolerance: f64,
}

impl SyncController {
    /// Build a controller for `result`, paused at the first obstacle sample
    ///
    /// # Errors
    /// - `EmptySeries` / `NonMonotonicSeries` when a derived series is unusable
    #[instrument(
        name = "sync_controller_new",
        skip(result),
        fields(issues = result.issues.len(), frames = result.derived.obstacles_time_series.len())
    )]
    pub fn new(result: ResultModel, tolerance: f64) -> Result<Self, ContractError> {
        result.validate()?;

        let derived = &result.derived;
        let obstacles = SeriesIndex::new(
            OBSTACLES_SERIES,
            derived.obstacles_time_series.clone(),
            tolerance,
        )?;
        let latency = SeriesIndex::new(LATENCY_SERIES, derived.latency_timeline.clone(), tolerance)?;
        let speed = SeriesIndex::new(SPEED_SERIES, derived.speed_timeline.clone(), tolerance)?;
        let curvature = SeriesIndex::new(
            CURVATURE_SERIES,
            derived.curvature_timeline.clone(),
            tolerance,
        )?;

        let clock = PlaybackClock::new(obstacles.first_time(), obstacles.last_time());
        let (t_min, t_max) = clock.range();

        observability::record_result_loaded(
            result.issues.len(),
            obstacles.len() + latency.len() + speed.len() + curvature.len(),
            t_max - t_min,
        );
        info!(t_min, t_max, tolerance, "analysis result loaded");

        Ok(Self {
            result,
            obstacles,
            latency,
            speed,
            curvature,
            clock,
            tolerance,
        })
    }

    /// Build a controller with tolerance taken from playback config
    pub fn with_config(result: ResultModel, config: &PlaybackConfig) -> Result<Self, ContractError> {
        Self::new(result, config.tolerance)
    }

    /// Replace the loaded result, resetting the cursor to the new start
    ///
    /// On error the current session is left untouched.
    pub fn load_result(&mut self, result: ResultModel) -> Result<(), ContractError> {
        *self = Self::new(result, self.tolerance)?;
        Ok(())
    }

    /// Resolve every series at the current cursor
    pub fn current_scene(&self) -> Scene {
        let cursor = self.clock.cursor();
        let (t_min, t_max) = self.clock.range();

        Scene {
            cursor,
            t_min,
            t_max,
            is_playing: self.clock.is_playing(),
            frame: self.obstacles.resolve(cursor).cloned(),
            latency: self.latency.resolve(cursor).copied(),
            speed: self.speed.resolve(cursor).copied(),
            curvature: self.curvature.resolve(cursor).copied(),
        }
    }

    /// Manual scrub: clamp into range and pause
    ///
    /// Returns the cursor after the seek. A NaN target leaves it unchanged.
    #[instrument(name = "sync_controller_seek", level = "debug", skip(self))]
    pub fn seek_to(&mut self, t: f64) -> f64 {
        let (t_min, t_max) = self.clock.range();
        self.clock.seek(t);
        let cursor = self.clock.cursor();
        observability::record_seek(cursor, t < t_min || t > t_max);
        cursor
    }

    #[instrument(name = "sync_controller_toggle", level = "debug", skip(self), fields(cursor = self.clock.cursor()))]
    pub fn toggle_play(&mut self) -> PlaybackState {
        let state = self.clock.toggle_play();
        debug!(?state, "playback toggled");
        state
    }

    /// Start playback (no-op at end of range or when already playing)
    pub fn play(&mut self) -> PlaybackState {
        self.clock.play();
        self.clock.state()
    }

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    /// Advance one scheduling step
    #[instrument(name = "sync_controller_tick", level = "trace", skip(self))]
    pub fn tick(&mut self, step: f64) -> TickOutcome {
        let outcome = self.clock.tick(step);
        match outcome {
            TickOutcome::Advanced => observability::record_tick("advanced"),
            TickOutcome::Finished => {
                observability::record_tick("finished");
                info!(cursor = self.clock.cursor(), "playback reached end of range");
            }
            TickOutcome::Ignored => observability::record_tick("ignored"),
        }
        outcome
    }

    /// Seek to an issue's timestamp
    ///
    /// Returns `false` (and leaves the cursor alone) when the issue has no
    /// timestamp.
    #[instrument(name = "sync_controller_jump_to_issue", level = "debug", skip(self, issue), fields(code = %issue.code))]
    pub fn jump_to_issue(&mut self, issue: &Issue) -> bool {
        let applied = match issue.timestamp {
            Some(t) => {
                self.seek_to(t);
                true
            }
            None => false,
        };
        observability::record_issue_jump(applied);
        applied
    }

    /// Jump to the issue at position `index` in the result's issue list
    ///
    /// Out-of-range indices and untimed issues are no-ops.
    pub fn jump_to_issue_index(&mut self, index: usize) -> bool {
        let Some(issue) = self.result.issues.get(index).cloned() else {
            debug!(index, "issue index out of range");
            return false;
        };
        self.jump_to_issue(&issue)
    }

    /// Loaded analysis result
    pub fn result(&self) -> &ResultModel {
        &self.result
    }

    /// Playback range `[t_min, t_max]`
    pub fn time_range(&self) -> (f64, f64) {
        self.clock.range()
    }

    pub fn cursor(&self) -> f64 {
        self.clock.cursor()
    }

    pub fn state(&self) -> PlaybackState {
        self.clock.state()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}
