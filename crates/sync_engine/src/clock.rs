//! Playback clock: cursor, range, and the play/pause state machine.

use tracing::{debug, warn};

/// Play/pause state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Cursor only moves on seek
    #[default]
    Paused,
    /// Cursor advances on every tick
    Playing,
}

/// Result of one scheduling tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Cursor moved forward, still playing
    Advanced,
    /// Cursor reached the end of range and playback stopped
    Finished,
    /// Clock was paused; tick had no effect
    Ignored,
}

/// Authoritative time cursor
///
/// Invariant: `t_min <= cursor <= t_max` after every operation.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    t_min: f64,
    t_max: f64,
    cursor: f64,
    state: PlaybackState,
}

impl PlaybackClock {
    /// Create a paused clock at the start of `[t_min, t_max]`
    pub fn new(t_min: f64, t_max: f64) -> Self {
        let t_max = t_max.max(t_min);
        Self {
            t_min,
            t_max,
            cursor: t_min,
            state: PlaybackState::Paused,
        }
    }

    /// Move the cursor to `t` (clamped) and pause
    ///
    /// A NaN target leaves the cursor where it is.
    pub fn seek(&mut self, t: f64) {
        self.state = PlaybackState::Paused;
        if t.is_nan() {
            warn!(target_time = t, "ignoring seek to NaN");
            return;
        }
        self.cursor = t.clamp(self.t_min, self.t_max);
    }

    /// Flip between paused and playing
    ///
    /// Starting playback requires room left in the range; at `t_max` this is
    /// a no-op.
    pub fn toggle_play(&mut self) -> PlaybackState {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.play(),
        }
        self.state
    }

    /// Start playing if there is room left in the range
    pub fn play(&mut self) {
        if self.cursor < self.t_max {
            self.state = PlaybackState::Playing;
        } else {
            debug!(cursor = self.cursor, "play requested at end of range");
        }
    }

    pub fn pause(&mut self) {
        self.state = PlaybackState::Paused;
    }

    /// Advance the cursor by `step` while playing
    pub fn tick(&mut self, step: f64) -> TickOutcome {
        if self.state != PlaybackState::Playing {
            return TickOutcome::Ignored;
        }
        if !step.is_finite() || step < 0.0 {
            warn!(step, "ignoring invalid tick step");
            return TickOutcome::Ignored;
        }

        let next = self.cursor + step;
        if next >= self.t_max {
            self.cursor = self.t_max;
            self.state = PlaybackState::Paused;
            TickOutcome::Finished
        } else {
            self.cursor = next;
            TickOutcome::Advanced
        }
    }

    #[inline]
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    #[inline]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn range(&self) -> (f64, f64) {
        (self.t_min, self.t_max)
    }

    pub fn at_end(&self) -> bool {
        self.cursor >= self.t_max
    }
}
