//! LogSink - logs scene summaries via tracing

use std::collections::HashMap;

use contracts::{ContractError, SceneCause, SceneSink, SceneUpdate};
use tracing::{info, instrument};

/// Sink that logs scene summaries
///
/// Tick scenes can be sampled with the `every` param; every other cause is
/// always logged.
pub struct LogSink {
    name: String,
    every: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            every: 1,
        }
    }

    /// Create from params map (for factory)
    pub fn from_params(name: impl Into<String>, params: &HashMap<String, String>) -> Self {
        let every = params
            .get("every")
            .and_then(|s| s.parse().ok())
            .filter(|&n: &u64| n > 0)
            .unwrap_or(1);
        Self {
            name: name.into(),
            every,
        }
    }

    fn should_log(&self, update: &SceneUpdate) -> bool {
        update.cause != SceneCause::Tick || update.sequence % self.every == 0
    }

    fn log_scene_summary(&self, update: &SceneUpdate) {
        let scene = &update.scene;

        info!(
            sink = %self.name,
            sequence = update.sequence,
            session = update.session,
            cause = ?update.cause,
            cursor = scene.cursor,
            playing = scene.is_playing,
            obstacles = scene.obstacle_count(),
            latency = ?scene.latency_ms(),
            speed = ?scene.speed_value(),
            curvature = ?scene.curvature_value(),
            "Scene resolved"
        );
    }
}

impl SceneSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, update),
        fields(sink = %self.name, sequence = update.sequence)
    )]
    async fn write(&mut self, update: &SceneUpdate) -> Result<(), ContractError> {
        if self.should_log(update) {
            self.log_scene_summary(update);
        }
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
