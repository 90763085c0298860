//! Replay orchestrator - wires driver, scene tap and dispatcher together.

use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{AnalysisService, LogArtifact, ReplayerConfig, SceneUpdate};
use observability::PlaybackMetricsAggregator;
use tokio::sync::mpsc;
use tracing::{info, warn};
use viewer::{PlaybackDriver, ViewerSession};

use super::interactive;
use super::ReplayStats;
use crate::error::CliError;

/// Per-run options not covered by `ReplayerConfig`
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Play to the end of range without reading commands
    pub autoplay: bool,

    /// Initial seek target (seconds)
    pub start: Option<f64>,

    /// Replay timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Channel buffer size
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            autoplay: true,
            start: None,
            timeout: None,
            buffer_size: 256,
            metrics_port: None,
        }
    }
}

/// Main replay orchestrator
pub struct ReplayPipeline {
    config: ReplayerConfig,
    options: ReplayOptions,
}

impl ReplayPipeline {
    pub fn new(config: ReplayerConfig, options: ReplayOptions) -> Self {
        Self { config, options }
    }

    /// Upload `artifact`, replay it, and tear everything down
    ///
    /// `shutdown` resolving ends the session early; sinks are still flushed.
    pub async fn run<S, F>(self, service: S, artifact: LogArtifact, shutdown: F) -> Result<ReplayStats>
    where
        S: AnalysisService + Sync + 'static,
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();

        if let Some(port) = self.options.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Dispatcher
        if self.config.sinks.is_empty() {
            warn!("No sinks configured - scenes will only be counted");
        }
        let (sink_tx, sink_rx) = mpsc::channel::<SceneUpdate>(self.options.buffer_size);
        let dispatcher = dispatcher::create_dispatcher(self.config.sinks.clone(), sink_rx)
            .await
            .context("Failed to create dispatcher")?;
        let active_sinks = self.config.sinks.len();
        let dispatcher_handle = dispatcher.spawn();
        info!(active_sinks, "Dispatcher started");

        // Driver -> tap -> dispatcher
        let (scene_tx, scene_rx) = mpsc::channel::<SceneUpdate>(self.options.buffer_size);
        let tap = tokio::spawn(tap_scenes(scene_rx, sink_tx));

        let mut driver = PlaybackDriver::new(
            ViewerSession::new(self.config.playback.clone()),
            service,
            scene_tx,
        );
        info!(backend = driver.service().name(), "Playback driver ready");

        let outcome = {
            let session = self.drive(&mut driver, artifact);
            tokio::pin!(shutdown);

            tokio::select! {
                result = with_timeout(self.options.timeout, session) => result,
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping replay...");
                    Ok(())
                }
            }
        };

        // Shutdown: dropping the driver closes the scene channel
        info!("Shutting down replay...");
        let final_scene = driver.scene().await;
        driver.shutdown().await;

        let playback = match tap.await {
            Ok(aggregator) => aggregator,
            Err(e) => {
                warn!(error = %e, "Scene tap task failed");
                PlaybackMetricsAggregator::default()
            }
        };

        let sink_metrics = match tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await {
            Ok(Ok(metrics)) => metrics,
            Ok(Err(e)) => {
                warn!(error = %e, "Dispatcher task failed");
                Vec::new()
            }
            Err(_) => {
                warn!("Timed out waiting for sinks to flush");
                Vec::new()
            }
        };

        outcome?;

        let stats = ReplayStats {
            duration: start_time.elapsed(),
            active_sinks,
            final_scene,
            playback,
            sink_metrics,
        };
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            scenes = stats.scenes_published(),
            "Replay shutdown complete"
        );
        Ok(stats)
    }

    async fn drive<S>(&self, driver: &mut PlaybackDriver<S>, artifact: LogArtifact) -> Result<()>
    where
        S: AnalysisService + Sync + 'static,
    {
        let file = artifact.file_name.clone();
        let scene = driver
            .upload(artifact)
            .await
            .with_context(|| format!("Failed to load analysis result for {}", file))?
            .ok_or_else(|| CliError::no_result(&file))?;

        info!(
            t_min = scene.t_min,
            t_max = scene.t_max,
            obstacles = scene.obstacle_count(),
            "Analysis result loaded"
        );

        if let Some(t) = self.options.start {
            driver.seek(t).await?;
        }

        if self.options.autoplay {
            driver.play().await?;
            info!("Autoplay running to end of range");
            driver.wait_until_stopped().await;
            Ok(())
        } else {
            interactive::run(driver).await
        }
    }
}

async fn with_timeout<F>(timeout: Option<Duration>, session: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, session).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_secs = limit.as_secs(), "Replay timed out");
                Ok(())
            }
        },
        None => session.await,
    }
}

/// Forward scenes to the dispatcher while aggregating playback statistics
async fn tap_scenes(
    mut scene_rx: mpsc::Receiver<SceneUpdate>,
    sink_tx: mpsc::Sender<SceneUpdate>,
) -> PlaybackMetricsAggregator {
    let mut aggregator = PlaybackMetricsAggregator::new();
    while let Some(update) = scene_rx.recv().await {
        aggregator.update(&update);
        if sink_tx.send(update).await.is_err() {
            warn!("Dispatcher channel closed");
            break;
        }
    }
    aggregator
}
