//! PlaybackDriver - owns the tick task and publishes scenes.
//!
//! The session lives behind an async mutex shared with a single tick task.
//! Every operator action runs under the lock and is applied atomically with
//! respect to ticks: the tick task re-checks generation and play state after
//! acquiring the lock, so a seek or pause always wins over a tick that was
//! already scheduled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{AnalysisService, LogArtifact, Scene, SceneCause, SceneUpdate};
use sync_engine::{PlaybackState, SyncController, TickOutcome};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::error::ViewerError;
use crate::session::{Applied, ViewerSession};

/// Sends scene updates with a process-wide sequence number
#[derive(Debug, Clone)]
struct ScenePublisher {
    tx: mpsc::Sender<SceneUpdate>,
    sequence: Arc<AtomicU64>,
}

impl ScenePublisher {
    fn build(&self, session: u64, cause: SceneCause, scene: Scene) -> SceneUpdate {
        let update = SceneUpdate {
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            session,
            cause,
            scene,
        };
        observability::record_scene_metrics(&update);
        update
    }

    /// Operator-driven update; waits for channel capacity
    async fn publish(&self, session: u64, cause: SceneCause, scene: Scene) {
        let update = self.build(session, cause, scene);
        if self.tx.send(update).await.is_err() {
            debug!(?cause, "scene receiver closed");
        }
    }

    /// Tick update; dropped when the consumer lags
    fn try_publish(&self, session: u64, cause: SceneCause, scene: Scene) {
        let update = self.build(session, cause, scene);
        if let Err(e) = self.tx.try_send(update) {
            match e {
                mpsc::error::TrySendError::Full(u) => {
                    debug!(sequence = u.sequence, "scene channel full, tick dropped")
                }
                mpsc::error::TrySendError::Closed(_) => debug!("scene receiver closed"),
            }
        }
    }
}

/// Drives a `ViewerSession` against an analysis service
pub struct PlaybackDriver<S> {
    session: Arc<Mutex<ViewerSession>>,
    service: Arc<S>,
    publisher: ScenePublisher,
    ticker: Option<JoinHandle<()>>,
}

impl<S> PlaybackDriver<S>
where
    S: AnalysisService + Sync + 'static,
{
    /// Create a driver; scenes are published on `updates`
    pub fn new(session: ViewerSession, service: S, updates: mpsc::Sender<SceneUpdate>) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            service: Arc::new(service),
            publisher: ScenePublisher {
                tx: updates,
                sequence: Arc::new(AtomicU64::new(0)),
            },
            ticker: None,
        }
    }

    /// Upload a log, replacing whatever was loaded
    ///
    /// Returns the initial scene, or `None` when a newer upload superseded
    /// this one. The session lock is released while the service works, so
    /// another holder of [`Self::session`] can begin an upload meanwhile;
    /// this response is then discarded and nothing is published.
    #[instrument(name = "driver_upload", skip(self, artifact), fields(file = %artifact.file_name))]
    pub async fn upload(&mut self, artifact: LogArtifact) -> Result<Option<Scene>, ViewerError> {
        self.stop_ticker();
        let generation = self.session.lock().await.begin_upload(artifact.clone());

        // lock released while the service works
        let outcome = self.service.analyze(&artifact).await;

        let scene = {
            let mut session = self.session.lock().await;
            match session.finish_upload(generation, outcome)? {
                Applied::Stale => return Ok(None),
                Applied::Current => session.scene(),
            }
        };
        if let Some(scene) = &scene {
            info!(t_min = scene.t_min, t_max = scene.t_max, "result ready");
            self.publisher
                .publish(generation, SceneCause::Load, scene.clone())
                .await;
        }
        Ok(scene)
    }

    /// Request the report for the uploaded log
    pub async fn generate_report(&mut self) -> Result<String, ViewerError> {
        let (generation, artifact) = self.session.lock().await.begin_report()?;
        let outcome = self.service.report(&artifact).await;

        let mut session = self.session.lock().await;
        session.finish_report(generation, outcome)?;
        Ok(session.report().unwrap_or_default().to_string())
    }

    pub async fn close_report(&mut self) {
        self.session.lock().await.close_report();
    }

    pub async fn toggle_play(&mut self) -> Result<PlaybackState, ViewerError> {
        self.apply(SceneCause::Toggle, |c| c.toggle_play()).await
    }

    pub async fn play(&mut self) -> Result<PlaybackState, ViewerError> {
        self.apply(SceneCause::Toggle, |c| c.play()).await
    }

    pub async fn pause(&mut self) -> Result<PlaybackState, ViewerError> {
        self.apply(SceneCause::Toggle, |c| {
            c.pause();
            c.state()
        })
        .await
    }

    /// Scrub to `t`; clamps and pauses
    pub async fn seek(&mut self, t: f64) -> Result<Scene, ViewerError> {
        self.apply(SceneCause::Seek, |c| {
            c.seek_to(t);
            c.current_scene()
        })
        .await
    }

    /// Jump to the issue at `index`; returns `false` for untimed or unknown issues
    pub async fn jump_to_issue(&mut self, index: usize) -> Result<bool, ViewerError> {
        self.apply(SceneCause::IssueJump, |c| c.jump_to_issue_index(index))
            .await
    }

    /// Current scene, if a result is loaded
    pub async fn scene(&self) -> Option<Scene> {
        self.session.lock().await.scene()
    }

    /// Shared session handle
    pub fn session(&self) -> Arc<Mutex<ViewerSession>> {
        Arc::clone(&self.session)
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Wait until the tick task stops (end of range, pause, or reload)
    ///
    /// Cancel safe: dropping the returned future leaves the task running.
    pub async fn wait_until_stopped(&mut self) {
        if let Some(handle) = self.ticker.as_mut() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "tick task failed");
                }
            }
            self.ticker = None;
        }
    }

    /// Stop ticking and pause; dropping the driver closes the scene channel
    pub async fn shutdown(mut self) {
        self.stop_ticker();
        if let Some(controller) = self.session.lock().await.controller_mut() {
            controller.pause();
        }
        info!("playback driver stopped");
    }

    /// Run `op` on the controller, publish the resulting scene, then start or
    /// stop the tick task to match the new play state
    async fn apply<T>(
        &mut self,
        cause: SceneCause,
        op: impl FnOnce(&mut SyncController) -> T,
    ) -> Result<T, ViewerError> {
        let (value, generation, playing) = {
            let mut session = self.session.lock().await;
            let generation = session.generation();
            let controller = session.require_controller()?;
            let value = op(controller);
            let scene = controller.current_scene();
            let playing = scene.is_playing;
            // published under the lock so sequence order matches mutation order
            self.publisher.publish(generation, cause, scene).await;
            (value, generation, playing)
        };

        if playing {
            if !self.ticker_running() {
                self.spawn_ticker(generation);
            }
        } else {
            self.stop_ticker();
        }
        Ok(value)
    }

    fn ticker_running(&self) -> bool {
        self.ticker.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn stop_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }

    fn spawn_ticker(&mut self, generation: u64) {
        self.stop_ticker();

        let session = Arc::clone(&self.session);
        let publisher = self.publisher.clone();

        self.ticker = Some(tokio::spawn(async move {
            let period = session.lock().await.config().tick_interval();
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last = Instant::now();
            debug!(generation, ?period, "tick task started");

            loop {
                let now = interval.tick().await;
                let elapsed = now.duration_since(last);
                last = now;

                let mut guard = session.lock().await;
                if guard.generation() != generation {
                    break;
                }
                let step = guard.config().step_for(elapsed);
                let Some(controller) = guard.controller_mut() else {
                    break;
                };
                if !controller.is_playing() {
                    break;
                }

                match controller.tick(step) {
                    TickOutcome::Advanced => {
                        publisher.try_publish(generation, SceneCause::Tick, controller.current_scene())
                    }
                    TickOutcome::Finished => {
                        let scene = controller.current_scene();
                        publisher.publish(generation, SceneCause::Finished, scene).await;
                        break;
                    }
                    TickOutcome::Ignored => break,
                }
            }
            debug!(generation, "tick task stopped");
        }));
    }
}

impl<S> Drop for PlaybackDriver<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}
