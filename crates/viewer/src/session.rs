//! ViewerSession - everything one operator sees, in one place.
//!
//! Uploads follow clear-then-fetch: starting an upload drops the previous
//! result and report before the service answers, so a failed upload leaves
//! an empty viewer rather than a stale one. Each upload bumps the session
//! generation; responses for an older generation are discarded.

use contracts::{
    AnalysisService, ContractError, LogArtifact, PlaybackConfig, ResultModel, Scene,
};
use sync_engine::SyncController;
use tracing::{info, warn};

use crate::error::ViewerError;

/// Result of applying a service response to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Response belonged to the current generation and was applied
    Current,
    /// A newer upload started meanwhile; response ignored
    Stale,
}

/// Single-operator viewer state
#[derive(Debug)]
pub struct ViewerSession {
    config: PlaybackConfig,
    controller: Option<SyncController>,
    report: Option<String>,
    error: Option<String>,
    is_loading: bool,
    artifact: Option<LogArtifact>,
    generation: u64,
}

impl ViewerSession {
    pub fn new(config: PlaybackConfig) -> Self {
        Self {
            config,
            controller: None,
            report: None,
            error: None,
            is_loading: false,
            artifact: None,
            generation: 0,
        }
    }

    /// Upload a log and load the analysis result
    ///
    /// On failure the session is left empty with an error message recorded.
    pub async fn upload<S: AnalysisService>(
        &mut self,
        service: &S,
        artifact: LogArtifact,
    ) -> Result<(), ViewerError> {
        let generation = self.begin_upload(artifact.clone());
        let outcome = service.analyze(&artifact).await;
        self.finish_upload(generation, outcome).map(|_| ())
    }

    /// Request the textual report for the uploaded log
    pub async fn generate_report<S: AnalysisService>(
        &mut self,
        service: &S,
    ) -> Result<&str, ViewerError> {
        let (generation, artifact) = self.begin_report()?;
        let outcome = service.report(&artifact).await;
        self.finish_report(generation, outcome)?;
        Ok(self.report.as_deref().unwrap_or_default())
    }

    /// Clear everything and mark an upload as in flight
    ///
    /// Returns the new generation to hand back to `finish_upload`.
    pub fn begin_upload(&mut self, artifact: LogArtifact) -> u64 {
        self.generation += 1;
        self.controller = None;
        self.report = None;
        self.error = None;
        self.is_loading = true;
        info!(
            generation = self.generation,
            file = %artifact.file_name,
            bytes = artifact.len(),
            "upload started"
        );
        self.artifact = Some(artifact);
        self.generation
    }

    /// Apply the analyze outcome for `generation`
    pub fn finish_upload(
        &mut self,
        generation: u64,
        outcome: Result<ResultModel, ContractError>,
    ) -> Result<Applied, ViewerError> {
        if generation != self.generation {
            warn!(generation, current = self.generation, "discarding stale analyze response");
            return Ok(Applied::Stale);
        }
        self.is_loading = false;

        let loaded = outcome.and_then(|result| SyncController::with_config(result, &self.config));
        match loaded {
            Ok(controller) => {
                self.controller = Some(controller);
                Ok(Applied::Current)
            }
            Err(e) => {
                warn!(generation, error = %e, "upload failed");
                self.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Check a report can be requested and snapshot what it needs
    pub fn begin_report(&mut self) -> Result<(u64, LogArtifact), ViewerError> {
        if self.controller.is_none() {
            return Err(ViewerError::NoResult);
        }
        let artifact = self.artifact.clone().ok_or(ViewerError::NoArtifact)?;
        self.error = None;
        Ok((self.generation, artifact))
    }

    /// Apply the report outcome for `generation`
    ///
    /// Failures set the error message; the loaded result stays intact.
    pub fn finish_report(
        &mut self,
        generation: u64,
        outcome: Result<String, ContractError>,
    ) -> Result<Applied, ViewerError> {
        if generation != self.generation {
            return Ok(Applied::Stale);
        }
        match outcome {
            Ok(report) => {
                self.report = Some(report);
                Ok(Applied::Current)
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    pub fn close_report(&mut self) {
        self.report = None;
    }

    /// Playback controls are usable only with a result and no upload in flight
    pub fn controls_enabled(&self) -> bool {
        self.controller.is_some() && !self.is_loading
    }

    pub fn controller(&self) -> Option<&SyncController> {
        self.controller.as_ref()
    }

    pub fn controller_mut(&mut self) -> Option<&mut SyncController> {
        self.controller.as_mut()
    }

    /// Controller for a playback control, if controls are enabled
    pub fn require_controller(&mut self) -> Result<&mut SyncController, ViewerError> {
        if self.is_loading {
            return Err(ViewerError::NoResult);
        }
        self.controller.as_mut().ok_or(ViewerError::NoResult)
    }

    pub fn result(&self) -> Option<&ResultModel> {
        self.controller.as_ref().map(SyncController::result)
    }

    pub fn scene(&self) -> Option<Scene> {
        self.controller.as_ref().map(SyncController::current_scene)
    }

    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_playing(&self) -> bool {
        self.controller.as_ref().is_some_and(SyncController::is_playing)
    }

    pub fn artifact(&self) -> Option<&LogArtifact> {
        self.artifact.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }
}
