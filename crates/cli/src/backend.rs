//! Analysis backend selection: live HTTP service or on-disk fixture.

use analysis_client::{FixtureAnalysisService, HttpAnalysisService};
use contracts::{AnalysisService, ContractError, LogArtifact, ResultModel, ServiceConfig};
use tracing::info;

/// Concrete analysis service picked from CLI flags
#[derive(Debug)]
pub enum Backend {
    Http(HttpAnalysisService),
    Fixture(FixtureAnalysisService),
}

impl Backend {
    /// Use the fixture when one is given, otherwise the configured endpoint
    pub fn select(
        service: &ServiceConfig,
        fixture: Option<&std::path::Path>,
        fixture_report: Option<&std::path::Path>,
    ) -> Result<Self, ContractError> {
        match fixture {
            Some(result_path) => {
                info!(result = %result_path.display(), "Using fixture analysis backend");
                let mut fixture = FixtureAnalysisService::new(result_path);
                if let Some(report_path) = fixture_report {
                    fixture = fixture.with_report(report_path);
                }
                Ok(Self::Fixture(fixture))
            }
            None => {
                info!(base_url = %service.base_url, "Using HTTP analysis backend");
                Ok(Self::Http(HttpAnalysisService::new(service)?))
            }
        }
    }
}

impl AnalysisService for Backend {
    fn name(&self) -> &str {
        match self {
            Self::Http(s) => s.name(),
            Self::Fixture(s) => s.name(),
        }
    }

    async fn analyze(&self, artifact: &LogArtifact) -> Result<ResultModel, ContractError> {
        match self {
            Self::Http(s) => s.analyze(artifact).await,
            Self::Fixture(s) => s.analyze(artifact).await,
        }
    }

    async fn report(&self, artifact: &LogArtifact) -> Result<String, ContractError> {
        match self {
            Self::Http(s) => s.report(artifact).await,
            Self::Fixture(s) => s.report(artifact).await,
        }
    }

    async fn health(&self) -> Result<(), ContractError> {
        match self {
            Self::Http(s) => s.health().await,
            Self::Fixture(s) => s.health().await,
        }
    }
}
