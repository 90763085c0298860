//! FixtureAnalysisService - pre-computed results served from disk

use std::path::{Path, PathBuf};

use contracts::{AnalysisService, ContractError, LogArtifact, ResultModel};
use tracing::{debug, instrument};

use crate::decode::decode_result;

/// Offline stand-in for the analysis backend
///
/// Every analyze call returns the result stored at `result_path`, whatever
/// the uploaded artifact. The file may also hold an `{"error": ...}` body,
/// which is reported as an upstream failure.
#[derive(Debug, Clone)]
pub struct FixtureAnalysisService {
    result_path: PathBuf,
    report_path: Option<PathBuf>,
}

impl FixtureAnalysisService {
    pub fn new(result_path: impl Into<PathBuf>) -> Self {
        Self {
            result_path: result_path.into(),
            report_path: None,
        }
    }

    /// Serve report text from `report_path`
    pub fn with_report(mut self, report_path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(report_path.into());
        self
    }

    pub fn result_path(&self) -> &Path {
        &self.result_path
    }

    async fn read(operation: &str, path: &Path) -> Result<Vec<u8>, ContractError> {
        tokio::fs::read(path).await.map_err(|e| {
            ContractError::upstream(
                operation,
                format!("cannot read fixture {}: {e}", path.display()),
            )
        })
    }
}

impl AnalysisService for FixtureAnalysisService {
    fn name(&self) -> &str {
        "fixture"
    }

    #[instrument(
        name = "fixture_analysis_analyze",
        skip(self, artifact),
        fields(fixture = %self.result_path.display(), file = %artifact.file_name)
    )]
    async fn analyze(&self, artifact: &LogArtifact) -> Result<ResultModel, ContractError> {
        let body = Self::read("analyze", &self.result_path).await?;
        let result = decode_result(&body)?;
        debug!(issues = result.issues.len(), "fixture result loaded");
        Ok(result)
    }

    #[instrument(name = "fixture_analysis_report", skip(self, artifact), fields(file = %artifact.file_name))]
    async fn report(&self, artifact: &LogArtifact) -> Result<String, ContractError> {
        let path = self
            .report_path
            .as_ref()
            .ok_or_else(|| ContractError::upstream("report", "no report fixture configured"))?;
        let body = Self::read("report", path).await?;
        String::from_utf8(body)
            .map_err(|e| ContractError::upstream("report", format!("report is not UTF-8: {e}")))
    }

    async fn health(&self) -> Result<(), ContractError> {
        if tokio::fs::try_exists(&self.result_path).await.unwrap_or(false) {
            Ok(())
        } else {
            Err(ContractError::upstream(
                "health",
                format!("fixture {} not found", self.result_path.display()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const RESULT: &str = r#"{
        "kpis": {
            "avg_latency_ms": 45.2, "p95_latency_ms": 78.5, "max_latency_ms": 120.0,
            "path_length": 8.5, "straight_line_distance": 5.8, "path_efficiency": 0.68,
            "max_curvature": 0.15, "jerk_spikes": 3, "stalls": 1, "near_misses": 0
        },
        "issues": [{"code": "STALL", "message": "stalled", "severity": "error", "timestamp": 3.4}],
        "derived": {
            "polyline": [[0, 0]],
            "obstacles_time_series": [{"t": 0.0, "obstacles": [], "pos": [0, 0]}],
            "latency_timeline": [{"t": 0.0, "latency": 45}],
            "speed_timeline": [{"t": 0.0, "speed": 0.0}],
            "curvature_timeline": [{"t": 0.0, "curvature": 0.0}]
        }
    }"#;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn artifact() -> LogArtifact {
        LogArtifact::from_bytes("run.csv", b"t,x,y\n".to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_fixture_analyze() {
        let file = write_temp(RESULT);
        let service = FixtureAnalysisService::new(file.path());

        let result = service.analyze(&artifact()).await.unwrap();
        assert_eq!(result.issues[0].timestamp, Some(3.4));
        assert!(service.health().await.is_ok());
    }

    #[tokio::test]
    async fn test_fixture_error_body() {
        let file = write_temp(r#"{"error": "mock backend failure"}"#);
        let service = FixtureAnalysisService::new(file.path());
        let err = service.analyze(&artifact()).await.unwrap_err();
        assert!(err.to_string().contains("mock backend failure"));
    }

    #[tokio::test]
    async fn test_fixture_report() {
        let result = write_temp(RESULT);
        let report = write_temp("# Report\n");

        let service = FixtureAnalysisService::new(result.path()).with_report(report.path());
        assert_eq!(service.report(&artifact()).await.unwrap(), "# Report\n");
    }

    #[tokio::test]
    async fn test_fixture_without_report() {
        let result = write_temp(RESULT);
        let service = FixtureAnalysisService::new(result.path());
        assert!(service.report(&artifact()).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_fixture() {
        let service = FixtureAnalysisService::new("/nonexistent/result.json");
        assert!(service.analyze(&artifact()).await.unwrap_err().is_upstream());
        assert!(service.health().await.is_err());
    }
}
