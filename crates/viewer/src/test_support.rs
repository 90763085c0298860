//! Shared fixtures for viewer unit tests

use std::time::Duration;

use contracts::{
    AnalysisService, ContractError, CurvatureSample, DerivedSeries, Issue, Kpis, LatencySample,
    LogArtifact, ObstacleFrame, Point2, ResultModel, Severity, SpeedSample,
};

/// Result sampled every 0.1s over `[start, end]` with one timed issue at `start + 1`
pub(crate) fn sample_result(start: f64, end: f64) -> ResultModel {
    let n = ((end - start) / 0.1).round() as usize;
    let times: Vec<f64> = (0..=n).map(|i| start + i as f64 * 0.1).collect();
    ResultModel {
        kpis: Kpis {
            avg_latency_ms: 45.2,
            path_efficiency: 0.68,
            ..Default::default()
        },
        issues: vec![
            Issue {
                code: "LOW_PATH_EFFICIENCY".into(),
                message: "Path efficiency 68% is below 70%".into(),
                severity: Severity::Warning,
                timestamp: None,
                frame_index: None,
            },
            Issue {
                code: "HIGH_LATENCY".into(),
                message: "Latency spike".into(),
                severity: Severity::Error,
                timestamp: Some(start + 1.0),
                frame_index: None,
            },
        ],
        derived: DerivedSeries {
            polyline: vec![Point2(0.0, 0.0), Point2(1.0, 1.0)],
            obstacles_time_series: times
                .iter()
                .map(|&t| ObstacleFrame {
                    t,
                    pos: Point2(t, 0.0),
                    obstacles: vec![Point2(2.0, 1.0), Point2(3.0, 1.0)],
                })
                .collect(),
            latency_timeline: times
                .iter()
                .map(|&t| LatencySample { t, latency: 45.0 })
                .collect(),
            speed_timeline: times
                .iter()
                .map(|&t| SpeedSample { t, speed: 2.0 })
                .collect(),
            curvature_timeline: times
                .iter()
                .map(|&t| CurvatureSample { t, curvature: 0.1 })
                .collect(),
        },
    }
}

/// Canned analysis service
#[derive(Debug, Clone)]
pub(crate) struct MockService {
    pub result: ResultModel,
    pub analyze_error: Option<String>,
    pub report_error: Option<String>,
    pub delay: Option<Duration>,
}

impl MockService {
    pub fn ok(result: ResultModel) -> Self {
        Self {
            result,
            analyze_error: None,
            report_error: None,
            delay: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        let mut service = Self::ok(sample_result(0.0, 1.0));
        service.analyze_error = Some(message.to_string());
        service
    }
}

impl AnalysisService for MockService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn analyze(&self, _artifact: &LogArtifact) -> Result<ResultModel, ContractError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.analyze_error {
            Some(message) => Err(ContractError::upstream("analyze", message.clone())),
            None => Ok(self.result.clone()),
        }
    }

    async fn report(&self, artifact: &LogArtifact) -> Result<String, ContractError> {
        match &self.report_error {
            Some(message) => Err(ContractError::upstream("report", message.clone())),
            None => Ok(format!("# Report for {}\n", artifact.file_name)),
        }
    }

    async fn health(&self) -> Result<(), ContractError> {
        Ok(())
    }
}
