//! ResultModel - Analysis service output
//!
//! Immutable data produced once per analyze call. The playback engine reads the
//! derived series; KPIs and the polyline are passed through untouched.

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Series names as they appear in the analysis payload
pub const OBSTACLES_SERIES: &str = "obstacles_time_series";
pub const LATENCY_SERIES: &str = "latency_timeline";
pub const SPEED_SERIES: &str = "speed_timeline";
pub const CURVATURE_SERIES: &str = "curvature_timeline";

/// Planar point, encoded as `[x, y]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2(pub f64, pub f64);

impl Point2 {
    #[inline]
    pub fn x(&self) -> f64 {
        self.0
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.1
    }
}

impl From<[f64; 2]> for Point2 {
    fn from(p: [f64; 2]) -> Self {
        Self(p[0], p[1])
    }
}

/// Anything sampled at a point on the playback timeline
pub trait Timestamped {
    /// Sample time (seconds)
    fn t(&self) -> f64;
}

/// Complete analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultModel {
    /// Scalar run metrics
    pub kpis: Kpis,

    /// Detected issues, in service order
    #[serde(default)]
    pub issues: Vec<Issue>,

    /// Derived time series
    pub derived: DerivedSeries,
}

/// Key performance indicators
///
/// Passed through untouched: every value is a JSON number, missing keys read
/// as zero, and keys this build does not know are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Kpis {
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub max_latency_ms: f64,
    pub path_length: f64,
    pub straight_line_distance: f64,
    pub path_efficiency: f64,
    pub max_curvature: f64,
    pub jerk_spikes: f64,
    pub stalls: f64,
    pub near_misses: f64,

    /// KPIs added by newer analysis services
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A detected issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Machine-readable issue code (e.g. `LOW_PATH_EFFICIENCY`)
    pub code: String,

    /// Human-readable description
    pub message: String,

    pub severity: Severity,

    /// Time the issue refers to, if it is localised in time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,

    /// Source frame index, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_index: Option<u64>,
}

/// Derived series bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSeries {
    /// Static planned path
    #[serde(default)]
    pub polyline: Vec<Point2>,

    /// Position + obstacles; defines the playback range
    pub obstacles_time_series: Vec<ObstacleFrame>,

    pub latency_timeline: Vec<LatencySample>,

    pub speed_timeline: Vec<SpeedSample>,

    pub curvature_timeline: Vec<CurvatureSample>,
}

/// Vehicle position and visible obstacles at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleFrame {
    pub t: f64,
    pub pos: Point2,
    #[serde(default)]
    pub obstacles: Vec<Point2>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySample {
    pub t: f64,
    /// Planner latency (ms)
    pub latency: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedSample {
    pub t: f64,
    /// Speed (m/s)
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvatureSample {
    pub t: f64,
    pub curvature: f64,
}

impl Timestamped for ObstacleFrame {
    fn t(&self) -> f64 {
        self.t
    }
}

impl Timestamped for LatencySample {
    fn t(&self) -> f64 {
        self.t
    }
}

impl Timestamped for SpeedSample {
    fn t(&self) -> f64 {
        self.t
    }
}

impl Timestamped for CurvatureSample {
    fn t(&self) -> f64 {
        self.t
    }
}

impl ResultModel {
    /// Check the structural invariants the playback engine relies on.
    ///
    /// # Errors
    /// - `EmptySeries` if any derived series has no samples
    /// - `NonMonotonicSeries` if timestamps decrease or are not finite
    pub fn validate(&self) -> Result<(), ContractError> {
        let d = &self.derived;
        check_series(OBSTACLES_SERIES, &d.obstacles_time_series)?;
        check_series(LATENCY_SERIES, &d.latency_timeline)?;
        check_series(SPEED_SERIES, &d.speed_timeline)?;
        check_series(CURVATURE_SERIES, &d.curvature_timeline)?;
        Ok(())
    }

    /// Playback range `[first.t, last.t]` of the obstacle series
    pub fn time_range(&self) -> Option<(f64, f64)> {
        let series = &self.derived.obstacles_time_series;
        Some((series.first()?.t, series.last()?.t))
    }

    /// Issues that carry a timestamp, with their list index
    pub fn timed_issues(&self) -> impl Iterator<Item = (usize, &Issue)> {
        self.issues
            .iter()
            .enumerate()
            .filter(|(_, issue)| issue.timestamp.is_some())
    }
}

/// Check that a series is non-empty with finite, non-decreasing timestamps
pub fn check_series<S: Timestamped>(name: &str, samples: &[S]) -> Result<(), ContractError> {
    if samples.is_empty() {
        return Err(ContractError::empty_series(name));
    }

    let mut previous = f64::NEG_INFINITY;
    for (index, sample) in samples.iter().enumerate() {
        let t = sample.t();
        if !t.is_finite() {
            return Err(ContractError::non_monotonic(
                name,
                index,
                format!("timestamp {t} is not finite"),
            ));
        }
        if t < previous {
            return Err(ContractError::non_monotonic(
                name,
                index,
                format!("timestamp {t} precedes {previous}"),
            ));
        }
        previous = t;
    }
    Ok(())
}
