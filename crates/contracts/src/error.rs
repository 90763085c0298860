//! Layered error definitions
//!
//! Categorized by source: config / result model / upstream service / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Result Model Errors =====
    /// A derived series has no samples, so no playback range can be established
    #[error("analysis result rejected: series '{series}' is empty")]
    EmptySeries { series: String },

    /// A derived series has a decreasing or non-finite timestamp
    #[error(
        "analysis result rejected: series '{series}' has invalid timestamp at index {index}: {message}"
    )]
    NonMonotonicSeries {
        series: String,
        index: usize,
        message: String,
    },

    /// Result payload could not be decoded
    #[error("result decode error: {message}")]
    ResultDecode {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ===== Upstream Errors =====
    /// Analyze/report call failed
    #[error("{operation} request failed: {message}")]
    Upstream { operation: String, message: String },

    /// Uploaded artifact is not a supported log encoding
    #[error("unsupported log artifact '{file_name}': expected .json or .csv")]
    UnsupportedArtifact { file_name: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create empty series error
    pub fn empty_series(series: impl Into<String>) -> Self {
        Self::EmptySeries {
            series: series.into(),
        }
    }

    /// Create non-monotonic series error
    pub fn non_monotonic(
        series: impl Into<String>,
        index: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::NonMonotonicSeries {
            series: series.into(),
            index,
            message: message.into(),
        }
    }

    /// Create upstream failure
    pub fn upstream(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from the analysis service boundary
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. }
                | Self::ResultDecode { .. }
                | Self::EmptySeries { .. }
                | Self::NonMonotonicSeries { .. }
        )
    }
}
