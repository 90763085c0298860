//! ReplayerConfig - Config Loader output
//!
//! Describes the full application configuration: playback engine, analysis
//! service endpoint, and scene output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::PlaybackConfig;

/// Default analysis service endpoint
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayerConfig {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Playback engine settings
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Analysis service endpoint
    #[serde(default)]
    pub service: ServiceConfig,

    /// Scene output routing
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// Analysis service endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL; `/analyze`, `/report` and `/health` are appended
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_SERVICE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Scene sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    pub name: String,

    pub sink_type: SinkType,

    /// Per-sink queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log scene summaries
    Log,
    /// JSON lines file
    File,
    /// UDP datagrams
    Network,
}

impl SinkConfig {
    /// Log sink with default queue capacity
    pub fn log(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sink_type: SinkType::Log,
            queue_capacity: default_queue_capacity(),
            params: HashMap::new(),
        }
    }
}
