//! Viewer error types

use contracts::ContractError;
use thiserror::Error;

/// Errors surfaced to the operator
#[derive(Debug, Error)]
pub enum ViewerError {
    /// Playback controls need a loaded result
    #[error("no analysis result loaded")]
    NoResult,

    /// Report requested before any log was uploaded
    #[error("no log uploaded")]
    NoArtifact,

    /// Command line could not be parsed
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Upstream or result model failure
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl ViewerError {
    pub fn invalid_command(message: impl Into<String>) -> Self {
        Self::InvalidCommand(message.into())
    }
}
