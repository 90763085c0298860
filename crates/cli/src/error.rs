//! Error types for CLI operations.

use std::path::Path;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Log file not found
    #[error("Log file not found: {path}")]
    LogNotFound { path: String },

    /// Command-line override rejected by validation
    #[error("Invalid override: {message}")]
    InvalidOverride { message: String },

    /// Upload finished but produced no result
    #[error("No analysis result loaded for {file}")]
    NoResult { file: String },
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn log_not_found(path: &Path) -> Self {
        Self::LogNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn invalid_override(message: impl Into<String>) -> Self {
        Self::InvalidOverride {
            message: message.into(),
        }
    }

    pub fn no_result(file: impl Into<String>) -> Self {
        Self::NoResult { file: file.into() }
    }
}
