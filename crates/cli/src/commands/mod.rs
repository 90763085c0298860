//! Command implementations.

mod inspect;
mod replay;
mod report;
mod validate;

pub use inspect::run_inspect;
pub(crate) use inspect::{print_issues, print_kpis};
pub use replay::run_replay;
pub use report::run_report;
pub use validate::run_validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{LogArtifact, ReplayerConfig};
use tracing::info;

use crate::backend::Backend;
use crate::cli::ServiceArgs;
use crate::error::CliError;

/// Picked up from the working directory when `--config` is absent
const DEFAULT_CONFIG_FILE: &str = "replayer.toml";

/// Load configuration and apply service overrides
///
/// An explicit path must exist; without one the default file is optional.
fn load_config(args: &ServiceArgs) -> Result<ReplayerConfig> {
    let path = match &args.config {
        Some(path) if !path.exists() => return Err(CliError::config_not_found(path).into()),
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
    };

    let mut config = match path {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            ConfigLoader::load_from_path(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            info!("No configuration file, using defaults");
            ReplayerConfig::default()
        }
    };

    if let Some(url) = &args.service_url {
        info!(url = %url, "Overriding service URL from CLI");
        config.service.base_url = url.clone();
    }
    if let Some(timeout) = args.service_timeout {
        config.service.timeout_secs = timeout;
    }

    ConfigLoader::validate(&config).map_err(|e| CliError::invalid_override(e.to_string()))?;
    Ok(config)
}

fn build_backend(args: &ServiceArgs, config: &ReplayerConfig) -> Result<Backend> {
    Backend::select(
        &config.service,
        args.fixture.as_deref(),
        args.fixture_report.as_deref(),
    )
    .context("Failed to set up analysis backend")
}

fn read_artifact(path: &Path) -> Result<LogArtifact> {
    if !path.exists() {
        return Err(CliError::log_not_found(path).into());
    }
    let artifact = LogArtifact::from_path(path)
        .with_context(|| format!("Failed to read log {}", path.display()))?;
    info!(
        file = %artifact.file_name,
        format = ?artifact.format,
        bytes = artifact.len(),
        "Log loaded"
    );
    Ok(artifact)
}
