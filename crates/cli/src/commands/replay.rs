//! `replay` command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::PlaybackConfig;
use tracing::{info, warn};

use super::{build_backend, load_config, read_artifact};
use crate::cli::ReplayArgs;
use crate::error::CliError;
use crate::pipeline::{ReplayOptions, ReplayPipeline};

/// Execute the `replay` command
pub async fn run_replay(args: &ReplayArgs) -> Result<()> {
    let mut config = load_config(&args.service)?;
    apply_playback_overrides(&mut config.playback, args);
    ConfigLoader::validate(&config).map_err(|e| CliError::invalid_override(e.to_string()))?;

    info!(
        tolerance = config.playback.tolerance,
        step = config.playback.step,
        tick_ms = config.playback.tick_interval_ms,
        mode = ?config.playback.mode,
        sinks = config.sinks.len(),
        "Configuration loaded"
    );

    let backend = build_backend(&args.service, &config)?;
    let artifact = read_artifact(&args.log)?;

    let options = ReplayOptions {
        autoplay: args.autoplay,
        start: args.start,
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        buffer_size: args.buffer_size.max(1),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    let pipeline = ReplayPipeline::new(config, options);
    let stats = pipeline
        .run(backend, artifact, shutdown_signal())
        .await
        .context("Replay failed")?;

    info!(
        scenes = stats.scenes_published(),
        duration_secs = stats.duration.as_secs_f64(),
        "Replay completed"
    );

    if !args.no_summary {
        stats.print_summary();
    }
    Ok(())
}

fn apply_playback_overrides(playback: &mut PlaybackConfig, args: &ReplayArgs) {
    if let Some(step) = args.step {
        playback.step = step;
    }
    if let Some(tick_ms) = args.tick_ms {
        playback.tick_interval_ms = tick_ms;
    }
    if let Some(tolerance) = args.tolerance {
        playback.tolerance = tolerance;
    }
    if let Some(mode) = args.mode {
        playback.mode = mode.into();
    }
    if let Some(rate) = args.rate {
        playback.playback_rate = rate;
    }
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
