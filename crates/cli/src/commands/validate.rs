//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{PlaybackMode, ReplayerConfig, SinkType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    service_url: String,
    tolerance: f64,
    step: f64,
    tick_interval_ms: u64,
    mode: String,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: Vec::new(),
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&config),
            summary: Some(ConfigSummary {
                version: format!("{:?}", config.version),
                service_url: config.service.base_url.clone(),
                tolerance: config.playback.tolerance,
                step: config.playback.step,
                tick_interval_ms: config.playback.tick_interval_ms,
                mode: format!("{:?}", config.playback.mode),
                sink_count: config.sinks.len(),
            }),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &ReplayerConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let playback = &config.playback;

    if config.sinks.is_empty() {
        warnings.push("No sinks configured - scenes will only be counted".to_string());
    }

    if playback.mode == PlaybackMode::FixedStep && playback.tolerance * 2.0 < playback.step {
        warnings.push(format!(
            "playback.tolerance ({}) is below half of playback.step ({}) - samples between ticks will be skipped",
            playback.tolerance, playback.step
        ));
    }

    if playback.mode == PlaybackMode::WallClock && playback.step != contracts::DEFAULT_STEP {
        warnings.push("playback.step is ignored in wall_clock mode".to_string());
    }

    for sink in &config.sinks {
        if sink.sink_type == SinkType::File && !sink.params.contains_key("base_path") {
            warnings.push(format!(
                "Sink '{}' has no base_path - writing to ./output",
                sink.name
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Service: {}", summary.service_url);
            println!(
                "  Playback: step={}s tolerance={}s tick={}ms mode={}",
                summary.step, summary.tolerance, summary.tick_interval_ms, summary.mode
            );
            println!("  Sinks: {}", summary.sink_count);
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
