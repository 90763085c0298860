//! `report` command implementation.

use anyhow::{Context, Result};
use contracts::AnalysisService;
use tracing::info;

use super::{build_backend, load_config, read_artifact};
use crate::cli::ReportArgs;

/// Execute the `report` command
pub async fn run_report(args: &ReportArgs) -> Result<()> {
    let config = load_config(&args.service)?;
    let backend = build_backend(&args.service, &config)?;
    let artifact = read_artifact(&args.log)?;

    let report = backend
        .report(&artifact)
        .await
        .with_context(|| format!("Report generation failed for {}", artifact.file_name))?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, &report)
                .await
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!(path = %path.display(), bytes = report.len(), "Report written");
        }
        None => println!("{}", report),
    }
    Ok(())
}
