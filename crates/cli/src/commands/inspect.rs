//! `inspect` command implementation.

use anyhow::{Context, Result};
use contracts::{AnalysisService, Issue, Kpis, ResultModel};
use serde::Serialize;
use tracing::info;

use super::{build_backend, load_config, read_artifact};
use crate::cli::InspectArgs;

/// Result overview for JSON output
#[derive(Serialize)]
struct ResultInfo<'a> {
    file: &'a str,
    kpis: &'a Kpis,
    issues: &'a [Issue],
    #[serde(skip_serializing_if = "Option::is_none")]
    time_range: Option<(f64, f64)>,
    series: SeriesInfo,
}

#[derive(Serialize)]
struct SeriesInfo {
    polyline_points: usize,
    obstacle_frames: usize,
    latency_samples: usize,
    speed_samples: usize,
    curvature_samples: usize,
}

impl SeriesInfo {
    fn from_result(result: &ResultModel) -> Self {
        let derived = &result.derived;
        Self {
            polyline_points: derived.polyline.len(),
            obstacle_frames: derived.obstacles_time_series.len(),
            latency_samples: derived.latency_timeline.len(),
            speed_samples: derived.speed_timeline.len(),
            curvature_samples: derived.curvature_timeline.len(),
        }
    }
}

/// Execute the `inspect` command
pub async fn run_inspect(args: &InspectArgs) -> Result<()> {
    let config = load_config(&args.service)?;
    let backend = build_backend(&args.service, &config)?;
    let artifact = read_artifact(&args.log)?;

    let result = backend
        .analyze(&artifact)
        .await
        .with_context(|| format!("Analysis failed for {}", artifact.file_name))?;
    info!(issues = result.issues.len(), "Analysis result received");

    if args.json {
        let info = ResultInfo {
            file: &artifact.file_name,
            kpis: &result.kpis,
            issues: &result.issues,
            time_range: result.time_range(),
            series: SeriesInfo::from_result(&result),
        };
        let json = serde_json::to_string_pretty(&info).context("Failed to serialize result")?;
        println!("{}", json);
    } else {
        print_result(&artifact.file_name, &result);
    }
    Ok(())
}

fn print_result(file: &str, result: &ResultModel) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Planning Log Analysis                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
    println!("📄 {}", file);

    if let Some((t_min, t_max)) = result.time_range() {
        println!("   └─ Timeline: {:.2}s → {:.2}s", t_min, t_max);
    }

    print_kpis(&result.kpis);
    print_issues(&result.issues);

    let series = SeriesInfo::from_result(result);
    println!("\n📈 Series");
    println!("   ├─ Polyline points: {}", series.polyline_points);
    println!("   ├─ Obstacle frames: {}", series.obstacle_frames);
    println!("   ├─ Latency samples: {}", series.latency_samples);
    println!("   ├─ Speed samples: {}", series.speed_samples);
    println!("   └─ Curvature samples: {}", series.curvature_samples);
    println!();
}

pub(crate) fn print_kpis(kpis: &Kpis) {
    println!("\n📊 KPIs");
    println!("   ├─ Avg latency: {:.1} ms", kpis.avg_latency_ms);
    println!("   ├─ P95 latency: {:.1} ms", kpis.p95_latency_ms);
    println!("   ├─ Max latency: {:.1} ms", kpis.max_latency_ms);
    println!("   ├─ Path length: {:.2} m", kpis.path_length);
    println!("   ├─ Straight line: {:.2} m", kpis.straight_line_distance);
    println!("   ├─ Path efficiency: {:.0}%", kpis.path_efficiency * 100.0);
    println!("   ├─ Max curvature: {:.3}", kpis.max_curvature);
    println!("   ├─ Jerk spikes: {}", kpis.jerk_spikes);
    println!("   ├─ Stalls: {}", kpis.stalls);
    if kpis.extra.is_empty() {
        println!("   └─ Near misses: {}", kpis.near_misses);
        return;
    }
    println!("   ├─ Near misses: {}", kpis.near_misses);
    for (i, (key, value)) in kpis.extra.iter().enumerate() {
        let prefix = if i + 1 == kpis.extra.len() { "└─" } else { "├─" };
        println!("   {} {}: {}", prefix, key, value);
    }
}

pub(crate) fn print_issues(issues: &[Issue]) {
    println!("\n⚠️  Issues ({})", issues.len());
    for (i, issue) in issues.iter().enumerate() {
        let prefix = if i + 1 == issues.len() { "└─" } else { "├─" };
        let at = issue
            .timestamp
            .map(|t| format!(" @ {:.2}s", t))
            .unwrap_or_default();
        println!(
            "   {} [{}] {:?} {}{}: {}",
            prefix, i, issue.severity, issue.code, at, issue.message
        );
    }
}
