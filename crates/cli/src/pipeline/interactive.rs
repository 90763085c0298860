//! Interactive command loop over stdin.

use std::fmt::Write as _;
use std::io::Write as _;

use anyhow::{Context, Result};
use contracts::{AnalysisService, Scene};
use sync_engine::PlaybackState;
use tokio::io::{AsyncBufReadExt, BufReader};
use viewer::{Command, PlaybackDriver, Response, HELP};

use crate::commands::{print_issues, print_kpis};

/// Read commands until `quit` or end of input
pub async fn run<S>(driver: &mut PlaybackDriver<S>) -> Result<()>
where
    S: AnalysisService + Sync + 'static,
{
    println!("{}", HELP);
    if let Some(scene) = driver.scene().await {
        println!("{}", format_scene(&scene));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await.context("Failed to read command")? {
        if line.trim().is_empty() {
            prompt();
            continue;
        }

        match line.parse::<Command>() {
            Ok(command) => match driver.execute(command).await {
                Ok(Response::Quit) => break,
                Ok(response) => render(&response),
                Err(e) => println!("error: {}", e),
            },
            Err(e) => println!("{}", e),
        }
        prompt();
    }
    Ok(())
}

fn prompt() {
    print!("> ");
    // prompt only; a failed flush is harmless
    let _ = std::io::stdout().flush();
}

fn render(response: &Response) {
    match response {
        Response::Issues(issues) => print_issues(issues),
        Response::Kpis(kpis) => print_kpis(kpis),
        Response::Report(report) => println!("{}", report),
        Response::Help => println!("{}", HELP),
        other => println!("{}", format_response(other)),
    }
}

fn format_response(response: &Response) -> String {
    match response {
        Response::Scene(scene) => format_scene(scene),
        Response::State(PlaybackState::Playing) => "▶ playing".to_string(),
        Response::State(PlaybackState::Paused) => "⏸ paused".to_string(),
        Response::Jumped { index, applied: true } => format!("jumped to issue {}", index),
        Response::Jumped { index, applied: false } => {
            format!("issue {} has no timestamp", index)
        }
        Response::Superseded => "upload superseded by a newer one".to_string(),
        Response::Healthy => "analysis service healthy".to_string(),
        Response::Ack => "ok".to_string(),
        Response::Issues(issues) => format!("{} issues", issues.len()),
        Response::Kpis(_) => "kpis".to_string(),
        Response::Report(report) => report.clone(),
        Response::Help => HELP.to_string(),
        Response::Quit => "bye".to_string(),
    }
}

/// One-line scene summary
pub(crate) fn format_scene(scene: &Scene) -> String {
    let mut line = format!(
        "{} t={:.2}s [{:.2}, {:.2}] {:>3.0}%",
        if scene.is_playing { "▶" } else { "⏸" },
        scene.cursor,
        scene.t_min,
        scene.t_max,
        scene.progress() * 100.0
    );

    match &scene.frame {
        Some(frame) => {
            let _ = write!(
                line,
                " pos=({:.2}, {:.2}) obstacles={}",
                frame.pos.x(),
                frame.pos.y(),
                frame.obstacles.len()
            );
        }
        None => line.push_str(" pos=-"),
    }

    let value = |v: Option<f64>, precision: usize| {
        v.map_or_else(|| "-".to_string(), |v| format!("{:.*}", precision, v))
    };
    let _ = write!(
        line,
        " latency={} speed={} curvature={}",
        value(scene.latency_ms(), 1),
        value(scene.speed_value(), 2),
        value(scene.curvature_value(), 3)
    );
    line
}
