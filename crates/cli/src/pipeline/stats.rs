//! Replay statistics.

use std::time::Duration;

use contracts::Scene;
use dispatcher::MetricsSnapshot;
use observability::PlaybackMetricsAggregator;

use super::interactive::format_scene;

/// Statistics from a replay run
#[derive(Debug, Clone, Default)]
pub struct ReplayStats {
    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Number of configured sinks
    pub active_sinks: usize,

    /// Scene at shutdown
    pub final_scene: Option<Scene>,

    /// Scene aggregator fed by the tap
    pub playback: PlaybackMetricsAggregator,

    /// Per-sink counters reported by the dispatcher
    pub sink_metrics: Vec<(String, MetricsSnapshot)>,
}

impl ReplayStats {
    pub fn scenes_published(&self) -> u64 {
        self.playback.total_scenes
    }

    /// Scenes per wall-clock second
    pub fn scene_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.scenes_published() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Replay Statistics                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Scenes published: {}", self.scenes_published());
        println!("   ├─ Scenes/s: {:.2}", self.scene_rate());
        println!("   └─ Active sinks: {}", self.active_sinks);

        if let Some(scene) = &self.final_scene {
            println!("\n📍 Final scene");
            println!("   └─ {}", format_scene(scene));
        }

        println!("\n{}", self.playback.summary());

        if !self.sink_metrics.is_empty() {
            println!("📤 Sinks");
            for (i, (name, snapshot)) in self.sink_metrics.iter().enumerate() {
                let prefix = if i + 1 == self.sink_metrics.len() { "└─" } else { "├─" };
                println!(
                    "   {} {}: written={} dropped={} superseded={} failed={}",
                    prefix,
                    name,
                    snapshot.write_count,
                    snapshot.dropped_count,
                    snapshot.superseded_count,
                    snapshot.failure_count
                );
            }
        }

        println!();
    }
}
