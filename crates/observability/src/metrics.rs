//! 回放指标收集模块
//!
//! 基于 SceneUpdate 收集和统计播放引擎的运行指标。

use std::collections::HashMap;

use contracts::{SceneCause, SceneUpdate, CURVATURE_SERIES, LATENCY_SERIES, OBSTACLES_SERIES, SPEED_SERIES};
use metrics::{counter, gauge, histogram};

/// 从 SceneUpdate 记录指标
///
/// 每次光标变化产生新场景时调用。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_scene_metrics;
///
/// while let Some(update) = scene_rx.recv().await {
///     record_scene_metrics(&update);
/// }
/// ```
pub fn record_scene_metrics(update: &SceneUpdate) {
    let scene = &update.scene;

    counter!(
        "log_replayer_scenes_total",
        "cause" => cause_label(update.cause)
    )
    .increment(1);

    gauge!("log_replayer_cursor_seconds").set(scene.cursor);
    gauge!("log_replayer_progress_ratio").set(scene.progress());
    gauge!("log_replayer_playing").set(if scene.is_playing { 1.0 } else { 0.0 });
    gauge!("log_replayer_obstacles_visible").set(scene.obstacle_count() as f64);

    record_series_resolution(OBSTACLES_SERIES, scene.frame.is_some());
    record_series_resolution(LATENCY_SERIES, scene.latency.is_some());
    record_series_resolution(SPEED_SERIES, scene.speed.is_some());
    record_series_resolution(CURVATURE_SERIES, scene.curvature.is_some());

    if let Some(latency) = scene.latency_ms() {
        histogram!("log_replayer_scene_latency_ms").record(latency);
    }
}

/// 记录单条序列的查找结果 (命中/未命中)
pub fn record_series_resolution(series: &'static str, hit: bool) {
    let status = if hit { "hit" } else { "miss" };
    counter!(
        "log_replayer_series_resolution_total",
        "series" => series,
        "status" => status
    )
    .increment(1);
}

/// 记录播放 tick
pub fn record_tick(outcome: &'static str) {
    counter!("log_replayer_ticks_total", "outcome" => outcome).increment(1);
}

/// 记录手动定位
pub fn record_seek(cursor: f64, clamped: bool) {
    counter!("log_replayer_seeks_total").increment(1);
    if clamped {
        counter!("log_replayer_seeks_clamped_total").increment(1);
    }
    gauge!("log_replayer_seek_cursor_seconds").set(cursor);
}

/// 记录问题跳转
pub fn record_issue_jump(applied: bool) {
    let status = if applied { "applied" } else { "untimed" };
    counter!("log_replayer_issue_jumps_total", "status" => status).increment(1);
}

/// 记录分析结果加载
pub fn record_result_loaded(issue_count: usize, samples: usize, t_span: f64) {
    counter!("log_replayer_results_loaded_total").increment(1);
    gauge!("log_replayer_result_issues").set(issue_count as f64);
    gauge!("log_replayer_result_samples").set(samples as f64);
    gauge!("log_replayer_result_span_seconds").set(t_span);
}

/// 记录上游服务调用
pub fn record_upstream_call(operation: &'static str, success: bool, elapsed_ms: f64) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "log_replayer_upstream_calls_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    histogram!("log_replayer_upstream_latency_ms", "operation" => operation).record(elapsed_ms);
}

/// 记录场景分发
pub fn record_scene_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "log_replayer_scenes_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录因会话已被替换而丢弃的场景
pub fn record_stale_scene(session: u64) {
    counter!("log_replayer_scenes_stale_total").increment(1);
    gauge!("log_replayer_dispatch_session").set(session as f64);
}

fn cause_label(cause: SceneCause) -> &'static str {
    match cause {
        SceneCause::Load => "load",
        SceneCause::Seek => "seek",
        SceneCause::IssueJump => "issue_jump",
        SceneCause::Toggle => "toggle",
        SceneCause::Tick => "tick",
        SceneCause::Finished => "finished",
    }
}

/// 回放指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct PlaybackMetricsAggregator {
    /// 场景总数
    pub total_scenes: u64,

    /// 各触发原因的场景数
    pub cause_counts: HashMap<SceneCause, u64>,

    /// 播放到末尾自动停止的次数
    pub auto_stops: u64,

    /// 各序列未命中次数
    pub series_misses: HashMap<&'static str, u64>,

    /// 延迟统计 (ms)
    pub latency_stats: RunningStats,

    /// 速度统计
    pub speed_stats: RunningStats,

    /// 可见障碍物数量统计
    pub obstacle_stats: RunningStats,

    /// 光标推进步长统计 (仅 tick)
    pub step_stats: RunningStats,

    last_cursor: Option<f64>,
}

impl PlaybackMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, update: &SceneUpdate) {
        let scene = &update.scene;
        self.total_scenes += 1;
        *self.cause_counts.entry(update.cause).or_insert(0) += 1;

        if update.cause == SceneCause::Finished {
            self.auto_stops += 1;
        }

        if matches!(update.cause, SceneCause::Tick | SceneCause::Finished) {
            if let Some(last) = self.last_cursor {
                self.step_stats.push(scene.cursor - last);
            }
        }
        self.last_cursor = Some(scene.cursor);

        for (series, hit) in [
            (OBSTACLES_SERIES, scene.frame.is_some()),
            (LATENCY_SERIES, scene.latency.is_some()),
            (SPEED_SERIES, scene.speed.is_some()),
            (CURVATURE_SERIES, scene.curvature.is_some()),
        ] {
            if !hit {
                *self.series_misses.entry(series).or_insert(0) += 1;
            }
        }

        if let Some(latency) = scene.latency_ms() {
            self.latency_stats.push(latency);
        }
        if let Some(speed) = scene.speed_value() {
            self.speed_stats.push(speed);
        }
        if scene.frame.is_some() {
            self.obstacle_stats.push(scene.obstacle_count() as f64);
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> PlaybackSummary {
        let count = |cause| self.cause_counts.get(&cause).copied().unwrap_or(0);
        let total_misses: u64 = self.series_misses.values().sum();
        let lookups = self.total_scenes * 4;

        PlaybackSummary {
            total_scenes: self.total_scenes,
            ticks: count(SceneCause::Tick) + count(SceneCause::Finished),
            seeks: count(SceneCause::Seek),
            issue_jumps: count(SceneCause::IssueJump),
            auto_stops: self.auto_stops,
            miss_rate: if lookups > 0 {
                total_misses as f64 / lookups as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            speed: StatsSummary::from(&self.speed_stats),
            obstacles: StatsSummary::from(&self.obstacle_stats),
            tick_step: StatsSummary::from(&self.step_stats),
            series_misses: self.series_misses.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct PlaybackSummary {
    pub total_scenes: u64,
    pub ticks: u64,
    pub seeks: u64,
    pub issue_jumps: u64,
    pub auto_stops: u64,
    pub miss_rate: f64,
    pub latency_ms: StatsSummary,
    pub speed: StatsSummary,
    pub obstacles: StatsSummary,
    pub tick_step: StatsSummary,
    pub series_misses: HashMap<&'static str, u64>,
}

impl std::fmt::Display for PlaybackSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Playback Summary ===")?;
        writeln!(f, "Total scenes: {}", self.total_scenes)?;
        writeln!(f, "Ticks: {} (auto-stops: {})", self.ticks, self.auto_stops)?;
        writeln!(f, "Seeks: {}", self.seeks)?;
        writeln!(f, "Issue jumps: {}", self.issue_jumps)?;
        writeln!(f, "Series miss rate: {:.2}%", self.miss_rate)?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;
        writeln!(f, "Speed: {}", self.speed)?;
        writeln!(f, "Visible obstacles: {}", self.obstacles)?;
        writeln!(f, "Tick step (s): {}", self.tick_step)?;

        if !self.series_misses.is_empty() {
            writeln!(f, "Series misses:")?;
            let mut misses: Vec<_> = self.series_misses.iter().collect();
            misses.sort();
            for (series, count) in misses {
                writeln!(f, "  {}: {}", series, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
