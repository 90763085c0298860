//! # Dispatcher
//!
//! 场景分发模块。
//!
//! 负责：
//! - 消费 `SceneUpdate`
//! - Fan-out 到多个 sinks (轨迹视图、图表、信息面板等消费者)
//! - 隔离慢 sink，不阻塞播放光标

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{SceneSink, SceneUpdate};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{DatagramFormat, FileSink, LogSink, NetworkSink};

#[cfg(test)]
pub(crate) fn sample_update(sequence: u64) -> SceneUpdate {
    use contracts::{CurvatureSample, LatencySample, ObstacleFrame, Point2, Scene, SceneCause};

    let cursor = sequence as f64 * 0.1;
    SceneUpdate {
        sequence,
        session: 1,
        cause: SceneCause::Tick,
        scene: Scene {
            cursor,
            t_min: 0.0,
            t_max: 10.0,
            is_playing: true,
            frame: Some(ObstacleFrame {
                t: cursor,
                pos: Point2(cursor, 0.0),
                obstacles: vec![Point2(2.0, 1.0)],
            }),
            latency: Some(LatencySample { t: cursor, latency: 45.0 }),
            speed: None,
            curvature: Some(CurvatureSample { t: cursor, curvature: 0.0 }),
        },
    }
}
