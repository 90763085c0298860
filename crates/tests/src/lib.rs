//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试 (demos/ 下的样例结果与配置)
//! - 端到端回放测试 (fixture 服务 -> 会话 -> 驱动 -> 分发器)

#[cfg(test)]
fn demo_path(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

#[cfg(test)]
mod contract_tests {
    use super::demo_path;
    use contracts::{ResultModel, Severity, DEFAULT_TOLERANCE};
    use sync_engine::SyncController;

    fn sample_result() -> ResultModel {
        let text = std::fs::read_to_string(demo_path("sample_result.json")).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_sample_result_contract() {
        let result = sample_result();
        result.validate().unwrap();

        assert_eq!(result.time_range(), Some((0.0, 8.0)));
        assert_eq!(result.kpis.jerk_spikes, 3.0);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].severity, Severity::Warning);
        assert!(result.issues[0].timestamp.is_none());
        assert_eq!(result.timed_issues().count(), 0);
    }

    #[test]
    fn test_sample_scene_resolution() {
        let mut controller = SyncController::new(sample_result(), DEFAULT_TOLERANCE).unwrap();

        // curvature starts one second later than the other series
        let scene = controller.current_scene();
        assert_eq!(scene.latency_ms(), Some(45.0));
        assert_eq!(scene.speed_value(), Some(0.0));
        assert_eq!(scene.curvature, None);

        controller.seek_to(6.03);
        let scene = controller.current_scene();
        let frame = scene.frame.as_ref().unwrap();
        assert_eq!((frame.pos.x(), frame.pos.y()), (5.0, 1.0));
        assert_eq!(frame.obstacles.len(), 2);
        assert_eq!(scene.latency_ms(), Some(47.0));
        assert_eq!(scene.curvature_value(), Some(0.1));
        assert_eq!(scene.latency.map(|p| p.t), Some(6.0));

        controller.seek_to(6.5);
        let scene = controller.current_scene();
        assert!(scene.frame.is_none());
        assert!(scene.latency.is_none());
    }

    #[test]
    fn test_demo_config_valid() {
        let config = config_loader::ConfigLoader::load_from_path(&demo_path("replayer.toml")).unwrap();
        assert_eq!(config.sinks.len(), 2);
        assert_eq!(config.playback.step, 0.1);
        assert_eq!(config.service.base_url, contracts::DEFAULT_SERVICE_URL);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use analysis_client::FixtureAnalysisService;
    use contracts::{
        LogArtifact, PlaybackConfig, SceneCause, SceneUpdate, SinkConfig, SinkType,
    };
    use dispatcher::create_dispatcher;
    use observability::PlaybackMetricsAggregator;
    use serde_json::Value;
    use tokio::sync::mpsc;
    use viewer::{Command, PlaybackDriver, Response, ViewerError, ViewerSession};

    use super::demo_path;

    fn fixture_service() -> FixtureAnalysisService {
        FixtureAnalysisService::new(demo_path("sample_result.json"))
            .with_report(demo_path("sample_report.md"))
    }

    fn run_log() -> LogArtifact {
        LogArtifact::from_path(&demo_path("run.json")).unwrap()
    }

    fn file_sink(dir: &std::path::Path) -> SinkConfig {
        SinkConfig {
            name: "scenes".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 1024,
            params: HashMap::from([
                ("base_path".to_string(), dir.display().to_string()),
                ("file_name".to_string(), "scenes.jsonl".to_string()),
            ]),
        }
    }

    /// End-to-end test: FixtureAnalysisService -> PlaybackDriver -> Dispatcher -> FileSink
    ///
    /// 验证完整的数据流：
    /// 1. 上传日志并加载分析结果
    /// 2. 自动播放至时间轴末尾并停止
    /// 3. 每个场景按顺序写入 JSON Lines 文件
    #[tokio::test]
    async fn test_e2e_autoplay_to_file() {
        let dir = tempfile::tempdir().unwrap();

        let (scene_tx, scene_rx) = mpsc::channel::<SceneUpdate>(1024);
        let dispatcher = create_dispatcher(vec![file_sink(dir.path())], scene_rx)
            .await
            .unwrap();
        let dispatcher_handle = dispatcher.spawn();

        let config = PlaybackConfig {
            step: 0.25,
            tick_interval_ms: 1,
            ..Default::default()
        };
        let mut driver = PlaybackDriver::new(ViewerSession::new(config), fixture_service(), scene_tx);

        let scene = driver.upload(run_log()).await.unwrap().unwrap();
        assert_eq!((scene.t_min, scene.t_max), (0.0, 8.0));

        driver.play().await.unwrap();
        tokio::time::timeout(Duration::from_secs(10), driver.wait_until_stopped())
            .await
            .expect("playback did not reach end of range");
        driver.shutdown().await;

        let metrics = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metrics[0].1.dropped_count, 0);

        let content = std::fs::read_to_string(dir.path().join("scenes.jsonl")).unwrap();
        let records: Vec<Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        // load + toggle + 31 ticks + finished
        assert_eq!(records.len(), 34);
        assert_eq!(metrics[0].1.write_count, 34);
        assert_eq!(records[0]["cause"], "load");
        assert_eq!(records[1]["cause"], "toggle");
        assert_eq!(records[33]["cause"], "finished");
        assert_eq!(records[33]["scene"]["cursor"], 8.0);
        assert_eq!(records[33]["scene"]["is_playing"], false);

        let sequences: Vec<u64> = records
            .iter()
            .map(|r| r["sequence"].as_u64().unwrap())
            .collect();
        assert!(sequences.windows(2).all(|w| w[0] < w[1]));

        let cursors: Vec<f64> = records
            .iter()
            .map(|r| r["scene"]["cursor"].as_f64().unwrap())
            .collect();
        assert!(cursors.windows(2).all(|w| w[0] <= w[1]));
        assert!(records.iter().all(|r| r["written_at"].is_string()));
    }

    /// 交互命令驱动：跳转、报告、重新加载
    #[tokio::test]
    async fn test_e2e_command_session() {
        let (scene_tx, mut scene_rx) = mpsc::channel::<SceneUpdate>(1024);
        let mut driver = PlaybackDriver::new(
            ViewerSession::new(PlaybackConfig::default()),
            fixture_service(),
            scene_tx,
        );

        let load = format!("load {}", demo_path("run.json").display());
        for line in [load.as_str(), "seek 3.02", "seek 100", "issue 0", "toggle"] {
            let command: Command = line.parse().unwrap();
            driver.execute(command).await.unwrap();
        }

        // at end of range: toggle is a no-op, issue 0 has no timestamp
        let scene = driver.scene().await.unwrap();
        assert_eq!(scene.cursor, 8.0);
        assert!(!scene.is_playing);

        match driver.execute("report".parse().unwrap()).await.unwrap() {
            Response::Report(text) => assert!(text.contains("LOW_PATH_EFFICIENCY")),
            other => panic!("unexpected {other:?}"),
        }

        // reload resets the cursor to the start
        match driver.execute(load.parse().unwrap()).await.unwrap() {
            Response::Scene(scene) => {
                assert_eq!(scene.cursor, 0.0);
                assert!(!scene.is_playing);
            }
            other => panic!("unexpected {other:?}"),
        }
        drop(driver);

        let mut aggregator = PlaybackMetricsAggregator::new();
        while let Some(update) = scene_rx.recv().await {
            aggregator.update(&update);
        }
        let summary = aggregator.summary();
        assert_eq!(summary.seeks, 2);
        assert_eq!(summary.issue_jumps, 1);
        assert_eq!(aggregator.cause_counts.get(&SceneCause::Load), Some(&2));
        assert_eq!(summary.auto_stops, 0);
    }

    /// 先清空再请求：失败的上传不会保留旧结果
    #[tokio::test]
    async fn test_e2e_failed_upload_clears_previous_result() {
        let mut session = ViewerSession::new(PlaybackConfig::default());
        session.upload(&fixture_service(), run_log()).await.unwrap();
        session.generate_report(&fixture_service()).await.unwrap();
        assert!(session.controls_enabled());
        assert!(session.report().is_some());

        let broken = FixtureAnalysisService::new(demo_path("sample_report.md"));
        let err = session.upload(&broken, run_log()).await.unwrap_err();
        assert!(matches!(err, ViewerError::Contract(_)));

        assert!(session.result().is_none());
        assert!(session.report().is_none());
        assert!(session.error().is_some());
        assert!(!session.controls_enabled());

        // retry succeeds
        session.upload(&fixture_service(), run_log()).await.unwrap();
        assert!(session.error().is_none());
        assert_eq!(session.scene().unwrap().cursor, 0.0);
    }

    #[tokio::test]
    async fn test_e2e_unsupported_artifact_rejected_before_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.bag");
        std::fs::write(&path, b"binary").unwrap();

        let mut session = ViewerSession::new(PlaybackConfig::default());
        assert!(LogArtifact::from_path(&path).is_err());
        assert_eq!(session.generation(), 0);
        assert!(!session.is_loading());
        assert!(matches!(
            session.generate_report(&fixture_service()).await,
            Err(ViewerError::NoResult)
        ));
    }
}
