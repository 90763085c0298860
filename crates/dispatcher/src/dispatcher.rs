//! Dispatcher - main loop for fan-out to sinks

use std::cmp::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{SceneUpdate, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{FileSink, LogSink, NetworkSink};

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub sinks: Vec<SinkConfig>,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    input_rx: mpsc::Receiver<SceneUpdate>,
}

impl DispatcherBuilder {
    pub fn new(config: DispatcherConfig, input_rx: mpsc::Receiver<SceneUpdate>) -> Self {
        Self { config, input_rx }
    }

    /// Build and start the dispatcher
    #[instrument(name = "dispatcher_builder_build", skip(self))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let handles = Self::initialize_handles(&self.config).await?;

        Ok(Dispatcher::with_handles(handles, self.input_rx))
    }

    #[instrument(
        name = "dispatcher_initialize_handles",
        skip(config),
        fields(sink_count = config.sinks.len())
    )]
    async fn initialize_handles(
        config: &DispatcherConfig,
    ) -> Result<Vec<SinkHandle>, DispatcherError> {
        let mut handles = Vec::with_capacity(config.sinks.len());
        for sink_config in &config.sinks {
            handles.push(create_sink_handle(sink_config).await?);
        }
        Ok(handles)
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
async fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::from_params(&config.name, &config.params);
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params).map_err(|e| {
                DispatcherError::sink_creation(&config.name, config.sink_type, e.into())
            })?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(&config.name, config.sink_type, e))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// Fans resolved scenes out to every configured sink
///
/// Sessions only move forward: once an update from a newer upload session
/// has been seen, anything still queued from an older one is dropped before
/// it reaches the sinks.
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<SceneUpdate>,
    session: u64,
    stale_count: u64,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles (for testing)
    pub fn with_handles(handles: Vec<SinkHandle>, input_rx: mpsc::Receiver<SceneUpdate>) -> Self {
        Self {
            handles,
            input_rx,
            session: 0,
            stale_count: 0,
        }
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run the dispatcher main loop
    ///
    /// Returns the final per-sink metrics once the input channel closes and
    /// every sink has drained.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> Vec<(String, MetricsSnapshot)> {
        info!(sinks = self.handles.len(), "Dispatcher started");

        let mut scene_count: u64 = 0;

        while let Some(update) = self.input_rx.recv().await {
            if !self.admit(&update) {
                continue;
            }
            scene_count += 1;
            self.dispatch_scene(&update);

            if scene_count % 100 == 0 {
                debug!(scenes = scene_count, session = self.session, "Dispatcher progress");
            }
        }

        info!(
            scenes = scene_count,
            stale = self.stale_count,
            "Dispatcher input closed, shutting down"
        );

        let metrics = self.shutdown_handles().await;

        info!("Dispatcher shutdown complete");
        metrics
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<Vec<(String, MetricsSnapshot)>> {
        tokio::spawn(self.run())
    }

    /// Track the newest session; reject updates from older ones
    fn admit(&mut self, update: &SceneUpdate) -> bool {
        match update.session.cmp(&self.session) {
            Ordering::Less => {
                self.stale_count += 1;
                observability::record_stale_scene(self.session);
                debug!(
                    sequence = update.sequence,
                    session = update.session,
                    current = self.session,
                    "Dropping scene from superseded session"
                );
                false
            }
            Ordering::Greater => {
                if self.session != 0 {
                    info!(from = self.session, to = update.session, "Replay session replaced");
                }
                self.session = update.session;
                true
            }
            Ordering::Equal => true,
        }
    }

    fn dispatch_scene(&self, update: &SceneUpdate) {
        for handle in &self.handles {
            handle.try_send(update.clone());
        }
    }

    async fn shutdown_handles(self) -> Vec<(String, MetricsSnapshot)> {
        let mut metrics = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            let name = handle.name().to_string();
            let snapshot_source = Arc::clone(handle.metrics());
            handle.shutdown().await;
            metrics.push((name, snapshot_source.snapshot()));
        }
        metrics
    }
}

/// Convenience function to create a dispatcher from sink configs
#[instrument(name = "dispatcher_create", skip(sink_configs, input_rx))]
pub async fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    input_rx: mpsc::Receiver<SceneUpdate>,
) -> Result<Dispatcher, DispatcherError> {
    let config = DispatcherConfig {
        sinks: sink_configs,
    };
    DispatcherBuilder::new(config, input_rx).build().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_update;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_dispatcher_fanout() {
        let (input_tx, input_rx) = mpsc::channel(10);

        let handles = vec![
            SinkHandle::spawn(LogSink::new("sink1"), 10),
            SinkHandle::spawn(LogSink::new("sink2"), 10),
        ];

        let dispatcher = Dispatcher::with_handles(handles, input_rx);
        let handle = dispatcher.spawn();

        for i in 0..5 {
            input_tx.send(sample_update(i)).await.unwrap();
        }

        drop(input_tx);

        let metrics = handle.await.unwrap();
        assert_eq!(metrics.len(), 2);
        for (_, snapshot) in metrics {
            assert_eq!(snapshot.write_count, 5);
        }
    }

    #[tokio::test]
    async fn test_superseded_session_dropped() {
        let (input_tx, input_rx) = mpsc::channel(10);
        let handles = vec![SinkHandle::spawn(LogSink::new("sink"), 10)];
        let handle = Dispatcher::with_handles(handles, input_rx).spawn();

        let mut old = sample_update(0);
        old.session = 1;
        let mut new = sample_update(1);
        new.session = 2;
        let mut late = sample_update(2);
        late.session = 1;

        for update in [old, new, late] {
            input_tx.send(update).await.unwrap();
        }
        drop(input_tx);

        let metrics = handle.await.unwrap();
        assert_eq!(metrics[0].1.write_count, 2);
    }

    #[tokio::test]
    async fn test_create_dispatcher_from_config() {
        let (input_tx, input_rx) = mpsc::channel(10);

        let configs = vec![SinkConfig {
            name: "test_log".to_string(),
            sink_type: SinkType::Log,
            queue_capacity: 50,
            params: HashMap::new(),
        }];

        let dispatcher = create_dispatcher(configs, input_rx).await.unwrap();
        let handle = dispatcher.spawn();

        input_tx.send(sample_update(1)).await.unwrap();

        drop(input_tx);
        let metrics = handle.await.unwrap();
        assert_eq!(metrics[0].0, "test_log");
    }

    #[tokio::test]
    async fn test_network_sink_requires_addr() {
        let (_input_tx, input_rx) = mpsc::channel(10);
        let configs = vec![SinkConfig {
            name: "udp".to_string(),
            sink_type: SinkType::Network,
            queue_capacity: 10,
            params: HashMap::new(),
        }];

        let err = create_dispatcher(configs, input_rx).await.err().unwrap();
        assert_eq!(err.sink_name(), "udp");
        assert!(err.to_string().contains("Network sink 'udp'"));
    }
}
