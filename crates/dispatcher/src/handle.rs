//! SinkHandle - one sink behind a bounded queue and its own worker task
//!
//! A full queue never blocks the dispatcher. Tick scenes are simply dropped.
//! Operator scenes (load, seek, jump, toggle, finished) are held in a single
//! catch-up slot instead: the worker writes the held scene next and skips
//! whatever older scenes are still queued, so a lagging sink always lands on
//! the operator's latest cursor. Every sink sees strictly increasing
//! sequence numbers.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{SceneCause, SceneSink, SceneUpdate};

use crate::metrics::SinkMetrics;

/// Latest operator scene that did not fit in the queue
#[derive(Debug, Default)]
struct CatchUp {
    slot: Mutex<Option<SceneUpdate>>,
    notify: Notify,
}

impl CatchUp {
    /// Hold `update`, returning the scene it displaced
    fn hold(&self, update: SceneUpdate) -> Option<SceneUpdate> {
        let displaced = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(update);
        self.notify.notify_one();
        displaced
    }

    fn take(&self) -> Option<SceneUpdate> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    tx: mpsc::Sender<SceneUpdate>,
    catch_up: Arc<CatchUp>,
    metrics: Arc<SinkMetrics>,
    worker: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker for `sink` with a queue of `queue_capacity` scenes
    pub fn spawn<S: SceneSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let catch_up = Arc::new(CatchUp::default());
        let metrics = Arc::new(SinkMetrics::new());

        let worker = tokio::spawn(sink_worker(
            sink,
            rx,
            Arc::clone(&catch_up),
            Arc::clone(&metrics),
            name.clone(),
        ));

        Self {
            name,
            tx,
            catch_up,
            metrics,
            worker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Offer a scene without waiting
    ///
    /// Returns `false` when the scene was dropped. A held operator scene
    /// counts as accepted.
    pub fn try_send(&self, update: SceneUpdate) -> bool {
        let update = match self.tx.try_send(update) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                return true;
            }
            Err(mpsc::error::TrySendError::Full(update)) => update,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "Sink worker closed unexpectedly");
                return false;
            }
        };

        if update.cause == SceneCause::Tick {
            self.drop_scene(&update, "Queue full, tick dropped");
            return false;
        }

        debug!(sink = %self.name, sequence = update.sequence, cause = ?update.cause, "Queue full, holding for catch-up");
        if let Some(displaced) = self.catch_up.hold(update) {
            self.drop_scene(&displaced, "Held scene replaced by a newer one");
        }
        true
    }

    fn drop_scene(&self, update: &SceneUpdate, reason: &str) {
        self.metrics.inc_dropped_count();
        observability::record_scene_dispatched(&self.name, false);
        warn!(sink = %self.name, sequence = update.sequence, cause = ?update.cause, "{}", reason);
    }

    /// Close the queue and wait for the worker
    ///
    /// Queued scenes and a held catch-up scene are written before the sink is
    /// flushed and closed.
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

/// Writes scenes in sequence order until the queue closes
struct Writer<S> {
    sink: S,
    name: String,
    metrics: Arc<SinkMetrics>,
    last_sequence: Option<u64>,
}

impl<S: SceneSink> Writer<S> {
    async fn write(&mut self, update: SceneUpdate) {
        if self.last_sequence.is_some_and(|last| update.sequence <= last) {
            self.metrics.inc_superseded_count();
            return;
        }
        self.last_sequence = Some(update.sequence);

        match self.sink.write(&update).await {
            Ok(()) => {
                self.metrics.record_write(update.sequence);
                observability::record_scene_dispatched(&self.name, true);
            }
            Err(e) => {
                self.metrics.inc_failure_count();
                observability::record_scene_dispatched(&self.name, false);
                error!(sink = %self.name, sequence = update.sequence, error = %e, "Write failed");
            }
        }
    }

    async fn finish(mut self) {
        if let Err(e) = self.sink.flush().await {
            error!(sink = %self.name, error = %e, "Flush failed on shutdown");
        }
        if let Err(e) = self.sink.close().await {
            error!(sink = %self.name, error = %e, "Close failed on shutdown");
        }
    }
}

#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, catch_up, metrics),
    fields(sink = %name)
)]
async fn sink_worker<S: SceneSink>(
    sink: S,
    mut rx: mpsc::Receiver<SceneUpdate>,
    catch_up: Arc<CatchUp>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!("Sink worker started");
    let mut writer = Writer {
        sink,
        name,
        metrics: Arc::clone(&metrics),
        last_sequence: None,
    };

    loop {
        let update = match catch_up.take() {
            Some(held) => held,
            None => tokio::select! {
                received = rx.recv() => match received {
                    Some(update) => update,
                    None => break,
                },
                _ = catch_up.notify.notified() => continue,
            },
        };
        metrics.set_queue_len(rx.len());
        writer.write(update).await;
    }

    if let Some(held) = catch_up.take() {
        writer.write(held).await;
    }
    writer.finish().await;
    debug!("Sink worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_update;
    use contracts::ContractError;
    use tokio::time::{sleep, Duration};

    /// Records written sequences, optionally slowly or failing
    struct RecordingSink {
        name: String,
        written: Arc<Mutex<Vec<u64>>>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl SceneSink for RecordingSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, update: &SceneUpdate) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ContractError::sink_write(&self.name, "refused"));
            }
            self.written.lock().unwrap().push(update.sequence);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn recording(name: &str, should_fail: bool, delay_ms: u64) -> (RecordingSink, Arc<Mutex<Vec<u64>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let sink = RecordingSink {
            name: name.to_string(),
            written: Arc::clone(&written),
            should_fail,
            delay_ms,
        };
        (sink, written)
    }

    fn operator_update(sequence: u64, cause: SceneCause) -> SceneUpdate {
        let mut update = sample_update(sequence);
        update.cause = cause;
        update.scene.is_playing = false;
        update
    }

    #[tokio::test]
    async fn test_writes_in_order() {
        let (sink, written) = recording("test", false, 0);
        let handle = SinkHandle::spawn(sink, 10);

        for i in 0..5 {
            assert!(handle.try_send(sample_update(i)));
        }

        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await;
        assert_eq!(*written.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(metrics.last_sequence(), 4);
    }

    #[tokio::test]
    async fn test_ticks_dropped_when_queue_full() {
        let (sink, _) = recording("slow", false, 100);
        let handle = SinkHandle::spawn(sink, 2);

        let accepted = (0..10).filter(|&i| handle.try_send(sample_update(i))).count();

        assert!(accepted < 10);
        assert_eq!(handle.metrics().dropped_count(), (10 - accepted) as u64);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_lagging_sink_catches_up_to_latest_seek() {
        let (sink, written) = recording("lagging", false, 20);
        let handle = SinkHandle::spawn(sink, 1);

        for i in 0..6 {
            handle.try_send(sample_update(i));
        }
        assert!(handle.try_send(operator_update(6, SceneCause::Seek)));
        assert!(handle.try_send(operator_update(7, SceneCause::Seek)));

        let metrics = Arc::clone(handle.metrics());
        handle.shutdown().await;

        let written = written.lock().unwrap().clone();
        assert_eq!(written.last(), Some(&7));
        assert!(written.windows(2).all(|w| w[0] < w[1]), "{written:?}");
        assert!(!written.contains(&6));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.offered(), 8);
    }

    #[tokio::test]
    async fn test_failure_isolation() {
        let (sink, _) = recording("failing", true, 0);
        let handle = SinkHandle::spawn(sink, 10);

        for i in 0..3 {
            handle.try_send(sample_update(i));
        }

        sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.metrics().failure_count(), 3);

        handle.shutdown().await;
    }
}
