//! The Scheduler drives collection cycles and fans batches out to outputs.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use corowatch_collector::{CollectError, CorosyncCollector};
use corowatch_types::MetricBatch;
use tracing::{debug, warn};

use crate::output::Output;

/// Default time between collection cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Something that can produce one metric batch per cycle.
///
/// Implemented by `CorosyncCollector`; tests substitute their own.
pub trait BatchSource: Send + Sync + 'static {
    /// Run one collection cycle.
    fn collect(&self) -> impl Future<Output = Result<MetricBatch, CollectError>> + Send;
}

impl BatchSource for CorosyncCollector {
    fn collect(&self) -> impl Future<Output = Result<MetricBatch, CollectError>> + Send {
        CorosyncCollector::collect(self)
    }
}

/// Runs collection cycles on an interval and emits each successful batch.
///
/// Cycles never overlap: the next tick is only awaited after the current
/// cycle has finished, and ticks missed while a cycle was running are
/// delayed rather than bunched up. A failed cycle is logged and skipped;
/// nothing is emitted for it.
///
/// # Example
///
/// ```rust,no_run
/// use corowatch_collector::CorosyncCollector;
/// use corowatch_sdk::{Output, Scheduler};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let collector = CorosyncCollector::builder().build()?;
///     let scheduler = Scheduler::builder(collector)
///         .output(Output::file("corosync.json"))
///         .interval(Duration::from_secs(10))
///         .build();
///
///     let handle = scheduler.start();
///
///     tokio::signal::ctrl_c().await?;
///     handle.shutdown().await;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Scheduler<S> {
    source: Arc<S>,
    outputs: Arc<Vec<Output>>,
    interval: Duration,
}

impl<S: BatchSource> Scheduler<S> {
    /// Create a builder for a scheduler around `source`.
    pub fn builder(source: S) -> SchedulerBuilder<S> {
        SchedulerBuilder::new(source)
    }

    /// The configured interval between cycles.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The configured outputs.
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Run exactly one cycle and emit the batch if it succeeded.
    pub async fn run_once(&self) -> Result<MetricBatch, CollectError> {
        let batch = self.source.collect().await?;
        emit_all(&self.outputs, &batch).await;
        Ok(batch)
    }

    /// Start background collection.
    ///
    /// This spawns a tokio task that runs one cycle per interval (the first
    /// immediately) and emits to all configured outputs. Prometheus outputs
    /// also get their HTTP server started here.
    ///
    /// Returns a handle that can be used to stop the loop.
    pub fn start(&self) -> EmissionHandle {
        use tokio::sync::watch;
        use tokio::time::MissedTickBehavior;

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let source = self.source.clone();
        let outputs = self.outputs.clone();
        let interval = self.interval;

        #[cfg(feature = "prometheus")]
        for output in outputs.iter() {
            if let Output::Prometheus(exporter) = output {
                exporter.start_server();
            }
        }

        let task = tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        match source.collect().await {
                            Ok(batch) => {
                                debug!(gauges = batch.len(), "cycle complete");
                                emit_all(&outputs, &batch).await;
                            }
                            Err(e) => warn!(error = %e, "collection cycle failed"),
                        }
                    }
                    changed = stop_rx.changed() => {
                        // A dropped handle counts as a stop request
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("scheduler stopped");
        });

        EmissionHandle { stop_tx, task }
    }
}

async fn emit_all(outputs: &[Output], batch: &MetricBatch) {
    for output in outputs {
        if let Err(e) = output.emit(batch).await {
            warn!(output = output.kind(), error = %e, "failed to emit batch");
        }
    }
}

/// Builder for configuring a Scheduler.
#[derive(Debug)]
pub struct SchedulerBuilder<S> {
    source: S,
    outputs: Vec<Output>,
    interval: Option<Duration>,
}

impl<S: BatchSource> SchedulerBuilder<S> {
    /// Create a new builder.
    pub fn new(source: S) -> Self {
        Self {
            source,
            outputs: Vec::new(),
            interval: None,
        }
    }

    /// Add an output destination.
    ///
    /// Multiple outputs can be added; batches will be emitted to all of them.
    pub fn output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    /// Set the collection interval.
    ///
    /// Defaults to 10 seconds if not specified.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Build the scheduler.
    pub fn build(self) -> Scheduler<S> {
        Scheduler {
            source: Arc::new(self.source),
            outputs: Arc::new(self.outputs),
            interval: self.interval.unwrap_or(DEFAULT_INTERVAL),
        }
    }
}

/// Handle for controlling background collection.
///
/// Drop this handle to stop the loop, or call `stop()` explicitly.
#[derive(Debug)]
pub struct EmissionHandle {
    stop_tx: tokio::sync::watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl EmissionHandle {
    /// Stop background collection.
    ///
    /// A cycle already in progress runs to completion first.
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop background collection and wait for the loop to exit.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Succeeds on every call except those listed in `failing`, stamping
    /// each batch with the call number.
    struct ScriptedSource {
        calls: AtomicUsize,
        failing: Vec<usize>,
    }

    impl ScriptedSource {
        fn new(failing: Vec<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing,
            }
        }
    }

    impl BatchSource for ScriptedSource {
        fn collect(&self) -> impl Future<Output = Result<MetricBatch, CollectError>> + Send {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.failing.contains(&call);
            async move {
                if fail {
                    return Err(CollectError::ToolNotFound {
                        binary: "corosync-quorumtool",
                    });
                }
                Ok(MetricBatch::builder()
                    .timestamp_ms(call as u64)
                    .gauge("corosync_quorum", |g| g.field("is_quorate", true))
                    .build())
            }
        }
    }

    #[test]
    fn test_builder() {
        let scheduler = Scheduler::builder(ScriptedSource::new(vec![]))
            .output(Output::file("corosync.json"))
            .output(Output::tcp("localhost:9999"))
            .interval(Duration::from_millis(500))
            .build();

        assert_eq!(scheduler.interval(), Duration::from_millis(500));
        assert_eq!(scheduler.outputs().len(), 2);
    }

    #[test]
    fn default_interval_is_ten_seconds() {
        let scheduler = Scheduler::builder(ScriptedSource::new(vec![])).build();
        assert_eq!(scheduler.interval(), DEFAULT_INTERVAL);
        assert!(scheduler.outputs().is_empty());
    }

    #[tokio::test]
    async fn run_once_emits_on_success() {
        let (output, mut rx) = Output::channel(4);
        let scheduler = Scheduler::builder(ScriptedSource::new(vec![]))
            .output(output)
            .build();

        let batch = scheduler.run_once().await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), batch);
    }

    #[tokio::test]
    async fn run_once_emits_nothing_on_failure() {
        let (output, mut rx) = Output::channel(4);
        let scheduler = Scheduler::builder(ScriptedSource::new(vec![0]))
            .output(output)
            .build();

        assert!(scheduler.run_once().await.is_err());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_cycle_is_skipped_and_loop_continues() {
        let (output, mut rx) = Output::channel(8);
        let scheduler = Scheduler::builder(ScriptedSource::new(vec![1]))
            .output(output)
            .interval(Duration::from_secs(10))
            .build();

        let handle = scheduler.start();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.timestamp_ms, 0);
        assert_eq!(second.timestamp_ms, 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn one_cycle_per_interval() {
        let (output, mut rx) = Output::channel(8);
        let scheduler = Scheduler::builder(ScriptedSource::new(vec![]))
            .output(output)
            .interval(Duration::from_secs(10))
            .build();

        let handle = scheduler.start();
        let started = tokio::time::Instant::now();

        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(20) && elapsed < Duration::from_secs(30));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_loop() {
        let (output, mut rx) = Output::channel(8);
        let source = ScriptedSource::new(vec![]);
        let scheduler = Scheduler::builder(source)
            .output(output)
            .interval(Duration::from_secs(10))
            .build();

        let handle = scheduler.start();
        rx.recv().await.unwrap();
        drop(handle);

        tokio::time::sleep(Duration::from_secs(60)).await;
        let calls = scheduler.source.calls.load(Ordering::SeqCst);
        assert_eq!(calls, 1);
    }
}
