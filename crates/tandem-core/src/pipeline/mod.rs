//! Producer/consumer log pipeline.
//!
//! Producers parse sources into [`LogEntry`] records and push them through a
//! [`BoundedQueue`]; consumers classify each record into a shared
//! [`StatisticsAggregate`]. [`LogPipeline::run`] owns the whole protocol:
//! consumers start first, producers drain a shared work list, the queue is
//! shut down only after every producer has joined, then consumers are joined.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::TandemError;
use crate::queue::BoundedQueue;
use crate::stats::{StatisticsAggregate, StatisticsSnapshot};
use crate::telemetry;
use crate::telemetry::profile;
use crate::telemetry::tags;
use crate::telemetry::worker::{DefaultWorkerTelemetry, WorkerTelemetry};
use crate::types::{LogEntry, Result};

mod consumer;
pub mod parser;
mod producer;
pub mod sample;

pub use consumer::ConsumerReport;
pub use parser::{LineParser, LogLineParser};
pub use producer::ProducerReport;
pub use sample::{SampleLog, SampleLogGenerator};

pub const DEFAULT_QUEUE_CAPACITY: usize = 32;
pub const DEFAULT_CONSUMERS: usize = 4;
pub const DEFAULT_MAX_PRODUCERS: usize = 8;

const PROFILE_TAG_STACK_PIPELINE: [&str; 2] = [tags::TAG_SYSTEM, tags::TAG_PIPELINE];

/// Sizing for a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub queue_capacity: usize,
    pub consumers: usize,
    /// Upper bound on producer threads; fewer are started when there are
    /// fewer sources.
    pub max_producers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            consumers: DEFAULT_CONSUMERS,
            max_producers: DEFAULT_MAX_PRODUCERS,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(TandemError::InvalidCapacity(self.queue_capacity));
        }
        if self.consumers == 0 {
            return Err(TandemError::InvalidConfig(
                "at least one consumer is required".to_string(),
            ));
        }
        if self.max_producers == 0 {
            return Err(TandemError::InvalidConfig(
                "at least one producer is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// One input stream for a producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineSource {
    File(PathBuf),
    Memory { name: String, data: Vec<u8> },
}

impl PipelineSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn memory(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::Memory {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Name used in records and log messages.
    pub fn name(&self) -> Cow<'_, str> {
        match self {
            Self::File(path) => path.to_string_lossy(),
            Self::Memory { name, .. } => Cow::Borrowed(name.as_str()),
        }
    }

    fn open(&self) -> std::io::Result<Box<dyn BufRead + '_>> {
        match self {
            Self::File(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
            Self::Memory { data, .. } => Ok(Box::new(Cursor::new(data.as_slice()))),
        }
    }
}

/// Outcome of [`LogPipeline::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunStats {
    pub elapsed: Duration,
    pub statistics: StatisticsSnapshot,
    pub producers: Vec<ProducerReport>,
    pub consumers: Vec<ConsumerReport>,
}

impl PipelineRunStats {
    /// Consumed records per second.
    pub fn throughput(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            self.statistics.consumed as f64 / seconds
        } else {
            0.0
        }
    }

    /// True when every produced record was consumed.
    pub fn is_balanced(&self) -> bool {
        self.statistics.produced == self.statistics.consumed
    }
}

/// Shared borrows handed to every worker thread of a run.
#[derive(Clone, Copy)]
pub(crate) struct WorkerContext<'a> {
    pub(crate) queue: &'a BoundedQueue<LogEntry>,
    pub(crate) stats: &'a StatisticsAggregate,
    pub(crate) parser: &'a dyn LineParser,
    pub(crate) telemetry: &'a dyn WorkerTelemetry,
}

pub struct LogPipeline {
    config: PipelineConfig,
    parser: Arc<dyn LineParser>,
    telemetry: Arc<dyn WorkerTelemetry>,
}

impl LogPipeline {
    /// Creates a pipeline with the default parser and telemetry.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_telemetry(config, Arc::new(DefaultWorkerTelemetry))
    }

    pub fn with_telemetry(config: PipelineConfig, telemetry: Arc<dyn WorkerTelemetry>) -> Self {
        Self {
            config,
            parser: Arc::new(LogLineParser),
            telemetry,
        }
    }

    /// Replaces the line parser.
    pub fn with_parser(mut self, parser: Arc<dyn LineParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs every source through the pipeline and waits for completion.
    ///
    /// Unreadable sources are logged and counted, never fatal. Errors come
    /// from invalid configuration, thread creation or a worker panic.
    pub fn run(&self, sources: Vec<PipelineSource>) -> Result<PipelineRunStats> {
        self.config.validate()?;

        let started = Instant::now();
        let queue = BoundedQueue::new(self.config.queue_capacity)?;
        let stats = StatisticsAggregate::new();
        let ctx = WorkerContext {
            queue: &queue,
            stats: &stats,
            parser: self.parser.as_ref(),
            telemetry: self.telemetry.as_ref(),
        };

        let producer_count = sources.len().min(self.config.max_producers);
        let (work_tx, work_rx) = crossbeam_channel::unbounded();
        for source in sources {
            // The receiver outlives this loop, so sending cannot fail.
            let _ = work_tx.send(source);
        }
        drop(work_tx);

        tracing::info!(
            producers = producer_count,
            consumers = self.config.consumers,
            capacity = self.config.queue_capacity,
            "pipeline starting"
        );

        let (producers, consumers) = thread::scope(|scope| -> Result<(Vec<_>, Vec<_>)> {
            let consumers = spawn_workers(scope, self.config.consumers, "consumer", |id| {
                move || consumer::run_consumer(id, ctx)
            });
            let consumers = match consumers {
                Ok(handles) => handles,
                Err((error, handles)) => {
                    queue.shutdown();
                    if let Err(join_error) = join_workers(handles) {
                        tracing::error!(%join_error, "consumer failed while aborting pipeline start");
                    }
                    return Err(error);
                }
            };

            let producers = spawn_workers(scope, producer_count, "producer", |id| {
                let work = work_rx.clone();
                move || producer::run_producer(id, work, ctx)
            });
            let (producers, spawn_error) = match producers {
                Ok(handles) => (join_workers(handles), None),
                Err((error, handles)) => {
                    // Workers already running still get to finish their sources.
                    (join_workers(handles), Some(error))
                }
            };

            queue.shutdown();
            let consumers = join_workers(consumers);

            if let Some(error) = spawn_error {
                return Err(error);
            }
            Ok((producers?, consumers?))
        })?;

        let elapsed = started.elapsed();
        let statistics = stats.snapshot();

        telemetry::increment_counter(tags::METRIC_PIPELINE_RUN_COUNT, 1);
        telemetry::record_histogram(
            tags::METRIC_PIPELINE_RUN_LATENCY_US,
            profile::duration_us(elapsed),
        );
        profile::event(
            tags::PROFILE_PIPELINE,
            &PROFILE_TAG_STACK_PIPELINE,
            "run",
            "ok",
            profile::duration_us(elapsed),
            "pipeline run completed",
        );
        tracing::info!(
            produced = statistics.produced,
            consumed = statistics.consumed,
            skipped = statistics.skipped,
            sources_failed = statistics.sources_failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "pipeline finished"
        );

        Ok(PipelineRunStats {
            elapsed,
            statistics,
            producers,
            consumers,
        })
    }
}

type SpawnFailure<'scope, T> = (TandemError, Vec<ScopedJoinHandle<'scope, T>>);

fn spawn_workers<'scope, 'env, T, B, F>(
    scope: &'scope Scope<'scope, 'env>,
    count: usize,
    role: &str,
    mut body: B,
) -> std::result::Result<Vec<ScopedJoinHandle<'scope, T>>, SpawnFailure<'scope, T>>
where
    T: Send + 'scope,
    B: FnMut(usize) -> F,
    F: FnOnce() -> T + Send + 'scope,
{
    let mut handles = Vec::with_capacity(count);
    for id in 0..count {
        let spawned = if spawn_refused(id) {
            Err(io::Error::other("worker spawning disabled"))
        } else {
            thread::Builder::new()
                .name(format!("tandem-{role}-{id}"))
                .spawn_scoped(scope, body(id))
        };
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(error) => {
                let error = TandemError::from(error)
                    .with_context(format!("failed to spawn {role} thread {id}"));
                return Err((error, handles));
            }
        }
    }
    Ok(handles)
}

#[cfg(not(test))]
#[inline]
fn spawn_refused(_worker_id: usize) -> bool {
    false
}

#[cfg(test)]
fn spawn_refused(worker_id: usize) -> bool {
    tests::REFUSE_SPAWN_FROM.with(|limit| limit.get().is_some_and(|first| worker_id >= first))
}

/// Joins every handle, even after a panic, and reports the first panic.
fn join_workers<T>(handles: Vec<ScopedJoinHandle<'_, T>>) -> Result<Vec<T>> {
    let mut results = Vec::with_capacity(handles.len());
    let mut first_panic = None;

    for handle in handles {
        match handle.join() {
            Ok(value) => results.push(value),
            Err(payload) => {
                let error = TandemError::from_panic(payload);
                tracing::error!(%error, "pipeline worker panicked");
                first_panic.get_or_insert(error);
            }
        }
    }

    match first_panic {
        Some(error) => Err(error),
        None => Ok(results),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::Arc;
    use std::time::Duration;

    use super::{LogPipeline, PipelineConfig, PipelineSource};
    use crate::TandemError;
    use crate::telemetry::worker::{WorkerRole, WorkerTelemetry};
    use crate::types::LogLevel;

    thread_local! {
        pub(super) static REFUSE_SPAWN_FROM: Cell<Option<usize>> = const { Cell::new(None) };
    }

    struct RefuseSpawnFrom;

    impl RefuseSpawnFrom {
        fn new(first: usize) -> Self {
            REFUSE_SPAWN_FROM.with(|limit| limit.set(Some(first)));
            Self
        }
    }

    impl Drop for RefuseSpawnFrom {
        fn drop(&mut self) {
            REFUSE_SPAWN_FROM.with(|limit| limit.set(None));
        }
    }

    struct PanicOnConsumerStart;

    impl WorkerTelemetry for PanicOnConsumerStart {
        fn on_worker_started(&self, role: WorkerRole, _worker_id: usize) {
            if role == WorkerRole::Consumer {
                panic!("consumer start hook exploded");
            }
        }

        fn on_queue_depth(&self, _worker_id: usize, _depth: usize) {}

        fn on_record(&self, _role: WorkerRole, _worker_id: usize, _level: LogLevel) {}

        fn on_worker_finished(
            &self,
            _role: WorkerRole,
            _worker_id: usize,
            _processed: u64,
            _elapsed: Duration,
        ) {
        }
    }

    #[test]
    fn consumer_spawn_failure_reports_spawn_error() {
        let _refuse = RefuseSpawnFrom::new(1);
        let config = PipelineConfig {
            queue_capacity: 4,
            consumers: 3,
            max_producers: 1,
        };
        let error = LogPipeline::new(config)
            .run(vec![PipelineSource::memory("x", "[t] [INFO] x\n")])
            .expect_err("second consumer cannot start");

        match error {
            TandemError::Context { context, source } => {
                assert_eq!(context, "failed to spawn consumer thread 1");
                assert!(matches!(*source, TandemError::Io(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn spawn_error_wins_over_panicked_consumer() {
        let _refuse = RefuseSpawnFrom::new(1);
        let config = PipelineConfig {
            queue_capacity: 4,
            consumers: 2,
            max_producers: 1,
        };
        let pipeline = LogPipeline::with_telemetry(config, Arc::new(PanicOnConsumerStart));
        let error = pipeline
            .run(vec![PipelineSource::memory("x", "[t] [INFO] x\n")])
            .expect_err("second consumer cannot start");

        assert!(
            matches!(error, TandemError::Context { .. }),
            "unexpected error: {error:?}"
        );
    }
}
