/// Profiling target for bounded queue operations.
pub const PROFILE_QUEUE: &str = "tandem.profile.queue";
/// Profiling target for pipeline orchestration.
pub const PROFILE_PIPELINE: &str = "tandem.profile.pipeline";
/// Profiling target for producer and consumer workers.
pub const PROFILE_WORKER: &str = "tandem.profile.worker";
/// Profiling target for the fork-join sort scheduler.
pub const PROFILE_SORT: &str = "tandem.profile.sort";

/// Global system-level tag shared by all profiling events.
pub const TAG_SYSTEM: &str = "system";
/// Logical tag for queue events.
pub const TAG_QUEUE: &str = "queue";
/// Logical tag for pipeline orchestration events.
pub const TAG_PIPELINE: &str = "pipeline";
/// Logical tag for worker events.
pub const TAG_WORKER: &str = "worker";
/// Logical tag for sort scheduler events.
pub const TAG_SORT: &str = "sort";

pub const METRIC_QUEUE_PUT_COUNT: &str = "tandem.queue.put.count";
pub const METRIC_QUEUE_PUT_BLOCKED_COUNT: &str = "tandem.queue.put.blocked.count";
pub const METRIC_QUEUE_PUT_REJECTED_COUNT: &str = "tandem.queue.put.rejected.count";
pub const METRIC_QUEUE_GET_COUNT: &str = "tandem.queue.get.count";
pub const METRIC_QUEUE_GET_BLOCKED_COUNT: &str = "tandem.queue.get.blocked.count";
pub const METRIC_QUEUE_GET_CLOSED_COUNT: &str = "tandem.queue.get.closed.count";
pub const METRIC_QUEUE_SHUTDOWN_COUNT: &str = "tandem.queue.shutdown.count";

pub const METRIC_PIPELINE_RECORD_PRODUCED_COUNT: &str = "tandem.pipeline.record.produced.count";
pub const METRIC_PIPELINE_RECORD_CONSUMED_COUNT: &str = "tandem.pipeline.record.consumed.count";
pub const METRIC_PIPELINE_LINE_SKIPPED_COUNT: &str = "tandem.pipeline.line.skipped.count";
pub const METRIC_PIPELINE_SOURCE_FAILED_COUNT: &str = "tandem.pipeline.source.failed.count";
pub const METRIC_PIPELINE_RUN_COUNT: &str = "tandem.pipeline.run.count";

pub const METRIC_WORKER_STARTED_COUNT: &str = "tandem.worker.started.count";
pub const METRIC_WORKER_FINISHED_COUNT: &str = "tandem.worker.finished.count";

pub const METRIC_SORT_RUN_COUNT: &str = "tandem.sort.run.count";
pub const METRIC_SORT_SPAWN_COUNT: &str = "tandem.sort.spawn.count";
pub const METRIC_SORT_SPAWN_DECLINED_COUNT: &str = "tandem.sort.spawn.declined.count";
pub const METRIC_SORT_SPAWN_FAILED_COUNT: &str = "tandem.sort.spawn.failed.count";
pub const METRIC_SORT_DEPTH_FALLBACK_COUNT: &str = "tandem.sort.depth_fallback.count";

pub const METRIC_QUEUE_WAIT_LATENCY_US: &str = "tandem.queue.wait.latency_us";
pub const METRIC_PIPELINE_RUN_LATENCY_US: &str = "tandem.pipeline.run.latency_us";
pub const METRIC_WORKER_RUNTIME_US: &str = "tandem.worker.runtime_us";
pub const METRIC_SORT_RUN_LATENCY_US: &str = "tandem.sort.run.latency_us";

pub const METRIC_QUEUE_DEPTH: &str = "tandem.queue.depth";
pub const METRIC_WORKER_ACTIVE_COUNT: &str = "tandem.worker.active.count";
pub const METRIC_SORT_ACTIVE_THREADS: &str = "tandem.sort.active_threads";
pub const METRIC_SORT_PEAK_THREADS: &str = "tandem.sort.peak_threads";
