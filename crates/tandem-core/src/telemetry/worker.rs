use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry;
use crate::telemetry::profile;
use crate::telemetry::tags;
use crate::types::LogLevel;

const PROFILE_TAG_STACK_WORKER: [&str; 2] = [tags::TAG_SYSTEM, tags::TAG_WORKER];

/// Which side of the pipeline a worker thread runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkerRole {
    Producer,
    Consumer,
}

impl WorkerRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Producer => "producer",
            Self::Consumer => "consumer",
        }
    }
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hooks invoked by pipeline workers.
///
/// Implementations must be cheap; `on_record` runs once per log entry on
/// both sides of the queue.
pub trait WorkerTelemetry: Send + Sync {
    fn on_worker_started(&self, role: WorkerRole, worker_id: usize);
    fn on_queue_depth(&self, worker_id: usize, depth: usize);
    fn on_record(&self, role: WorkerRole, worker_id: usize, level: LogLevel);
    fn on_worker_finished(
        &self,
        role: WorkerRole,
        worker_id: usize,
        processed: u64,
        elapsed: Duration,
    );
}

/// Reports worker activity to the global metric registry and, with
/// `profiling`, to `tandem.profile.worker`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWorkerTelemetry;

impl WorkerTelemetry for DefaultWorkerTelemetry {
    fn on_worker_started(&self, role: WorkerRole, worker_id: usize) {
        telemetry::increment_counter(tags::METRIC_WORKER_STARTED_COUNT, 1);
        telemetry::add_gauge(tags::METRIC_WORKER_ACTIVE_COUNT, 1);

        if profile::is_tag_stack_enabled(&PROFILE_TAG_STACK_WORKER) {
            tracing::debug!(
                target: "tandem.profile.worker",
                op = "start",
                role = role.as_str(),
                worker_id,
                "worker started"
            );
        }
    }

    fn on_queue_depth(&self, _worker_id: usize, depth: usize) {
        telemetry::set_gauge(tags::METRIC_QUEUE_DEPTH, depth as u64);
    }

    fn on_record(&self, role: WorkerRole, _worker_id: usize, _level: LogLevel) {
        let metric = match role {
            WorkerRole::Producer => tags::METRIC_PIPELINE_RECORD_PRODUCED_COUNT,
            WorkerRole::Consumer => tags::METRIC_PIPELINE_RECORD_CONSUMED_COUNT,
        };
        telemetry::increment_counter(metric, 1);
    }

    fn on_worker_finished(
        &self,
        role: WorkerRole,
        worker_id: usize,
        processed: u64,
        elapsed: Duration,
    ) {
        let elapsed_us = profile::duration_us(elapsed);

        telemetry::increment_counter(tags::METRIC_WORKER_FINISHED_COUNT, 1);
        telemetry::record_histogram(tags::METRIC_WORKER_RUNTIME_US, elapsed_us);
        telemetry::sub_gauge_saturating(tags::METRIC_WORKER_ACTIVE_COUNT, 1);

        profile::event(
            tags::PROFILE_WORKER,
            &PROFILE_TAG_STACK_WORKER,
            "finish",
            "ok",
            elapsed_us,
            "worker finished",
        );

        tracing::debug!(
            role = role.as_str(),
            worker_id,
            processed,
            elapsed_us,
            "worker finished"
        );
    }
}
