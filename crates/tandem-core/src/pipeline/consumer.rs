use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::pipeline::WorkerContext;
use crate::queue::BoundedQueue;
use crate::telemetry::worker::WorkerRole;
use crate::types::LogEntry;

// Queue depth is sampled once per this many records.
const DEPTH_SAMPLE_INTERVAL: u64 = 64;

/// Work done by one consumer thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerReport {
    pub worker_id: usize,
    pub records: u64,
    pub elapsed: Duration,
}

// Shuts the queue down if the consumer unwinds; blocked producers are
// rejected rather than left waiting on a full queue.
struct ShutdownOnPanic<'a>(&'a BoundedQueue<LogEntry>);

impl Drop for ShutdownOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.shutdown();
        }
    }
}

/// Drains the queue into the shared statistics until `get` reports the
/// queue closed and empty.
pub(crate) fn run_consumer(worker_id: usize, ctx: WorkerContext<'_>) -> ConsumerReport {
    let _guard = ShutdownOnPanic(ctx.queue);
    let started = Instant::now();
    ctx.telemetry.on_worker_started(WorkerRole::Consumer, worker_id);

    let mut records = 0u64;
    while let Some(entry) = ctx.queue.get() {
        let level = entry.classification();
        ctx.stats.record_consumed(level);
        ctx.telemetry.on_record(WorkerRole::Consumer, worker_id, level);

        records += 1;
        if records % DEPTH_SAMPLE_INTERVAL == 0 {
            ctx.telemetry.on_queue_depth(worker_id, ctx.queue.len());
        }
    }

    let elapsed = started.elapsed();
    ctx.telemetry
        .on_worker_finished(WorkerRole::Consumer, worker_id, records, elapsed);

    ConsumerReport {
        worker_id,
        records,
        elapsed,
    }
}
