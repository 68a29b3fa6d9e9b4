use std::io::BufRead;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};

use crate::pipeline::{PipelineSource, WorkerContext};
use crate::telemetry;
use crate::telemetry::tags;
use crate::telemetry::worker::WorkerRole;

/// Work done by one producer thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerReport {
    pub worker_id: usize,
    pub sources_read: u64,
    pub sources_failed: u64,
    pub records: u64,
    pub skipped_lines: u64,
    pub elapsed: Duration,
}

enum SourceOutcome {
    Finished,
    // The queue stopped accepting records; nothing more can be sent.
    QueueClosed,
}

/// Pulls sources off `work` until it is empty and feeds parsed records
/// into the queue. Never signals shutdown itself.
pub(crate) fn run_producer(
    worker_id: usize,
    work: Receiver<PipelineSource>,
    ctx: WorkerContext<'_>,
) -> ProducerReport {
    let started = Instant::now();
    ctx.telemetry.on_worker_started(WorkerRole::Producer, worker_id);

    let mut report = ProducerReport {
        worker_id,
        ..ProducerReport::default()
    };

    while let Ok(source) = work.recv() {
        match read_source(worker_id, &source, &ctx, &mut report) {
            Ok(SourceOutcome::Finished) => {
                report.sources_read += 1;
                ctx.stats.record_source_processed();
            }
            Ok(SourceOutcome::QueueClosed) => {
                tracing::warn!(
                    worker_id,
                    source = %source.name(),
                    "queue closed before producer finished; remaining records dropped"
                );
                break;
            }
            Err(error) => {
                tracing::warn!(
                    worker_id,
                    source = %source.name(),
                    %error,
                    "failed to read log source"
                );
                report.sources_failed += 1;
                ctx.stats.record_source_failed();
                telemetry::increment_counter(tags::METRIC_PIPELINE_SOURCE_FAILED_COUNT, 1);
            }
        }
    }

    report.elapsed = started.elapsed();
    ctx.telemetry.on_worker_finished(
        WorkerRole::Producer,
        worker_id,
        report.records,
        report.elapsed,
    );
    report
}

fn read_source(
    worker_id: usize,
    source: &PipelineSource,
    ctx: &WorkerContext<'_>,
    report: &mut ProducerReport,
) -> std::io::Result<SourceOutcome> {
    let mut reader = source.open()?;
    let name: Arc<str> = Arc::from(source.name());
    let mut raw = Vec::with_capacity(256);
    let mut line_number = 0u32;

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            return Ok(SourceOutcome::Finished);
        }
        line_number = line_number.saturating_add(1);

        let line = String::from_utf8_lossy(trim_line_ending(&raw));
        let Some(entry) = ctx.parser.parse_line(&line, &name, line_number) else {
            report.skipped_lines += 1;
            ctx.stats.record_skipped();
            telemetry::increment_counter(tags::METRIC_PIPELINE_LINE_SKIPPED_COUNT, 1);
            continue;
        };

        let level = entry.classification();
        if ctx.queue.put(entry).is_err() {
            return Ok(SourceOutcome::QueueClosed);
        }

        report.records += 1;
        ctx.stats.record_produced();
        ctx.telemetry.on_record(WorkerRole::Producer, worker_id, level);
    }
}

fn trim_line_ending(mut line: &[u8]) -> &[u8] {
    if let Some(rest) = line.strip_suffix(b"\n") {
        line = rest;
    }
    if let Some(rest) = line.strip_suffix(b"\r") {
        line = rest;
    }
    line
}

#[cfg(test)]
mod tests {
    use super::trim_line_ending;

    #[test]
    fn trims_unix_and_windows_endings() {
        assert_eq!(trim_line_ending(b"line\n"), b"line");
        assert_eq!(trim_line_ending(b"line\r\n"), b"line");
        assert_eq!(trim_line_ending(b"line"), b"line");
        assert_eq!(trim_line_ending(b"\n"), b"");
    }
}
