use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineRunStats;
use crate::sort::{ScalabilityRow, SortComparison, SortRunStats};
use crate::telemetry::{self, TelemetrySnapshot};
use crate::types::LogLevel;

/// Options controlling how reports are built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportBuildOptions {
    /// Attaches a point-in-time telemetry snapshot to the report.
    pub include_telemetry_snapshot: bool,
}

impl ReportBuildOptions {
    fn telemetry(self) -> Option<TelemetrySnapshot> {
        self.include_telemetry_snapshot.then(telemetry::snapshot)
    }
}

/// Per-thread line of a pipeline report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub role: String,
    pub worker_id: usize,
    pub records: u64,
    pub elapsed: Duration,
    pub records_per_sec: f64,
}

impl WorkerReport {
    fn new(role: &str, worker_id: usize, records: u64, elapsed: Duration) -> Self {
        Self {
            role: role.to_string(),
            worker_id,
            records,
            elapsed,
            records_per_sec: records as f64 / elapsed.as_secs_f64().max(1e-6),
        }
    }
}

/// Summary of a pipeline run, ready for text or JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub elapsed: Duration,
    pub produced: u64,
    pub consumed: u64,
    pub skipped_lines: u64,
    pub sources_processed: u64,
    pub sources_failed: u64,
    pub levels: BTreeMap<LogLevel, u64>,
    pub throughput: f64,
    pub balanced: bool,
    pub workers: Vec<WorkerReport>,
    pub telemetry: Option<TelemetrySnapshot>,
}

impl PipelineReport {
    pub fn from_run(stats: &PipelineRunStats, options: ReportBuildOptions) -> Self {
        let summary = &stats.statistics;

        let producers = stats
            .producers
            .iter()
            .map(|p| WorkerReport::new("producer", p.worker_id, p.records, p.elapsed));
        let consumers = stats
            .consumers
            .iter()
            .map(|c| WorkerReport::new("consumer", c.worker_id, c.records, c.elapsed));

        Self {
            elapsed: stats.elapsed,
            produced: summary.produced,
            consumed: summary.consumed,
            skipped_lines: summary.skipped,
            sources_processed: summary.sources_processed,
            sources_failed: summary.sources_failed,
            levels: summary.level_counts().collect(),
            throughput: stats.throughput(),
            balanced: stats.is_balanced(),
            workers: producers.chain(consumers).collect(),
            telemetry: options.telemetry(),
        }
    }

    pub fn level(&self, level: LogLevel) -> u64 {
        self.levels.get(&level).copied().unwrap_or(0)
    }
}

/// Sequential versus parallel sort outcome plus optional scaling table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortReport {
    pub len: usize,
    pub threads: usize,
    pub sequential: Duration,
    pub parallel: Duration,
    pub speedup: f64,
    pub efficiency: f64,
    pub sequential_sorted: bool,
    pub parallel_sorted: bool,
    pub results_match: bool,
    pub passed: bool,
    pub scheduler: SortRunStats,
    pub scalability: Vec<ScalabilityRow>,
    pub telemetry: Option<TelemetrySnapshot>,
}

impl SortReport {
    pub fn from_comparison(
        comparison: &SortComparison,
        scalability: &[ScalabilityRow],
        options: ReportBuildOptions,
    ) -> Self {
        Self {
            len: comparison.len,
            threads: comparison.threads,
            sequential: comparison.sequential,
            parallel: comparison.parallel,
            speedup: comparison.speedup(),
            efficiency: comparison.efficiency(),
            sequential_sorted: comparison.sequential_sorted,
            parallel_sorted: comparison.parallel_sorted,
            results_match: comparison.results_match,
            passed: comparison.passed(),
            scheduler: comparison.run,
            scalability: scalability.to_vec(),
            telemetry: options.telemetry(),
        }
    }
}
