pub mod error;
pub mod pipeline;
pub mod queue;
pub mod report;
pub mod sort;
pub mod stats;
pub mod telemetry;
pub mod types;

pub use error::TandemError;
pub use pipeline::{
    ConsumerReport, LineParser, LogLineParser, LogPipeline, PipelineConfig, PipelineRunStats,
    PipelineSource, ProducerReport, SampleLog, SampleLogGenerator,
};
pub use queue::{BoundedQueue, ShutdownRejected};
pub use report::{PipelineReport, ReportBuildOptions, SortReport};
pub use sort::{
    SortConfig, SortRunStats, SortScheduler, ThreadBudget, parallel_sort,
};
pub use stats::{StatisticsAggregate, StatisticsSnapshot};
pub use telemetry::worker::{DefaultWorkerTelemetry, WorkerRole, WorkerTelemetry};
pub use types::{LogEntry, LogLevel, Result};
