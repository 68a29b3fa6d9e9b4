use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tandem_core::{
    LineParser, LogEntry, LogLevel, LogPipeline, PipelineConfig, PipelineSource,
    SampleLogGenerator, TandemError, WorkerRole, WorkerTelemetry,
};
use tempfile::NamedTempFile;

const LEVELS: [&str; 4] = ["DEBUG", "INFO", "WARN", "ERROR"];

fn error_log(lines: usize, offset: usize) -> String {
    (0..lines)
        .map(|index| {
            let level = LEVELS[(index + offset) % LEVELS.len()];
            format!("[2024-01-15 10:00:{:02}] [{level}] event {index}\n", index % 60)
        })
        .collect()
}

fn config(queue_capacity: usize, consumers: usize, max_producers: usize) -> PipelineConfig {
    PipelineConfig {
        queue_capacity,
        consumers,
        max_producers,
    }
}

#[test]
fn two_producers_three_consumers_process_every_record() -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = LogPipeline::new(config(4, 3, 2));
    let stats = pipeline.run(vec![
        PipelineSource::memory("first.log", error_log(50, 0)),
        PipelineSource::memory("second.log", error_log(50, 1)),
    ])?;

    let summary = stats.statistics;
    assert_eq!(summary.produced, 100);
    assert_eq!(summary.consumed, 100);
    assert_eq!(summary.classified_total(), 100);
    assert_eq!(summary.sources_processed, 2);
    assert_eq!(summary.sources_failed, 0);
    assert!(stats.is_balanced());

    assert_eq!(stats.producers.len(), 2);
    assert_eq!(stats.consumers.len(), 3);
    assert_eq!(stats.producers.iter().map(|p| p.records).sum::<u64>(), 100);
    assert_eq!(stats.consumers.iter().map(|c| c.records).sum::<u64>(), 100);
    Ok(())
}

#[test]
fn classifies_error_and_access_lines() -> Result<(), Box<dyn std::error::Error>> {
    let text = concat!(
        "# header comment\n",
        "[t] [DEBUG] a\n",
        "[t] [INFO] b\n",
        "[t] [WARNING] c\n",
        "[t] [ERROR] d\n",
        "[t] [TRACE] e\n",
        "10.0.0.1 - - [t] \"GET / HTTP/1.1\" 200 10\r\n",
        "10.0.0.2 - - [t] \"PUT /x HTTP/1.1\" 204 0\n",
        "\n",
        "garbage line\n",
    );

    let stats = LogPipeline::new(config(2, 2, 1)).run(vec![PipelineSource::memory("mixed", text)])?;
    let summary = stats.statistics;

    assert_eq!(summary.produced, 7);
    assert_eq!(summary.consumed, 7);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.level(LogLevel::Debug), 1);
    assert_eq!(summary.level(LogLevel::Info), 1);
    assert_eq!(summary.level(LogLevel::Warn), 1);
    assert_eq!(summary.level(LogLevel::Error), 1);
    assert_eq!(summary.level(LogLevel::Unknown), 1);
    assert_eq!(summary.level(LogLevel::Http), 2);
    Ok(())
}

#[test]
fn missing_file_is_counted_not_fatal() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    file.write_all(error_log(20, 0).as_bytes())?;
    file.flush()?;

    let missing = file.path().with_extension("does-not-exist");
    let stats = LogPipeline::new(PipelineConfig::default()).run(vec![
        PipelineSource::file(file.path()),
        PipelineSource::file(missing),
    ])?;

    assert_eq!(stats.statistics.produced, 20);
    assert_eq!(stats.statistics.consumed, 20);
    assert_eq!(stats.statistics.sources_processed, 1);
    assert_eq!(stats.statistics.sources_failed, 1);
    assert_eq!(
        stats.producers.iter().map(|p| p.sources_failed).sum::<u64>(),
        1
    );
    Ok(())
}

#[test]
fn all_sources_missing_reports_zero_statistics() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let stats = LogPipeline::new(PipelineConfig::default())
        .run(vec![PipelineSource::file(dir.path().join("absent.log"))])?;

    assert_eq!(stats.statistics.produced, 0);
    assert_eq!(stats.statistics.consumed, 0);
    assert_eq!(stats.statistics.sources_failed, 1);
    assert!(stats.is_balanced());
    Ok(())
}

#[test]
fn no_sources_still_starts_and_stops_consumers() -> Result<(), Box<dyn std::error::Error>> {
    let stats = LogPipeline::new(config(4, 2, 4)).run(Vec::new())?;
    assert!(stats.producers.is_empty());
    assert_eq!(stats.consumers.len(), 2);
    assert_eq!(stats.statistics.consumed, 0);
    Ok(())
}

#[test]
fn sources_beyond_producer_limit_are_all_read() -> Result<(), Box<dyn std::error::Error>> {
    let sources = (0..10)
        .map(|index| PipelineSource::memory(format!("s{index}"), error_log(30, index)))
        .collect::<Vec<_>>();

    let stats = LogPipeline::new(config(8, 2, 3)).run(sources)?;
    assert_eq!(stats.producers.len(), 3);
    assert_eq!(stats.statistics.sources_processed, 10);
    assert_eq!(stats.statistics.produced, 300);
    assert_eq!(stats.statistics.consumed, 300);
    Ok(())
}

#[test]
fn non_utf8_bytes_do_not_stop_a_producer() -> Result<(), Box<dyn std::error::Error>> {
    let mut data = b"[t] [INFO] caf\xe9 ok\n".to_vec();
    data.extend_from_slice(b"\xff\xfe\n");
    data.extend_from_slice(b"[t] [WARN] after binary");

    let stats = LogPipeline::new(PipelineConfig::default())
        .run(vec![PipelineSource::memory("latin1", data)])?;
    assert_eq!(stats.statistics.consumed, 2);
    assert_eq!(stats.statistics.skipped, 1);
    Ok(())
}

#[test]
fn sample_sources_round_trip_through_pipeline() -> Result<(), Box<dyn std::error::Error>> {
    let mut generator = SampleLogGenerator::new(Some(42));
    let first = generator.generate(600);
    let second = generator.generate(700);
    let expected = (first.expected_records + second.expected_records) as u64;
    let comments = (first.comment_lines + second.comment_lines) as u64;

    let stats = LogPipeline::new(PipelineConfig::default()).run(vec![
        PipelineSource::memory("sample-1.log", first.text),
        PipelineSource::memory("sample-2.log", second.text),
    ])?;

    assert_eq!(stats.statistics.produced, expected);
    assert_eq!(stats.statistics.consumed, expected);
    assert_eq!(stats.statistics.skipped, comments);
    assert_eq!(stats.statistics.classified_total(), expected);
    assert!(stats.throughput() > 0.0);
    Ok(())
}

#[test]
fn invalid_configuration_is_rejected() {
    let cases = [config(0, 1, 1), config(4, 0, 1), config(4, 1, 0)];
    for case in cases {
        let error = LogPipeline::new(case)
            .run(vec![PipelineSource::memory("x", "[t] [INFO] x")])
            .expect_err("invalid config must fail");
        assert!(
            matches!(
                error,
                TandemError::InvalidCapacity(0) | TandemError::InvalidConfig(_)
            ),
            "unexpected error: {error:?}"
        );
    }
}

struct UppercaseOnlyParser;

impl LineParser for UppercaseOnlyParser {
    fn parse_line(&self, line: &str, source: &Arc<str>, line_number: u32) -> Option<LogEntry> {
        let word = line.trim();
        if word.is_empty() || word.chars().any(|c| c.is_ascii_lowercase()) {
            return None;
        }
        Some(LogEntry::new("", word, word, Arc::clone(source), line_number))
    }
}

#[test]
fn custom_parser_replaces_default() -> Result<(), Box<dyn std::error::Error>> {
    let pipeline =
        LogPipeline::new(config(2, 2, 1)).with_parser(Arc::new(UppercaseOnlyParser));
    let stats = pipeline.run(vec![PipelineSource::memory(
        "words",
        "ERROR\nskip me\nGET\nINFO\n",
    )])?;

    assert_eq!(stats.statistics.consumed, 3);
    assert_eq!(stats.statistics.skipped, 1);
    assert_eq!(stats.statistics.level(LogLevel::Http), 1);
    Ok(())
}

struct PanickingParser;

impl LineParser for PanickingParser {
    fn parse_line(&self, line: &str, _source: &Arc<str>, _line_number: u32) -> Option<LogEntry> {
        if line.contains("boom") {
            panic!("parser exploded");
        }
        None
    }
}

#[test]
fn producer_panic_surfaces_as_worker_panicked() {
    let pipeline = LogPipeline::new(config(2, 2, 1)).with_parser(Arc::new(PanickingParser));
    let error = pipeline
        .run(vec![PipelineSource::memory("bad", "fine\nboom\n")])
        .expect_err("panic must propagate");

    match error {
        TandemError::WorkerPanicked(message) => assert!(message.contains("parser exploded")),
        other => panic!("unexpected error: {other:?}"),
    }
}

struct PanickingConsumerTelemetry;

impl WorkerTelemetry for PanickingConsumerTelemetry {
    fn on_worker_started(&self, _role: WorkerRole, _worker_id: usize) {}

    fn on_queue_depth(&self, _worker_id: usize, _depth: usize) {}

    fn on_record(&self, role: WorkerRole, _worker_id: usize, _level: LogLevel) {
        if role == WorkerRole::Consumer {
            panic!("consumer hook exploded");
        }
    }

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
fn consumer_panic_releases_blocked_producers() {
    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        let pipeline =
            LogPipeline::with_telemetry(config(2, 1, 1), Arc::new(PanickingConsumerTelemetry));
        let result = pipeline.run(vec![PipelineSource::memory("busy", error_log(50, 0))]);
        let _ = done_tx.send(result);
    });

    let result = done_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("pipeline must return after its only consumer panicked");
    match result {
        Err(TandemError::WorkerPanicked(message)) => {
            assert!(message.contains("consumer hook exploded"))
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[derive(Default)]
struct RecordingTelemetry {
    started: Mutex<Vec<(WorkerRole, usize)>>,
    finished: Mutex<Vec<(WorkerRole, u64)>>,
    produced: AtomicU64,
    consumed: AtomicU64,
}

impl WorkerTelemetry for RecordingTelemetry {
    fn on_worker_started(&self, role: WorkerRole, worker_id: usize) {
        self.started
            .lock()
            .expect("started lock poisoned")
            .push((role, worker_id));
    }

    fn on_queue_depth(&self, _worker_id: usize, _depth: usize) {}

    fn on_record(&self, role: WorkerRole, _worker_id: usize, _level: LogLevel) {
        match role {
            WorkerRole::Producer => self.produced.fetch_add(1, Ordering::Relaxed),
            WorkerRole::Consumer => self.consumed.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn on_worker_finished(
        &self,
        role: WorkerRole,
        _worker_id: usize,
        processed: u64,
        _elapsed: Duration,
    ) {
        self.finished
            .lock()
            .expect("finished lock poisoned")
            .push((role, processed));
    }
}

#[test]
fn custom_telemetry_sees_every_worker_and_record() -> Result<(), Box<dyn std::error::Error>> {
    let telemetry = Arc::new(RecordingTelemetry::default());
    let pipeline = LogPipeline::with_telemetry(config(4, 3, 2), telemetry.clone());
    pipeline.run(vec![
        PipelineSource::memory("a", error_log(40, 0)),
        PipelineSource::memory("b", error_log(25, 2)),
    ])?;

    let started = telemetry.started.lock().expect("started lock poisoned");
    let producers = started
        .iter()
        .filter(|(role, _)| *role == WorkerRole::Producer)
        .count();
    assert_eq!(producers, 2);
    assert_eq!(started.len(), 5);

    let finished = telemetry.finished.lock().expect("finished lock poisoned");
    assert_eq!(finished.len(), 5);
    let consumed_by_reports: u64 = finished
        .iter()
        .filter(|(role, _)| *role == WorkerRole::Consumer)
        .map(|(_, processed)| processed)
        .sum();
    assert_eq!(consumed_by_reports, 65);

    assert_eq!(telemetry.produced.load(Ordering::Relaxed), 65);
    assert_eq!(telemetry.consumed.load(Ordering::Relaxed), 65);
    Ok(())
}
