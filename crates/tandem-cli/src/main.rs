use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tandem_core::pipeline::{DEFAULT_CONSUMERS, DEFAULT_MAX_PRODUCERS, DEFAULT_QUEUE_CAPACITY};
use tandem_core::sort::benchmark::{self, ScalabilityRow};
use tandem_core::sort::{DEFAULT_ARRAY_SIZE, DEFAULT_MAX_THREADS, MAX_THREADS};
use tandem_core::{
    LogLevel, LogPipeline, PipelineConfig, PipelineReport, PipelineSource, ReportBuildOptions,
    SampleLogGenerator, SortConfig, SortReport,
};

/// Thread counts measured by the scalability table.
const SCALABILITY_THREADS: [usize; 5] = [1, 2, 4, 8, 16];
/// Arrays at least this long also get a scalability table.
const SCALABILITY_MIN_SIZE: usize = 100_000;
const SAMPLE_SOURCES: usize = 2;

#[derive(Parser)]
#[command(
    name = "tandem",
    version,
    about = "Concurrent log pipeline and adaptive parallel sort",
    long_about = "Run log files through a bounded producer/consumer pipeline, or benchmark the adaptive fork-join sort against a sequential baseline."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OutputArgs {
    /// Print the report as pretty JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Log lifecycle events at info level (RUST_LOG takes precedence).
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Attach a telemetry snapshot to JSON reports.
    #[arg(long, default_value_t = false)]
    telemetry: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and classify log files with producer and consumer threads.
    Pipeline {
        /// Log files to process. Two synthetic samples are used when empty.
        files: Vec<PathBuf>,

        /// Bounded queue capacity.
        #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
        capacity: usize,

        /// Number of consumer threads.
        #[arg(long, default_value_t = DEFAULT_CONSUMERS)]
        consumers: usize,

        /// Upper bound on producer threads.
        #[arg(long, default_value_t = DEFAULT_MAX_PRODUCERS)]
        max_producers: usize,

        /// Seed for the synthetic samples.
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Compare the adaptive parallel sort with sequential quicksort.
    Sort {
        /// Array length; invalid values fall back to 100000.
        #[arg(allow_hyphen_values = true)]
        size: Option<String>,

        /// Thread budget (1-64); invalid values fall back to 4.
        #[arg(allow_hyphen_values = true)]
        threads: Option<String>,

        /// Seed for the random input array.
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        output: OutputArgs,
    },
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Pipeline {
            files,
            capacity,
            consumers,
            max_producers,
            seed,
            output,
        } => {
            init_tracing(output.verbose);
            let config = PipelineConfig {
                queue_capacity: capacity,
                consumers,
                max_producers,
            };
            pipeline_command(files, config, seed, &output)?
        }
        Commands::Sort {
            size,
            threads,
            seed,
            output,
        } => {
            init_tracing(output.verbose);
            let size = parse_or_default(size.as_deref(), DEFAULT_ARRAY_SIZE, usize::MAX);
            let threads = parse_or_default(threads.as_deref(), DEFAULT_MAX_THREADS, MAX_THREADS);
            sort_command(size, threads, seed, &output)?
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .try_init();
}

/// Positive integers up to `max`; anything else yields `default`.
fn parse_or_default(raw: Option<&str>, default: usize, max: usize) -> usize {
    match raw.map(|value| value.trim().parse::<i64>()) {
        Some(Ok(value)) if value > 0 && (value as u64) <= max as u64 => value as usize,
        Some(_) => {
            tracing::warn!(value = raw.unwrap_or_default(), default, "invalid argument, using default");
            default
        }
        None => default,
    }
}

fn pipeline_command(
    files: Vec<PathBuf>,
    config: PipelineConfig,
    seed: Option<u64>,
    output: &OutputArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let sources = if files.is_empty() {
        let mut generator = SampleLogGenerator::new(seed);
        (0..SAMPLE_SOURCES)
            .map(|index| {
                let entries = generator.entry_count();
                let sample = generator.generate(entries);
                PipelineSource::memory(format!("sample-{}.log", index + 1), sample.text)
            })
            .collect()
    } else {
        files.into_iter().map(PipelineSource::File).collect::<Vec<_>>()
    };

    let source_count = sources.len();
    let pipeline = LogPipeline::new(config);
    let stats = pipeline.run(sources)?;
    let report = PipelineReport::from_run(
        &stats,
        ReportBuildOptions {
            include_telemetry_snapshot: output.telemetry,
        },
    );

    if output.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_pipeline_report(&report, source_count, &config);
    }
    Ok(())
}

fn sort_command(
    size: usize,
    threads: usize,
    seed: Option<u64>,
    output: &OutputArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let original = benchmark::random_array(size, seed);
    let comparison = benchmark::compare(&original, SortConfig::with_max_threads(threads));
    let scalability = if size >= SCALABILITY_MIN_SIZE {
        benchmark::scalability(&original, &SCALABILITY_THREADS)
    } else {
        Vec::new()
    };

    let report = SortReport::from_comparison(
        &comparison,
        &scalability,
        ReportBuildOptions {
            include_telemetry_snapshot: output.telemetry,
        },
    );

    if output.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_sort_report(&report);
    }
    Ok(())
}

fn print_pipeline_report(report: &PipelineReport, source_count: usize, config: &PipelineConfig) {
    println!("pipeline complete");
    println!(
        "  sources: {source_count} ({} read, {} failed)",
        report.sources_processed, report.sources_failed
    );
    println!(
        "  queue capacity: {} | consumers: {} | max producers: {}",
        config.queue_capacity, config.consumers, config.max_producers
    );
    println!("  records produced: {}", report.produced);
    println!("  records consumed: {}", report.consumed);
    println!("  lines skipped: {}", report.skipped_lines);
    println!("  by level:");
    let total = report.consumed.max(1) as f64;
    for level in LogLevel::ALL {
        let count = report.level(level);
        println!(
            "    {:<8} {count:>8} ({:5.1}%)",
            level.as_str(),
            count as f64 / total * 100.0
        );
    }
    println!("  elapsed: {}", format_duration(report.elapsed));
    println!("  throughput: {}", format_rate(report.throughput));
    if !report.balanced {
        println!("  warning: produced and consumed counts differ");
    }
    println!("  workers:");
    for worker in &report.workers {
        println!(
            "    {:<8} #{:<2} records {:>8} | {:>8} | {}",
            worker.role,
            worker.worker_id,
            worker.records,
            format_duration(worker.elapsed),
            format_rate(worker.records_per_sec),
        );
    }
}

fn print_sort_report(report: &SortReport) {
    println!("sort benchmark ({} elements, {} threads)", report.len, report.threads);
    println!("  sequential: {}", format_duration(report.sequential));
    println!("  parallel:   {}", format_duration(report.parallel));
    println!(
        "  sequential sorted: {}",
        pass_fail(report.sequential_sorted)
    );
    println!("  parallel sorted:   {}", pass_fail(report.parallel_sorted));
    println!("  results match:     {}", pass_fail(report.results_match));
    println!("  speedup:    {:.2}x", report.speedup);
    println!("  efficiency: {:.1}%", report.efficiency);
    println!(
        "  scheduler: depth limit {} | spawned {} | declined {} | spawn failures {} | peak threads {}",
        report.scheduler.max_depth,
        report.scheduler.spawned,
        report.scheduler.declined,
        report.scheduler.spawn_failures,
        report.scheduler.peak_active,
    );

    if !report.scalability.is_empty() {
        print_scalability(&report.scalability);
    }
}

fn print_scalability(rows: &[ScalabilityRow]) {
    println!("  scalability:");
    println!("    threads | time       | speedup  | efficiency | sorted");
    for row in rows {
        println!(
            "    {:>7} | {:>10} | {:>7.2}x | {:>9.1}% | {}",
            row.threads,
            format_duration(row.elapsed),
            row.speedup,
            row.efficiency,
            pass_fail(row.sorted),
        );
    }
}

fn pass_fail(ok: bool) -> &'static str {
    if ok { "PASS" } else { "FAIL" }
}

fn format_rate(records_per_second: f64) -> String {
    if !records_per_second.is_finite() || records_per_second <= 0.0 {
        return "0 rec/s".to_string();
    }

    const UNITS: [&str; 3] = ["rec/s", "K rec/s", "M rec/s"];
    let mut value = records_per_second;
    let mut unit = 0usize;
    while value >= 1000.0 && unit + 1 < UNITS.len() {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{value:.0} {}", UNITS[unit])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    if minutes > 0 {
        format!("{minutes:02}:{seconds:02}")
    } else if total_seconds > 0 {
        format!("{seconds}.{:03}s", duration.subsec_millis())
    } else {
        format!("{:.3}ms", duration.as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_positional_values_fall_back() {
        assert_eq!(parse_or_default(None, 4, MAX_THREADS), 4);
        assert_eq!(parse_or_default(Some("8"), 4, MAX_THREADS), 8);
        assert_eq!(parse_or_default(Some("0"), 4, MAX_THREADS), 4);
        assert_eq!(parse_or_default(Some("-3"), 4, MAX_THREADS), 4);
        assert_eq!(parse_or_default(Some("65"), 4, MAX_THREADS), 4);
        assert_eq!(parse_or_default(Some("lots"), 4, MAX_THREADS), 4);
        assert_eq!(parse_or_default(Some("64"), 4, MAX_THREADS), 64);
    }

    #[test]
    fn rate_and_duration_formatting() {
        assert_eq!(format_rate(0.0), "0 rec/s");
        assert_eq!(format_rate(512.0), "512 rec/s");
        assert_eq!(format_rate(2500.0), "2.50 K rec/s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.500s");
        assert_eq!(format_duration(Duration::from_secs(125)), "02:05");
    }
}
