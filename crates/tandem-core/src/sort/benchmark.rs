//! Timing harness comparing the scheduler with the sequential sort.

use std::time::{Duration, Instant};

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::sort::sequential::{is_sorted, quick_sort_sequential};
use crate::sort::{SortConfig, SortRunStats, SortScheduler};

/// Exclusive upper bound of generated values.
pub const RANDOM_VALUE_LIMIT: i32 = 1_000_000;

/// `n` values drawn uniformly from `0..1_000_000`.
pub fn random_array(n: usize, seed: Option<u64>) -> Vec<i32> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    (0..n).map(|_| rng.gen_range(0..RANDOM_VALUE_LIMIT)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SortComparison {
    pub len: usize,
    pub threads: usize,
    pub sequential: Duration,
    pub parallel: Duration,
    pub sequential_sorted: bool,
    pub parallel_sorted: bool,
    /// Parallel output equals the sequential output element for element.
    pub results_match: bool,
    pub run: SortRunStats,
}

impl SortComparison {
    pub fn speedup(&self) -> f64 {
        speedup(self.sequential, self.parallel)
    }

    /// Speedup per thread, as a percentage.
    pub fn efficiency(&self) -> f64 {
        efficiency(self.speedup(), self.threads)
    }

    pub fn passed(&self) -> bool {
        self.sequential_sorted && self.parallel_sorted && self.results_match
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalabilityRow {
    pub threads: usize,
    pub elapsed: Duration,
    pub speedup: f64,
    pub efficiency: f64,
    pub sorted: bool,
}

/// Sorts copies of `original` sequentially and with the scheduler, then
/// checks both results.
pub fn compare(original: &[i32], config: SortConfig) -> SortComparison {
    let config = config.normalized();

    let mut sequential = original.to_vec();
    let started = Instant::now();
    quick_sort_sequential(&mut sequential, config.insertion_threshold);
    let sequential_elapsed = started.elapsed();

    let mut parallel = original.to_vec();
    let scheduler = SortScheduler::new(config);
    let started = Instant::now();
    let run = scheduler.sort(&mut parallel);
    let parallel_elapsed = started.elapsed();

    SortComparison {
        len: original.len(),
        threads: config.max_threads,
        sequential: sequential_elapsed,
        parallel: parallel_elapsed,
        sequential_sorted: is_sorted(&sequential),
        parallel_sorted: is_sorted(&parallel),
        results_match: sequential == parallel,
        run,
    }
}

/// Times the scheduler once per thread count against one sequential
/// baseline.
pub fn scalability(original: &[i32], thread_counts: &[usize]) -> Vec<ScalabilityRow> {
    let mut baseline = original.to_vec();
    let started = Instant::now();
    quick_sort_sequential(&mut baseline, SortConfig::default().insertion_threshold);
    let sequential = started.elapsed();

    thread_counts
        .iter()
        .map(|&threads| {
            let mut data = original.to_vec();
            let scheduler = SortScheduler::new(SortConfig::with_max_threads(threads));
            let started = Instant::now();
            scheduler.sort(&mut data);
            let elapsed = started.elapsed();

            let speedup = speedup(sequential, elapsed);
            ScalabilityRow {
                threads: scheduler.config().max_threads,
                elapsed,
                speedup,
                efficiency: efficiency(speedup, threads),
                sorted: data == baseline,
            }
        })
        .collect()
}

fn speedup(sequential: Duration, parallel: Duration) -> f64 {
    let parallel = parallel.as_secs_f64();
    if parallel > 0.0 {
        sequential.as_secs_f64() / parallel
    } else {
        0.0
    }
}

fn efficiency(speedup: f64, threads: usize) -> f64 {
    speedup / threads.max(1) as f64 * 100.0
}
