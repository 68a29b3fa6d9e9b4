use std::sync::Arc;
use std::thread;

use tandem_core::sort::benchmark::{self, RANDOM_VALUE_LIMIT};
use tandem_core::sort::sequential::{is_sorted, quick_sort_sequential};
use tandem_core::sort::{SortConfig, max_depth_for};
use tandem_core::{SortScheduler, ThreadBudget, parallel_sort};

const THREAD_COUNTS: [usize; 4] = [1, 2, 4, 8];

fn reference_sorted(input: &[i64]) -> Vec<i64> {
    let mut expected = input.to_vec();
    expected.sort();
    expected
}

fn edge_case_inputs() -> Vec<(&'static str, Vec<i64>)> {
    let random = benchmark::random_array(5_000, Some(9))
        .into_iter()
        .map(i64::from)
        .collect();
    vec![
        ("empty", Vec::new()),
        ("single", vec![42]),
        ("pair", vec![2, 1]),
        ("duplicates", (0..3_000).map(|i| i % 5).collect()),
        ("all_equal", vec![7; 2_048]),
        ("sorted", (0..4_000).collect()),
        ("reverse", (0..4_000).rev().collect()),
        ("organ_pipe", (0..2_000).chain((0..2_000).rev()).collect()),
        ("random", random),
    ]
}

#[test]
fn matches_reference_sort_for_every_thread_count() {
    for (name, input) in edge_case_inputs() {
        let expected = reference_sorted(&input);
        for threads in THREAD_COUNTS {
            let mut data = input.clone();
            parallel_sort(&mut data, threads);
            assert_eq!(data, expected, "{name} with {threads} threads");
        }
    }
}

#[test]
fn empty_and_singleton_are_no_ops() {
    let scheduler = SortScheduler::new(SortConfig::with_max_threads(8));

    let mut empty: Vec<u8> = Vec::new();
    let stats = scheduler.sort(&mut empty);
    assert_eq!(stats.len, 0);
    assert_eq!(stats.spawned, 0);
    assert_eq!(scheduler.budget().reservations(), 0);

    let mut single = vec![3u8];
    let stats = scheduler.sort(&mut single);
    assert_eq!(single, vec![3]);
    assert_eq!(stats.inline_small + stats.depth_fallbacks, 0);
}

#[test]
fn reverse_sorted_hundred_thousand_with_eight_threads() {
    let input: Vec<i32> = (0..100_000).rev().collect();

    let mut sequential = input.clone();
    quick_sort_sequential(&mut sequential, 32);

    let mut parallel = input;
    let stats = parallel_sort(&mut parallel, 8);

    assert!(is_sorted(&parallel));
    assert_eq!(parallel, sequential);
    assert_eq!(parallel.first(), Some(&0));
    assert_eq!(parallel.last(), Some(&99_999));
    assert_eq!(stats.max_depth, 4);
    assert!(stats.peak_active <= 8);
}

#[test]
fn budget_returns_to_zero_after_each_run() {
    let scheduler = SortScheduler::new(SortConfig::with_max_threads(4));
    for seed in 0..5 {
        let mut data = benchmark::random_array(50_000, Some(seed));
        let stats = scheduler.sort(&mut data);
        assert!(is_sorted(&data));
        assert!(stats.peak_active <= 4);
    }

    let budget = scheduler.budget();
    assert_eq!(budget.active(), 0);
    assert_eq!(budget.reservations(), budget.releases());
    assert!(budget.peak() <= 4);
}

#[test]
fn single_thread_budget_never_spawns() {
    let mut data = benchmark::random_array(20_000, Some(1));
    let stats = parallel_sort(&mut data, 1);

    assert!(is_sorted(&data));
    assert_eq!(stats.spawned, 0);
    assert_eq!(stats.peak_active, 1);
    assert!(stats.declined > 0);
}

#[test]
fn large_random_input_spawns_within_budget() {
    let mut data = benchmark::random_array(200_000, Some(5));
    let stats = parallel_sort(&mut data, 4);

    assert!(is_sorted(&data));
    assert!(stats.spawned >= 1);
    assert!(stats.peak_active <= 4);
    assert_eq!(stats.spawn_failures, 0);
}

#[test]
fn shared_budget_balances_across_concurrent_sorts() {
    let budget = Arc::new(ThreadBudget::new(6));

    thread::scope(|scope| {
        for seed in 0..3u64 {
            let budget = Arc::clone(&budget);
            scope.spawn(move || {
                let scheduler = SortScheduler::with_budget(SortConfig::default(), budget);
                let mut data = benchmark::random_array(60_000, Some(seed));
                scheduler.sort(&mut data);
                assert!(is_sorted(&data));
            });
        }
    });

    assert_eq!(budget.active(), 0);
    assert_eq!(budget.reservations(), budget.releases());
    // Three callers entered, plus whatever forks were granted.
    assert!(budget.reservations() >= 3);
}

#[test]
fn small_insertion_threshold_still_sorts() {
    let config = SortConfig {
        max_threads: 4,
        insertion_threshold: 1,
    };
    let mut data: Vec<i64> = (0..3_000).map(|i| (i * 37) % 101).collect();
    let expected = reference_sorted(&data);
    SortScheduler::new(config).sort(&mut data);
    assert_eq!(data, expected);
}

#[test]
fn depth_limit_follows_thread_count() {
    assert_eq!(max_depth_for(0), 1);
    assert_eq!(max_depth_for(1), 1);
    assert_eq!(max_depth_for(2), 2);
    assert_eq!(max_depth_for(4), 3);
    assert_eq!(max_depth_for(5), 4);
    assert_eq!(max_depth_for(8), 4);
    assert_eq!(max_depth_for(64), 7);
}

#[test]
fn sorts_non_copy_values() {
    let mut words: Vec<String> = (0..1_000).map(|i| format!("w{:04}", (i * 7) % 1_000)).collect();
    let mut expected = words.clone();
    expected.sort();
    parallel_sort(&mut words, 4);
    assert_eq!(words, expected);
}

#[test]
fn comparison_reports_matching_results() {
    let original = benchmark::random_array(30_000, Some(77));
    assert!(original.iter().all(|v| (0..RANDOM_VALUE_LIMIT).contains(v)));

    let comparison = benchmark::compare(&original, SortConfig::with_max_threads(4));
    assert!(comparison.passed());
    assert_eq!(comparison.len, 30_000);
    assert_eq!(comparison.threads, 4);
    assert!(comparison.speedup() >= 0.0);

    let rows = benchmark::scalability(&original, &[1, 2, 4]);
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.sorted));
    assert_eq!(
        rows.iter().map(|row| row.threads).collect::<Vec<_>>(),
        vec![1, 2, 4]
    );
}

#[test]
fn random_array_is_reproducible_with_seed() {
    assert_eq!(
        benchmark::random_array(100, Some(3)),
        benchmark::random_array(100, Some(3))
    );
    assert!(benchmark::random_array(0, None).is_empty());
}
