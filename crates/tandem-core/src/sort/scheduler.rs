use std::io;
use std::panic;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::sort::SortConfig;
use crate::sort::budget::{BudgetReservation, ThreadBudget};
use crate::sort::sequential::{insertion_sort, partition, quick_sort_sequential};
use crate::telemetry;
use crate::telemetry::profile;
use crate::telemetry::tags;

const PROFILE_TAG_STACK_SORT: [&str; 2] = [tags::TAG_SYSTEM, tags::TAG_SORT];

/// Depth at which forking stops: `ceil(log2(max_threads)) + 1`.
pub fn max_depth_for(max_threads: usize) -> usize {
    max_threads.max(1).next_power_of_two().trailing_zeros() as usize + 1
}

/// What the scheduler did during one [`SortScheduler::sort`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRunStats {
    pub len: usize,
    pub max_threads: usize,
    pub max_depth: usize,
    /// Subranges handed to a new thread.
    pub spawned: u64,
    /// Fork attempts refused by the budget.
    pub declined: u64,
    /// Threads the OS refused to create.
    pub spawn_failures: u64,
    /// Ranges small enough for insertion sort.
    pub inline_small: u64,
    /// Ranges sorted sequentially because the depth limit was reached.
    pub depth_fallbacks: u64,
    /// Most budget slots held at once during the run.
    pub peak_active: usize,
}

#[derive(Default)]
struct RunCounters {
    spawned: AtomicU64,
    declined: AtomicU64,
    spawn_failures: AtomicU64,
    inline_small: AtomicU64,
    depth_fallbacks: AtomicU64,
    peak_active: AtomicUsize,
}

impl RunCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Adaptive fork-join quicksort.
///
/// Each range is partitioned, then each side is offered to a new thread if
/// it is larger than the insertion threshold, the recursion is shallower
/// than the depth limit and the [`ThreadBudget`] has a free slot. Otherwise
/// the side is sorted by the current thread. Sibling ranges are disjoint
/// slices, so no locking is needed on the data.
#[derive(Debug, Clone)]
pub struct SortScheduler {
    config: SortConfig,
    budget: Arc<ThreadBudget>,
}

impl SortScheduler {
    pub fn new(config: SortConfig) -> Self {
        let config = config.normalized();
        Self {
            budget: Arc::new(ThreadBudget::new(config.max_threads)),
            config,
        }
    }

    /// Uses a budget shared with other schedulers. The budget's cap takes
    /// precedence over `config.max_threads`.
    pub fn with_budget(config: SortConfig, budget: Arc<ThreadBudget>) -> Self {
        let mut config = config.normalized();
        config.max_threads = budget.max_threads();
        Self { config, budget }
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    pub fn budget(&self) -> &Arc<ThreadBudget> {
        &self.budget
    }

    pub fn max_depth(&self) -> usize {
        max_depth_for(self.config.max_threads)
    }

    /// Sorts `data` in place. Slices of length 0 or 1 are left untouched.
    ///
    /// Panics raised by a comparison on a worker thread are resumed on the
    /// caller.
    pub fn sort<T: Ord + Send>(&self, data: &mut [T]) -> SortRunStats {
        let mut stats = SortRunStats {
            len: data.len(),
            max_threads: self.config.max_threads,
            max_depth: self.max_depth(),
            ..SortRunStats::default()
        };
        if data.len() <= 1 {
            return stats;
        }

        let started = Instant::now();
        let counters = RunCounters::default();
        {
            let caller = self.budget.enter();
            counters
                .peak_active
                .fetch_max(caller.active_at_acquire(), Ordering::Relaxed);

            let task = SortTask {
                budget: &self.budget,
                counters: &counters,
                threshold: self.config.insertion_threshold,
                max_depth: stats.max_depth,
            };
            task.run(data, 0);
            drop(caller);
        }

        stats.spawned = counters.spawned.load(Ordering::Relaxed);
        stats.declined = counters.declined.load(Ordering::Relaxed);
        stats.spawn_failures = counters.spawn_failures.load(Ordering::Relaxed);
        stats.inline_small = counters.inline_small.load(Ordering::Relaxed);
        stats.depth_fallbacks = counters.depth_fallbacks.load(Ordering::Relaxed);
        stats.peak_active = counters.peak_active.load(Ordering::Relaxed);

        let elapsed_us = profile::elapsed_us(started);
        telemetry::increment_counter(tags::METRIC_SORT_RUN_COUNT, 1);
        telemetry::record_histogram(tags::METRIC_SORT_RUN_LATENCY_US, elapsed_us);
        profile::event(
            tags::PROFILE_SORT,
            &PROFILE_TAG_STACK_SORT,
            "sort",
            "ok",
            elapsed_us,
            "parallel sort completed",
        );
        tracing::debug!(
            len = stats.len,
            max_threads = stats.max_threads,
            spawned = stats.spawned,
            declined = stats.declined,
            spawn_failures = stats.spawn_failures,
            peak_active = stats.peak_active,
            elapsed_us,
            "parallel sort completed"
        );

        stats
    }
}

enum Fork<'scope, 'data, T> {
    Spawned(ScopedJoinHandle<'scope, ()>),
    Inline(&'data mut [T]),
    // The slice went down with the failed spawn; it is re-split afterwards.
    Failed,
}

struct SortTask<'a> {
    budget: &'a ThreadBudget,
    counters: &'a RunCounters,
    threshold: usize,
    max_depth: usize,
}

impl SortTask<'_> {
    fn run<T: Ord + Send>(&self, data: &mut [T], depth: usize) {
        if data.len() <= self.threshold {
            insertion_sort(data);
            RunCounters::bump(&self.counters.inline_small);
            return;
        }
        if depth >= self.max_depth {
            quick_sort_sequential(data, self.threshold);
            RunCounters::bump(&self.counters.depth_fallbacks);
            telemetry::increment_counter(tags::METRIC_SORT_DEPTH_FALLBACK_COUNT, 1);
            return;
        }

        let pivot = partition(data);
        let (left, rest) = data.split_at_mut(pivot);
        let right = &mut rest[1..];
        let next = depth + 1;

        let (left_lost, right_lost) = thread::scope(|scope| {
            let forks = [self.fork(scope, left, next), self.fork(scope, right, next)];
            let lost = [
                matches!(forks[0], Fork::Failed),
                matches!(forks[1], Fork::Failed),
            ];

            let mut handles = Vec::with_capacity(2);
            for fork in forks {
                match fork {
                    Fork::Inline(part) => self.run(part, next),
                    Fork::Spawned(handle) => handles.push(handle),
                    Fork::Failed => {}
                }
            }
            for handle in handles {
                if let Err(payload) = handle.join() {
                    panic::resume_unwind(payload);
                }
            }

            (lost[0], lost[1])
        });

        if left_lost || right_lost {
            let (left, rest) = data.split_at_mut(pivot);
            if left_lost {
                self.run(left, next);
            }
            if right_lost {
                self.run(&mut rest[1..], next);
            }
        }
    }

    fn fork<'scope, 'env, 'data, T>(
        &'env self,
        scope: &'scope Scope<'scope, 'env>,
        part: &'data mut [T],
        depth: usize,
    ) -> Fork<'scope, 'data, T>
    where
        T: Ord + Send,
        'data: 'scope,
    {
        if part.len() <= self.threshold {
            return Fork::Inline(part);
        }
        let Some(reservation) = self.budget.try_reserve() else {
            RunCounters::bump(&self.counters.declined);
            telemetry::increment_counter(tags::METRIC_SORT_SPAWN_DECLINED_COUNT, 1);
            return Fork::Inline(part);
        };
        self.counters
            .peak_active
            .fetch_max(reservation.active_at_acquire(), Ordering::Relaxed);

        let len = part.len();
        let spawned = spawn_sort_thread(scope, depth, move || {
            let _reservation: BudgetReservation<'_> = reservation;
            self.run(part, depth);
        });

        match spawned {
            Ok(handle) => {
                RunCounters::bump(&self.counters.spawned);
                telemetry::increment_counter(tags::METRIC_SORT_SPAWN_COUNT, 1);
                tracing::debug!(depth, len, "forked sort range");
                Fork::Spawned(handle)
            }
            Err(error) => {
                // The closure, and with it the reservation, is already dropped.
                RunCounters::bump(&self.counters.spawn_failures);
                telemetry::increment_counter(tags::METRIC_SORT_SPAWN_FAILED_COUNT, 1);
                tracing::debug!(%error, depth, "sort thread spawn failed; sorting inline");
                Fork::Failed
            }
        }
    }
}

fn spawn_sort_thread<'scope, 'env, F>(
    scope: &'scope Scope<'scope, 'env>,
    depth: usize,
    body: F,
) -> io::Result<ScopedJoinHandle<'scope, ()>>
where
    F: FnOnce() + Send + 'scope,
{
    if spawning_disabled() {
        return Err(io::Error::other("sort thread spawning disabled"));
    }
    thread::Builder::new()
        .name(format!("tandem-sort-d{depth}"))
        .spawn_scoped(scope, body)
}

#[cfg(not(test))]
#[inline]
fn spawning_disabled() -> bool {
    false
}

#[cfg(test)]
fn spawning_disabled() -> bool {
    tests::SPAWNING_DISABLED.with(std::cell::Cell::get)
}
