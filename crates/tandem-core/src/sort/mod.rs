//! Adaptive fork-join sorting bounded by a shared thread budget.

use serde::{Deserialize, Serialize};

pub mod benchmark;
mod budget;
mod scheduler;
pub mod sequential;

pub use benchmark::{ScalabilityRow, SortComparison};
pub use budget::{BudgetReservation, ThreadBudget};
pub use scheduler::{SortRunStats, SortScheduler, max_depth_for};

/// Ranges this short are insertion sorted.
pub const INSERTION_THRESHOLD: usize = 32;
pub const DEFAULT_MAX_THREADS: usize = 4;
/// Largest thread count the CLI accepts.
pub const MAX_THREADS: usize = 64;
pub const DEFAULT_ARRAY_SIZE: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    /// Threads allowed at once, counting the caller.
    pub max_threads: usize,
    pub insertion_threshold: usize,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            max_threads: DEFAULT_MAX_THREADS,
            insertion_threshold: INSERTION_THRESHOLD,
        }
    }
}

impl SortConfig {
    pub fn with_max_threads(max_threads: usize) -> Self {
        Self {
            max_threads,
            ..Self::default()
        }
    }

    /// Clamps both fields to at least one.
    pub fn normalized(self) -> Self {
        Self {
            max_threads: self.max_threads.max(1),
            insertion_threshold: self.insertion_threshold.max(1),
        }
    }
}

/// Sorts `buffer` in place using up to `max_threads` threads.
pub fn parallel_sort<T: Ord + Send>(buffer: &mut [T], max_threads: usize) -> SortRunStats {
    SortScheduler::new(SortConfig::with_max_threads(max_threads)).sort(buffer)
}
