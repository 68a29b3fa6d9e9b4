use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::telemetry;
use crate::telemetry::tags;

/// Shared cap on concurrently live sort threads.
///
/// The calling thread registers itself with [`enter`](Self::enter); every
/// extra thread must first win a [`try_reserve`](Self::try_reserve). Both
/// return a [`BudgetReservation`] that gives its slot back when dropped, so
/// a slot is released exactly once whether the work ran on a new thread,
/// inline, or never started because the spawn failed.
#[derive(Debug)]
pub struct ThreadBudget {
    max_threads: usize,
    active: AtomicUsize,
    peak: AtomicUsize,
    reservations: AtomicU64,
    releases: AtomicU64,
    declined: AtomicU64,
}

impl ThreadBudget {
    /// Creates a budget for `max_threads` threads (at least one).
    pub fn new(max_threads: usize) -> Self {
        Self {
            max_threads: max_threads.max(1),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            reservations: AtomicU64::new(0),
            releases: AtomicU64::new(0),
            declined: AtomicU64::new(0),
        }
    }

    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    /// Slots currently held.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Highest `active` value observed.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Successful `enter` and `try_reserve` calls.
    pub fn reservations(&self) -> u64 {
        self.reservations.load(Ordering::Acquire)
    }

    /// Dropped reservations.
    pub fn releases(&self) -> u64 {
        self.releases.load(Ordering::Acquire)
    }

    /// `try_reserve` calls refused because the budget was full.
    pub fn declined(&self) -> u64 {
        self.declined.load(Ordering::Acquire)
    }

    /// Registers the calling task without checking the cap.
    pub fn enter(&self) -> BudgetReservation<'_> {
        let previous = self.active.fetch_add(1, Ordering::AcqRel);
        self.commit(previous + 1)
    }

    /// Claims a slot for a new thread if the pre-increment count is below
    /// the cap. A refused claim is rolled back before returning.
    pub fn try_reserve(&self) -> Option<BudgetReservation<'_>> {
        let previous = self.active.fetch_add(1, Ordering::AcqRel);
        if previous < self.max_threads {
            return Some(self.commit(previous + 1));
        }

        self.active.fetch_sub(1, Ordering::AcqRel);
        self.declined.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn commit(&self, active: usize) -> BudgetReservation<'_> {
        self.reservations.fetch_add(1, Ordering::Relaxed);
        let peak = self.peak.fetch_max(active, Ordering::AcqRel).max(active);

        telemetry::set_gauge(tags::METRIC_SORT_ACTIVE_THREADS, active as u64);
        telemetry::max_gauge(tags::METRIC_SORT_PEAK_THREADS, peak as u64);

        BudgetReservation {
            budget: self,
            active_at_acquire: active,
        }
    }

    fn release(&self) {
        let previous = self.active.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "thread budget released more slots than reserved");
        self.releases.fetch_add(1, Ordering::Relaxed);
        telemetry::set_gauge(
            tags::METRIC_SORT_ACTIVE_THREADS,
            previous.saturating_sub(1) as u64,
        );
    }
}

/// One held slot of a [`ThreadBudget`].
#[must_use = "dropping a reservation releases its slot immediately"]
#[derive(Debug)]
pub struct BudgetReservation<'a> {
    budget: &'a ThreadBudget,
    active_at_acquire: usize,
}

impl BudgetReservation<'_> {
    /// Slots held right after this one was taken, itself included.
    pub fn active_at_acquire(&self) -> usize {
        self.active_at_acquire
    }
}

impl Drop for BudgetReservation<'_> {
    fn drop(&mut self) {
        self.budget.release();
    }
}

#[cfg(test)]
mod tests {
    use super::ThreadBudget;

    #[test]
    fn reserve_respects_cap_and_rolls_back() {
        let budget = ThreadBudget::new(2);
        let caller = budget.enter();
        let first = budget.try_reserve();
        assert!(first.is_some());
        assert!(budget.try_reserve().is_none());
        assert_eq!(budget.active(), 2);
        assert_eq!(budget.declined(), 1);

        drop(first);
        drop(caller);
        assert_eq!(budget.active(), 0);
        assert_eq!(budget.reservations(), budget.releases());
        assert_eq!(budget.peak(), 2);
    }

    #[test]
    fn zero_cap_is_clamped_to_one() {
        let budget = ThreadBudget::new(0);
        assert_eq!(budget.max_threads(), 1);
        let only = budget.try_reserve();
        assert!(only.is_some());
        assert!(budget.try_reserve().is_none());
    }
}
