use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::types::LogLevel;

/// Counters shared by every pipeline worker.
///
/// Each counter is its own atomic cell, so increments never contend on a
/// lock. Counters are not updated together; a snapshot taken while workers
/// run may show `consumed` ahead of a level counter.
#[derive(Debug, Default)]
pub struct StatisticsAggregate {
    produced: AtomicU64,
    consumed: AtomicU64,
    skipped: AtomicU64,
    sources_processed: AtomicU64,
    sources_failed: AtomicU64,
    levels: [AtomicU64; LogLevel::COUNT],
}

impl StatisticsAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_produced(&self) {
        self.produced.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one consumed record under its classification.
    pub fn record_consumed(&self, level: LogLevel) {
        self.levels[level.index()].fetch_add(1, Ordering::Relaxed);
        self.consumed.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a line that did not parse into a record.
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_source_processed(&self) {
        self.sources_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_source_failed(&self) {
        self.sources_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn produced(&self) -> u64 {
        self.produced.load(Ordering::Relaxed)
    }

    pub fn consumed(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }

    pub fn level(&self, level: LogLevel) -> u64 {
        self.levels[level.index()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            produced: self.produced(),
            consumed: self.consumed(),
            skipped: self.skipped.load(Ordering::Relaxed),
            sources_processed: self.sources_processed.load(Ordering::Relaxed),
            sources_failed: self.sources_failed.load(Ordering::Relaxed),
            levels: LogLevel::ALL.map(|level| self.level(level)),
        }
    }
}

/// Plain copy of a [`StatisticsAggregate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub produced: u64,
    pub consumed: u64,
    pub skipped: u64,
    pub sources_processed: u64,
    pub sources_failed: u64,
    /// Indexed in [`LogLevel::ALL`] order.
    pub levels: [u64; LogLevel::COUNT],
}

impl StatisticsSnapshot {
    pub fn level(&self, level: LogLevel) -> u64 {
        self.levels[level.index()]
    }

    /// Sum of every per-level counter.
    pub fn classified_total(&self) -> u64 {
        self.levels.iter().sum()
    }

    /// Levels paired with their counts, in report order.
    pub fn level_counts(&self) -> impl Iterator<Item = (LogLevel, u64)> + '_ {
        LogLevel::ALL.into_iter().map(|level| (level, self.level(level)))
    }
}
