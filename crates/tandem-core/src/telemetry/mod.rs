//! Process-wide metrics for the queue, pipeline and sort scheduler.
//!
//! Every recording function is a no-op unless the `telemetry` feature is
//! enabled, so hot paths can call them unconditionally.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod profile;
pub mod tags;
pub mod worker;

pub use worker::{DefaultWorkerTelemetry, WorkerRole, WorkerTelemetry};

/// Histogram summary captured in telemetry snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub total: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
}

/// Point-in-time copy of every recorded metric, keyed by metric name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub counters: BTreeMap<String, u64>,
    pub gauges: BTreeMap<String, u64>,
    pub histograms: BTreeMap<String, HistogramSnapshot>,
}

impl TelemetrySnapshot {
    pub fn counter(&self, name: &str) -> Option<u64> {
        self.counters.get(name).copied()
    }

    pub fn gauge(&self, name: &str) -> Option<u64> {
        self.gauges.get(name).copied()
    }

    pub fn histogram(&self, name: &str) -> Option<HistogramSnapshot> {
        self.histograms.get(name).copied()
    }

    /// Returns true when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.gauges.is_empty() && self.histograms.is_empty()
    }
}

/// Increments a named counter by `value`.
#[inline]
pub fn increment_counter(name: &'static str, value: u64) {
    #[cfg(feature = "telemetry")]
    registry::update(|store| {
        let entry = store.counters.entry(name).or_insert(0);
        *entry = entry.saturating_add(value);
    });

    let _ = (name, value);
}

/// Records one histogram sample.
#[inline]
pub fn record_histogram(name: &'static str, value: u64) {
    #[cfg(feature = "telemetry")]
    registry::update(|store| store.histograms.entry(name).or_default().record(value));

    let _ = (name, value);
}

/// Sets a gauge to an absolute value.
#[inline]
pub fn set_gauge(name: &'static str, value: u64) {
    #[cfg(feature = "telemetry")]
    registry::update(|store| {
        store.gauges.insert(name, value);
    });

    let _ = (name, value);
}

/// Adds `delta` to a gauge.
#[inline]
pub fn add_gauge(name: &'static str, delta: u64) {
    #[cfg(feature = "telemetry")]
    registry::update(|store| {
        let entry = store.gauges.entry(name).or_insert(0);
        *entry = entry.saturating_add(delta);
    });

    let _ = (name, delta);
}

/// Subtracts `delta` from a gauge, flooring at zero.
#[inline]
pub fn sub_gauge_saturating(name: &'static str, delta: u64) {
    #[cfg(feature = "telemetry")]
    registry::update(|store| {
        let entry = store.gauges.entry(name).or_insert(0);
        *entry = entry.saturating_sub(delta);
    });

    let _ = (name, delta);
}

/// Raises a gauge to `value` if it is currently lower.
#[inline]
pub fn max_gauge(name: &'static str, value: u64) {
    #[cfg(feature = "telemetry")]
    registry::update(|store| {
        let entry = store.gauges.entry(name).or_insert(0);
        *entry = (*entry).max(value);
    });

    let _ = (name, value);
}

pub fn snapshot() -> TelemetrySnapshot {
    #[cfg(feature = "telemetry")]
    {
        return registry::snapshot();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        TelemetrySnapshot::default()
    }
}

/// Clears all recorded metrics.
pub fn reset() {
    #[cfg(feature = "telemetry")]
    registry::update(|store| *store = registry::Store::default());
}

#[cfg(feature = "telemetry")]
mod registry {
    use std::collections::BTreeMap;
    use std::sync::{Mutex, OnceLock};

    use super::{HistogramSnapshot, TelemetrySnapshot};

    #[derive(Debug, Clone, Copy, Default)]
    pub(super) struct HistogramAggregate {
        count: u64,
        total: u64,
        min: u64,
        max: u64,
    }

    impl HistogramAggregate {
        pub(super) fn record(&mut self, value: u64) {
            if self.count == 0 {
                self.min = value;
                self.max = value;
            } else {
                self.min = self.min.min(value);
                self.max = self.max.max(value);
            }

            self.count = self.count.saturating_add(1);
            self.total = self.total.saturating_add(value);
        }

        fn snapshot(&self) -> HistogramSnapshot {
            let mean = if self.count == 0 {
                0.0
            } else {
                self.total as f64 / self.count as f64
            };

            HistogramSnapshot {
                count: self.count,
                total: self.total,
                min: self.min,
                max: self.max,
                mean,
            }
        }
    }

    #[derive(Default)]
    pub(super) struct Store {
        pub(super) counters: BTreeMap<&'static str, u64>,
        pub(super) gauges: BTreeMap<&'static str, u64>,
        pub(super) histograms: BTreeMap<&'static str, HistogramAggregate>,
    }

    fn store() -> &'static Mutex<Store> {
        static STORE: OnceLock<Mutex<Store>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(Store::default()))
    }

    pub(super) fn update<F>(op: F)
    where
        F: FnOnce(&mut Store),
    {
        let mut guard = match store().lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        op(&mut guard);
    }

    pub(super) fn snapshot() -> TelemetrySnapshot {
        let mut snapshot = TelemetrySnapshot::default();
        update(|store| {
            snapshot.counters = store
                .counters
                .iter()
                .map(|(name, value)| ((*name).to_owned(), *value))
                .collect();
            snapshot.gauges = store
                .gauges
                .iter()
                .map(|(name, value)| ((*name).to_owned(), *value))
                .collect();
            snapshot.histograms = store
                .histograms
                .iter()
                .map(|(name, value)| ((*name).to_owned(), value.snapshot()))
                .collect();
        });
        snapshot
    }
}
