use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Instant;

use crate::TandemError;
use crate::telemetry;
use crate::telemetry::profile;
use crate::telemetry::tags;
use crate::types::Result;

const PROFILE_TAG_STACK_QUEUE: [&str; 2] = [tags::TAG_SYSTEM, tags::TAG_QUEUE];

/// Value handed back by [`BoundedQueue::put`] once the queue is closing.
pub struct ShutdownRejected<T>(pub T);

impl<T> ShutdownRejected<T> {
    /// Returns the value that was not enqueued.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for ShutdownRejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownRejected").finish_non_exhaustive()
    }
}

impl<T> fmt::Display for ShutdownRejected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue is shutting down; value was not enqueued")
    }
}

impl<T> std::error::Error for ShutdownRejected<T> {}

struct RingState<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    count: usize,
    shutting_down: bool,
}

impl<T> RingState<T> {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    fn push_back(&mut self, value: T) {
        debug_assert!(!self.is_full());
        debug_assert!(self.slots[self.tail].is_none());
        self.slots[self.tail] = Some(value);
        self.tail = (self.tail + 1) % self.capacity();
        self.count += 1;
    }

    fn pop_front(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        let value = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.count -= 1;
        value
    }
}

/// Fixed-capacity FIFO shared between threads.
///
/// `put` blocks while the queue is full and `get` blocks while it is
/// empty. [`shutdown`](Self::shutdown) wakes every waiter: blocked and
/// future `put` calls return [`ShutdownRejected`], while `get` keeps
/// draining buffered values and returns `None` once nothing is left.
///
/// Callers must stop producing before calling `shutdown`; values offered
/// afterwards are rejected, not lost.
pub struct BoundedQueue<T> {
    state: Mutex<RingState<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Creates a queue holding at most `capacity` values.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(TandemError::InvalidCapacity(capacity));
        }

        let slots = std::iter::repeat_with(|| None).take(capacity).collect();
        Ok(Self {
            state: Mutex::new(RingState {
                slots,
                head: 0,
                tail: 0,
                count: 0,
                shutting_down: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.lock_state().capacity()
    }

    /// Number of buffered values at the time of the call.
    pub fn len(&self) -> usize {
        self.lock_state().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_shutdown(&self) -> bool {
        self.lock_state().shutting_down
    }

    /// Appends `value`, blocking while the queue is full.
    ///
    /// Returns the value inside [`ShutdownRejected`] if shutdown has been
    /// requested, whether before the call or while it was waiting.
    pub fn put(&self, value: T) -> std::result::Result<(), ShutdownRejected<T>> {
        let mut state = self.lock_state();
        let mut waited_since = None;

        while state.is_full() && !state.shutting_down {
            waited_since.get_or_insert_with(Instant::now);
            state = match self.not_full.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }

        if let Some(started) = waited_since {
            telemetry::increment_counter(tags::METRIC_QUEUE_PUT_BLOCKED_COUNT, 1);
            telemetry::record_histogram(
                tags::METRIC_QUEUE_WAIT_LATENCY_US,
                profile::elapsed_us(started),
            );
        }

        if state.shutting_down {
            drop(state);
            telemetry::increment_counter(tags::METRIC_QUEUE_PUT_REJECTED_COUNT, 1);
            return Err(ShutdownRejected(value));
        }

        state.push_back(value);
        let depth = state.count;
        drop(state);
        self.not_empty.notify_one();

        telemetry::increment_counter(tags::METRIC_QUEUE_PUT_COUNT, 1);
        telemetry::set_gauge(tags::METRIC_QUEUE_DEPTH, depth as u64);
        Ok(())
    }

    /// Removes the oldest value, blocking while the queue is empty.
    ///
    /// `None` means the queue is both empty and shut down; consumers should
    /// stop.
    pub fn get(&self) -> Option<T> {
        let mut state = self.lock_state();
        let mut waited_since = None;

        while state.count == 0 && !state.shutting_down {
            waited_since.get_or_insert_with(Instant::now);
            state = match self.not_empty.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }

        if let Some(started) = waited_since {
            telemetry::increment_counter(tags::METRIC_QUEUE_GET_BLOCKED_COUNT, 1);
            telemetry::record_histogram(
                tags::METRIC_QUEUE_WAIT_LATENCY_US,
                profile::elapsed_us(started),
            );
        }

        let Some(value) = state.pop_front() else {
            drop(state);
            telemetry::increment_counter(tags::METRIC_QUEUE_GET_CLOSED_COUNT, 1);
            return None;
        };

        let depth = state.count;
        drop(state);
        self.not_full.notify_one();

        telemetry::increment_counter(tags::METRIC_QUEUE_GET_COUNT, 1);
        telemetry::set_gauge(tags::METRIC_QUEUE_DEPTH, depth as u64);
        Some(value)
    }

    /// Closes the queue and wakes every blocked producer and consumer.
    ///
    /// Calling it more than once is harmless.
    pub fn shutdown(&self) {
        let started = Instant::now();
        let buffered = {
            let mut state = self.lock_state();
            state.shutting_down = true;
            state.count
        };
        self.not_full.notify_all();
        self.not_empty.notify_all();

        telemetry::increment_counter(tags::METRIC_QUEUE_SHUTDOWN_COUNT, 1);
        profile::event(
            tags::PROFILE_QUEUE,
            &PROFILE_TAG_STACK_QUEUE,
            "shutdown",
            "ok",
            profile::elapsed_us(started),
            "bounded queue shutdown requested",
        );
        tracing::debug!(buffered, "bounded queue shutdown requested");
    }

    /// Takes every value still buffered, oldest first.
    pub fn drain_remaining(&self) -> Vec<T> {
        let mut state = self.lock_state();
        let mut drained = Vec::with_capacity(state.count);
        while let Some(value) = state.pop_front() {
            drained.push(value);
        }
        drop(state);
        self.not_full.notify_all();
        drained
    }

    fn lock_state(&self) -> MutexGuard<'_, RingState<T>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("BoundedQueue")
            .field("capacity", &state.capacity())
            .field("len", &state.count)
            .field("shutting_down", &state.shutting_down)
            .finish()
    }
}
