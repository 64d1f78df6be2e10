//! Debouncing of rapidly changing inputs.
//!
//! Time is passed in explicitly (`now: Instant`) so the UI loop drives the
//! timers once per frame and tests drive them without sleeping.

use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Cancellable one-shot timer
// ---------------------------------------------------------------------------

/// Identifies one armed emission of a [`Timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Pending<T> {
    handle: TimerHandle,
    value: T,
    deadline: Instant,
}

/// One-shot timer carrying a value. At most one emission is pending:
/// arming again replaces (cancels) whatever was armed before.
#[derive(Debug)]
pub struct Timer<T> {
    next_id: u64,
    pending: Option<Pending<T>>,
}

impl<T> Default for Timer<T> {
    fn default() -> Self {
        Timer {
            next_id: 0,
            pending: None,
        }
    }
}

impl<T> Timer<T> {
    pub fn arm(&mut self, value: T, delay: Duration, now: Instant) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending = Some(Pending {
            handle,
            value,
            deadline: now + delay,
        });
        handle
    }

    /// Cancel `handle` if it is still pending. Stale handles are a no-op.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let armed = self.pending.as_ref().is_some_and(|p| p.handle == handle);
        if armed {
            self.pending = None;
        }
        armed
    }

    /// Take the pending value if its deadline has passed.
    pub fn fire_due(&mut self, now: Instant) -> Option<T> {
        if self.pending.as_ref().is_some_and(|p| now >= p.deadline) {
            self.pending.take().map(|p| p.value)
        } else {
            None
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Time left before the pending emission fires (zero if overdue).
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|p| p.deadline.saturating_duration_since(now))
    }
}

// ---------------------------------------------------------------------------
// Debouncer
// ---------------------------------------------------------------------------

/// Holds the stabilized copy of a value that only follows the raw input
/// once the input has been quiet for `delay`.
///
/// Dropping a debouncer discards any pending emission.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    stable: T,
    timer: Timer<T>,
}

impl<T: Clone> Debouncer<T> {
    pub fn new(initial: T, delay: Duration) -> Self {
        Debouncer {
            delay,
            stable: initial,
            timer: Timer::default(),
        }
    }

    /// Record a new raw value, restarting the quiet period.
    pub fn set(&mut self, value: T, now: Instant) {
        self.timer.arm(value, self.delay, now);
    }

    /// Promote the pending value if the quiet period has elapsed.
    /// Returns the new stabilized value when an emission happened.
    pub fn poll(&mut self, now: Instant) -> Option<&T> {
        let value = self.timer.fire_due(now)?;
        self.stable = value;
        Some(&self.stable)
    }

    pub fn value(&self) -> &T {
        &self.stable
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.timer.remaining(now)
    }
}
