// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic timers driven by the executor's steady clock.
//!
//! The transport plays no part in timer readiness: the executor compares
//! each timer's next trigger time against `Instant::now()` and bounds its
//! wait timeout by the earliest deadline. Deadlines that pass while a long
//! callback runs are collapsed into a single firing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Periodic callback source.
pub struct Timer {
    period: Duration,
    callback: Box<dyn Fn() + Send + Sync>,
    next_call: Mutex<Instant>,
    canceled: AtomicBool,
}

impl Timer {
    pub(crate) fn new(period: Duration, callback: Box<dyn Fn() + Send + Sync>) -> Self {
        Self {
            period,
            callback,
            next_call: Mutex::new(Instant::now() + period),
            canceled: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Duration until the next firing; zero when already due.
    ///
    /// A canceled timer reports `Duration::MAX` so it never bounds an
    /// executor wait.
    #[must_use]
    pub fn time_until_trigger(&self) -> Duration {
        if self.is_canceled() {
            return Duration::MAX;
        }
        let next_call = self.next_call.lock().unwrap_or_else(|e| e.into_inner());
        next_call.saturating_duration_since(Instant::now())
    }

    /// Whether the timer is due right now.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.is_canceled() && self.time_until_trigger() == Duration::ZERO
    }

    /// Advance the schedule and run the callback.
    ///
    /// The next deadline is measured from now, not from the missed one, so
    /// a timer fires at most once per selection cycle no matter how many
    /// deadlines passed during a long-running callback.
    pub(crate) fn execute(&self) {
        {
            let mut next_call = self.next_call.lock().unwrap_or_else(|e| e.into_inner());
            *next_call = Instant::now() + self.period;
        }
        (self.callback)();
    }

    /// Stop the timer firing until [`Timer::reset`] is called.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    /// Un-cancel and restart the period from now.
    pub fn reset(&self) {
        {
            let mut next_call = self.next_call.lock().unwrap_or_else(|e| e.into_inner());
            *next_call = Instant::now() + self.period;
        }
        self.canceled.store(false, Ordering::Release);
    }
}
