// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wait signals and guard conditions.
//!
//! A [`WaitSignal`] is a condvar-backed, single-consumer latch. The executor
//! creates one per wait, attaches it to every handle it is interested in,
//! blocks on it, and detaches afterwards. Handles keep only weak references
//! to attached signals so a dropped waiter never leaks.
//!
//! A [`GuardCondition`] is the fire-once wakeup primitive: triggering it
//! wakes every attached waiter, and the observer consumes the trigger with
//! [`GuardCondition::take_trigger`].

use parking_lot::{Condvar, Mutex as PlMutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

/// Condvar-backed latch used to block a wait-set until readiness.
pub struct WaitSignal {
    id: u64,
    notified: AtomicBool,
    sleeping: PlMutex<bool>,
    condvar: Condvar,
}

impl WaitSignal {
    pub fn new() -> Arc<Self> {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Arc::new(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            notified: AtomicBool::new(false),
            sleeping: PlMutex::new(false),
            condvar: Condvar::new(),
        })
    }

    /// Unique identifier, used by handles to detach a specific signal.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Latch the signal and wake a sleeping waiter.
    pub fn signal(&self) {
        self.notified.store(true, Ordering::Release);
        if *self.sleeping.lock() {
            self.condvar.notify_all();
        }
    }

    /// Block until signaled or until `timeout` elapses (`None` blocks
    /// indefinitely). Returns `true` when signaled; consumes the latch.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        if self.notified.swap(false, Ordering::AcqRel) {
            return true;
        }

        // A timeout too large to represent as a deadline means "wait forever".
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut sleeping = self.sleeping.lock();

        loop {
            if self.notified.swap(false, Ordering::AcqRel) {
                *sleeping = false;
                return true;
            }

            *sleeping = true;
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        *sleeping = false;
                        return self.notified.swap(false, Ordering::AcqRel);
                    }
                    self.condvar.wait_for(&mut sleeping, deadline - now);
                }
                None => self.condvar.wait(&mut sleeping),
            }
        }
    }
}

/// Readiness contract every waitable transport handle implements.
pub trait Waitable: Send + Sync {
    /// Whether taking from this handle would yield something right now.
    fn is_ready(&self) -> bool;

    /// Register a signal to fire when this handle becomes ready.
    ///
    /// If the handle is already ready the signal fires immediately, so a
    /// waiter attaching after the fact does not sleep through it.
    fn attach_wait_signal(&self, signal: &Arc<WaitSignal>);

    /// Remove a previously attached signal by id.
    fn detach_wait_signal(&self, signal_id: u64);
}

struct WaitHook {
    id: u64,
    signal: Weak<WaitSignal>,
}

/// Shared attach/detach/notify bookkeeping for waitable handles.
///
/// Dead weak references are pruned on every attach and notify.
pub struct WaitHookSet {
    hooks: Mutex<Vec<WaitHook>>,
}

impl WaitHookSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            hooks: Mutex::new(Vec::new()),
        }
    }

    pub fn attach(&self, signal: &Arc<WaitSignal>) {
        let mut hooks = self.hooks.lock().unwrap_or_else(|e| e.into_inner());
        hooks.retain(|hook| hook.signal.upgrade().is_some());
        hooks.push(WaitHook {
            id: signal.id(),
            signal: Arc::downgrade(signal),
        });
    }

    pub fn detach(&self, signal_id: u64) {
        let mut hooks = self.hooks.lock().unwrap_or_else(|e| e.into_inner());
        hooks.retain(|hook| hook.id != signal_id);
    }

    /// Fire every live attached signal.
    pub fn notify(&self) {
        let mut hooks = self.hooks.lock().unwrap_or_else(|e| e.into_inner());
        hooks.retain(|hook| {
            if let Some(signal) = hook.signal.upgrade() {
                signal.signal();
                true
            } else {
                false
            }
        });
    }
}

impl Default for WaitHookSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Fire-once wakeup primitive attached to every executor wait-set.
///
/// Used for the executor interrupt (node added/removed with `notify`) and
/// for the process-wide interrupt installed by `init()`.
pub struct GuardCondition {
    trigger_value: AtomicBool,
    hooks: WaitHookSet,
}

impl GuardCondition {
    #[must_use]
    pub fn new() -> Self {
        Self {
            trigger_value: AtomicBool::new(false),
            hooks: WaitHookSet::new(),
        }
    }

    /// Set the trigger and wake every attached waiter.
    pub fn trigger(&self) {
        self.trigger_value.store(true, Ordering::Release);
        self.hooks.notify();
    }

    /// Whether the trigger is currently set.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.trigger_value.load(Ordering::Acquire)
    }

    /// Consume the trigger, returning whether it was set.
    pub fn take_trigger(&self) -> bool {
        self.trigger_value.swap(false, Ordering::AcqRel)
    }
}

impl Waitable for GuardCondition {
    fn is_ready(&self) -> bool {
        self.is_triggered()
    }

    fn attach_wait_signal(&self, signal: &Arc<WaitSignal>) {
        self.hooks.attach(signal);
        if self.is_triggered() {
            signal.signal();
        }
    }

    fn detach_wait_signal(&self, signal_id: u64) {
        self.hooks.detach(signal_id);
    }
}

impl Default for GuardCondition {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_signal_latches_before_wait() {
        let signal = WaitSignal::new();
        signal.signal();
        assert!(signal.wait(Some(Duration::from_millis(100))));
    }

    #[test]
    fn test_wait_times_out() {
        let signal = WaitSignal::new();
        let start = Instant::now();
        assert!(!signal.wait(Some(Duration::from_millis(50))));
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_cross_thread_wake() {
        let signal = WaitSignal::new();
        let remote = Arc::clone(&signal);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.signal();
        });

        let start = Instant::now();
        assert!(signal.wait(Some(Duration::from_secs(5))));
        assert!(start.elapsed() < Duration::from_secs(1));
        handle.join().expect("wake thread should not panic");
    }

    #[test]
    fn test_guard_trigger_wakes_attached_signal() {
        let guard = GuardCondition::new();
        let signal = WaitSignal::new();

        guard.attach_wait_signal(&signal);
        guard.trigger();

        assert!(signal.wait(Some(Duration::from_millis(100))));
        assert!(guard.take_trigger());
        assert!(!guard.is_triggered());
    }

    #[test]
    fn test_guard_attach_after_trigger_fires_immediately() {
        let guard = GuardCondition::new();
        guard.trigger();

        let signal = WaitSignal::new();
        guard.attach_wait_signal(&signal);
        assert!(signal.wait(Some(Duration::from_millis(100))));
    }

    #[test]
    fn test_detached_signal_not_woken() {
        let guard = GuardCondition::new();
        let signal = WaitSignal::new();

        guard.attach_wait_signal(&signal);
        guard.detach_wait_signal(signal.id());
        guard.trigger();

        assert!(!signal.wait(Some(Duration::from_millis(20))));
    }
}
