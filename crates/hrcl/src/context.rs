// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide lifecycle and the shared context.
//!
//! `shutdown()` is the canonical cancellation path: it sets the process-wide
//! flag read by [`ok`], triggers the interrupt guard condition (waking every
//! blocked wait-set) and notifies the sleep condvar (so [`sleep_for`]
//! returns early with `false`). The SIGINT hook installed by [`init`] is a
//! convenience that calls `shutdown()`; nothing else in the crate depends on
//! signal availability.
//!
//! The interrupt guard condition and the sleep condvar are lazily
//! initialized process singletons. Executors attach to the guard only for
//! the duration of a wait and must be dropped before process exit.

use parking_lot::{Condvar, Mutex as PlMutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once, OnceLock};
use std::time::{Duration, Instant};

use crate::env_config::EnvConfig;
use crate::error::{Error, Result};
use crate::intra_process::IntraProcessManager;
use crate::qos::QoS;
use crate::rmw::{GuardCondition, LoopbackTransport, RmwTransport};

/// Process-wide shutdown flag. `false` at startup and after re-init.
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Guard condition triggered on shutdown, shared by every executor wait-set.
static SIGINT_GUARD: OnceLock<Arc<GuardCondition>> = OnceLock::new();

/// Condvar gate backing [`sleep_for`].
static INTERRUPT_GATE: OnceLock<InterruptGate> = OnceLock::new();

/// Default context installed by [`init`].
static DEFAULT_CONTEXT: Mutex<Option<Arc<Context>>> = Mutex::new(None);

/// One-shot SIGINT hook installation.
static SIGNAL_HOOK: Once = Once::new();

struct InterruptGate {
    mutex: PlMutex<()>,
    condvar: Condvar,
}

fn interrupt_gate() -> &'static InterruptGate {
    INTERRUPT_GATE.get_or_init(|| InterruptGate {
        mutex: PlMutex::new(()),
        condvar: Condvar::new(),
    })
}

/// Process-wide guard condition fired by `shutdown()` and the SIGINT hook.
///
/// Lazily created; the same instance is handed out for the life of the
/// process.
#[must_use]
pub fn sigint_guard_condition() -> Arc<GuardCondition> {
    Arc::clone(SIGINT_GUARD.get_or_init(|| Arc::new(GuardCondition::new())))
}

/// Shared state every node hangs off: the transport, the intra-process
/// manager and the runtime configuration.
pub struct Context {
    transport: Arc<dyn RmwTransport>,
    intra_process_manager: Arc<IntraProcessManager>,
    env: EnvConfig,
}

impl Context {
    /// Create a context over an explicit transport.
    pub fn new(transport: Arc<dyn RmwTransport>, env: EnvConfig) -> Arc<Self> {
        Arc::new(Self {
            transport,
            intra_process_manager: Arc::new(IntraProcessManager::new()),
            env,
        })
    }

    /// Create a context over the in-process loopback transport.
    pub fn with_loopback(env: EnvConfig) -> Arc<Self> {
        Self::new(Arc::new(LoopbackTransport::new()), env)
    }

    /// The context installed by [`init`].
    ///
    /// # Errors
    ///
    /// `NotInit` if `init()` has not run.
    pub fn default_context() -> Result<Arc<Self>> {
        DEFAULT_CONTEXT
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(Error::NotInit)
    }

    #[must_use]
    pub fn transport(&self) -> Arc<dyn RmwTransport> {
        Arc::clone(&self.transport)
    }

    #[must_use]
    pub fn intra_process_manager(&self) -> Arc<IntraProcessManager> {
        Arc::clone(&self.intra_process_manager)
    }

    #[must_use]
    pub fn env(&self) -> &EnvConfig {
        &self.env
    }

    /// Reliable profile with the history depth configured via
    /// `HRCL_DEFAULT_DEPTH`.
    ///
    /// Internal entities (such as the parameter services) use this instead
    /// of `QoS::default()` so the environment setting takes effect.
    #[must_use]
    pub fn default_qos(&self) -> QoS {
        QoS::reliable().keep_last(self.env.default_depth)
    }

    /// The process-wide interrupt guard (see [`sigint_guard_condition`]).
    #[must_use]
    pub fn sigint_guard(&self) -> Arc<GuardCondition> {
        sigint_guard_condition()
    }
}

/// Initialize the library: reset the shutdown flag, install the default
/// context over the loopback transport and hook SIGINT.
///
/// May be called again after [`shutdown`]; calling it while the library is
/// live returns `AlreadyInit`.
pub fn init() -> Result<()> {
    init_with_env(EnvConfig::from_env())
}

/// [`init`] with an explicit configuration instead of the environment.
pub fn init_with_env(env: EnvConfig) -> Result<()> {
    let mut slot = DEFAULT_CONTEXT.lock().unwrap_or_else(|e| e.into_inner());
    if slot.is_some() && ok() {
        return Err(Error::AlreadyInit);
    }

    SHUTDOWN.store(false, Ordering::Release);
    // Clear a trigger left over from a previous shutdown so fresh waits
    // do not wake spuriously.
    sigint_guard_condition().take_trigger();
    *slot = Some(Context::with_loopback(env));
    drop(slot);

    SIGNAL_HOOK.call_once(|| {
        if let Err(err) = ctrlc::set_handler(shutdown) {
            log::warn!("[context] could not install SIGINT hook: {}", err);
        }
    });

    log::debug!("[context] initialized");
    Ok(())
}

/// Whether the library is live (shutdown has not been requested).
#[must_use]
pub fn ok() -> bool {
    !SHUTDOWN.load(Ordering::Acquire)
}

/// Request process-wide shutdown.
///
/// Wakes every blocked executor wait and every cooperative sleep. Safe to
/// call from any thread, repeatedly, and from the signal hook.
pub fn shutdown() {
    SHUTDOWN.store(true, Ordering::Release);
    sigint_guard_condition().trigger();
    let gate = interrupt_gate();
    let _guard = gate.mutex.lock();
    gate.condvar.notify_all();
    log::debug!("[context] shutdown requested");
}

/// Sleep cooperatively for `duration`.
///
/// Returns `true` if the full duration elapsed, `false` if the sleep was
/// interrupted by [`shutdown`]. Interruption is not an error.
pub fn sleep_for(duration: Duration) -> bool {
    let gate = interrupt_gate();
    // A duration too large to represent as a deadline can only end by
    // interruption.
    let deadline = Instant::now().checked_add(duration);
    let mut guard = gate.mutex.lock();

    loop {
        if SHUTDOWN.load(Ordering::Acquire) {
            return false;
        }
        match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return true;
                }
                gate.condvar.wait_for(&mut guard, deadline - now);
            }
            None => {
                gate.condvar.wait(&mut guard);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Process-global state (shutdown flag, default context) is exercised by
    // the integration tests in `tests/shutdown.rs`, which own the whole
    // process lifecycle. The unit tests here stick to per-instance state.

    #[test]
    fn test_explicit_context_has_intra_process_manager() {
        let context = Context::with_loopback(EnvConfig::default());
        let manager = context.intra_process_manager();
        assert!(!manager.matches_any_publishers(&crate::rmw::Gid::zero()));
    }

    #[test]
    fn test_default_qos_uses_configured_depth() {
        let env = EnvConfig {
            default_depth: 32,
            ..EnvConfig::default()
        };
        let context = Context::with_loopback(env);
        assert_eq!(context.default_qos().depth(), 32);
    }

    #[test]
    fn test_sigint_guard_is_a_singleton() {
        let a = sigint_guard_condition();
        let b = sigint_guard_condition();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_sleep_for_elapses_without_shutdown() {
        let start = Instant::now();
        assert!(sleep_for(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(25));
    }
}
