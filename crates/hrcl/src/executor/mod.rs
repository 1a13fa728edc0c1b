// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Work dispatch: wait-set construction, readiness selection and callback
//! invocation.
//!
//! The [`Executor`] multiplexes readiness across every entity of its added
//! nodes. One spin iteration is: rebuild the wait-set scratch through the
//! memory strategy, block until something is ready (bounded by the earliest
//! timer deadline), then repeatedly select the next ready executable whose
//! callback group permits it and dispatch it.
//!
//! Selection scans in fixed priority order (timer, subscription, service,
//! client) so deadline-sensitive periodic work is never starved by message
//! traffic, and a server drains requests before its own clients issue new
//! ones. Ties within a kind fall back to insertion order.
//!
//! Concurrency discipline is entirely in the callback-group token: a
//! mutually-exclusive group is claimed atomically at selection and released
//! when the dispatched [`AnyExecutable`] drops, so no lock is ever held
//! across user code.

pub mod memory_strategy;

mod multi_threaded;
mod single_threaded;

pub use memory_strategy::{DefaultMemoryStrategy, MemoryStrategy, ScratchSizes, WaitSetScratch};
pub use multi_threaded::MultiThreadedExecutor;
pub use single_threaded::SingleThreadedExecutor;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use crate::callback_group::{CallbackGroup, CallbackGroupKind};
use crate::client::ClientBase;
use crate::context::Context;
use crate::error::Result;
use crate::node::Node;
use crate::rmw::{GuardCondition, WaitSignal, Waitable};
use crate::service::ServiceBase;
use crate::subscription::SubscriptionBase;
use crate::timer::Timer;

use memory_strategy::{ClientSlot, ServiceSlot, SubscriptionSlot, TimerSlot};

/// The entity half of one unit of work.
pub enum ExecutableKind {
    Subscription(Arc<dyn SubscriptionBase>),
    IntraProcessSubscription(Arc<dyn SubscriptionBase>),
    Timer(Arc<Timer>),
    Service(Arc<dyn ServiceBase>),
    Client(Arc<dyn ClientBase>),
}

impl ExecutableKind {
    fn label(&self) -> &'static str {
        match self {
            ExecutableKind::Subscription(_) => "subscription",
            ExecutableKind::IntraProcessSubscription(_) => "intra-process subscription",
            ExecutableKind::Timer(_) => "timer",
            ExecutableKind::Service(_) => "service",
            ExecutableKind::Client(_) => "client",
        }
    }
}

/// One unit of work: an entity plus its callback group and owning node,
/// both held strongly for the duration of the dispatch.
///
/// For a mutually-exclusive group, constructing this claims the group's
/// execution token; dropping it (after the callback returns, or during
/// unwinding if the callback panics) releases the token.
pub struct AnyExecutable {
    pub kind: ExecutableKind,
    callback_group: Arc<CallbackGroup>,
    node: Arc<Node>,
}

impl AnyExecutable {
    #[must_use]
    pub fn callback_group(&self) -> &Arc<CallbackGroup> {
        &self.callback_group
    }

    #[must_use]
    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }
}

impl Drop for AnyExecutable {
    fn drop(&mut self) {
        if self.callback_group.kind() == CallbackGroupKind::MutuallyExclusive {
            self.callback_group
                .can_be_taken_from()
                .store(true, Ordering::Release);
        }
    }
}

enum Claim {
    Taken(Arc<CallbackGroup>, Arc<Node>),
    Busy,
    Dead,
}

fn try_claim(group: &Weak<CallbackGroup>, node: &Weak<Node>) -> Claim {
    let Some(node) = node.upgrade() else {
        return Claim::Dead;
    };
    let Some(group) = group.upgrade() else {
        return Claim::Dead;
    };
    match group.kind() {
        CallbackGroupKind::Reentrant => Claim::Taken(group, node),
        CallbackGroupKind::MutuallyExclusive => {
            if group
                .can_be_taken_from()
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                Claim::Taken(group, node)
            } else {
                Claim::Busy
            }
        }
    }
}

struct GroupSnapshot {
    node: Weak<Node>,
    group: Weak<CallbackGroup>,
    subscriptions: Vec<Arc<dyn SubscriptionBase>>,
    timers: Vec<Arc<Timer>>,
    services: Vec<Arc<dyn ServiceBase>>,
    clients: Vec<Arc<dyn ClientBase>>,
}

/// Work-dispatch engine over one or more nodes.
///
/// The spin policy lives in the variants ([`SingleThreadedExecutor`],
/// [`MultiThreadedExecutor`]); this type provides everything they share:
/// node membership, wait-set construction and the selection step.
pub struct Executor {
    context: Arc<Context>,
    interrupt_guard: Arc<GuardCondition>,
    memory_strategy: Mutex<Box<dyn MemoryStrategy>>,
    weak_nodes: Mutex<Vec<Weak<Node>>>,
    /// Bumped on every add/remove; invalidates scratch built against an
    /// older node membership.
    membership_generation: AtomicU64,
}

impl Executor {
    #[must_use]
    pub fn new(context: Arc<Context>) -> Self {
        Self::with_memory_strategy(context, Box::new(DefaultMemoryStrategy::new()))
    }

    #[must_use]
    pub fn with_memory_strategy(
        context: Arc<Context>,
        memory_strategy: Box<dyn MemoryStrategy>,
    ) -> Self {
        Self {
            context,
            interrupt_guard: Arc::new(GuardCondition::new()),
            memory_strategy: Mutex::new(memory_strategy),
            weak_nodes: Mutex::new(Vec::new()),
            membership_generation: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn context(&self) -> Arc<Context> {
        Arc::clone(&self.context)
    }

    /// Add a node to the set observed by this executor.
    ///
    /// With `notify` set, fires the interrupt guard condition so a wait
    /// blocked in another thread returns promptly and rebuilds its wait-set.
    pub fn add_node(&self, node: &Arc<Node>, notify: bool) {
        self.weak_nodes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::downgrade(node));
        self.membership_generation.fetch_add(1, Ordering::AcqRel);
        log::debug!("[executor] node '{}' added (notify={})", node.name(), notify);
        if notify {
            self.interrupt_guard.trigger();
        }
    }

    /// Remove a node from the set observed by this executor.
    pub fn remove_node(&self, node: &Arc<Node>, notify: bool) {
        self.weak_nodes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|weak| match weak.upgrade() {
                Some(candidate) => !Arc::ptr_eq(&candidate, node),
                None => false,
            });
        self.membership_generation.fetch_add(1, Ordering::AcqRel);
        log::debug!(
            "[executor] node '{}' removed (notify={})",
            node.name(),
            notify
        );
        if notify {
            self.interrupt_guard.trigger();
        }
    }

    /// Wake a wait blocked in this executor without changing membership.
    pub(crate) fn interrupt(&self) {
        self.interrupt_guard.trigger();
    }

    /// Hot-swap the allocation policy.
    ///
    /// Callers must ensure no spin is in progress on another thread.
    pub fn set_memory_strategy(&self, memory_strategy: Box<dyn MemoryStrategy>) {
        *self
            .memory_strategy
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = memory_strategy;
    }

    /// Dispatch everything that is already ready, without blocking for new
    /// work.
    pub fn spin_some(&self) -> Result<()> {
        self.wait_for_work(Some(Duration::ZERO))?;
        while let Some(executable) = self.get_next_ready_executable() {
            self.execute_any_executable(executable)?;
        }
        Ok(())
    }

    /// Temporarily add `node`, wait up to `timeout` for work, dispatch at
    /// most one executable, then remove the node again.
    pub fn spin_node_once(&self, node: &Arc<Node>, timeout: Option<Duration>) -> Result<()> {
        self.add_node(node, true);
        let next = self.get_next_executable(timeout);
        let result = match next {
            Ok(Some(executable)) => self.execute_any_executable(executable),
            Ok(None) => Ok(()),
            Err(err) => Err(err),
        };
        self.remove_node(node, true);
        result
    }

    /// Nanosecond entry point for [`Executor::spin_node_once`]; negative
    /// values block indefinitely.
    pub fn spin_node_once_nanoseconds(&self, node: &Arc<Node>, nanoseconds: i64) -> Result<()> {
        let timeout = u64::try_from(nanoseconds).ok().map(Duration::from_nanos);
        self.spin_node_once(node, timeout)
    }

    /// Temporarily add `node`, dispatch everything already ready, then
    /// remove the node again.
    pub fn spin_node_some(&self, node: &Arc<Node>) -> Result<()> {
        self.add_node(node, true);
        let result = self.spin_some();
        self.remove_node(node, true);
        result
    }

    /// Find the next executable, waiting up to `timeout` (`None` blocks
    /// until work or a guard trigger arrives).
    ///
    /// Returns `Ok(None)` when the wait ended without a dispatchable
    /// entity, which is how guard-driven wakeups (shutdown, notify) surface
    /// to the spin loop.
    pub fn get_next_executable(&self, timeout: Option<Duration>) -> Result<Option<AnyExecutable>> {
        // Leftover readiness from the previous wait first.
        if let Some(executable) = self.get_next_ready_executable() {
            return Ok(Some(executable));
        }
        self.wait_for_work(timeout)?;
        Ok(self.get_next_ready_executable())
    }

    /// Invoke the callback for one unit of work.
    pub fn execute_any_executable(&self, executable: AnyExecutable) -> Result<()> {
        if self.context.env().log_dispatch {
            log::debug!(
                "[executor] dispatching {} for node '{}'",
                executable.kind.label(),
                executable.node.name()
            );
        }
        let result = match &executable.kind {
            ExecutableKind::Timer(timer) => {
                timer.execute();
                Ok(())
            }
            ExecutableKind::Subscription(subscription) => subscription.execute(),
            ExecutableKind::IntraProcessSubscription(subscription) => {
                subscription.execute_intra_process()
            }
            ExecutableKind::Service(service) => service.execute(),
            ExecutableKind::Client(client) => client.execute(),
        };
        // Dropping the executable releases the group token.
        drop(executable);
        result
    }

    /// Rebuild the wait-set and block until readiness, a guard trigger or
    /// the timeout. The wait never outlasts the earliest timer deadline.
    fn wait_for_work(&self, timeout: Option<Duration>) -> Result<()> {
        let generation = self.membership_generation.load(Ordering::Acquire);
        let mut strategy = self.memory_strategy.lock().unwrap_or_else(|e| e.into_inner());
        strategy.clear_handles();
        strategy.handles().generation = generation;

        let nodes: Vec<Arc<Node>> = {
            let mut weak_nodes = self.weak_nodes.lock().unwrap_or_else(|e| e.into_inner());
            weak_nodes.retain(|weak| weak.upgrade().is_some());
            weak_nodes.iter().filter_map(Weak::upgrade).collect()
        };

        let mut snapshots = Vec::new();
        let mut sizes = ScratchSizes {
            guards: 2,
            ..ScratchSizes::default()
        };
        for node in &nodes {
            for group in node.callback_groups() {
                let subscriptions = group.subscriptions();
                let timers = group.timers();
                let services = group.services();
                let clients = group.clients();

                sizes.subscriptions += subscriptions
                    .iter()
                    .map(|s| if s.intra_handle().is_some() { 2 } else { 1 })
                    .sum::<usize>();
                sizes.timers += timers.len();
                sizes.services += services.len();
                sizes.clients += clients.len();

                snapshots.push(GroupSnapshot {
                    node: Arc::downgrade(node),
                    group: Arc::downgrade(&group),
                    subscriptions,
                    timers,
                    services,
                    clients,
                });
            }
        }

        strategy.reserve(&sizes);
        let scratch = strategy.handles();

        for snapshot in snapshots {
            for subscription in snapshot.subscriptions {
                let has_intra = subscription.intra_handle().is_some();
                scratch.subscriptions.push(Some(SubscriptionSlot {
                    subscription: Arc::clone(&subscription),
                    intra: false,
                    group: snapshot.group.clone(),
                    node: snapshot.node.clone(),
                }));
                if has_intra {
                    scratch.subscriptions.push(Some(SubscriptionSlot {
                        subscription,
                        intra: true,
                        group: snapshot.group.clone(),
                        node: snapshot.node.clone(),
                    }));
                }
            }
            for timer in snapshot.timers {
                scratch.timers.push(Some(TimerSlot {
                    timer,
                    group: snapshot.group.clone(),
                    node: snapshot.node.clone(),
                }));
            }
            for service in snapshot.services {
                scratch.services.push(Some(ServiceSlot {
                    service,
                    group: snapshot.group.clone(),
                    node: snapshot.node.clone(),
                }));
            }
            for client in snapshot.clients {
                scratch.clients.push(Some(ClientSlot {
                    client,
                    group: snapshot.group.clone(),
                    node: snapshot.node.clone(),
                }));
            }
        }
        scratch.guards.push(Some(Arc::clone(&self.interrupt_guard)));
        scratch.guards.push(Some(self.context.sigint_guard()));

        let effective_timeout = combine_timeout(timeout, earliest_timer(scratch));

        let signal = WaitSignal::new();
        attach_signal(scratch, &signal);

        // The attach step fires the signal for anything already ready, so a
        // single bounded wait suffices; a timer coming due is covered by the
        // timeout bound above.
        signal.wait(effective_timeout);

        detach_signal(scratch, signal.id());

        // Readiness is communicated by nulling non-ready slots in place.
        for slot in scratch.subscriptions.iter_mut() {
            let ready = match slot {
                Some(entry) => {
                    if entry.intra {
                        entry
                            .subscription
                            .intra_handle()
                            .is_some_and(|handle| handle.is_ready())
                    } else {
                        entry.subscription.handle().is_ready()
                    }
                }
                None => continue,
            };
            if !ready {
                *slot = None;
            }
        }
        for slot in scratch.services.iter_mut() {
            let ready = match slot {
                Some(entry) => entry.service.handle().is_ready(),
                None => continue,
            };
            if !ready {
                *slot = None;
            }
        }
        for slot in scratch.clients.iter_mut() {
            let ready = match slot {
                Some(entry) => entry.client.handle().is_ready(),
                None => continue,
            };
            if !ready {
                *slot = None;
            }
        }

        // Guards exist to wake the wait; consume their triggers and drop
        // the slots so selection never sees them.
        for guard in scratch.guards.iter().flatten() {
            guard.take_trigger();
        }
        scratch.guards.clear();

        Ok(())
    }

    /// Select the next ready executable consistent with group policy.
    ///
    /// Scans timers, then subscriptions, then services, then clients; within
    /// a kind, slots are in insertion order. A mutually-exclusive group is
    /// claimed atomically here; slots whose group is busy stay in place for
    /// a later pass, slots whose node or group died are pruned silently.
    pub fn get_next_ready_executable(&self) -> Option<AnyExecutable> {
        let mut strategy = self.memory_strategy.lock().unwrap_or_else(|e| e.into_inner());
        let scratch = strategy.handles();

        // Leftover slots built against an older node membership are
        // discarded, not dispatched.
        if scratch.generation != self.membership_generation.load(Ordering::Acquire) {
            scratch.clear();
            return None;
        }

        for slot in scratch.timers.iter_mut() {
            let Some(entry) = slot.as_ref() else { continue };
            if !entry.timer.is_ready() {
                continue;
            }
            match try_claim(&entry.group, &entry.node) {
                Claim::Dead => *slot = None,
                Claim::Busy => {}
                Claim::Taken(group, node) => {
                    if let Some(taken) = slot.take() {
                        return Some(AnyExecutable {
                            kind: ExecutableKind::Timer(taken.timer),
                            callback_group: group,
                            node,
                        });
                    }
                }
            }
        }

        for slot in scratch.subscriptions.iter_mut() {
            let Some(entry) = slot.as_ref() else { continue };
            match try_claim(&entry.group, &entry.node) {
                Claim::Dead => *slot = None,
                Claim::Busy => {}
                Claim::Taken(group, node) => {
                    if let Some(taken) = slot.take() {
                        let kind = if taken.intra {
                            ExecutableKind::IntraProcessSubscription(taken.subscription)
                        } else {
                            ExecutableKind::Subscription(taken.subscription)
                        };
                        return Some(AnyExecutable {
                            kind,
                            callback_group: group,
                            node,
                        });
                    }
                }
            }
        }

        for slot in scratch.services.iter_mut() {
            let Some(entry) = slot.as_ref() else { continue };
            match try_claim(&entry.group, &entry.node) {
                Claim::Dead => *slot = None,
                Claim::Busy => {}
                Claim::Taken(group, node) => {
                    if let Some(taken) = slot.take() {
                        return Some(AnyExecutable {
                            kind: ExecutableKind::Service(taken.service),
                            callback_group: group,
                            node,
                        });
                    }
                }
            }
        }

        for slot in scratch.clients.iter_mut() {
            let Some(entry) = slot.as_ref() else { continue };
            match try_claim(&entry.group, &entry.node) {
                Claim::Dead => *slot = None,
                Claim::Busy => {}
                Claim::Taken(group, node) => {
                    if let Some(taken) = slot.take() {
                        return Some(AnyExecutable {
                            kind: ExecutableKind::Client(taken.client),
                            callback_group: group,
                            node,
                        });
                    }
                }
            }
        }

        None
    }
}

/// Minimum remaining deadline across all timer slots; `None` when no timer
/// bounds the wait.
fn earliest_timer(scratch: &WaitSetScratch) -> Option<Duration> {
    scratch
        .timers
        .iter()
        .flatten()
        .map(|slot| slot.timer.time_until_trigger())
        .filter(|remaining| *remaining < Duration::MAX)
        .min()
}

fn combine_timeout(user: Option<Duration>, timer: Option<Duration>) -> Option<Duration> {
    match (user, timer) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

fn attach_signal(scratch: &WaitSetScratch, signal: &Arc<WaitSignal>) {
    for slot in scratch.subscriptions.iter().flatten() {
        if slot.intra {
            if let Some(handle) = slot.subscription.intra_handle() {
                handle.attach_wait_signal(signal);
            }
        } else {
            slot.subscription.handle().attach_wait_signal(signal);
        }
    }
    for slot in scratch.services.iter().flatten() {
        slot.service.handle().attach_wait_signal(signal);
    }
    for slot in scratch.clients.iter().flatten() {
        slot.client.handle().attach_wait_signal(signal);
    }
    for guard in scratch.guards.iter().flatten() {
        guard.attach_wait_signal(signal);
    }
}

fn detach_signal(scratch: &WaitSetScratch, signal_id: u64) {
    for slot in scratch.subscriptions.iter().flatten() {
        if slot.intra {
            if let Some(handle) = slot.subscription.intra_handle() {
                handle.detach_wait_signal(signal_id);
            }
        } else {
            slot.subscription.handle().detach_wait_signal(signal_id);
        }
    }
    for slot in scratch.services.iter().flatten() {
        slot.service.handle().detach_wait_signal(signal_id);
    }
    for slot in scratch.clients.iter().flatten() {
        slot.client.handle().detach_wait_signal(signal_id);
    }
    for guard in scratch.guards.iter().flatten() {
        guard.detach_wait_signal(signal_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env_config::EnvConfig;
    use crate::qos::QoS;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn test_context() -> Arc<Context> {
        Context::with_loopback(EnvConfig::default())
    }

    fn test_node(context: &Arc<Context>, name: &str) -> Arc<Node> {
        Node::builder(name)
            .context(Arc::clone(context))
            .build()
            .expect("node creation should succeed")
    }

    #[test]
    fn test_no_work_times_out() {
        let context = test_context();
        let executor = Executor::new(Arc::clone(&context));
        let node = test_node(&context, "idle");
        executor.add_node(&node, false);

        let start = Instant::now();
        let next = executor
            .get_next_executable(Some(Duration::from_millis(50)))
            .expect("selection should not fail");
        assert!(next.is_none());
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_ready_subscription_selected() {
        let context = test_context();
        let executor = Executor::new(Arc::clone(&context));
        let node = test_node(&context, "talker");
        executor.add_node(&node, false);

        let received = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&received);
        let _subscription = node
            .create_subscription("data", QoS::default(), move |message: i64| {
                count.fetch_add(message as usize, Ordering::Relaxed);
            })
            .expect("subscription creation should succeed");
        let publisher = node
            .create_publisher::<i64>("data", QoS::default())
            .expect("publisher creation should succeed");
        publisher.publish(5).expect("publish should succeed");

        let executable = executor
            .get_next_executable(Some(Duration::from_millis(200)))
            .expect("selection should not fail")
            .expect("an executable should be ready");
        executor
            .execute_any_executable(executable)
            .expect("dispatch should not fail");
        assert_eq!(received.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_timer_beats_ready_subscription() {
        let context = test_context();
        let executor = Executor::new(Arc::clone(&context));
        let node = test_node(&context, "mixed");
        executor.add_node(&node, false);

        let _subscription = node
            .create_subscription("data", QoS::default(), |_message: i64| {})
            .expect("subscription creation should succeed");
        let publisher = node
            .create_publisher::<i64>("data", QoS::default())
            .expect("publisher creation should succeed");
        let _timer = node
            .create_timer(Duration::from_millis(1), || {})
            .expect("timer creation should succeed");

        publisher.publish(1).expect("publish should succeed");
        std::thread::sleep(Duration::from_millis(5));

        let executable = executor
            .get_next_executable(Some(Duration::from_millis(200)))
            .expect("selection should not fail")
            .expect("an executable should be ready");
        assert!(matches!(executable.kind, ExecutableKind::Timer(_)));
    }

    #[test]
    fn test_mutually_exclusive_group_blocks_second_take() {
        let context = test_context();
        let executor = Executor::new(Arc::clone(&context));
        let node = test_node(&context, "talker");
        executor.add_node(&node, false);

        let _first = node
            .create_subscription("data", QoS::default(), |_message: i64| {})
            .expect("subscription creation should succeed");
        let _second = node
            .create_subscription("data", QoS::default(), |_message: i64| {})
            .expect("subscription creation should succeed");
        let publisher = node
            .create_publisher::<i64>("data", QoS::default())
            .expect("publisher creation should succeed");
        publisher.publish(1).expect("publish should succeed");

        let first = executor
            .get_next_executable(Some(Duration::from_millis(200)))
            .expect("selection should not fail")
            .expect("an executable should be ready");

        // Same group, token now claimed: nothing else may be taken.
        assert!(executor.get_next_ready_executable().is_none());

        drop(first);
        assert!(executor.get_next_ready_executable().is_some());
    }

    #[test]
    fn test_notify_wakes_blocked_wait() {
        let context = test_context();
        let executor = Arc::new(Executor::new(Arc::clone(&context)));
        let node = test_node(&context, "late");

        let background = Arc::clone(&executor);
        let waiter = std::thread::spawn(move || {
            let start = Instant::now();
            let _ = background.get_next_executable(Some(Duration::from_secs(5)));
            start.elapsed()
        });

        std::thread::sleep(Duration::from_millis(50));
        executor.add_node(&node, true);

        let elapsed = waiter.join().expect("waiter should not panic");
        assert!(elapsed < Duration::from_secs(2), "notify should cut the wait short");
    }

    #[test]
    fn test_spin_some_drains_only_present_work() {
        let context = test_context();
        let executor = Executor::new(Arc::clone(&context));
        let node = test_node(&context, "drain");
        executor.add_node(&node, false);

        let received = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&received);
        let _subscription = node
            .create_subscription("data", QoS::default(), move |_message: i64| {
                count.fetch_add(1, Ordering::Relaxed);
            })
            .expect("subscription creation should succeed");
        let publisher = node
            .create_publisher::<i64>("data", QoS::default())
            .expect("publisher creation should succeed");
        for _ in 0..3 {
            publisher.publish(1).expect("publish should succeed");
        }

        executor.spin_some().expect("spin_some should not fail");
        assert_eq!(received.load(Ordering::Relaxed), 1);

        // Each dispatch takes one sample; drain the rest.
        executor.spin_some().expect("spin_some should not fail");
        executor.spin_some().expect("spin_some should not fail");
        assert_eq!(received.load(Ordering::Relaxed), 3);
    }
}
